use clap::{Parser, Subcommand};
use lib::config::{Config, MatchPolicy};
use lib::integrity;
use lib::routing::{Resolution, Resolver};
use lib::skills::{SkillEntry, SkillSummary};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "skillmap")]
#[command(about = "Browse skill corpora and route intake responses to documents", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory with a default config and the bundled skills.
    Init {
        /// Config file path (default: SKILLMAP_CONFIG_PATH or ~/.skillmap/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// List loaded skills (name, description, document and rule counts).
    List {
        /// Config file path (default: SKILLMAP_CONFIG_PATH or ~/.skillmap/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Show a skill's intake menu, routing table and documents.
    Show {
        /// Skill name (frontmatter `name`).
        skill: String,

        /// Config file path (default: SKILLMAP_CONFIG_PATH or ~/.skillmap/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Resolve a response (menu number or free text) to the documents to load next.
    Route {
        /// Skill name (frontmatter `name`).
        skill: String,

        /// The response; several words are joined with spaces.
        #[arg(required = true, num_args = 1..)]
        input: Vec<String>,

        /// Config file path (default: SKILLMAP_CONFIG_PATH or ~/.skillmap/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Multi-match policy: "all" or "first" (default from SKILLMAP_ROUTING_POLICY or config).
        #[arg(long, value_name = "POLICY")]
        policy: Option<MatchPolicy>,

        /// Print the full content of each matched document.
        #[arg(long)]
        load: bool,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Print a skill's verification checklist.
    Checklist {
        /// Skill name (frontmatter `name`).
        skill: String,

        /// Config file path (default: SKILLMAP_CONFIG_PATH or ~/.skillmap/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Check routing targets, overlapping triggers and intake/routing drift. Exits 1 on errors.
    Check {
        /// Only check this skill.
        skill: Option<String>,

        /// Config file path (default: SKILLMAP_CONFIG_PATH or ~/.skillmap/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Treat warnings as errors.
        #[arg(long)]
        strict: bool,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Version) => {
            println!("skillmap {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Some(Commands::Init { config }) => run_init(config),
        Some(Commands::List { config, json }) => run_list(config, json),
        Some(Commands::Show { skill, config }) => run_show(config, &skill),
        Some(Commands::Route {
            skill,
            input,
            config,
            policy,
            load,
            json,
        }) => run_route(config, &skill, &input.join(" "), policy, load, json),
        Some(Commands::Checklist { skill, config }) => run_checklist(config, &skill),
        Some(Commands::Check {
            skill,
            config,
            strict,
            json,
        }) => match run_check(config, skill.as_deref(), strict, json) {
            Ok(true) => Ok(()),
            Ok(false) => std::process::exit(1),
            Err(e) => Err(e),
        },
        None => {
            println!("Run with --help for usage");
            Ok(())
        }
    };

    if let Err(e) = result {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run_init(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(lib::config::default_config_path);
    let dir = lib::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

/// Load config and every enabled skill. Requires `skillmap init` to have run.
fn load_corpus(config_path: Option<PathBuf>) -> anyhow::Result<(Config, Vec<SkillEntry>)> {
    let (config, path) = lib::config::load_config(config_path)?;
    lib::init::require_initialized(&path, &config)?;
    let skills_dir = lib::config::resolve_skills_dir(&config, &path);
    let extra = lib::config::resolve_extra_dirs(&config, &path);
    let skills = lib::skills::load_skills(Some(skills_dir.as_path()), &extra, &config.skills.disabled)?;
    log::debug!("loaded {} skills from {}", skills.len(), skills_dir.display());
    Ok((config, skills))
}

fn find_skill(skills: Vec<SkillEntry>, name: &str) -> anyhow::Result<SkillEntry> {
    let names: Vec<String> = skills.iter().map(|s| s.name.clone()).collect();
    skills
        .into_iter()
        .find(|s| s.name == name)
        .ok_or_else(|| anyhow::anyhow!("unknown skill: {} (available: {})", name, names.join(", ")))
}

fn run_list(config_path: Option<PathBuf>, json: bool) -> anyhow::Result<()> {
    let (_, skills) = load_corpus(config_path)?;
    let summaries: Vec<SkillSummary> = skills.iter().map(SkillSummary::from).collect();
    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }
    if summaries.is_empty() {
        println!("no skills found");
    }
    for s in &summaries {
        println!(
            "{:<20} {} ({} documents, {} rules)",
            s.name, s.description, s.documents, s.rules
        );
    }
    Ok(())
}

fn print_intake(skill: &SkillEntry) {
    let Some(intake) = &skill.intake else {
        return;
    };
    if !intake.prompt.is_empty() {
        println!("{}", intake.prompt);
    }
    for o in &intake.options {
        println!("  {}. {}", o.index, o.label);
    }
}

fn run_show(config_path: Option<PathBuf>, name: &str) -> anyhow::Result<()> {
    let (_, skills) = load_corpus(config_path)?;
    let skill = find_skill(skills, name)?;

    println!("{}: {}", skill.name, skill.description);
    println!("path: {}", skill.path.display());
    println!();
    print_intake(&skill);
    println!();
    println!("routing ({:?}):", skill.routes_origin);
    for rule in &skill.rules {
        let triggers: Vec<String> = rule.triggers.iter().map(|t| t.to_string()).collect();
        println!("  [{}] {} -> {}", rule.row, triggers.join(", "), rule.targets.join(", "));
    }
    println!();
    println!("documents:");
    for d in &skill.documents {
        println!("  {:<10} {}", format!("{:?}", d.kind).to_lowercase(), d.path);
    }
    Ok(())
}

fn run_route(
    config_path: Option<PathBuf>,
    name: &str,
    input: &str,
    policy: Option<MatchPolicy>,
    load: bool,
    json: bool,
) -> anyhow::Result<()> {
    let (config, skills) = load_corpus(config_path)?;
    let skill = find_skill(skills, name)?;
    let policy = policy.unwrap_or_else(|| lib::config::resolve_routing_policy(&config));
    let resolver = Resolver::new(skill.rules.clone())
        .with_config(&config.routing)
        .with_policy(policy);
    let resolution = resolver.resolve(input)?;
    let loaded = if load {
        skill.load_documents(resolution.documents())?
    } else {
        Vec::new()
    };

    if json {
        let out = serde_json::json!({
            "skill": skill.name,
            "policy": resolver.policy(),
            "ambiguous": resolution.is_ambiguous(),
            "resolution": resolution,
            "loaded": loaded,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    match &resolution {
        Resolution::NoMatch { input } => {
            println!("no routing rule in {} matches \"{}\".", skill.name, input);
            println!("Ask a clarifying question. The options are:");
            print_intake(&skill);
        }
        Resolution::Matched { rules, documents, .. } => {
            if resolution.is_ambiguous() {
                let rows: Vec<String> = rules
                    .iter()
                    .map(|m| {
                        let state = if m.fired { "" } else { " (not fired)" };
                        format!("row {} via {}{}", m.row, m.trigger, state)
                    })
                    .collect();
                log::warn!("response matched several rules: {}", rows.join("; "));
            }
            if loaded.is_empty() {
                for d in documents {
                    println!("{}", d);
                }
            } else {
                for d in &loaded {
                    println!("==> {} <==", d.path);
                    println!("{}", d.content.trim_end());
                    println!();
                }
            }
        }
    }
    Ok(())
}

fn run_checklist(config_path: Option<PathBuf>, name: &str) -> anyhow::Result<()> {
    let (_, skills) = load_corpus(config_path)?;
    let skill = find_skill(skills, name)?;
    if skill.checklist.is_empty() {
        println!("{} has no verification checklist", skill.name);
        return Ok(());
    }
    for item in &skill.checklist {
        match &item.command {
            Some(cmd) if cmd == &item.text => println!("[ ] $ {}", cmd),
            Some(cmd) => println!("[ ] {}\n      $ {}", item.text, cmd),
            None => println!("[ ] {}", item.text),
        }
    }
    Ok(())
}

/// Returns Ok(true) when the corpus passes.
fn run_check(
    config_path: Option<PathBuf>,
    only: Option<&str>,
    strict: bool,
    json: bool,
) -> anyhow::Result<bool> {
    let (config, path) = lib::config::load_config(config_path)?;
    lib::init::require_initialized(&path, &config)?;
    let skills_dir = lib::config::resolve_skills_dir(&config, &path);
    let extra = lib::config::resolve_extra_dirs(&config, &path);
    let report = integrity::check_corpus(
        Some(skills_dir.as_path()),
        &extra,
        &config.skills.disabled,
        only,
    );

    if let Some(name) = only {
        if report.skills_checked == 0 {
            anyhow::bail!("unknown skill: {}", name);
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for f in &report.findings {
            println!("{}", f);
        }
        println!(
            "checked {} skills: {} errors, {} warnings",
            report.skills_checked,
            report.count(integrity::Severity::Error),
            report.count(integrity::Severity::Warning)
        );
    }
    Ok(!(report.has_errors() || (strict && report.has_warnings())))
}
