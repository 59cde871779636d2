//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.skillmap/config.json`) and environment.
//! It only covers where skills live and how routing behaves; everything else is per skill.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Skills load paths and options.
    #[serde(default)]
    pub skills: SkillsConfig,

    /// How responses are matched against routing tables.
    #[serde(default)]
    pub routing: RoutingConfig,
}

/// Skills load config (dirs, disabled list).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillsConfig {
    /// Override the default skill root. Relative paths are resolved against the config file's parent. Omit or leave empty to use `<config dir>/skills`.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    /// Extra skill directories. A skill here overwrites a skill of the same name from the primary root.
    #[serde(default)]
    pub extra_dirs: Vec<PathBuf>,
    /// Skill names to skip even when present on disk.
    #[serde(default)]
    pub disabled: Vec<String>,
}

/// What happens when a response matches more than one routing rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    /// Every matching rule fires; their documents are unioned in table order.
    #[default]
    All,
    /// Only the first matching rule (in table order) fires.
    First,
}

impl std::str::FromStr for MatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(MatchPolicy::All),
            "first" => Ok(MatchPolicy::First),
            other => Err(format!("unknown routing policy: {} (expected \"all\" or \"first\")", other)),
        }
    }
}

/// How a keyword trigger is compared with the response text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordMatch {
    /// Keyword must appear as whole word(s): "go" matches "go api" but not "django".
    #[default]
    Word,
    /// Plain case-insensitive substring containment.
    Substring,
}

/// Routing options.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingConfig {
    /// "all" (default) or "first". Overridden by SKILLMAP_ROUTING_POLICY env.
    #[serde(default)]
    pub policy: MatchPolicy,
    /// "word" (default) or "substring".
    #[serde(default)]
    pub keyword_match: KeywordMatch,
}

/// Resolve the routing policy: env SKILLMAP_ROUTING_POLICY overrides config.
pub fn resolve_routing_policy(config: &Config) -> MatchPolicy {
    policy_from(std::env::var("SKILLMAP_ROUTING_POLICY").ok(), config)
}

/// Policy from an optional env value and config. Empty or unparsable values fall back to config (the latter with a warning).
pub fn policy_from(env: Option<String>, config: &Config) -> MatchPolicy {
    match env {
        Some(s) if !s.trim().is_empty() => match s.parse() {
            Ok(p) => p,
            Err(e) => {
                log::warn!("ignoring SKILLMAP_ROUTING_POLICY: {}", e);
                config.routing.policy
            }
        },
        _ => config.routing.policy,
    }
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    config_path_from(std::env::var("SKILLMAP_CONFIG_PATH").ok(), dirs::home_dir())
}

/// Config path from an optional SKILLMAP_CONFIG_PATH value and home dir: env wins, then `~/.skillmap/config.json`.
pub fn config_path_from(env: Option<String>, home: Option<PathBuf>) -> PathBuf {
    match env {
        Some(p) if !p.trim().is_empty() => PathBuf::from(p),
        _ => home
            .map(|h| h.join(".skillmap").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json")),
    }
}

/// Load config from the given path, or the default path (or SKILLMAP_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used (for resolving the config directory).
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

fn config_parent(config_path: &Path) -> &Path {
    config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// Default skill root when no override is set: `skills` subdirectory of the config file's parent.
pub fn skills_dir(config_path: &Path) -> PathBuf {
    config_parent(config_path).join("skills")
}

/// Resolve the primary skill root: uses `config.skills.directory` if set (relative paths resolved against the config file's parent), otherwise the default `skills` subdirectory.
pub fn resolve_skills_dir(config: &Config, config_path: &Path) -> PathBuf {
    match &config.skills.directory {
        Some(d) if !d.as_os_str().is_empty() => {
            if d.is_absolute() {
                d.clone()
            } else {
                config_parent(config_path).join(d)
            }
        }
        _ => skills_dir(config_path),
    }
}

/// Resolve extra skill dirs the same way as the primary root.
pub fn resolve_extra_dirs(config: &Config, config_path: &Path) -> Vec<PathBuf> {
    let parent = config_parent(config_path);
    config
        .skills
        .extra_dirs
        .iter()
        .filter(|d| !d.as_os_str().is_empty())
        .map(|d| if d.is_absolute() { d.clone() } else { parent.join(d) })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_route_all_by_word() {
        let c: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(c.routing.policy, MatchPolicy::All);
        assert_eq!(c.routing.keyword_match, KeywordMatch::Word);
        assert!(c.skills.extra_dirs.is_empty());
    }

    #[test]
    fn parses_camel_case_fields() {
        let c: Config = serde_json::from_str(
            r#"{"skills":{"extraDirs":["more"],"disabled":["prd"]},"routing":{"policy":"first","keywordMatch":"substring"}}"#,
        )
        .unwrap();
        assert_eq!(c.skills.extra_dirs, vec![PathBuf::from("more")]);
        assert_eq!(c.skills.disabled, vec!["prd".to_string()]);
        assert_eq!(c.routing.policy, MatchPolicy::First);
        assert_eq!(c.routing.keyword_match, KeywordMatch::Substring);
    }

    #[test]
    fn policy_from_str() {
        assert_eq!("ALL".parse::<MatchPolicy>(), Ok(MatchPolicy::All));
        assert_eq!(" first ".parse::<MatchPolicy>(), Ok(MatchPolicy::First));
        assert!("most".parse::<MatchPolicy>().is_err());
    }

    #[test]
    fn env_policy_overrides_config() {
        let mut config = Config::default();
        config.routing.policy = MatchPolicy::All;
        assert_eq!(policy_from(Some("first".into()), &config), MatchPolicy::First);
        assert_eq!(policy_from(Some(" FIRST ".into()), &config), MatchPolicy::First);

        config.routing.policy = MatchPolicy::First;
        assert_eq!(policy_from(Some("all".into()), &config), MatchPolicy::All);
    }

    #[test]
    fn bad_or_empty_env_policy_falls_back_to_config() {
        let mut config = Config::default();
        config.routing.policy = MatchPolicy::First;
        assert_eq!(policy_from(Some("most".into()), &config), MatchPolicy::First);
        assert_eq!(policy_from(Some("  ".into()), &config), MatchPolicy::First);
        assert_eq!(policy_from(None, &config), MatchPolicy::First);
        assert_eq!(policy_from(None, &Config::default()), MatchPolicy::All);
    }

    #[test]
    fn config_path_prefers_env_then_home() {
        assert_eq!(
            config_path_from(Some("/etc/skillmap.json".into()), Some(PathBuf::from("/home/u"))),
            PathBuf::from("/etc/skillmap.json")
        );
        assert_eq!(
            config_path_from(Some("".into()), Some(PathBuf::from("/home/u"))),
            PathBuf::from("/home/u/.skillmap/config.json")
        );
        assert_eq!(
            config_path_from(None, Some(PathBuf::from("/home/u"))),
            PathBuf::from("/home/u/.skillmap/config.json")
        );
        assert_eq!(config_path_from(None, None), PathBuf::from("config.json"));
    }

    #[test]
    fn resolve_skills_dir_default() {
        let config = Config::default();
        let path = Path::new("/home/user/.skillmap/config.json");
        assert_eq!(
            resolve_skills_dir(&config, path),
            PathBuf::from("/home/user/.skillmap/skills")
        );
    }

    #[test]
    fn resolve_skills_dir_override_relative() {
        let mut config = Config::default();
        config.skills.directory = Some(PathBuf::from("custom/skills"));
        let path = Path::new("/home/user/.skillmap/config.json");
        assert_eq!(
            resolve_skills_dir(&config, path),
            PathBuf::from("/home/user/.skillmap/custom/skills")
        );
    }

    #[test]
    fn resolve_skills_dir_override_absolute() {
        let mut config = Config::default();
        config.skills.directory = Some(PathBuf::from("/repo/skills"));
        let path = Path::new("/home/user/.skillmap/config.json");
        assert_eq!(
            resolve_skills_dir(&config, path),
            PathBuf::from("/repo/skills")
        );
    }

    #[test]
    fn resolve_extra_dirs_relative_to_config() {
        let mut config = Config::default();
        config.skills.extra_dirs = vec![PathBuf::from("team"), PathBuf::from("/abs/skills")];
        let path = Path::new("/home/user/.skillmap/config.json");
        assert_eq!(
            resolve_extra_dirs(&config, path),
            vec![
                PathBuf::from("/home/user/.skillmap/team"),
                PathBuf::from("/abs/skills")
            ]
        );
    }
}
