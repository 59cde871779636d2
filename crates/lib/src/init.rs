//! Initialize the configuration directory: create ~/.skillmap, default config, and bundled skills.
//!
//! Layout mirrors `crates/lib/config/`: `config/skills/` → `~/.skillmap/skills/`.

use anyhow::{Context, Result};
use include_dir::{include_dir, Dir};
use std::path::{Path, PathBuf};

use crate::config;

static BUNDLED_SKILLS: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/config/skills");

/// Ensure the configuration directory has been initialized (config file and skills directory exist).
/// Uses the primary skill root from config (or default) and checks that it exists.
pub fn require_initialized(config_path: &Path, config: &config::Config) -> Result<()> {
    if !config_path.exists() {
        anyhow::bail!(
            "configuration not initialized; run `skillmap init` first (config file not found: {})",
            config_path.display()
        );
    }
    let skills_dir = config::resolve_skills_dir(config, config_path);
    if !skills_dir.exists() {
        anyhow::bail!(
            "configuration not initialized; run `skillmap init` first (skills directory not found: {})",
            skills_dir.display()
        );
    }
    Ok(())
}

/// Names of the skills compiled into the binary.
pub fn bundled_skill_names() -> Vec<String> {
    let mut names: Vec<String> = BUNDLED_SKILLS
        .dirs()
        .filter(|d| {
            d.files()
                .any(|f| f.path().file_name().is_some_and(|n| n == "SKILL.md"))
        })
        .filter_map(|d| d.path().file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect();
    names.sort();
    names
}

/// Create the config directory and default files if they do not exist.
/// - Creates the config directory (parent of config file path).
/// - Writes `config.json` with `{}` if missing.
/// - Extracts bundled skills into the `skills` subdirectory if it does not exist.
pub fn init_config_dir(config_path: &Path) -> Result<PathBuf> {
    let config_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(config_dir)
        .with_context(|| format!("creating config directory {}", config_dir.display()))?;

    if !config_path.exists() {
        let default_config = b"{}";
        std::fs::write(config_path, default_config)
            .with_context(|| format!("writing default config to {}", config_path.display()))?;
        log::info!("created default config at {}", config_path.display());
    }

    let skills_dir = config::skills_dir(config_path);
    if !skills_dir.exists() {
        std::fs::create_dir_all(&skills_dir)
            .with_context(|| format!("creating skills directory {}", skills_dir.display()))?;
        if let Err(e) = BUNDLED_SKILLS.extract(&skills_dir) {
            anyhow::bail!(
                "extracting bundled skills to {}: {}",
                skills_dir.display(),
                e
            );
        }
        log::info!("extracted bundled skills to {}", skills_dir.display());
    } else {
        log::debug!("skills directory already exists at {}, skipping", skills_dir.display());
    }

    Ok(config_dir.to_path_buf())
}
