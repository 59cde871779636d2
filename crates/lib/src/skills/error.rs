use std::path::PathBuf;

/// Errors from reading a skill folder or one of its documents.
#[derive(Debug, thiserror::Error)]
pub enum SkillError {
    #[error("{}: missing YAML frontmatter (file must start with ---)", .path.display())]
    MissingFrontmatter { path: PathBuf },

    #[error("{}: frontmatter is not closed (missing ---)", .path.display())]
    UnclosedFrontmatter { path: PathBuf },

    #[error("{}: invalid frontmatter: {source}", .path.display())]
    InvalidYaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{}: missing required frontmatter field '{field}'", .path.display())]
    MissingField { path: PathBuf, field: &'static str },

    #[error("reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("skill {skill}: target `{target}` escapes the skill directory")]
    UnsafeTarget { skill: String, target: String },

    #[error("skill {skill}: target `{target}` is not a valid pattern: {reason}")]
    InvalidPattern {
        skill: String,
        target: String,
        reason: String,
    },

    #[error("skill {skill}: target `{target}` matches no document")]
    DanglingTarget { skill: String, target: String },
}
