//! SKILL.md frontmatter: a YAML block between `---` lines with required `name` and `description`.

use serde::Deserialize;
use std::path::Path;

use super::error::SkillError;

/// SKILL.md split into its required frontmatter fields and the markdown body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSkillMd {
    pub name: String,
    pub description: String,
    pub body: String,
}

/// Frontmatter parsed from SKILL.md. Other keys are accepted and ignored.
#[derive(Debug, Default, Deserialize)]
struct SkillFrontmatter {
    name: Option<String>,
    description: Option<String>,
}

/// Parse SKILL.md content. `path` is only used in error messages.
pub fn parse_skill_md(content: &str, path: &Path) -> Result<ParsedSkillMd, SkillError> {
    let (yaml, body) = split_frontmatter(content, path)?;
    let fm: SkillFrontmatter = if yaml.trim().is_empty() {
        SkillFrontmatter::default()
    } else {
        serde_yaml::from_str(yaml).map_err(|source| SkillError::InvalidYaml {
            path: path.to_path_buf(),
            source,
        })?
    };
    let name = required(fm.name, "name", path)?;
    let description = required(fm.description, "description", path)?;
    Ok(ParsedSkillMd {
        name,
        description,
        body: body.to_string(),
    })
}

fn required(value: Option<String>, field: &'static str, path: &Path) -> Result<String, SkillError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| SkillError::MissingField {
            path: path.to_path_buf(),
            field,
        })
}

/// Returns (yaml, body). The opening `---` must be the first line; the block ends at the next line that is exactly `---`.
fn split_frontmatter<'a>(content: &'a str, path: &Path) -> Result<(&'a str, &'a str), SkillError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut lines = content.split_inclusive('\n');
    let first = match lines.next() {
        Some(l) if l.trim_end() == "---" => l,
        _ => {
            return Err(SkillError::MissingFrontmatter {
                path: path.to_path_buf(),
            })
        }
    };
    let start = first.len();
    let mut offset = start;
    for line in lines {
        if line.trim_end() == "---" {
            return Ok((&content[start..offset], &content[offset + line.len()..]));
        }
        offset += line.len();
    }
    Err(SkillError::UnclosedFrontmatter {
        path: path.to_path_buf(),
    })
}
