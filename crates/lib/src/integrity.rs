//! Load-time link integrity for skill corpora.
//!
//! Nothing in a corpus checks that routing targets exist or that rows do not overlap; this module does.
//! Errors mean a response could route to a document that cannot be loaded. Warnings point at
//! ambiguity or drift between the intake menu and the routing table.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::routing::Trigger;
use crate::skills::{load_skill, skill_dirs, SkillEntry, SkillError, SkillSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub severity: Severity,
    pub skill: String,
    pub message: String,
}

impl Finding {
    fn error(skill: &str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            skill: skill.to_string(),
            message: message.into(),
        }
    }

    fn warning(skill: &str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            skill: skill.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}[{}]: {}", level, self.skill, self.message)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub skills_checked: usize,
    pub findings: Vec<Finding>,
}

impl Report {
    pub fn has_errors(&self) -> bool {
        self.findings.iter().any(|f| f.severity == Severity::Error)
    }

    pub fn has_warnings(&self) -> bool {
        self.findings.iter().any(|f| f.severity == Severity::Warning)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.findings.iter().filter(|f| f.severity == severity).count()
    }
}

/// Check every skill directory under the given roots, including ones that fail to parse or are shadowed by name.
/// Disabled skills (by name or folder name) are skipped. When `only` is set, only skills with that name (or folder name) are checked.
pub fn check_corpus(
    skills_dir: Option<&Path>,
    extra_dirs: &[PathBuf],
    disabled: &[String],
    only: Option<&str>,
) -> Report {
    let mut report = Report::default();
    let roots = skills_dir
        .map(|d| (d.to_path_buf(), SkillSource::Skills))
        .into_iter()
        .chain(extra_dirs.iter().map(|d| (d.clone(), SkillSource::Extra)));

    for (root, source) in roots {
        for dir in skill_dirs(&root) {
            let folder = folder_name(&dir);
            let is_disabled = |name: &str| disabled.iter().any(|d| d == name || d == &folder);
            match load_skill(&dir, source) {
                Ok(entry) => {
                    if is_disabled(&entry.name) {
                        log::debug!("skill {} is disabled; not checked", entry.name);
                        continue;
                    }
                    if only.is_some_and(|n| n != entry.name && n != folder) {
                        continue;
                    }
                    report.skills_checked += 1;
                    report.findings.extend(check_skill(&entry));
                }
                Err(e) => {
                    if is_disabled(&folder) {
                        continue;
                    }
                    if only.is_some_and(|n| n != folder) {
                        continue;
                    }
                    report.skills_checked += 1;
                    report.findings.push(Finding::error(&folder, e.to_string()));
                }
            }
        }
    }
    log::debug!(
        "checked {} skills: {} errors, {} warnings",
        report.skills_checked,
        report.count(Severity::Error),
        report.count(Severity::Warning)
    );
    report
}

fn folder_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// All findings for one loaded skill, errors first.
pub fn check_skill(entry: &SkillEntry) -> Vec<Finding> {
    let name = entry.name.as_str();
    let mut out = Vec::new();

    let folder = folder_name(&entry.path);
    if !folder.is_empty() && folder != entry.name {
        out.push(Finding::warning(
            name,
            format!("frontmatter name differs from folder name `{}`", folder),
        ));
    }

    if let Some(e) = &entry.routes_error {
        out.push(Finding::warning(
            name,
            format!("{}; the table in SKILL.md is used instead", e),
        ));
    }

    if entry.rules.is_empty() {
        out.push(Finding::warning(name, "no routing rules found"));
    }

    for rule in &entry.rules {
        for target in &rule.targets {
            match entry.expand_target(target) {
                Ok(docs) if docs.is_empty() => out.push(Finding::error(
                    name,
                    format!("routing row {}: `{}` matches no document", rule.row, target),
                )),
                Ok(_) => {}
                Err(e @ (SkillError::UnsafeTarget { .. } | SkillError::InvalidPattern { .. })) => {
                    out.push(Finding::error(name, format!("routing row {}: {}", rule.row, e)))
                }
                Err(e) => out.push(Finding::error(name, e.to_string())),
            }
        }
    }

    let mut rows_by_trigger: BTreeMap<String, BTreeSet<usize>> = BTreeMap::new();
    for rule in &entry.rules {
        for t in &rule.triggers {
            rows_by_trigger.entry(t.to_string()).or_default().insert(rule.row);
        }
    }
    for (trigger, rows) in rows_by_trigger.iter().filter(|(_, rows)| rows.len() > 1) {
        let rows: Vec<String> = rows.iter().map(|r| r.to_string()).collect();
        out.push(Finding::warning(
            name,
            format!(
                "trigger {} appears in rows {}; responses with it match several rules",
                trigger,
                rows.join(", ")
            ),
        ));
    }

    let routed: BTreeSet<u32> = entry
        .rules
        .iter()
        .flat_map(|r| r.triggers.iter())
        .filter_map(|t| match t {
            Trigger::MenuIndex(n) => Some(*n),
            Trigger::Keyword(_) => None,
        })
        .collect();
    match &entry.intake {
        Some(intake) => {
            let offered: BTreeSet<u32> = intake.options.iter().map(|o| o.index).collect();
            for n in routed.difference(&offered) {
                out.push(Finding::warning(
                    name,
                    format!("routing uses menu choice {} but the intake menu has no such option", n),
                ));
            }
            for o in intake.options.iter().filter(|o| !routed.contains(&o.index)) {
                out.push(Finding::warning(
                    name,
                    format!("intake option {} ({}) has no routing rule", o.index, o.label),
                ));
            }
        }
        None if !routed.is_empty() => out.push(Finding::warning(
            name,
            "routing uses menu choices but SKILL.md has no <intake> menu",
        )),
        None => {}
    }

    out.sort_by(|a, b| b.severity.cmp(&a.severity));
    out
}
