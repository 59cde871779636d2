//! Load skills from dirs: each skill is a directory with SKILL.md (YAML frontmatter + markdown).
//! Every other `.md` file under the skill directory is a document that routing can target.
//! When present, `routes.json` in the skill directory replaces the routing table parsed from SKILL.md.

use anyhow::Result;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

use super::descriptor::RouteDescriptor;
use super::error::SkillError;
use super::frontmatter::parse_skill_md;
use super::sections::{
    find_section, parse_checklist, parse_intake, split_sections, ChecklistItem, Intake, Section,
    CHECKLIST_TAGS,
};
use crate::routing::{parse_routing_table, RoutingRule};

/// A loaded skill.
#[derive(Debug, Clone)]
pub struct SkillEntry {
    pub name: String,
    pub description: String,
    pub source: SkillSource,
    pub path: PathBuf,
    /// Raw SKILL.md content.
    pub content: String,
    /// SKILL.md without the frontmatter.
    pub body: String,
    /// Routable documents, sorted by path.
    pub documents: Vec<Document>,
    pub sections: Vec<Section>,
    pub intake: Option<Intake>,
    pub rules: Vec<RoutingRule>,
    pub routes_origin: RoutesOrigin,
    /// Why routes.json was present but ignored.
    pub routes_error: Option<String>,
    pub checklist: Vec<ChecklistItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SkillSource {
    /// From the primary skill root (e.g. ~/.skillmap/skills).
    Skills,
    /// From config.skills.extraDirs.
    Extra,
}

/// Where a skill's routing rules came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RoutesOrigin {
    Markdown,
    Descriptor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DocumentKind {
    Reference,
    Workflow,
    Template,
    Other,
}

impl DocumentKind {
    /// Kind from the first component of a skill-relative path.
    pub fn from_path(rel: &str) -> Self {
        match rel.split('/').next() {
            Some("references") => DocumentKind::Reference,
            Some("workflows") => DocumentKind::Workflow,
            Some("templates") => DocumentKind::Template,
            _ => DocumentKind::Other,
        }
    }
}

/// A routable Markdown file inside a skill directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    /// Skill-relative path with `/` separators (e.g. `references/go/patterns.md`).
    pub path: String,
    pub kind: DocumentKind,
}

/// A document read from disk.
#[derive(Debug, Clone, Serialize)]
pub struct LoadedDocument {
    pub path: String,
    pub kind: DocumentKind,
    pub content: String,
}

/// Listing view of a skill.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillSummary {
    pub name: String,
    pub description: String,
    pub source: SkillSource,
    pub path: PathBuf,
    pub documents: usize,
    pub rules: usize,
}

/// Load all skills from the primary root and any extra dirs.
/// Each dir should contain subdirs, each with a SKILL.md file.
/// Precedence: primary root first, then extra (later overwrites earlier by name). Disabled names are dropped.
/// Result is sorted by name.
pub fn load_skills(
    skills_dir: Option<&Path>,
    extra_dirs: &[PathBuf],
    disabled: &[String],
) -> Result<Vec<SkillEntry>> {
    let mut merged: HashMap<String, SkillEntry> = HashMap::new();

    if let Some(d) = skills_dir {
        for e in load_skills_from_dir(d, SkillSource::Skills)? {
            merged.insert(e.name.clone(), e);
        }
    }
    for dir in extra_dirs {
        for e in load_skills_from_dir(dir, SkillSource::Extra)? {
            if let Some(prev) = merged.insert(e.name.clone(), e) {
                log::debug!("skill {} from {} overridden", prev.name, prev.path.display());
            }
        }
    }

    let mut out: Vec<SkillEntry> = merged
        .into_values()
        .filter(|e| {
            let skip = disabled.iter().any(|d| d == &e.name);
            if skip {
                log::debug!("skill {} is disabled", e.name);
            }
            !skip
        })
        .collect();
    out.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(out)
}

/// Subdirectories of `root` that contain SKILL.md, sorted. A missing root yields none.
pub fn skill_dirs(root: &Path) -> Vec<PathBuf> {
    let read_dir = match std::fs::read_dir(root) {
        Ok(d) => d,
        Err(e) => {
            log::debug!("skill root {} not readable: {}", root.display(), e);
            return Vec::new();
        }
    };
    let mut dirs: Vec<PathBuf> = read_dir
        .flatten()
        .map(|entry| entry.path())
        .filter(|p| p.is_dir() && p.join("SKILL.md").is_file())
        .collect();
    dirs.sort();
    dirs
}

fn load_skills_from_dir(dir: &Path, source: SkillSource) -> Result<Vec<SkillEntry>> {
    let mut out = Vec::new();
    for path in skill_dirs(dir) {
        match load_skill(&path, source) {
            Ok(entry) => out.push(entry),
            Err(e) => log::warn!("skipping skill at {}: {}", path.display(), e),
        }
    }
    Ok(out)
}

/// Load one skill directory strictly: any SKILL.md problem is an error.
pub fn load_skill(dir: &Path, source: SkillSource) -> Result<SkillEntry, SkillError> {
    let skill_md = dir.join("SKILL.md");
    let content = std::fs::read_to_string(&skill_md).map_err(|e| SkillError::Io {
        path: skill_md.clone(),
        source: e,
    })?;
    let parsed = parse_skill_md(&content, &skill_md)?;

    let sections = split_sections(&parsed.body);
    let intake = find_section(&sections, "intake").map(|s| parse_intake(&s.content));
    let checklist = CHECKLIST_TAGS
        .iter()
        .find_map(|tag| find_section(&sections, tag))
        .map(|s| parse_checklist(&s.content))
        .unwrap_or_default();

    let (descriptor, routes_error) = match load_route_descriptor(dir) {
        Ok(d) => (d, None),
        Err(e) => (None, Some(e)),
    };
    let (rules, routes_origin) = match descriptor {
        Some(d) => (d.to_rules(), RoutesOrigin::Descriptor),
        None => {
            let text = find_section(&sections, "routing")
                .map(|s| s.content.as_str())
                .unwrap_or(parsed.body.as_str());
            (parse_routing_table(text), RoutesOrigin::Markdown)
        }
    };

    Ok(SkillEntry {
        name: parsed.name,
        description: parsed.description,
        source,
        path: dir.to_path_buf(),
        documents: collect_documents(dir),
        content,
        body: parsed.body,
        sections,
        intake,
        rules,
        routes_origin,
        routes_error,
        checklist,
    })
}

/// If the skill directory contains routes.json, parse and return it. Otherwise None.
/// An unparsable file is an error message; the caller falls back to the table in SKILL.md.
fn load_route_descriptor(skill_dir: &Path) -> Result<Option<RouteDescriptor>, String> {
    let path = skill_dir.join("routes.json");
    let Ok(content) = std::fs::read_to_string(&path) else {
        return Ok(None);
    };
    serde_json::from_str::<RouteDescriptor>(&content)
        .map(Some)
        .map_err(|e| {
            log::warn!(
                "failed to parse {}: {}; using the table in SKILL.md",
                path.display(),
                e
            );
            format!("routes.json: {}", e)
        })
}

fn collect_documents(dir: &Path) -> Vec<Document> {
    let mut docs: Vec<Document> = WalkDir::new(dir)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !e.file_name().to_string_lossy().starts_with('.'))
        .flatten()
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "md"))
        .filter_map(|e| {
            let rel = e.path().strip_prefix(dir).ok()?;
            let rel = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            (rel != "SKILL.md").then(|| Document {
                kind: DocumentKind::from_path(&rel),
                path: rel,
            })
        })
        .collect();
    docs.sort_by(|a, b| a.path.cmp(&b.path));
    docs
}

fn is_glob(target: &str) -> bool {
    target.contains(['*', '?', '['])
}

/// True when a target is absolute or steps out of the skill directory.
fn is_unsafe_target(target: &str) -> bool {
    let p = Path::new(target);
    target.starts_with('/')
        || target.starts_with('\\')
        || p.is_absolute()
        || p.components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_) | Component::RootDir))
}

impl SkillEntry {
    pub fn summary(&self) -> SkillSummary {
        SkillSummary::from(self)
    }

    pub fn document(&self, path: &str) -> Option<&Document> {
        let path = path.strip_prefix("./").unwrap_or(path);
        self.documents.iter().find(|d| d.path == path)
    }

    /// Documents a routing target refers to, in path order. An empty result means the target dangles.
    pub fn expand_target(&self, target: &str) -> Result<Vec<&Document>, SkillError> {
        let target = target.trim();
        if is_unsafe_target(target) {
            return Err(SkillError::UnsafeTarget {
                skill: self.name.clone(),
                target: target.to_string(),
            });
        }
        let target = target.strip_prefix("./").unwrap_or(target);
        if !is_glob(target) {
            return Ok(self.document(target).into_iter().collect());
        }
        let pattern = glob::Pattern::new(target).map_err(|e| SkillError::InvalidPattern {
            skill: self.name.clone(),
            target: target.to_string(),
            reason: e.to_string(),
        })?;
        let opts = glob::MatchOptions {
            case_sensitive: true,
            require_literal_separator: true,
            require_literal_leading_dot: true,
        };
        Ok(self
            .documents
            .iter()
            .filter(|d| pattern.matches_with(&d.path, opts))
            .collect())
    }

    /// Read every document the targets refer to, de-duplicated, in target order.
    pub fn load_documents<S: AsRef<str>>(&self, targets: &[S]) -> Result<Vec<LoadedDocument>, SkillError> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for target in targets {
            let target = target.as_ref();
            let docs = self.expand_target(target)?;
            if docs.is_empty() {
                return Err(SkillError::DanglingTarget {
                    skill: self.name.clone(),
                    target: target.to_string(),
                });
            }
            for doc in docs {
                if !seen.insert(doc.path.as_str()) {
                    continue;
                }
                let file = self.path.join(&doc.path);
                let content = std::fs::read_to_string(&file).map_err(|source| SkillError::Io {
                    path: file.clone(),
                    source,
                })?;
                log::debug!("loaded {} ({} bytes) for skill {}", doc.path, content.len(), self.name);
                out.push(LoadedDocument {
                    path: doc.path.clone(),
                    kind: doc.kind,
                    content,
                });
            }
        }
        Ok(out)
    }

    /// Section by tag (e.g. "overview", "process").
    pub fn section(&self, tag: &str) -> Option<&Section> {
        find_section(&self.sections, tag)
    }
}

impl From<&SkillEntry> for SkillSummary {
    fn from(e: &SkillEntry) -> Self {
        SkillSummary {
            name: e.name.clone(),
            description: e.description.clone(),
            source: e.source,
            path: e.path.clone(),
            documents: e.documents.len(),
            rules: e.rules.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::Trigger;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("skillmap-loader-{}-{}", tag, uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let p = root.join(rel);
        std::fs::create_dir_all(p.parent().unwrap()).unwrap();
        std::fs::write(p, content).unwrap();
    }

    const SKILL: &str = "---\nname: stripe\ndescription: Stripe billing\n---\n<intake>\n1. Checkout\n2. Webhooks\n</intake>\n<routing>\n| Response | Load |\n|---|---|\n| 1, \"checkout\" | `workflows/checkout.md` |\n| 2, \"webhook\" | `references/webhooks/*.md` |\n</routing>\n<verification>\n- `stripe listen` forwards events\n</verification>\n";

    fn stripe_skill(root: &Path) -> PathBuf {
        let dir = root.join("stripe");
        write(&dir, "SKILL.md", SKILL);
        write(&dir, "workflows/checkout.md", "# Checkout\n");
        write(&dir, "references/webhooks/events.md", "# Events\n");
        write(&dir, "references/webhooks/signing.md", "# Signing\n");
        write(&dir, "references/webhooks/deep/nested.md", "# Nested\n");
        write(&dir, "templates/receipt.md", "# Receipt\n");
        write(&dir, ".drafts/hidden.md", "# Hidden\n");
        write(&dir, "notes.txt", "not markdown");
        dir
    }

    #[test]
    fn load_skill_parses_all_parts() {
        let root = temp_dir("parts");
        let dir = stripe_skill(&root);
        let s = load_skill(&dir, SkillSource::Skills).unwrap();
        assert_eq!(s.name, "stripe");
        assert_eq!(s.routes_origin, RoutesOrigin::Markdown);
        assert!(s.routes_error.is_none());
        assert_eq!(s.rules.len(), 2);
        assert_eq!(s.intake.as_ref().unwrap().options.len(), 2);
        assert_eq!(s.checklist[0].command.as_deref(), Some("stripe listen"));
        let paths: Vec<&str> = s.documents.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "references/webhooks/deep/nested.md",
                "references/webhooks/events.md",
                "references/webhooks/signing.md",
                "templates/receipt.md",
                "workflows/checkout.md",
            ]
        );
        assert_eq!(s.documents[3].kind, DocumentKind::Template);
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn glob_targets_do_not_cross_directories() {
        let root = temp_dir("glob");
        let s = load_skill(&stripe_skill(&root), SkillSource::Skills).unwrap();
        let docs: Vec<&str> = s
            .expand_target("references/webhooks/*.md")
            .unwrap()
            .iter()
            .map(|d| d.path.as_str())
            .collect();
        assert_eq!(docs, vec!["references/webhooks/events.md", "references/webhooks/signing.md"]);
        assert_eq!(s.expand_target("references/**/*.md").unwrap().len(), 3);
        assert_eq!(s.expand_target("./workflows/checkout.md").unwrap().len(), 1);
        assert!(s.expand_target("workflows/missing.md").unwrap().is_empty());
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn unsafe_targets_are_rejected() {
        let root = temp_dir("unsafe");
        let s = load_skill(&stripe_skill(&root), SkillSource::Skills).unwrap();
        for t in ["../other/SKILL.md", "/etc/passwd", "references/../../x.md"] {
            assert!(matches!(s.expand_target(t), Err(SkillError::UnsafeTarget { .. })), "{}", t);
        }
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn load_documents_reads_and_dedupes() {
        let root = temp_dir("docs");
        let s = load_skill(&stripe_skill(&root), SkillSource::Skills).unwrap();
        let docs = s
            .load_documents(&["references/webhooks/*.md", "references/webhooks/events.md"])
            .unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].content, "# Events\n");
        assert_eq!(docs[0].kind, DocumentKind::Reference);
        let err = s.load_documents(&["workflows/refunds.md"]).unwrap_err();
        assert!(matches!(err, SkillError::DanglingTarget { .. }));
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn routes_json_replaces_markdown_table() {
        let root = temp_dir("routes");
        let dir = stripe_skill(&root);
        write(
            &dir,
            "routes.json",
            r#"{"rules":[{"triggers":["refund"],"targets":["workflows/checkout.md"]}]}"#,
        );
        let s = load_skill(&dir, SkillSource::Skills).unwrap();
        assert_eq!(s.routes_origin, RoutesOrigin::Descriptor);
        assert!(s.routes_error.is_none());
        assert_eq!(s.rules.len(), 1);
        assert_eq!(s.rules[0].triggers, vec![Trigger::Keyword("refund".into())]);

        write(&dir, "routes.json", "{ not json");
        let s = load_skill(&dir, SkillSource::Skills).unwrap();
        assert_eq!(s.routes_origin, RoutesOrigin::Markdown);
        assert!(s.routes_error.as_deref().is_some_and(|e| e.starts_with("routes.json:")));
        assert_eq!(s.rules.len(), 2);
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn load_skills_merges_skips_invalid_and_disabled() {
        let primary = temp_dir("primary");
        let extra = temp_dir("extra");
        stripe_skill(&primary);
        write(&primary, "broken/SKILL.md", "no frontmatter");
        write(&primary, "prd/SKILL.md", "---\nname: prd\ndescription: PRDs\n---\n");
        write(&primary, "not-a-skill/readme.md", "# nothing");
        write(&extra, "stripe2/SKILL.md", "---\nname: stripe\ndescription: Team Stripe\n---\n");

        let skills = load_skills(Some(primary.as_path()), &[extra.clone()], &[]).unwrap();
        let names: Vec<&str> = skills.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["prd", "stripe"]);
        let stripe = skills.iter().find(|s| s.name == "stripe").unwrap();
        assert_eq!(stripe.source, SkillSource::Extra);
        assert_eq!(stripe.description, "Team Stripe");

        let skills = load_skills(Some(primary.as_path()), &[], &["prd".to_string()]).unwrap();
        assert_eq!(skills.len(), 1);

        let none = load_skills(Some(primary.join("missing").as_path()), &[], &[]).unwrap();
        assert!(none.is_empty());
        let _ = std::fs::remove_dir_all(&primary);
        let _ = std::fs::remove_dir_all(&extra);
    }
}
