//! Skills: load SKILL.md folders (frontmatter, intake, routing table, checklist, documents).
//!
//! Skills load from the config directory's skills (~/.skillmap/skills) and any config.skills.extraDirs.
//! Precedence: extra overwrites config dir by name.
//! When a skill directory contains `routes.json`, it is parsed as a route descriptor (see descriptor module).

mod descriptor;
mod error;
mod frontmatter;
mod loader;
mod sections;

pub use descriptor::{RouteDescriptor, RouteSpec};
pub use error::SkillError;
pub use frontmatter::{parse_skill_md, ParsedSkillMd};
pub use loader::{
    load_skill, load_skills, skill_dirs, Document, DocumentKind, LoadedDocument, RoutesOrigin,
    SkillEntry, SkillSource, SkillSummary,
};
pub use sections::{
    find_section, parse_checklist, parse_intake, split_sections, ChecklistItem, Intake, MenuOption,
    Section, CHECKLIST_TAGS,
};

pub(crate) use sections::backtick_spans;
