//! Route descriptor (routes.json) for skills that declare routing as data.
//!
//! When a skill directory contains `routes.json`, the loader parses it and uses its rules
//! instead of the table in SKILL.md. Triggers use the same token syntax as table cells
//! ("1" is a menu index, anything else a keyword).

use serde::Deserialize;

use crate::routing::{parse_trigger, RoutingRule};

/// Root structure of a skill's routes.json file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RouteDescriptor {
    /// Rules in precedence order.
    #[serde(default)]
    pub rules: Vec<RouteSpec>,
}

/// One rule: any trigger selects all targets.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RouteSpec {
    pub triggers: Vec<String>,
    pub targets: Vec<String>,
    /// Free text for humans; not used for matching.
    #[serde(default)]
    pub description: Option<String>,
}

impl RouteDescriptor {
    /// Convert to routing rules. `row` is the 1-based entry number; entries without usable triggers or targets are dropped.
    pub fn to_rules(&self) -> Vec<RoutingRule> {
        self.rules
            .iter()
            .enumerate()
            .filter_map(|(i, spec)| {
                let mut triggers = Vec::new();
                for t in spec.triggers.iter().filter_map(|t| parse_trigger(t)) {
                    if !triggers.contains(&t) {
                        triggers.push(t);
                    }
                }
                let targets: Vec<String> = spec
                    .targets
                    .iter()
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect();
                if triggers.is_empty() || targets.is_empty() {
                    log::debug!("routes.json entry {} has no triggers or no targets; skipped", i + 1);
                    return None;
                }
                Some(RoutingRule {
                    triggers,
                    targets,
                    row: i + 1,
                })
            })
            .collect()
    }
}
