//! Routing: intake response -> routing table -> document identifiers.
//!
//! Rules come from a skill's `routes.json` when present, otherwise from the Markdown table in SKILL.md
//! (the `<routing>` section, or every table in the body when there is no such section).

mod resolver;
mod table;

pub use resolver::{MatchedRule, Resolution, Resolver, RouteError};
pub use table::{parse_routing_table, parse_trigger, parse_trigger_cell, RoutingRule, Trigger};
