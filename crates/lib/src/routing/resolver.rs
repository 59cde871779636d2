//! Resolve a free-text or numeric response against a routing table.
//!
//! Resolution is a pure function of (rules, options, input): no state is kept between calls.

use serde::Serialize;

use super::table::{RoutingRule, Trigger};
use crate::config::{KeywordMatch, MatchPolicy, RoutingConfig};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    #[error("response is empty")]
    EmptyInput,
}

/// A rule that matched the response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedRule {
    /// Position in the table (0-based).
    pub index: usize,
    pub row: usize,
    /// First trigger of the rule that matched.
    pub trigger: Trigger,
    /// False when the rule matched but the policy did not let it contribute documents.
    pub fired: bool,
}

/// Outcome of resolving one response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum Resolution {
    /// Nothing matched; the caller should ask a clarifying question.
    NoMatch { input: String },
    Matched {
        input: String,
        rules: Vec<MatchedRule>,
        /// Targets of the fired rules, first occurrence wins. Never empty.
        documents: Vec<String>,
    },
}

impl Resolution {
    pub fn input(&self) -> &str {
        match self {
            Resolution::NoMatch { input } | Resolution::Matched { input, .. } => input,
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, Resolution::Matched { .. })
    }

    /// Document identifiers to load; empty on no match.
    pub fn documents(&self) -> &[String] {
        match self {
            Resolution::NoMatch { .. } => &[],
            Resolution::Matched { documents, .. } => documents,
        }
    }

    pub fn matched_rules(&self) -> &[MatchedRule] {
        match self {
            Resolution::NoMatch { .. } => &[],
            Resolution::Matched { rules, .. } => rules,
        }
    }

    /// More than one rule matched. Reported whatever the policy, since tables define no precedence.
    pub fn is_ambiguous(&self) -> bool {
        self.matched_rules().len() > 1
    }
}

/// Resolver over one skill's routing rules.
#[derive(Debug, Clone)]
pub struct Resolver {
    rules: Vec<RoutingRule>,
    policy: MatchPolicy,
    keyword_match: KeywordMatch,
}

impl Resolver {
    /// Rules without triggers or targets can never route anywhere and are dropped.
    pub fn new(rules: Vec<RoutingRule>) -> Self {
        let rules = rules
            .into_iter()
            .filter(|r| {
                let usable = !r.triggers.is_empty() && !r.targets.is_empty();
                if !usable {
                    log::debug!("routing row {} has no triggers or no targets; ignored", r.row);
                }
                usable
            })
            .collect();
        Self {
            rules,
            policy: MatchPolicy::default(),
            keyword_match: KeywordMatch::default(),
        }
    }

    pub fn with_policy(mut self, policy: MatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_keyword_match(mut self, keyword_match: KeywordMatch) -> Self {
        self.keyword_match = keyword_match;
        self
    }

    /// Apply policy and keyword matching from config.
    pub fn with_config(self, routing: &RoutingConfig) -> Self {
        self.with_policy(routing.policy)
            .with_keyword_match(routing.keyword_match)
    }

    pub fn rules(&self) -> &[RoutingRule] {
        &self.rules
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// Resolve a response. Only empty input is an error; unmatched input is `Resolution::NoMatch`.
    pub fn resolve(&self, input: &str) -> Result<Resolution, RouteError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(RouteError::EmptyInput);
        }
        let response = Response::new(input);

        let mut matched = Vec::new();
        let mut documents: Vec<String> = Vec::new();
        for (index, rule) in self.rules.iter().enumerate() {
            let Some(trigger) = rule
                .triggers
                .iter()
                .find(|t| response.matches(t, self.keyword_match))
            else {
                continue;
            };
            let fired = match self.policy {
                MatchPolicy::All => true,
                MatchPolicy::First => matched.is_empty(),
            };
            if fired {
                for target in &rule.targets {
                    if !documents.contains(target) {
                        documents.push(target.clone());
                    }
                }
            }
            matched.push(MatchedRule {
                index,
                row: rule.row,
                trigger: trigger.clone(),
                fired,
            });
        }

        if matched.is_empty() {
            log::debug!("no routing rule matched {:?}", input);
            return Ok(Resolution::NoMatch {
                input: input.to_string(),
            });
        }
        if matched.len() > 1 {
            log::debug!(
                "{:?} matched {} rules (policy {:?})",
                input,
                matched.len(),
                self.policy
            );
        }
        Ok(Resolution::Matched {
            input: input.to_string(),
            rules: matched,
            documents,
        })
    }
}

/// Normalized response text.
struct Response {
    lower: String,
    tokens: Vec<String>,
    words: Vec<String>,
    menu_index: Option<u32>,
}

impl Response {
    fn new(input: &str) -> Self {
        let lower = input.to_lowercase();
        let tokens = tokenize(&lower);
        let words = words(&lower);
        let menu_index = lower
            .trim_end_matches(['.', ')'])
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|_| lower.starts_with(|c: char| c.is_ascii_digit()));
        Self {
            lower,
            tokens,
            words,
            menu_index,
        }
    }

    fn matches(&self, trigger: &Trigger, mode: KeywordMatch) -> bool {
        match trigger {
            Trigger::MenuIndex(n) => self.menu_index == Some(*n),
            Trigger::Keyword(k) => match mode {
                // "c++" or "node.js" keep their punctuation: compare whitespace-separated words.
                KeywordMatch::Word if has_inner_punctuation(k) => {
                    contains_run(&self.words, &words(k))
                }
                KeywordMatch::Word => contains_run(&self.tokens, &tokenize(k)),
                KeywordMatch::Substring => self.lower.contains(k.as_str()),
            },
        }
    }
}

/// True when `needle` occurs as a contiguous run in `haystack`. An empty needle never matches.
fn contains_run(haystack: &[String], needle: &[String]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle)
}

fn has_inner_punctuation(keyword: &str) -> bool {
    keyword.chars().any(|c| !c.is_alphanumeric() && !c.is_whitespace())
}

/// Whitespace-separated words with sentence punctuation trimmed from their ends.
fn words(s: &str) -> Vec<String> {
    s.split_whitespace()
        .map(|w| w.trim_matches(|c: char| matches!(c, ',' | '.' | ';' | ':' | '!' | '?' | '(' | ')' | '"' | '\'')))
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn tokenize(s: &str) -> Vec<String> {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::parse_routing_table;

    const TABLE: &str = "| Response | Load |\n|---|---|\n| 1, \"laravel\" | `references/laravel/*.md` |\n| 2, \"go\", \"golang\" | `references/go/patterns.md` |\n| \"database\", \"migration\" | `workflows/database-design.md` |\n| \"optimize\", \"slow query\" | `workflows/optimize-performance.md`, `workflows/database-design.md` |\n";

    fn resolver() -> Resolver {
        Resolver::new(parse_routing_table(TABLE))
    }

    #[test]
    fn empty_input_is_rejected() {
        assert_eq!(resolver().resolve("   "), Err(RouteError::EmptyInput));
    }

    #[test]
    fn menu_index_matches_bare_number_only() {
        let r = resolver();
        assert_eq!(r.resolve("1").unwrap().documents(), ["references/laravel/*.md"]);
        assert_eq!(r.resolve("2.").unwrap().documents(), ["references/go/patterns.md"]);
        assert!(!r.resolve("10").unwrap().is_match());
        assert!(!r.resolve("route 1").unwrap().is_match());
    }

    #[test]
    fn word_mode_respects_word_boundaries() {
        let r = resolver();
        assert!(!r.resolve("django").unwrap().is_match());
        assert!(r.resolve("a Go service").unwrap().is_match());
        assert_eq!(
            r.resolve("this SLOW   query hurts").unwrap().documents(),
            ["workflows/optimize-performance.md", "workflows/database-design.md"]
        );
    }

    #[test]
    fn punctuated_keywords_match_whole_words() {
        let r = Resolver::new(parse_routing_table(
            "| a | b |\n|-|-|\n| \"c++\" | `references/cpp.md` |\n| \"node.js\" | `references/node.md` |\n",
        ));
        assert!(!r.resolve("objective-c").unwrap().is_match());
        assert!(!r.resolve("I write c").unwrap().is_match());
        assert_eq!(r.resolve("Mostly C++.").unwrap().documents(), ["references/cpp.md"]);
        assert_eq!(r.resolve("an api in node.js, please").unwrap().documents(), ["references/node.md"]);
        assert!(!r.resolve("nodejs").unwrap().is_match());
    }

    #[test]
    fn rules_without_targets_never_match() {
        let rules = vec![
            RoutingRule {
                triggers: vec![Trigger::Keyword("deploy".into())],
                targets: vec![],
                row: 1,
            },
            RoutingRule {
                triggers: vec![],
                targets: vec!["workflows/any.md".into()],
                row: 2,
            },
        ];
        let r = Resolver::new(rules);
        assert!(r.rules().is_empty());
        assert!(!r.resolve("deploy now").unwrap().is_match());
    }

    #[test]
    fn quoted_number_keyword_matches_free_text() {
        let r = Resolver::new(parse_routing_table(
            "| a | b |\n|-|-|\n| \"404\", \"not found\" | `workflows/debug-backend.md` |\n",
        ));
        assert!(r.resolve("getting a 404 on login").unwrap().is_match());
        assert!(r.resolve("404").unwrap().is_match());
    }

    #[test]
    fn substring_mode_matches_inside_words() {
        let r = resolver().with_keyword_match(KeywordMatch::Substring);
        let res = r.resolve("django").unwrap();
        assert_eq!(res.documents(), ["references/go/patterns.md"]);
    }

    #[test]
    fn all_policy_unions_and_dedupes_in_table_order() {
        let res = resolver().resolve("optimize the database").unwrap();
        assert!(res.is_ambiguous());
        assert_eq!(
            res.documents(),
            ["workflows/database-design.md", "workflows/optimize-performance.md"]
        );
        let rows: Vec<usize> = res.matched_rules().iter().map(|m| m.row).collect();
        assert_eq!(rows, vec![5, 6]);
        assert!(res.matched_rules().iter().all(|m| m.fired));
    }

    #[test]
    fn first_policy_fires_only_first_rule_but_still_reports_ambiguity() {
        let res = resolver()
            .with_policy(MatchPolicy::First)
            .resolve("optimize the database")
            .unwrap();
        assert!(res.is_ambiguous());
        assert_eq!(res.documents(), ["workflows/database-design.md"]);
        let fired: Vec<bool> = res.matched_rules().iter().map(|m| m.fired).collect();
        assert_eq!(fired, vec![true, false]);
    }

    #[test]
    fn matched_trigger_is_reported() {
        let res = resolver().resolve("golang").unwrap();
        assert_eq!(res.matched_rules()[0].trigger, Trigger::Keyword("golang".into()));
    }

    #[test]
    fn no_match_keeps_trimmed_input() {
        let res = resolver().resolve("  xyzzy ").unwrap();
        assert_eq!(
            res,
            Resolution::NoMatch {
                input: "xyzzy".into()
            }
        );
        assert!(res.documents().is_empty());
        assert!(!res.is_ambiguous());
    }

    #[test]
    fn serializes_with_outcome_tag() {
        let v = serde_json::to_value(resolver().resolve("go").unwrap()).unwrap();
        assert_eq!(v["outcome"], "matched");
        assert_eq!(v["documents"][0], "references/go/patterns.md");
        assert_eq!(v["rules"][0]["trigger"]["keyword"], "go");
        let v = serde_json::to_value(resolver().resolve("xyzzy").unwrap()).unwrap();
        assert_eq!(v["outcome"], "noMatch");
    }
}
