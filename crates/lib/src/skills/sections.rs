//! Informal `<tag>` ... `</tag>` blocks in a SKILL.md body, and the two blocks with structure:
//! the intake menu and the verification checklist.
//!
//! Tags must sit on their own line. Tags inside fenced code blocks are content, not delimiters.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

static OPEN_TAG: OnceLock<Regex> = OnceLock::new();
static CLOSE_TAG: OnceLock<Regex> = OnceLock::new();
static MENU_OPTION: OnceLock<Regex> = OnceLock::new();
static BULLET: OnceLock<Regex> = OnceLock::new();

fn open_tag() -> &'static Regex {
    OPEN_TAG.get_or_init(|| Regex::new(r"^\s*<([a-z][a-z0-9_-]*)>\s*$").expect("open tag regex"))
}

fn close_tag() -> &'static Regex {
    CLOSE_TAG.get_or_init(|| Regex::new(r"^\s*</([a-z][a-z0-9_-]*)>\s*$").expect("close tag regex"))
}

fn menu_option() -> &'static Regex {
    MENU_OPTION.get_or_init(|| {
        Regex::new(r"^\s*(?:\*\*)?(\d+)[.)](?:\*\*)?\s+(.+?)\s*$").expect("menu option regex")
    })
}

fn bullet() -> &'static Regex {
    BULLET.get_or_init(|| Regex::new(r"^\s*[-*+]\s+(?:\[[ xX]\]\s+)?(.+?)\s*$").expect("bullet regex"))
}

/// One tagged block of the body (e.g. `overview`, `process`, `intake`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub tag: String,
    pub content: String,
}

/// The intake block: free prompt text plus numbered menu options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Intake {
    pub prompt: String,
    pub options: Vec<MenuOption>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuOption {
    pub index: u32,
    pub label: String,
}

/// One verification step. `command` is set when the step names a shell command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecklistItem {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

/// Section tags that hold the verification checklist.
pub const CHECKLIST_TAGS: &[&str] = &["verification", "success_criteria"];

fn is_fence(line: &str) -> bool {
    let t = line.trim_start();
    t.starts_with("```") || t.starts_with("~~~")
}

/// Split a body into tagged sections, in order. Text outside any tag is not returned.
/// A section left open runs to the end of the body.
pub fn split_sections(body: &str) -> Vec<Section> {
    let mut out = Vec::new();
    let mut current: Option<(String, Vec<&str>)> = None;
    let mut in_fence = false;

    for line in body.lines() {
        if is_fence(line) {
            in_fence = !in_fence;
        }
        match current.as_mut() {
            None => {
                if in_fence {
                    continue;
                }
                if let Some(c) = open_tag().captures(line) {
                    current = Some((c[1].to_string(), Vec::new()));
                }
            }
            Some((tag, lines)) => {
                let closes = !in_fence
                    && close_tag()
                        .captures(line)
                        .is_some_and(|c| &c[1] == tag.as_str());
                if closes {
                    if let Some((tag, lines)) = current.take() {
                        out.push(Section {
                            tag,
                            content: lines.join("\n"),
                        });
                    }
                } else {
                    lines.push(line);
                }
            }
        }
    }
    if let Some((tag, lines)) = current {
        log::debug!("section <{}> is not closed; taking the rest of the body", tag);
        out.push(Section {
            tag,
            content: lines.join("\n"),
        });
    }
    out
}

/// First section with the given tag.
pub fn find_section<'a>(sections: &'a [Section], tag: &str) -> Option<&'a Section> {
    sections.iter().find(|s| s.tag == tag)
}

/// Parse an intake block. Lines like `1. Laravel` or `2) Go` become options; everything else is prompt text.
pub fn parse_intake(content: &str) -> Intake {
    let mut prompt = Vec::new();
    let mut options = Vec::new();
    for line in content.lines() {
        if let Some(c) = menu_option().captures(line) {
            if let Ok(index) = c[1].parse::<u32>() {
                options.push(MenuOption {
                    index,
                    label: c[2].to_string(),
                });
                continue;
            }
        }
        let t = line.trim();
        if !t.is_empty() {
            prompt.push(t);
        }
    }
    Intake {
        prompt: prompt.join("\n"),
        options,
    }
}

/// Parse a verification block into checklist items.
pub fn parse_checklist(content: &str) -> Vec<ChecklistItem> {
    let mut items = Vec::new();
    let mut in_fence = false;
    for line in content.lines() {
        if is_fence(line) {
            in_fence = !in_fence;
            continue;
        }
        let t = line.trim();
        if in_fence {
            if !t.is_empty() && !t.starts_with('#') {
                items.push(ChecklistItem {
                    text: t.to_string(),
                    command: Some(t.to_string()),
                });
            }
            continue;
        }
        if let Some(c) = bullet().captures(line) {
            let text = c[1].to_string();
            let command = backtick_spans(&text).first().map(|s| s.to_string());
            items.push(ChecklistItem { text, command });
        }
    }
    items
}

/// Contents of every single-backtick span in `s`, trimmed, skipping empty ones.
pub(crate) fn backtick_spans(s: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut rest = s;
    while let Some(start) = rest.find('`') {
        let after = &rest[start + 1..];
        let Some(end) = after.find('`') else { break };
        let span = after[..end].trim();
        if !span.is_empty() {
            out.push(span);
        }
        rest = &after[end + 1..];
    }
    out
}
