// PromptDeck: Template engine
//
// `{{name}}` placeholder substitution for user-authored prompt templates.

use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::OnceLock;

fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{([A-Za-z0-9_]+)\}\}").expect("placeholder pattern is valid"))
}

/// Render `template`, replacing every `{{name}}` with `variables[name]`.
///
/// Unknown names render as the empty string. Anything that is not a complete
/// token (a lone `{{`, `{{ spaced }}`, ...) is copied through unchanged.
pub fn render(template: &str, variables: &HashMap<&str, String>) -> String {
    placeholder()
        .replace_all(template, |caps: &Captures| {
            variables.get(&caps[1]).cloned().unwrap_or_default()
        })
        .into_owned()
}
