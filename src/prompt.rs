// PromptDeck: Default prompt builder
//
// Composes the instruction block sent to the model when a tool carries no
// custom template.

use crate::model::GenerationInput;

/// Map a length hint onto the wording the model is given.
///
/// Unknown hints pass through unchanged.
pub fn describe_length(length: &str) -> &str {
    match length {
        "short" => "approximately 200 characters",
        "medium" => "approximately 300-500 characters",
        "long" => "500+ characters",
        other => other,
    }
}

/// Build the default prompt for `tool_name`.
pub fn build_default_prompt(
    tool_name: &str,
    tool_description: &str,
    input: &GenerationInput,
) -> String {
    let mut prompt = format!("You are a tool called \"{}\".\n", tool_name);
    prompt.push_str(&format!("Tool description: {}\n\n", tool_description));
    prompt.push_str("Generate suitable text based on the following information.\n\n");

    if let Some(title) = input.title() {
        prompt.push_str(&format!("Title: {}\n", title));
    }

    prompt.push_str(&format!("Content: {}\n", input.text));

    if let Some(tone) = input.tone() {
        prompt.push_str(&format!("Tone: {}\n", tone));
    }

    if let Some(length) = input.length() {
        prompt.push_str(&format!("Length: {}\n", describe_length(length)));
    }

    prompt.push_str("\nGenerated text:");
    prompt
}
