//! Best-effort extraction of the final solution from model output

const OPEN_MARKER: &str = "[CODE]";
const CLOSE_MARKER: &str = "[/CODE]";

/// Text between the first `[CODE]` and the following `[/CODE]`, trimmed
pub fn extract_code_block(text: &str) -> Option<&str> {
    let start = text.find(OPEN_MARKER)? + OPEN_MARKER.len();
    let len = text[start..].find(CLOSE_MARKER)?;
    Some(text[start..start + len].trim())
}

/// Final result text: the extracted code in a fenced block, or `text`
/// verbatim when no marked block is present
pub fn present_solution(text: &str) -> String {
    match extract_code_block(text) {
        Some(code) => format!("Here's your solution:\n\n```\n{}\n```", code),
        None => text.to_string(),
    }
}
