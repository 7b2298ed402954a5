//! Small string helpers shared by config parsing and log rendering

/// Shorten `s` to at most `max_chars` characters, ending in `…` when cut.
///
/// Counts characters, not bytes, so multi-byte text never splits mid-char.
///
/// # Examples
/// ```
/// use usbide::utils::ellipsize;
///
/// assert_eq!(ellipsize("hello world", 6), "hello…");
/// assert_eq!(ellipsize("short", 10), "short");
/// ```
pub fn ellipsize(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    if max_chars == 0 {
        return String::new();
    }
    let keep: String = s.chars().take(max_chars - 1).collect();
    format!("{keep}…")
}

/// `1/true/yes/on`, case-insensitive, surrounding whitespace ignored
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// `0/false/no/off`, case-insensitive, surrounding whitespace ignored
pub fn is_falsy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}

/// Split a tool list on commas and whitespace, dropping blanks and repeats.
///
/// Order of first appearance is kept.
pub fn parse_tool_list(raw: &str) -> Vec<String> {
    let mut tools: Vec<String> = Vec::new();
    for item in raw.split(|c: char| c == ',' || c.is_whitespace()) {
        if !item.is_empty() && !tools.iter().any(|t| t == item) {
            tools.push(item.to_string());
        }
    }
    tools
}
