/// Characters stripped from scanner output before parsing.
const STRIPPED: [char; 3] = ['"', '[', ']'];

/// Removes quote and bracket characters anywhere in the text, then trims the ends.
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| !STRIPPED.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Splits normalized text positionally into course name, student id and student name.
///
/// Missing trailing fields are empty and anything past the third comma-separated segment
/// is dropped. There is no validation beyond that.
pub fn parse_fields(raw: &str) -> [String; 3] {
    let cleaned = normalize(raw);
    let mut segments = cleaned.split(',').map(|segment| segment.trim().to_string());
    [
        segments.next().unwrap_or_default(),
        segments.next().unwrap_or_default(),
        segments.next().unwrap_or_default(),
    ]
}
