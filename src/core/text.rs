//! Text measurements derived from the markdown body.

/// Maximum excerpt length in characters
pub const EXCERPT_MAX_CHARS: usize = 150;

/// Reading speed used for read-time estimates
pub const WORDS_PER_MINUTE: usize = 200;

/// Character count of the trimmed body
pub fn text_length(content: &str) -> usize {
    content.trim().chars().count()
}

/// Number of lines in the trimmed body (0 when empty)
pub fn line_count(content: &str) -> usize {
    content.trim().lines().count()
}

/// Estimated read time in whole minutes, never below 1
pub fn read_time_minutes(content: &str) -> u32 {
    let words = content.split_whitespace().count();
    let minutes = words.div_ceil(WORDS_PER_MINUTE).max(1);
    u32::try_from(minutes).unwrap_or(u32::MAX)
}

/// Strip the most common markdown markers and collapse whitespace
fn plain_text(content: &str) -> String {
    let mut words = Vec::new();

    for line in content.lines() {
        let line = line.trim_start().trim_start_matches(['#', '>']).trim_start();
        let line = line
            .strip_prefix("- ")
            .or_else(|| line.strip_prefix("* "))
            .unwrap_or(line);
        for word in line.split_whitespace() {
            let cleaned: String = word.chars().filter(|c| !matches!(c, '*' | '_' | '`')).collect();
            if !cleaned.is_empty() {
                words.push(cleaned);
            }
        }
    }

    words.join(" ")
}

/// Plain-text preview of at most [`EXCERPT_MAX_CHARS`] characters
pub fn excerpt(content: &str) -> String {
    let plain = plain_text(content);
    if plain.chars().count() <= EXCERPT_MAX_CHARS {
        return plain;
    }

    let cut: String = plain.chars().take(EXCERPT_MAX_CHARS - 3).collect();
    format!("{}...", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_and_lines() {
        assert_eq!(text_length("  short  "), 5);
        assert_eq!(line_count(""), 0);
        assert_eq!(line_count("\n\none\ntwo\n\n"), 2);
        assert_eq!(line_count("a\n\nb"), 3);
    }

    #[test]
    fn test_read_time() {
        assert_eq!(read_time_minutes(""), 1);
        assert_eq!(read_time_minutes(&"word ".repeat(200)), 1);
        assert_eq!(read_time_minutes(&"word ".repeat(201)), 2);
    }

    #[test]
    fn test_excerpt_strips_markdown() {
        assert_eq!(excerpt("# Title\n\nSome **bold** text"), "Title Some bold text");
        assert_eq!(excerpt("> quoted\n- item"), "quoted item");
    }

    #[test]
    fn test_excerpt_is_capped() {
        let long = "abcd ".repeat(100);
        let result = excerpt(&long);

        assert!(result.chars().count() <= EXCERPT_MAX_CHARS);
        assert!(result.ends_with("..."));
    }
}
