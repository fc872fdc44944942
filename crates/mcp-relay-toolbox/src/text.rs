//! Text statistics.

use crate::types::TextStats;

/// Count words, lines, characters, and bytes in `text`.
///
/// Lines follow `str::lines`, so a trailing newline does not open an extra line.
pub fn analyze(text: &str) -> TextStats {
    TextStats {
        words: text.split_whitespace().count(),
        lines: text.lines().count(),
        chars: text.chars().count(),
        bytes: text.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_empty() {
        let stats = analyze("");
        assert_eq!(stats.words, 0);
        assert_eq!(stats.lines, 0);
        assert_eq!(stats.chars, 0);
    }

    #[test]
    fn test_analyze_multiline() {
        let stats = analyze("hello world\nsecond line here\n");
        assert_eq!(stats.words, 5);
        assert_eq!(stats.lines, 2);
        assert_eq!(stats.bytes, 29);
    }

    #[test]
    fn test_analyze_unicode_counts_chars_not_bytes() {
        let stats = analyze("日本語 λ");
        assert_eq!(stats.words, 2);
        assert_eq!(stats.chars, 5);
        assert!(stats.bytes > stats.chars);
    }
}
