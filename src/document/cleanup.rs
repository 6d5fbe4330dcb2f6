//! Text normalization helpers
//!
//! Shared by the sanitizers and analyzers so every stage agrees on what
//! "the same text" means.

/// Characters removed outright from run text.
const INVISIBLE: [char; 3] = ['\u{200B}', '\u{FEFF}', '\u{00AD}'];

/// Normalize one run: tabs, CR/LF and no-break spaces become plain spaces,
/// zero-width characters vanish and runs of spaces collapse to one.
/// Leading and trailing spaces are kept so runs can be concatenated.
pub(crate) fn clean_run_text(text: &str) -> String {
    let mapped: String = text
        .chars()
        .filter(|c| !INVISIBLE.contains(c))
        .map(|c| match c {
            '\t' | '\r' | '\n' | '\u{00A0}' | '\u{3000}' => ' ',
            other => other,
        })
        .collect();
    collapse_spaces(&mapped)
}

/// Collapse every run of two or more spaces into one, without trimming.
pub(crate) fn collapse_spaces(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_space = false;
    for c in text.chars() {
        if c == ' ' {
            if !prev_space {
                out.push(c);
            }
            prev_space = true;
        } else {
            out.push(c);
            prev_space = false;
        }
    }
    out
}

/// Collapse all whitespace to single spaces and trim.
pub(crate) fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Canonical form of a style name for vocabulary matching:
/// lowercase with `_`, `-` and spaces removed.
pub(crate) fn style_token(style: &str) -> String {
    style
        .chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_run_text() {
        assert_eq!(clean_run_text("a\tb\r\nc"), "a b c");
        assert_eq!(clean_run_text("x\u{00A0}\u{00A0}y"), "x y");
        assert_eq!(clean_run_text("zero\u{200B}width"), "zerowidth");
        assert_eq!(clean_run_text("  keep  edges  "), " keep edges ");
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  a \n\t b  "), "a b");
        assert_eq!(normalize_whitespace(""), "");
    }

    #[test]
    fn test_style_token() {
        assert_eq!(style_token("List Paragraph"), "listparagraph");
        assert_eq!(style_token("list_bullet-2"), "listbullet2");
    }
}
