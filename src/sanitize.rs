//! Character-level protection for text embedded in mdoc output.

use std::borrow::Cow;

/// Reduce `text` to the characters that are safe inside a macro argument.
///
/// Letters, digits, space, form feed, tab, newline and underscore are kept;
/// every other character becomes a single space. Returns the input unchanged
/// (borrowed) when nothing needs replacing.
#[must_use]
pub fn sanitize(text: &str) -> Cow<'_, str> {
    if text.chars().all(is_allowed) {
        return Cow::Borrowed(text);
    }
    Cow::Owned(
        text.chars()
            .map(|ch| if is_allowed(ch) { ch } else { ' ' })
            .collect(),
    )
}

fn is_allowed(ch: char) -> bool {
    ch.is_alphanumeric() || matches!(ch, ' ' | '\x0c' | '\t' | '\n' | '_')
}

/// Guard a text line so roff never reads it as a request.
///
/// Lines starting with `.` or `'` get a zero-width `\&` prefix.
#[must_use]
pub fn protect_line_start(line: &str) -> Cow<'_, str> {
    if line.starts_with('.') || line.starts_with('\'') {
        Cow::Owned(format!("\\&{line}"))
    } else {
        Cow::Borrowed(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_keeps_allowed_text_borrowed() {
        let sanitized = sanitize("ls 1\tsnake_case\n");
        assert!(matches!(sanitized, Cow::Borrowed(_)));
        assert_eq!(sanitized, "ls 1\tsnake_case\n");
    }

    #[test]
    fn sanitize_replaces_each_disallowed_char_with_space() {
        assert_eq!(sanitize("ls(1)"), "ls 1 ");
        assert_eq!(sanitize("a\"b\\c.d"), "a b c d");
        assert_eq!(sanitize("--"), "  ");
    }

    #[test]
    fn sanitize_keeps_unicode_letters() {
        assert_eq!(sanitize("café"), "café");
    }

    #[test]
    fn protect_line_start_escapes_request_characters() {
        assert_eq!(protect_line_start(".TH evil"), "\\&.TH evil");
        assert_eq!(protect_line_start("'br"), "\\&'br");
        assert_eq!(protect_line_start("plain. text"), "plain. text");
    }
}
