//! Inline markup: emphasis, literals, cross references and escapes.
//!
//! Text is tokenized left to right with [`next_token`]. Spans never nest and
//! a span only counts as markup when its closing marker appears before the
//! end of the text; otherwise the rest of the text is passed through
//! untouched.

use std::io::{self, Write};

use crate::block::write_macro;
use crate::sanitize::{protect_line_start, sanitize};

/// Delimiter-bounded span kinds and the mdoc macro each one becomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    /// `*text*`
    Symbolic,
    /// `_text_`
    Emphasis,
    /// `` `text` ``
    Literal,
    /// `^text^`
    Reference,
}

impl SpanKind {
    fn from_marker(ch: char) -> Option<Self> {
        match ch {
            '*' => Some(Self::Symbolic),
            '_' => Some(Self::Emphasis),
            '`' => Some(Self::Literal),
            '^' => Some(Self::Reference),
            _ => None,
        }
    }

    #[must_use]
    pub fn macro_name(self) -> &'static str {
        match self {
            Self::Symbolic => "Sy",
            Self::Emphasis => "Em",
            Self::Literal => "Li",
            Self::Reference => "Xr",
        }
    }
}

/// One unit of inline input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// Characters passed through as they are.
    Text(&'a str),
    /// A closed span. `trailing` holds the `,`/`.` run kept after a reference.
    Span {
        kind: SpanKind,
        inner: &'a str,
        trailing: &'a str,
    },
    /// `\x` resolved to `x`.
    Escape(char),
    /// A backslash with nothing after it.
    LoneBackslash,
}

fn is_special(ch: char) -> bool {
    ch == '\\' || SpanKind::from_marker(ch).is_some()
}

/// Read the token starting at byte offset `pos` of `text`.
///
/// Returns the token and the offset just past it, or `None` once `pos` has
/// reached the end of `text`.
#[must_use]
pub fn next_token(text: &str, pos: usize) -> Option<(Token<'_>, usize)> {
    let rest = text.get(pos..)?;
    let first = rest.chars().next()?;

    if first == '\\' {
        return Some(escape_token(rest, pos));
    }
    if let Some(kind) = SpanKind::from_marker(first) {
        return Some(span_token(kind, first, text, pos));
    }

    let end = rest.find(is_special).unwrap_or(rest.len());
    Some((Token::Text(rest.get(..end).unwrap_or(rest)), pos + end))
}

fn escape_token(rest: &str, pos: usize) -> (Token<'_>, usize) {
    let mut chars = rest.chars().skip(1);
    match chars.next() {
        None => (Token::LoneBackslash, pos + 1),
        Some('\\') => match chars.next() {
            Some(ch) => (Token::Escape(ch), pos + 2 + ch.len_utf8()),
            None => (Token::LoneBackslash, pos + 2),
        },
        Some(ch) => (Token::Escape(ch), pos + 1 + ch.len_utf8()),
    }
}

fn span_token(kind: SpanKind, marker: char, text: &str, pos: usize) -> (Token<'_>, usize) {
    let rest = text.get(pos..).unwrap_or_default();
    let body_start = pos + marker.len_utf8();
    let body = text.get(body_start..).unwrap_or_default();

    let Some(close) = body.find(marker) else {
        return (Token::Text(rest), text.len());
    };
    let inner = body.get(..close).unwrap_or_default();
    if inner.trim().is_empty() {
        let end = body_start + close + marker.len_utf8();
        return (Token::Text(text.get(pos..end).unwrap_or(rest)), end);
    }

    let mut cursor = body_start + close + marker.len_utf8();

    let mut trailing = "";
    if kind == SpanKind::Reference {
        let after = text.get(cursor..).unwrap_or_default();
        let len = after
            .find(|ch: char| ch != ',' && ch != '.')
            .unwrap_or(after.len());
        trailing = after.get(..len).unwrap_or_default();
        cursor += len;
    }
    if text.get(cursor..).is_some_and(|after| after.starts_with(' ')) {
        cursor += 1;
    }

    (
        Token::Span {
            kind,
            inner,
            trailing,
        },
        cursor,
    )
}

/// Rewrite `text` as mdoc: plain runs become text lines and every span
/// becomes its own macro line.
pub(crate) fn render_inline(text: &str, out: &mut dyn Write) -> io::Result<()> {
    let mut line = String::new();
    let mut pos = 0;
    while let Some((token, next)) = next_token(text, pos) {
        match token {
            Token::Text(run) => line.push_str(run),
            Token::Escape(ch) => line.push(ch),
            Token::LoneBackslash => line.push('\\'),
            Token::Span {
                kind,
                inner,
                trailing,
            } => match span_argument(kind, inner) {
                Some(argument) => {
                    flush_text(&mut line, out)?;
                    write_span(kind, &argument, trailing, out)?;
                }
                // Nothing left to pass to the macro: keep the source as text.
                None => line.push_str(text.get(pos..next).unwrap_or_default()),
            },
        }
        pos = next;
    }
    flush_text(&mut line, out)
}

fn flush_text(line: &mut String, out: &mut dyn Write) -> io::Result<()> {
    let text = line.trim();
    if !text.is_empty() {
        writeln!(out, "{}", protect_line_start(text))?;
    }
    line.clear();
    Ok(())
}

/// The macro argument a span carries, or `None` when nothing printable is left.
fn span_argument(kind: SpanKind, inner: &str) -> Option<String> {
    let argument = if kind == SpanKind::Reference {
        sanitize(inner).trim().to_string()
    } else {
        inner.trim().to_string()
    };
    (!argument.is_empty()).then_some(argument)
}

fn write_span(
    kind: SpanKind,
    argument: &str,
    trailing: &str,
    out: &mut dyn Write,
) -> io::Result<()> {
    // Trailing punctuation goes on the macro line as separate delimiters.
    let mut args = vec![argument];
    args.extend(
        trailing
            .char_indices()
            .filter_map(|(idx, ch)| trailing.get(idx..idx + ch.len_utf8())),
    );
    write_macro(out, kind.macro_name(), &args)
}
