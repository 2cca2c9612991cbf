//! Block-level dispatch.
//!
//! Every input line is matched against [`RULES`] from top to bottom and the
//! first rule whose predicate holds handles it. Lines no rule claims are
//! ordinary text and go through [`text`].

use std::io::{self, Write};

use tracing::{debug, trace};

use crate::inline::render_inline;
use crate::sanitize::{protect_line_start, sanitize};
use crate::{ConversionState, ConvertOptions};

const AUTHOR_PREFIX: &str = "author:";
const DATE_PREFIX: &str = "date:";
const TITLE_PREFIX: &str = "title:";
const FENCE: &str = "```";
const COMMENT_OPEN: &str = "<!--";
const COMMENT_CLOSE: &str = "-->";

/// Everything a rule handler may touch while converting one line.
pub(crate) struct Dispatch<'a> {
    pub(crate) state: &'a mut ConversionState,
    pub(crate) options: &'a ConvertOptions,
    pub(crate) out: &'a mut dyn Write,
}

pub(crate) struct Rule {
    pub(crate) name: &'static str,
    matches: fn(&ConversionState, &str) -> bool,
    apply: fn(&mut Dispatch<'_>, &str) -> io::Result<()>,
}

pub(crate) const RULES: &[Rule] = &[
    Rule {
        name: "comment-body",
        matches: in_comment,
        apply: comment_body,
    },
    Rule {
        name: "code-body",
        matches: in_code,
        apply: code_body,
    },
    Rule {
        name: "blank",
        matches: is_blank,
        apply: blank,
    },
    Rule {
        name: "author",
        matches: is_author,
        apply: author,
    },
    Rule {
        name: "date",
        matches: is_date,
        apply: date,
    },
    Rule {
        name: "title",
        matches: is_title,
        apply: title,
    },
    Rule {
        name: "heading",
        matches: is_heading,
        apply: heading,
    },
    Rule {
        name: "optional-argument",
        matches: is_optional_argument,
        apply: optional_argument,
    },
    Rule {
        name: "list",
        matches: is_list_line,
        apply: list_line,
    },
    Rule {
        name: "list-end",
        matches: is_list_end,
        apply: list_end,
    },
    Rule {
        name: "comment-open",
        matches: is_comment_open,
        apply: comment_open,
    },
    Rule {
        name: "display-open",
        matches: is_display_open,
        apply: open_display,
    },
    Rule {
        name: "display-close",
        matches: is_display_close,
        apply: display_close,
    },
    Rule {
        name: "fence",
        matches: is_fence,
        apply: open_display,
    },
];

static TEXT: Rule = Rule {
    name: "text",
    matches: always,
    apply: text,
};

/// Convert one line (terminator already removed).
pub(crate) fn dispatch(
    state: &mut ConversionState,
    options: &ConvertOptions,
    line: &str,
    out: &mut dyn Write,
) -> io::Result<()> {
    let rule = select_rule(state, line);
    trace!(rule = rule.name, "dispatching line");
    let mut ctx = Dispatch {
        state,
        options,
        out,
    };
    (rule.apply)(&mut ctx, line)
}

pub(crate) fn select_rule(state: &ConversionState, line: &str) -> &'static Rule {
    RULES
        .iter()
        .find(|rule| (rule.matches)(state, line))
        .unwrap_or(&TEXT)
}

/// Write `.Name arg...`, skipping empty arguments.
pub(crate) fn write_macro(out: &mut dyn Write, name: &str, args: &[&str]) -> io::Result<()> {
    write!(out, ".{name}")?;
    for arg in args.iter().filter(|arg| !arg.is_empty()) {
        write!(out, " {arg}")?;
    }
    writeln!(out)
}

fn strip_prefix_ignore_case<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let head = line.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        line.get(prefix.len()..)
    } else {
        None
    }
}

fn in_comment(state: &ConversionState, _line: &str) -> bool {
    state.in_comment_block
}

fn in_code(state: &ConversionState, _line: &str) -> bool {
    state.in_code_block
}

fn is_blank(_state: &ConversionState, line: &str) -> bool {
    line.is_empty()
}

fn is_author(_state: &ConversionState, line: &str) -> bool {
    strip_prefix_ignore_case(line, AUTHOR_PREFIX).is_some()
}

fn is_date(_state: &ConversionState, line: &str) -> bool {
    strip_prefix_ignore_case(line, DATE_PREFIX).is_some()
}

fn is_title(_state: &ConversionState, line: &str) -> bool {
    strip_prefix_ignore_case(line, TITLE_PREFIX).is_some()
}

fn is_heading(_state: &ConversionState, line: &str) -> bool {
    line.starts_with('#')
}

fn is_optional_argument(_state: &ConversionState, line: &str) -> bool {
    line.starts_with('[')
}

fn is_list_line(_state: &ConversionState, line: &str) -> bool {
    line.starts_with('-')
}

fn is_list_end(_state: &ConversionState, line: &str) -> bool {
    line.starts_with('~')
}

fn is_comment_open(_state: &ConversionState, line: &str) -> bool {
    line.starts_with(COMMENT_OPEN)
}

fn is_display_open(_state: &ConversionState, line: &str) -> bool {
    line.starts_with('<')
}

fn is_display_close(_state: &ConversionState, line: &str) -> bool {
    line.starts_with('>')
}

fn is_fence(_state: &ConversionState, line: &str) -> bool {
    line.starts_with(FENCE)
}

fn always(_state: &ConversionState, _line: &str) -> bool {
    true
}

fn comment_body(ctx: &mut Dispatch<'_>, line: &str) -> io::Result<()> {
    if line.contains(COMMENT_CLOSE) {
        ctx.state.in_comment_block = false;
        debug!("comment block closed");
    }
    Ok(())
}

fn code_body(ctx: &mut Dispatch<'_>, line: &str) -> io::Result<()> {
    if line.starts_with('>') || line.starts_with(FENCE) {
        return display_close(ctx, line);
    }
    writeln!(ctx.out, "{}", protect_line_start(line))
}

fn blank(ctx: &mut Dispatch<'_>, _line: &str) -> io::Result<()> {
    write_macro(ctx.out, "Pp", &[])
}

fn metadata(ctx: &mut Dispatch<'_>, line: &str, prefix: &str, name: &str) -> io::Result<()> {
    let value = strip_prefix_ignore_case(line, prefix).unwrap_or_default().trim();
    write_macro(ctx.out, name, &[value])
}

fn author(ctx: &mut Dispatch<'_>, line: &str) -> io::Result<()> {
    metadata(ctx, line, AUTHOR_PREFIX, "An")
}

fn date(ctx: &mut Dispatch<'_>, line: &str) -> io::Result<()> {
    metadata(ctx, line, DATE_PREFIX, "Dd")
}

fn title(ctx: &mut Dispatch<'_>, line: &str) -> io::Result<()> {
    metadata(ctx, line, TITLE_PREFIX, "Dt")?;
    write_macro(ctx.out, "Os", &[])
}

fn heading(ctx: &mut Dispatch<'_>, line: &str) -> io::Result<()> {
    let raw = line.trim_start_matches('#').trim();
    let sanitized = sanitize(raw);
    let text = sanitized.trim();
    write_macro(ctx.out, "Sh", &[text])?;

    if text.eq_ignore_ascii_case("NAME") {
        ctx.state.pending_name_description = true;
    } else if text.eq_ignore_ascii_case("OPTIONS")
        && ctx.options.options_opens_list
        && !ctx.state.in_list_block
    {
        open_list(ctx)?;
    }
    Ok(())
}

fn optional_argument(ctx: &mut Dispatch<'_>, line: &str) -> io::Result<()> {
    let body = line.strip_prefix('[').unwrap_or(line);
    let content = body
        .split_once(']')
        .map_or(body, |(inside, _)| inside)
        .trim();

    if content.is_empty() {
        trace!("empty optional argument dropped");
        return Ok(());
    }
    match content.strip_prefix('-') {
        Some(flagged) if !flagged.trim().is_empty() => {
            write_macro(ctx.out, "Op", &flag_arguments(flagged))
        }
        _ => write_macro(ctx.out, "Op", &["Ar", content]),
    }
}

/// `Fl`/`Ar` arguments for `flag arg`; a keyword is only paired with a
/// non-empty token.
fn flag_arguments(flagged: &str) -> Vec<&str> {
    let flagged = flagged.trim_end();
    let (flag, arg) = flagged
        .split_once(' ')
        .map_or((flagged, ""), |(flag, arg)| (flag, arg.trim()));
    let mut args = Vec::with_capacity(4);
    if !flag.is_empty() {
        args.extend(["Fl", flag]);
    }
    if !arg.is_empty() {
        args.extend(["Ar", arg]);
    }
    args
}

fn open_list(ctx: &mut Dispatch<'_>) -> io::Result<()> {
    write_macro(ctx.out, "Bl", &["-tag", "-width", ctx.options.list_width.as_str()])?;
    ctx.state.in_list_block = true;
    debug!("list opened");
    Ok(())
}

fn close_list(ctx: &mut Dispatch<'_>) -> io::Result<()> {
    write_macro(ctx.out, "El", &[])?;
    ctx.state.in_list_block = false;
    debug!("list closed");
    Ok(())
}

fn list_line(ctx: &mut Dispatch<'_>, line: &str) -> io::Result<()> {
    if line.starts_with(COMMENT_CLOSE) {
        trace!("comment close marker outside a comment block");
        return Ok(());
    }

    let rest = line.strip_prefix('-').unwrap_or(line);
    if rest.trim().is_empty() {
        return close_list(ctx);
    }
    if !ctx.state.in_list_block {
        open_list(ctx)?;
    }

    match rest.chars().next() {
        Some(ch) if ch.is_alphabetic() => write_macro(ctx.out, "It", &flag_arguments(rest)),
        _ => {
            write_macro(ctx.out, "It", &[])?;
            render_inline(rest.trim(), ctx.out)
        }
    }
}

fn list_end(ctx: &mut Dispatch<'_>, _line: &str) -> io::Result<()> {
    close_list(ctx)
}

fn comment_open(ctx: &mut Dispatch<'_>, line: &str) -> io::Result<()> {
    let after_open = line.get(COMMENT_OPEN.len()..).unwrap_or_default();
    if !after_open.contains(COMMENT_CLOSE) {
        ctx.state.in_comment_block = true;
        debug!("comment block opened");
    }
    Ok(())
}

fn open_display(ctx: &mut Dispatch<'_>, _line: &str) -> io::Result<()> {
    write_macro(
        ctx.out,
        "Bd",
        &["-literal", "-offset", ctx.options.display_offset.as_str()],
    )?;
    ctx.state.stripping_leading_whitespace = false;
    ctx.state.in_code_block = true;
    debug!("no-format block opened");
    Ok(())
}

fn display_close(ctx: &mut Dispatch<'_>, _line: &str) -> io::Result<()> {
    write_macro(ctx.out, "Ed", &[])?;
    ctx.state.stripping_leading_whitespace = ctx.options.strip_leading_whitespace;
    ctx.state.in_code_block = false;
    debug!("no-format block closed");
    Ok(())
}

fn text(ctx: &mut Dispatch<'_>, line: &str) -> io::Result<()> {
    let text = if ctx.state.stripping_leading_whitespace {
        line.trim_start_matches([' ', '\t'])
    } else {
        line
    };
    if text.trim().is_empty() {
        return Ok(());
    }

    if ctx.state.pending_name_description {
        ctx.state.pending_name_description = false;
        return name_description(ctx, text);
    }
    render_inline(text, ctx.out)
}

fn name_description(ctx: &mut Dispatch<'_>, text: &str) -> io::Result<()> {
    match text.split_once("--") {
        Some((name, description)) => {
            write_macro(ctx.out, "Nm", &[name.trim()])?;
            let description = description.trim();
            if description.is_empty() {
                Ok(())
            } else {
                write_macro(ctx.out, "Nd", &[description])
            }
        }
        None => write_macro(ctx.out, "Nm", &[text.trim()]),
    }
}
