#![forbid(unsafe_code)]
//! md2mdoc converts simple markdown-like text into mdoc manual pages, one line
//! at a time.
//!
//! # Example
//!
//! ```
//! let input = "title: WIDGET 1\n# NAME\nwidget -- does a thing\n";
//! let mdoc = md2mdoc::convert_str(input, &md2mdoc::ConvertOptions::default())?;
//! assert_eq!(mdoc, ".Dt WIDGET 1\n.Os\n.Sh NAME\n.Nm widget\n.Nd does a thing\n");
//! # Ok::<(), md2mdoc::Md2mdocError>(())
//! ```
//!
//! The conversion is one way. Its output is mdoc, not input syntax, so feeding
//! it back through the converter does not reproduce it.

mod block;
mod config;
mod inline;
mod sanitize;

use std::io::{self, BufRead, Write};

use tracing::{debug, trace, warn};

pub use config::{
    BUILTIN_SCHEMA, ConvertOptions, load_config, validate_config_with_schema,
    validate_config_with_schema_str,
};
pub use inline::{SpanKind, Token, next_token};
pub use sanitize::{protect_line_start, sanitize};

#[derive(Debug, thiserror::Error)]
pub enum Md2mdocError {
    /// Reading the source or writing the sink failed.
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("yaml parse error: {0}")]
    Yaml(String),
    #[error("schema validation error: {0}")]
    Schema(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Md2mdocError>;

/// Block state carried from one line to the next within a single document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionState {
    pub stripping_leading_whitespace: bool,
    pub in_code_block: bool,
    pub in_list_block: bool,
    pub in_comment_block: bool,
    pub pending_name_description: bool,
}

impl Default for ConversionState {
    fn default() -> Self {
        Self::new(&ConvertOptions::default())
    }
}

impl ConversionState {
    #[must_use]
    pub fn new(options: &ConvertOptions) -> Self {
        Self {
            stripping_leading_whitespace: options.strip_leading_whitespace,
            in_code_block: false,
            in_list_block: false,
            in_comment_block: false,
            pending_name_description: false,
        }
    }
}

/// Line-by-line converter for one document.
///
/// Lines must be fed in order. Independent documents each need their own
/// `Converter`.
#[derive(Debug)]
pub struct Converter {
    options: ConvertOptions,
    state: ConversionState,
    line_number: usize,
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(ConvertOptions::default())
    }
}

impl Converter {
    #[must_use]
    pub fn new(options: ConvertOptions) -> Self {
        let state = ConversionState::new(&options);
        Self {
            options,
            state,
            line_number: 0,
        }
    }

    #[must_use]
    pub fn state(&self) -> &ConversionState {
        &self.state
    }

    #[must_use]
    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Convert one line and write the resulting mdoc to `out`.
    ///
    /// A trailing `\n` or `\r\n` is ignored. The only failures are write
    /// errors from `out`.
    pub fn convert_line<W: Write>(&mut self, line: &str, out: &mut W) -> Result<()> {
        self.line_number += 1;
        let line = line
            .strip_suffix('\n')
            .map_or(line, |line| line.strip_suffix('\r').unwrap_or(line));
        trace!(line = self.line_number, "converting line");
        block::dispatch(&mut self.state, &self.options, line, out)?;
        Ok(())
    }

    /// End the document, reporting any block that was never closed.
    pub fn finish(self) -> ConversionState {
        if self.state.in_code_block {
            warn!("input ended inside a no-format block");
        }
        if self.state.in_list_block {
            warn!("input ended inside a list");
        }
        if self.state.in_comment_block {
            warn!("input ended inside a comment");
        }
        if self.state.pending_name_description {
            warn!("NAME heading was never followed by a name line");
        }
        debug!(lines = self.line_number, "conversion finished");
        self.state
    }
}

/// Convert every line of `reader` into `writer` with a fresh [`Converter`].
#[tracing::instrument(skip_all)]
pub fn convert_reader<R: BufRead, W: Write>(
    reader: R,
    mut writer: W,
    options: &ConvertOptions,
) -> Result<ConversionState> {
    let mut converter = Converter::new(options.clone());
    for line in reader.lines() {
        converter.convert_line(&line?, &mut writer)?;
    }
    writer.flush()?;
    Ok(converter.finish())
}

/// Convert a whole document held in memory.
pub fn convert_str(input: &str, options: &ConvertOptions) -> Result<String> {
    let mut out = Vec::new();
    convert_reader(input.as_bytes(), &mut out, options)?;
    String::from_utf8(out)
        .map_err(|err| Md2mdocError::Io(io::Error::new(io::ErrorKind::InvalidData, err)))
}
