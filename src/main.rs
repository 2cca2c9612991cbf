#![forbid(unsafe_code)]

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Convert simple markdown-like text into mdoc manual pages.
#[derive(Debug, Parser)]
#[command(name = "md2mdoc", version, about)]
struct Cli {
    /// Input files; none or `-` reads standard input
    #[arg(value_name = "PATH")]
    inputs: Vec<PathBuf>,

    /// Write the result here instead of standard output
    #[arg(short = 'o', long = "output", value_name = "PATH", conflicts_with = "out_dir")]
    output: Option<PathBuf>,

    /// Write one `<name>.mdoc` per input into this directory
    #[arg(short = 'd', long = "out-dir", value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// YAML configuration file
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Validate the configuration against this schema instead of the built-in one
    #[arg(long = "schema", value_name = "PATH", requires = "config")]
    schema: Option<PathBuf>,

    /// Width argument for `.Bl -tag -width`
    #[arg(long = "list-width", value_name = "WIDTH", value_parser = macro_argument)]
    list_width: Option<String>,

    /// Offset argument for `.Bd -literal -offset`
    #[arg(long = "offset", value_name = "OFFSET", value_parser = macro_argument)]
    display_offset: Option<String>,

    /// Keep leading whitespace on text lines
    #[arg(long = "keep-whitespace")]
    keep_whitespace: bool,
}

/// A single mdoc macro argument: no whitespace and no quotes, as the
/// configuration schema requires for the same keys.
fn macro_argument(value: &str) -> Result<String, String> {
    if value.is_empty() || value.chars().any(|ch| ch.is_whitespace() || ch == '"') {
        return Err("must be one word without whitespace or quotes".to_string());
    }
    Ok(value.to_string())
}

#[derive(Debug)]
enum Source {
    Stdin,
    File(PathBuf),
}

impl Source {
    fn from_arg(path: &Path) -> Self {
        if path.as_os_str() == "-" {
            Source::Stdin
        } else {
            Source::File(path.to_path_buf())
        }
    }

    fn open(&self) -> io::Result<Box<dyn BufRead>> {
        match self {
            Source::Stdin => Ok(Box::new(io::stdin().lock())),
            Source::File(path) => Ok(Box::new(BufReader::new(File::open(path)?))),
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .init();
}

fn resolve_options(cli: &Cli) -> md2mdoc::Result<md2mdoc::ConvertOptions> {
    let mut options = match &cli.config {
        Some(path) => md2mdoc::load_config(path, cli.schema.as_deref())?,
        None => md2mdoc::ConvertOptions::default(),
    };
    if let Some(width) = &cli.list_width {
        options.list_width.clone_from(width);
    }
    if let Some(offset) = &cli.display_offset {
        options.display_offset.clone_from(offset);
    }
    if cli.keep_whitespace {
        options.strip_leading_whitespace = false;
    }
    Ok(options)
}

fn output_path_for(dir: &Path, input: &Path) -> PathBuf {
    let mut name = input
        .file_stem()
        .map_or_else(|| "stdin".into(), |stem| stem.to_os_string());
    name.push(".mdoc");
    dir.join(name)
}

/// First pair of inputs whose outputs in `dir` would be the same file.
fn find_output_clash<'a>(
    inputs: &'a [PathBuf],
    dir: &Path,
) -> Option<(&'a Path, &'a Path, PathBuf)> {
    let mut seen: HashMap<PathBuf, &'a Path> = HashMap::new();
    for input in inputs {
        let output = output_path_for(dir, input);
        if let Some(&previous) = seen.get(&output) {
            return Some((previous, input.as_path(), output));
        }
        seen.insert(output, input.as_path());
    }
    None
}

fn convert_one(
    source: &Source,
    output: Option<&Path>,
    options: &md2mdoc::ConvertOptions,
) -> md2mdoc::Result<()> {
    let reader = source.open()?;
    match output {
        Some(path) => {
            let writer = BufWriter::new(File::create(path)?);
            md2mdoc::convert_reader(reader, writer, options)?;
            info!(?source, output = %path.display(), "converted");
        }
        None => {
            let writer = BufWriter::new(io::stdout().lock());
            md2mdoc::convert_reader(reader, writer, options)?;
        }
    }
    Ok(())
}

fn convert_batch(
    inputs: &[PathBuf],
    dir: &Path,
    options: &md2mdoc::ConvertOptions,
) -> md2mdoc::Result<()> {
    // Each task owns its own converter; nothing is shared between documents.
    inputs.par_iter().try_for_each(|input| {
        let source = Source::File(input.clone());
        convert_one(&source, Some(&output_path_for(dir, input)), options)
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let cli = Cli::parse();
    let options = resolve_options(&cli)?;

    let sources: Vec<Source> = cli
        .inputs
        .iter()
        .map(PathBuf::as_path)
        .map(Source::from_arg)
        .collect();
    match (sources.as_slice(), &cli.out_dir) {
        ([], None) => convert_one(&Source::Stdin, cli.output.as_deref(), &options)?,
        ([source], None) => convert_one(source, cli.output.as_deref(), &options)?,
        (_, None) => Cli::command()
            .error(
                ErrorKind::MissingRequiredArgument,
                "several inputs need --out-dir",
            )
            .exit(),
        (sources, Some(dir)) => {
            if sources.is_empty() || sources.iter().any(|source| matches!(source, Source::Stdin)) {
                Cli::command()
                    .error(
                        ErrorKind::ArgumentConflict,
                        "--out-dir needs named input files",
                    )
                    .exit()
            }
            if let Some((first, second, output)) = find_output_clash(&cli.inputs, dir) {
                Cli::command()
                    .error(
                        ErrorKind::ArgumentConflict,
                        format!(
                            "{} and {} would both be written to {}",
                            first.display(),
                            second.display(),
                            output.display()
                        ),
                    )
                    .exit()
            }
            std::fs::create_dir_all(dir)?;
            convert_batch(&cli.inputs, dir, &options)?;
        }
    }
    io::stdout().flush()?;
    Ok(())
}
