use std::fs;
use std::path::{Path, PathBuf};

use md2mdoc::{ConvertOptions, convert_reader};

type Error = Box<dyn std::error::Error>;

/// Converts each `.md` source and compares it with the matching `.mdoc` file.
#[rstest::rstest]
#[tracing_test::traced_test]
fn test_with_fixtures(#[files("tests/fixtures/source/*.md")] path: PathBuf) -> Result<(), Error> {
    let file_name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or("Invalid fixture file name")?;
    let expected_path = Path::new("tests")
        .join("fixtures")
        .join("expected")
        .join(file_name)
        .with_extension("mdoc");

    let source = fs::read(&path)?;
    let mut output = Vec::new();
    let state = convert_reader(source.as_slice(), &mut output, &ConvertOptions::default())?;

    let expected = fs::read_to_string(&expected_path)?;
    let actual = String::from_utf8(output)?;

    pretty_assertions::assert_eq!(expected, actual, "mdoc output mismatch for fixture: {file_name}");
    assert!(!state.in_code_block, "fixture {file_name} leaves a display block open");
    assert!(!state.in_comment_block, "fixture {file_name} leaves a comment open");

    Ok(())
}
