use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

const PAGE: &str = "title: WIDGET 1\n# NAME\nwidget -- does a thing\n\n*bold* move\n";
const PAGE_MDOC: &str = ".Dt WIDGET 1\n.Os\n.Sh NAME\n.Nm widget\n.Nd does a thing\n.Pp\n.Sy bold\nmove\n";

fn temp_dir() -> PathBuf {
    let mut path = std::env::temp_dir();
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    path.push(format!("md2mdoc-test-{}-{}", std::process::id(), stamp));
    fs::create_dir_all(&path).expect("create temp dir");
    path
}

fn md2mdoc_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_md2mdoc"))
}

#[test]
fn cli_file_input_writes_output() {
    let dir = temp_dir();
    let input = dir.join("widget.md");
    let output = dir.join("widget.1");
    fs::write(&input, PAGE).expect("write input");

    let status = Command::new(md2mdoc_bin())
        .args([input.to_str().unwrap(), "-o", output.to_str().unwrap()])
        .status()
        .expect("run md2mdoc");

    assert!(status.success());
    let mdoc = fs::read_to_string(output).expect("read output");
    assert_eq!(mdoc, PAGE_MDOC);
}

#[test]
fn cli_stdin_input_writes_stdout() {
    let mut child = Command::new(md2mdoc_bin())
        .arg("-")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("spawn md2mdoc");

    {
        let stdin = child.stdin.as_mut().expect("stdin");
        stdin.write_all(PAGE.as_bytes()).expect("write stdin");
    }

    let output = child.wait_with_output().expect("wait");
    assert!(output.status.success());
    assert_eq!(String::from_utf8(output.stdout).expect("utf8"), PAGE_MDOC);
}

#[test]
fn cli_converts_several_files_into_directory() {
    let dir = temp_dir();
    let first = dir.join("one.md");
    let second = dir.join("two.md");
    fs::write(&first, "# One\n").expect("write input");
    fs::write(&second, "# Two\n-x\n").expect("write input");
    let out_dir = dir.join("out");

    let status = Command::new(md2mdoc_bin())
        .args([
            first.to_str().unwrap(),
            second.to_str().unwrap(),
            "--out-dir",
            out_dir.to_str().unwrap(),
        ])
        .status()
        .expect("run md2mdoc");

    assert!(status.success());
    assert_eq!(
        fs::read_to_string(out_dir.join("one.mdoc")).expect("one"),
        ".Sh One\n"
    );
    assert_eq!(
        fs::read_to_string(out_dir.join("two.mdoc")).expect("two"),
        ".Sh Two\n.Bl -tag -width Ds\n.It Fl x\n"
    );
}

#[test]
fn cli_several_files_need_out_dir() {
    let dir = temp_dir();
    let first = dir.join("a.md");
    let second = dir.join("b.md");
    fs::write(&first, "a\n").expect("write input");
    fs::write(&second, "b\n").expect("write input");

    let status = Command::new(md2mdoc_bin())
        .args([first.to_str().unwrap(), second.to_str().unwrap()])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .expect("run md2mdoc");

    assert!(!status.success());
}

#[test]
fn cli_missing_input_fails() {
    let dir = temp_dir();
    let status = Command::new(md2mdoc_bin())
        .arg(dir.join("absent.md").to_str().unwrap())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .expect("run md2mdoc");

    assert!(!status.success());
}

#[test]
fn cli_config_file_applies() {
    let dir = temp_dir();
    let config = dir.join("md2mdoc.yml");
    fs::write(&config, "list_width: Fl\n").expect("write config");

    let output = Command::new(md2mdoc_bin())
        .args(["-c", config.to_str().unwrap(), "--offset", "4n"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .and_then(|mut child| {
            child
                .stdin
                .as_mut()
                .expect("stdin")
                .write_all(b"-v\n<\n>\n")?;
            child.wait_with_output()
        })
        .expect("run md2mdoc");

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8(output.stdout).expect("utf8"),
        ".Bl -tag -width Fl\n.It Fl v\n.Bd -literal -offset 4n\n.Ed\n"
    );
}

#[test]
fn cli_rejects_inputs_that_share_an_output_name() {
    let dir = temp_dir();
    fs::create_dir_all(dir.join("a")).expect("create a");
    fs::create_dir_all(dir.join("b")).expect("create b");
    let first = dir.join("a").join("x.md");
    let second = dir.join("b").join("x.md");
    fs::write(&first, "# Alpha\n").expect("write input");
    fs::write(&second, "# Beta\n").expect("write input");
    let out_dir = dir.join("out");

    let output = Command::new(md2mdoc_bin())
        .args([
            first.to_str().unwrap(),
            second.to_str().unwrap(),
            "--out-dir",
            out_dir.to_str().unwrap(),
        ])
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .expect("run md2mdoc");

    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).expect("utf8");
    assert!(stderr.contains("would both be written to"));
    assert!(!out_dir.join("x.mdoc").exists());
}

#[test]
fn cli_rejects_multi_word_list_width() {
    let status = Command::new(md2mdoc_bin())
        .args(["--list-width", "two words"])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .expect("run md2mdoc");

    assert!(!status.success());
}
