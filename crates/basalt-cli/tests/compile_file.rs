//! Integration tests for `basalt compile` file handling and error output.

use std::fs;
use std::io::Write;
use std::process::{Command, Stdio};

fn cargo_bin() -> Command {
    let mut cmd = Command::new(env!("CARGO"));
    cmd.args(["run", "-p", "basalt-cli", "--bin", "basalt", "--"]);
    cmd
}

#[test]
fn test_compile_file_to_outfile() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let input = dir.path().join("input.bas");
    let output = dir.path().join("output.js");
    fs::write(&input, "Dim x As Integer\nx = 5\n").expect("write input");

    let status = cargo_bin()
        .args([
            "compile",
            input.to_str().expect("input path"),
            "-o",
            output.to_str().expect("output path"),
        ])
        .status()
        .expect("run compile command");
    assert!(status.success());

    let js = fs::read_to_string(&output).expect("read output");
    assert!(js.contains("var x = 5;"), "{js}");
    assert!(js.starts_with("(function () {"), "{js}");
}

#[test]
fn test_compile_stdin_to_stdout() {
    let mut child = cargo_bin()
        .args(["compile", "-"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("spawn compile command");

    child
        .stdin
        .take()
        .expect("stdin handle")
        .write_all(b"MsgBox \"hi\"\n")
        .expect("write stdin");

    let output = child.wait_with_output().expect("wait for compile command");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("MsgBox(\"hi\")"), "{stdout}");
}

#[test]
fn test_compile_error_json_is_structured() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let input = dir.path().join("broken.bas");
    fs::write(&input, "If Then\n").expect("write input");

    let output = cargo_bin()
        .args(["--json", "compile", input.to_str().expect("input path")])
        .output()
        .expect("run compile command");
    assert!(!output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value =
        serde_json::from_str(stdout.trim()).expect("stdout should be valid JSON");
    assert_eq!(json["kind"], "syntax");
    assert_eq!(json["line"], 1);
    assert!(json["message"].as_str().expect("message").contains("unexpected"));
    assert!(json["span"]["start"].is_number());
}
