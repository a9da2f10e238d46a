//! `basalt compile` command implementation.
//!
//! Reads a source file (or stdin when the input is `-`), compiles it,
//! and writes the generated JavaScript to stdout or to `-o OUTFILE`.
//! Compile failures print a structured error with the error kind and
//! the source position, as a single JSON object when `--json`.

use basalt_compiler::{clean, compile, CompileError, LineIndex, Location};
use miette::{miette, IntoDiagnostic, Result};
use serde_json::json;
use std::fs;
use std::io::Read;
use std::path::Path;

pub fn run(input: &str, outfile: Option<&Path>, json: bool) -> Result<()> {
    let source = read_source(input)?;

    let output = match compile(&source) {
        Ok(output) => output,
        Err(err) => return report(&source, &err, json),
    };

    match outfile {
        Some(path) => fs::write(path, output).into_diagnostic()?,
        None => print!("{output}"),
    }
    Ok(())
}

fn read_source(input: &str) -> Result<String> {
    if input == "-" {
        let mut source = String::new();
        std::io::stdin()
            .read_to_string(&mut source)
            .into_diagnostic()?;
        return Ok(source);
    }
    fs::read_to_string(input).into_diagnostic()
}

/// Error spans are offsets into the normalized source, so positions
/// are resolved against the cleaned text. Lines and columns are
/// reported 1-based.
fn report(source: &str, err: &CompileError, json: bool) -> Result<()> {
    let normalized = clean(source);
    let index = LineIndex::new(&normalized);
    let location = Location::of(err.span(), &index);
    let line = location.first_line + 1;
    let column = location.first_column + 1;

    if json {
        let payload = json!({
            "kind": err.kind(),
            "message": err.message(),
            "line": line,
            "column": column,
            "span": err.span(),
        });
        println!("{payload}");
        std::process::exit(1);
    }

    Err(miette!(
        "{} error at {line}:{column}: {}",
        err.kind(),
        err.message()
    ))
}
