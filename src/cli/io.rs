//! JSON I/O for the CLI
//!
//! Requests arrive on stdin, one JSON object per line. Responses go to
//! stdout, one per line. Logs never touch stdout.

use std::io::{self, BufRead, Read, Write};

use serde::Serialize;
use serde_json::json;

use super::errors::{CliError, CliResult};

/// Reads the whole of `input` as one request.
pub fn read_request_from<R: Read>(mut input: R) -> CliResult<String> {
    let mut request = String::new();
    input.read_to_string(&mut request)?;

    if request.trim().is_empty() {
        return Err(CliError::EmptyInput);
    }
    Ok(request)
}

/// Reads one request from stdin.
pub fn read_request() -> CliResult<String> {
    read_request_from(io::stdin().lock())
}

/// Non-blank lines of `input`.
pub fn read_lines<R: BufRead>(input: R) -> impl Iterator<Item = CliResult<String>> {
    input.lines().filter_map(|line| match line {
        Ok(line) if line.trim().is_empty() => None,
        Ok(line) => Some(Ok(line)),
        Err(e) => Some(Err(CliError::from(e))),
    })
}

/// Writes one line and flushes.
pub fn write_json_to<W: Write>(output: &mut W, json_str: &str) -> CliResult<()> {
    writeln!(output, "{}", json_str)?;
    output.flush()?;
    Ok(())
}

pub fn write_json(json_str: &str) -> CliResult<()> {
    write_json_to(&mut io::stdout().lock(), json_str)
}

/// Writes `{"status":"ok","data":...}` to stdout.
pub fn write_response<T: Serialize>(data: T) -> CliResult<()> {
    let response = json!({
        "status": "ok",
        "data": serde_json::to_value(data)?,
    });
    write_json(&response.to_string())
}
