#![forbid(unsafe_code)]

//! Newline-delimited JSON over stdio: one request object per line in, one
//! response envelope per line out. Malformed input answers an error envelope
//! and the loop keeps going; only EOF or an explicit quit ends the session.

use crate::session::Session;
use crate::support::{err, ok, ok_with_warnings, warning_value};
use cq_store::Warning;
use serde_json::{Value, json};
use std::io::{BufRead, BufReader, Write};

pub(crate) fn run_stdio(
    session: &mut Session,
    open_warnings: Vec<Warning>,
) -> Result<(), Box<dyn std::error::Error>> {
    let stdin = std::io::stdin();
    let mut reader = BufReader::new(stdin.lock());
    let mut stdout = std::io::stdout().lock();

    // Startup warnings (journal replay, unreadable mirror files) go out first
    // so the client sees them before issuing commands.
    let ready = ok_with_warnings(
        "session.start",
        json!({ "data_dir": session.store.data_dir().display().to_string() }),
        open_warnings.iter().map(warning_value).collect(),
    );
    write_line(&mut stdout, &ready)?;

    let mut line = String::new();
    loop {
        line.clear();
        let read = reader.read_line(&mut line)?;
        if read == 0 {
            break;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let request: Value = match serde_json::from_str(trimmed) {
            Ok(value) => value,
            Err(parse_err) => {
                let resp = err("?", "INVALID_INPUT", &format!("malformed JSON: {parse_err}"));
                write_line(&mut stdout, &resp)?;
                continue;
            }
        };

        if request.get("cmd").and_then(|v| v.as_str()) == Some("quit") {
            write_line(&mut stdout, &ok("quit", json!({ "bye": true })))?;
            break;
        }

        let response = session.dispatch(&request);
        write_line(&mut stdout, &response)?;
    }
    Ok(())
}

fn write_line(
    stdout: &mut std::io::StdoutLock<'_>,
    value: &Value,
) -> Result<(), Box<dyn std::error::Error>> {
    writeln!(stdout, "{}", serde_json::to_string(value)?)?;
    stdout.flush()?;
    Ok(())
}
