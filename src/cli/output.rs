//! Command output: plain text or the versioned JSON envelope.

use std::io::Write;

use serde::Serialize;

use crate::http::response::Envelope;

pub const EXIT_OK: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_USAGE: i32 = 2;

/// Write a successful result. Plain mode prints the bare JSON payload.
pub fn write_ok<T: Serialize>(stdout: &mut impl Write, json: bool, payload: &T) -> i32 {
    let rendered = if json {
        serde_json::to_string(&Envelope::ok(payload))
    } else {
        serde_json::to_string(payload)
    };
    match rendered {
        Ok(line) => {
            let _ = writeln!(stdout, "{}", line);
            EXIT_OK
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode output");
            EXIT_FAILURE
        }
    }
}

/// Write a plain line (e.g. a bare txid).
pub fn write_line(stdout: &mut impl Write, line: &str) -> i32 {
    let _ = writeln!(stdout, "{}", line);
    EXIT_OK
}

/// Write a failure. JSON mode puts the envelope on stdout, plain mode puts
/// the message on stderr.
pub fn write_err(
    stdout: &mut impl Write,
    stderr: &mut impl Write,
    json: bool,
    code: &str,
    message: &str,
) -> i32 {
    if json {
        if let Ok(line) = serde_json::to_string(&Envelope::<()>::err(code, message)) {
            let _ = writeln!(stdout, "{}", line);
        }
    } else {
        let message = if message.is_empty() { code } else { message };
        let _ = writeln!(stderr, "{}", message);
    }
    EXIT_FAILURE
}
