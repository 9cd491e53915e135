//! The interactive keyboard-driven front end for `FileClient`.

use crate::client::{FileClient, GetFileOutcome, PutFileOutcome};
use std::io::{self, BufRead, Write};

/// Reads lines from `input` until `exit` or EOF, dispatching each to
/// `client`. The command keyword is case-folded; the filename argument
/// keeps its original case.
pub fn run(client: &mut FileClient, input: impl BufRead) {
    let stdout = io::stdout();
    for line in input.lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };
        let mut parts = line.trim().splitn(2, char::is_whitespace);
        let command = parts.next().unwrap_or("").to_ascii_lowercase();
        let arg = parts.next().unwrap_or("").trim();

        match command.as_str() {
            "" => continue,
            "identify" => match client.identify(arg) {
                Ok(()) => writeln!(stdout.lock(), "identified as {arg}").ok(),
                Err(e) => writeln!(stdout.lock(), "identify failed: {e}").ok(),
            },
            "get" => match client.get_file(arg) {
                Ok(GetFileOutcome::Saved(data)) => match std::fs::write(arg, &data) {
                    Ok(()) => writeln!(stdout.lock(), "saved {} ({} bytes)", arg, data.len()).ok(),
                    Err(e) => writeln!(stdout.lock(), "failed to write {arg}: {e}").ok(),
                },
                Ok(GetFileOutcome::NotFound) => writeln!(stdout.lock(), "{arg}: not found on server").ok(),
                Ok(GetFileOutcome::ServerError) => writeln!(stdout.lock(), "{arg}: server error").ok(),
                Err(e) => writeln!(stdout.lock(), "get failed: {e}").ok(),
            },
            "put" => match std::fs::read(arg) {
                Ok(data) => match client.put_file(arg, &data, 0o644) {
                    Ok(PutFileOutcome::Accepted) => writeln!(stdout.lock(), "uploaded {arg}").ok(),
                    Ok(PutFileOutcome::Rejected) => writeln!(stdout.lock(), "{arg}: rejected by server").ok(),
                    Err(e) => writeln!(stdout.lock(), "put failed: {e}").ok(),
                },
                Err(e) => writeln!(stdout.lock(), "cannot read {arg}: {e}").ok(),
            },
            "clear" => {
                print!("\x1B[2J\x1B[1;1H");
                io::stdout().flush().ok();
                None
            }
            "exit" => return,
            other => writeln!(stdout.lock(), "unknown command: {other}").ok(),
        };
    }
}
