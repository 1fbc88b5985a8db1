//! Interactive password prompt.
//!
//! The prompt goes to stderr so stdout stays clean for the report. On a
//! terminal the input is read in raw mode and never echoed; when stdin is
//! piped, one line is read as-is.

use std::io::{self, BufRead, IsTerminal, Write};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use tracing::warn;

use crate::error::{Error, Result};

#[derive(Debug, PartialEq, Eq)]
enum KeyOutcome {
    Continue,
    Submit,
    Cancel,
}

fn apply_key(buffer: &mut String, key: &KeyEvent) -> KeyOutcome {
    if key.kind == KeyEventKind::Release {
        return KeyOutcome::Continue;
    }

    match key.code {
        KeyCode::Enter => KeyOutcome::Submit,
        KeyCode::Esc => KeyOutcome::Cancel,
        KeyCode::Char('c') | KeyCode::Char('d')
            if key.modifiers.contains(KeyModifiers::CONTROL) =>
        {
            KeyOutcome::Cancel
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            buffer.clear();
            KeyOutcome::Continue
        }
        KeyCode::Backspace => {
            buffer.pop();
            KeyOutcome::Continue
        }
        KeyCode::Char(c) => {
            buffer.push(c);
            KeyOutcome::Continue
        }
        _ => KeyOutcome::Continue,
    }
}

fn read_hidden_line() -> io::Result<Option<String>> {
    let mut buffer = String::new();
    loop {
        if let Event::Key(key) = event::read()? {
            match apply_key(&mut buffer, &key) {
                KeyOutcome::Continue => {}
                KeyOutcome::Submit => return Ok(Some(buffer)),
                KeyOutcome::Cancel => return Ok(None),
            }
        }
    }
}

/// Ask for the password of `username`.
pub fn prompt_password(username: &str) -> Result<String> {
    let mut stderr = io::stderr().lock();
    write!(stderr, "Password for {} :", username).map_err(Error::PasswordPrompt)?;
    stderr.flush().map_err(Error::PasswordPrompt)?;

    let stdin = io::stdin();
    if !stdin.is_terminal() {
        let mut line = String::new();
        stdin.lock().read_line(&mut line).map_err(Error::PasswordPrompt)?;
        writeln!(stderr).map_err(Error::PasswordPrompt)?;
        return Ok(line.trim_end_matches(['\r', '\n']).to_string());
    }

    enable_raw_mode().map_err(Error::PasswordPrompt)?;
    let entered = read_hidden_line();
    let restored = disable_raw_mode();
    writeln!(stderr).map_err(Error::PasswordPrompt)?;

    finish_hidden_read(entered, restored)
}

/// Outcome of a raw-mode read once the terminal mode has been restored.
///
/// A failed restore fails the prompt even when a password was typed.
fn finish_hidden_read(
    entered: io::Result<Option<String>>,
    restored: io::Result<()>,
) -> Result<String> {
    let entered = entered.map_err(Error::PasswordPrompt)?;

    if let Err(e) = restored {
        warn!("Failed to restore terminal mode after password entry: {}", e);
        return Err(Error::PasswordPrompt(e));
    }

    entered.ok_or_else(|| {
        Error::PasswordPrompt(io::Error::new(
            io::ErrorKind::Interrupted,
            "password entry cancelled",
        ))
    })
}
