use std::io::{self, Write};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};

/// Restores cooked mode even if reading fails mid-way.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

/// Prompt on stderr and read one line from the terminal without echoing it.
///
/// Esc or Ctrl+C cancel and return an empty string.
pub fn read_hidden(prompt: &str) -> io::Result<String> {
    let mut err = io::stderr();
    write!(err, "{}", prompt)?;
    err.flush()?;

    let mut input = String::new();
    {
        let _guard = RawModeGuard::enable()?;
        loop {
            match event::read()? {
                Event::Key(KeyEvent {
                    code,
                    modifiers,
                    kind: KeyEventKind::Press,
                    ..
                }) => match code {
                    KeyCode::Enter => break,
                    KeyCode::Esc => {
                        input.clear();
                        break;
                    }
                    KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                        input.clear();
                        break;
                    }
                    KeyCode::Backspace => {
                        input.pop();
                    }
                    KeyCode::Char(c) => input.push(c),
                    _ => {}
                },
                Event::Paste(text) => input.push_str(&text),
                _ => {}
            }
        }
    }

    writeln!(err)?;
    Ok(input.trim().to_string())
}
