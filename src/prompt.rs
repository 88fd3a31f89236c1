//! Stdin line prompts and text-command parsing.
//!
//! Confirmations and scene names are entered on a plain line prompt
//! outside the preview surface. Text-command input mode reuses the same
//! stdin handling for a full command REPL, dispatching on the first
//! letter of each line.

use crate::controller::Action;
use std::io::{self, BufRead, Write};

/// Read one line from stdin, optionally printing a prompt first.
///
/// Returns `Ok(None)` on EOF so callers can wind down cleanly.
pub fn read_line(prompt: &str) -> io::Result<Option<String>> {
    if !prompt.is_empty() {
        print!("{}", prompt);
        // Flush to ensure the prompt is visible before reading
        io::stdout().flush()?;
    }

    let mut line = String::new();
    let bytes = io::stdin().lock().read_line(&mut line)?;
    if bytes == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Ask a yes/no question; anything that doesn't start with 'y' (or an
/// empty answer, or EOF) counts as no.
pub fn confirm(question: &str) -> io::Result<bool> {
    let Some(answer) = read_line(&format!("{} [y/N] ", question))? else {
        return Ok(false);
    };
    Ok(answer.to_lowercase().starts_with('y'))
}

/// Parse a line of text-command input into an [`Action`].
///
/// Dispatch is on the first letter of the first word, matching the
/// original command surface:
/// - `q` quit, `p` preview, `s` save, `v` view, `d` delete, `r` render
/// - `n [name]` - change scene, name prompted for when absent
/// - `a <value>` - set the onion-skin alpha directly
///
/// Empty and unrecognized lines are ignored.
pub fn parse_command(input: &str) -> Option<Action> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    let words: Vec<&str> = trimmed.split_whitespace().collect();
    let first = words[0].chars().next()?.to_ascii_lowercase();

    match first {
        'q' => Some(Action::Quit),
        'p' => Some(Action::Redraw),
        's' => Some(Action::Capture),
        'v' => Some(Action::ViewPrevious),
        'd' => Some(Action::DeleteLast),
        'r' => Some(Action::Render),
        'n' => Some(Action::NewScene(words.get(1).map(|s| s.to_string()))),
        'a' => {
            let Some(value) = words.get(1).and_then(|w| w.parse::<f32>().ok()) else {
                println!("Usage: a <0.0-1.0>");
                return None;
            };
            if !(0.0..=1.0).contains(&value) {
                println!("Alpha must be between 0.0 and 1.0");
                return None;
            }
            Some(Action::SetAlpha(value))
        }
        _ => None,
    }
}
