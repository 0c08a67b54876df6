//! Built-in tool adapters.
//!
//! These tools exercise the executor's tool-invocation contract and cover the
//! common needs of research-style tasks:
//!
//! - **Calculator**: evaluates mathematical expressions (stateless, thread-safe)
//! - **Bash**: sandboxed shell execution confined to a per-run workspace, with
//!   banned-substring filtering, wallclock timeout, and ANSI-scrubbed output
//! - **Code**: sandboxed script execution with timeout, optional memory cap,
//!   and tracking of files the script creates in the workspace
//! - **Web fetch**: HTTP GET with a domain allow-list, response-size cap, and
//!   timeout
//!
//! Tools are independent: a blocked or failing tool reports a structured
//! result into the executor's conversation and never aborts the run.

pub mod bash;
pub mod calculator;
pub mod code;
pub mod web;

pub use bash::{BashSandbox, BashTool, SandboxOutput};
pub use calculator::{Calculator, CalculatorError, CalculatorTool};
pub use code::{CodeSandbox, CodeTool};
pub use web::{WebFetch, WebTool};

use chrono::Utc;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Create a unique workspace directory for one run under `root`.
///
/// The directory is named `<timestamp>_<uuid8>` so concurrent runs sharing a
/// root never collide, and stale workspaces sort chronologically for cleanup.
pub fn create_run_workspace(root: &Path) -> io::Result<PathBuf> {
    let stamp = Utc::now().format("%Y%m%d_%H%M%S");
    let suffix = &Uuid::new_v4().simple().to_string()[..8];
    let dir = root.join(format!("{}_{}", stamp, suffix));
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Strip ANSI escape sequences from captured terminal output.
///
/// Handles CSI sequences (`ESC [ ... final-byte`) and OSC sequences
/// (`ESC ] ... BEL/ST`); other lone escapes drop the ESC and keep the rest.
pub fn strip_ansi(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\u{1b}' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            // CSI: parameters and intermediates, terminated by 0x40..=0x7e.
            Some('[') => {
                chars.next();
                for c in chars.by_ref() {
                    if ('\u{40}'..='\u{7e}').contains(&c) {
                        break;
                    }
                }
            }
            // OSC: terminated by BEL or ESC-backslash.
            Some(']') => {
                chars.next();
                while let Some(c) = chars.next() {
                    if c == '\u{07}' {
                        break;
                    }
                    if c == '\u{1b}' && chars.peek() == Some(&'\\') {
                        chars.next();
                        break;
                    }
                }
            }
            // Two-character escape (e.g. ESC c): swallow the next char.
            Some(_) => {
                chars.next();
            }
            None => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::strip_ansi;

    #[test]
    fn strips_color_codes() {
        assert_eq!(strip_ansi("\u{1b}[31mred\u{1b}[0m plain"), "red plain");
    }

    #[test]
    fn passes_clean_text_through() {
        assert_eq!(strip_ansi("no escapes here"), "no escapes here");
    }

    #[test]
    fn strips_cursor_movement() {
        assert_eq!(strip_ansi("a\u{1b}[2Jb\u{1b}[1;1Hc"), "abc");
    }
}
