//! Copying article text to the system clipboard.
//!
//! The clipboard is an external program (`xclip` by default) fed through
//! stdin. A failure never touches article state; the viewer reports it as a
//! notice.

use crate::error::ClipboardError;
use std::io::Write;
use std::process::{Command, Stdio};
use tracing::{debug, instrument};

/// Something that can put text on the clipboard.
pub trait ClipboardWriter {
    fn write(&self, text: &str) -> Result<(), ClipboardError>;
}

/// Collapse text to one line: lines are trimmed, blank lines dropped, and
/// what remains is joined with single spaces.
pub fn clipboard_text(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Pipes text into a configured command.
#[derive(Debug, Clone)]
pub struct CommandClipboard {
    program: String,
    args: Vec<String>,
}

impl CommandClipboard {
    /// `command[0]` is the program, the rest its arguments.
    pub fn new(command: &[String]) -> Result<Self, ClipboardError> {
        let (program, args) = command.split_first().ok_or(ClipboardError::NoCommand)?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

impl ClipboardWriter for CommandClipboard {
    #[instrument(level = "debug", skip_all, fields(program = %self.program, bytes = text.len()))]
    fn write(&self, text: &str) -> Result<(), ClipboardError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| ClipboardError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        // stdin is dropped at the end of the match so the child sees EOF
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(text.as_bytes()),
            None => Ok(()),
        };

        // Always reap the child; an early exit explains a failed write.
        let status = child.wait()?;
        if !status.success() {
            return Err(ClipboardError::NonZeroExit {
                program: self.program.clone(),
                status,
            });
        }
        written?;
        debug!("Copied text to clipboard");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_clipboard_text_collapses_blank_lines() {
        let text = "Title\nTime:10:00\n\nFirst para.\n\n  Second para.  \n";
        assert_eq!(clipboard_text(text), "Title Time:10:00 First para. Second para.");
    }

    #[test]
    fn test_empty_command_is_rejected() {
        assert!(matches!(CommandClipboard::new(&[]), Err(ClipboardError::NoCommand)));
    }

    #[test]
    fn test_successful_command() {
        let clipboard = CommandClipboard::new(&command(&["sh", "-c", "cat > /dev/null"])).unwrap();
        assert!(clipboard.write("hello").is_ok());
    }

    #[test]
    fn test_non_zero_exit_is_reported() {
        let clipboard =
            CommandClipboard::new(&command(&["sh", "-c", "cat > /dev/null; exit 3"])).unwrap();
        let err = clipboard.write("hello").unwrap_err();
        match err {
            ClipboardError::NonZeroExit { status, .. } => assert_eq!(status.code(), Some(3)),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_early_exit_reports_status_not_broken_pipe() {
        let clipboard = CommandClipboard::new(&command(&["sh", "-c", "exit 3"])).unwrap();
        let err = clipboard.write(&"x".repeat(1 << 20)).unwrap_err();
        match err {
            ClipboardError::NonZeroExit { status, .. } => assert_eq!(status.code(), Some(3)),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_large_text_is_fully_written() {
        let clipboard = CommandClipboard::new(&command(&["sh", "-c", "cat > /dev/null"])).unwrap();
        assert!(clipboard.write(&"x".repeat(1 << 20)).is_ok());
    }

    #[test]
    fn test_missing_program_is_reported() {
        let clipboard =
            CommandClipboard::new(&command(&["awful-news-reader-no-such-clipboard"])).unwrap();
        assert!(matches!(clipboard.write("hello"), Err(ClipboardError::Spawn { .. })));
    }
}
