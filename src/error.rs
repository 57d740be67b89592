//! Error type shared by the enumerator, the launcher and the server controls.

use std::fmt::{self, Display, Formatter};
use std::io;

/// Failures surfaced to the user as a recoverable notice.
#[derive(Debug)]
pub enum MirrorError {
    /// The tool could not be located on `PATH` and no override was given.
    ToolNotFound { tool: &'static str },
    /// The tool was located but the process could not be created.
    Spawn { tool: &'static str, source: io::Error },
    /// The tool ran but exited with a non-zero status.
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
    /// The tool printed something that is not valid UTF-8.
    Decode { command: String },
    /// A user supplied tool path was rejected.
    InvalidPath { path: String, reason: &'static str },
}

impl Display for MirrorError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            MirrorError::ToolNotFound { tool } => write!(
                f,
                "{} not found in PATH. Please install {} and try again.",
                tool, tool
            ),
            MirrorError::Spawn { tool, source } => {
                write!(f, "Failed to start {}: {}", tool, source)
            }
            MirrorError::CommandFailed {
                command,
                code,
                stderr,
            } => {
                match code {
                    Some(code) => write!(f, "`{}` exited with status {}", command, code)?,
                    None => write!(f, "`{}` was terminated by a signal", command)?,
                }
                if !stderr.trim().is_empty() {
                    write!(f, ": {}", stderr.trim())?;
                }
                Ok(())
            }
            MirrorError::Decode { command } => {
                write!(f, "`{}` produced output that is not valid UTF-8", command)
            }
            MirrorError::InvalidPath { path, reason } => write!(f, "{}: {}", reason, path),
        }
    }
}

impl std::error::Error for MirrorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MirrorError::Spawn { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, MirrorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_failed_includes_trimmed_stderr() {
        let err = MirrorError::CommandFailed {
            command: "adb devices".to_string(),
            code: Some(1),
            stderr: "error: no permissions\n".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "`adb devices` exited with status 1: error: no permissions"
        );
    }

    #[test]
    fn tool_not_found_names_the_tool() {
        let err = MirrorError::ToolNotFound { tool: "scrcpy" };
        assert!(err.to_string().starts_with("scrcpy not found in PATH"));
    }
}
