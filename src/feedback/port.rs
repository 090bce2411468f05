use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Project-relative file holding the feedback service port.
pub const FEEDBACK_PID_FILE: &str = ".claude/feedback.pid";

#[derive(Debug, Error)]
pub enum FeedbackPortError {
    #[error(".claude/feedback.pid not found")]
    FileNotFound,

    #[error("Invalid port number in .claude/feedback.pid: {0:?}")]
    InvalidFormat(String),

    #[error("Failed to read feedback config file: {0}")]
    ReadFailed(#[source] io::Error),
}

#[derive(Debug)]
pub enum FeedbackPort {
    /// No project selected.
    Absent,
    Ready(u16),
    Unconfigured(FeedbackPortError),
}

impl FeedbackPort {
    #[cfg(test)]
    pub fn port(&self) -> Option<u16> {
        match self {
            FeedbackPort::Ready(port) => Some(*port),
            _ => None,
        }
    }
}

pub fn pid_file_path(project: &Path) -> PathBuf {
    project.join(FEEDBACK_PID_FILE)
}

/// Parse the pid file body. A single trailing `%` (zsh's missing-newline
/// marker, easily copied along with the number) is tolerated.
pub fn parse_port(text: &str) -> Result<u16, FeedbackPortError> {
    let trimmed = text.trim();
    let digits = trimmed.strip_suffix('%').unwrap_or(trimmed);

    match digits.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(FeedbackPortError::InvalidFormat(trimmed.to_string())),
    }
}

pub fn resolve(project: Option<&Path>) -> FeedbackPort {
    let Some(project) = project else {
        return FeedbackPort::Absent;
    };

    let path = pid_file_path(project);
    let content = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("No feedback pid file at {}", path.display());
            return FeedbackPort::Unconfigured(FeedbackPortError::FileNotFound);
        }
        Err(e) => return FeedbackPort::Unconfigured(FeedbackPortError::ReadFailed(e)),
    };

    match parse_port(&content) {
        Ok(port) => FeedbackPort::Ready(port),
        Err(e) => FeedbackPort::Unconfigured(e),
    }
}

pub fn target_url(port: u16) -> String {
    format!("http://127.0.0.1:{}", port)
}
