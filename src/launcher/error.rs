use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Port {port} is already in use")]
    PortInUse { port: u16 },

    #[error("Server entry script not found: {}", path.display())]
    EntryScriptMissing { path: PathBuf },

    #[error("Failed to start server: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Failed while waiting for server: {0}")]
    Wait(#[source] std::io::Error),
}

impl LaunchError {
    /// Lines telling the user how to get out of this state.
    pub fn remediation(&self) -> Vec<String> {
        match self {
            LaunchError::PortInUse { port } => vec![
                "You can:".to_string(),
                format!(
                    "  1. Use a different port: ccui --port {}",
                    port.checked_add(1).unwrap_or(3001)
                ),
                "  2. Stop the existing service: ccui --stop".to_string(),
                format!("  3. Kill the process manually: kill -9 $(lsof -ti:{})", port),
            ],
            LaunchError::EntryScriptMissing { .. } => vec![
                "Make sure Claude Code UI is installed correctly.".to_string(),
                "Try reinstalling: npm install -g claude-code-ui".to_string(),
                "Or point CCUI_HOME at the installation directory.".to_string(),
            ],
            LaunchError::Spawn(_) => {
                vec!["Check that the configured runtime (default: node) is on PATH.".to_string()]
            }
            LaunchError::Wait(_) => Vec::new(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        1
    }
}
