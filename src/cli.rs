use clap::error::ErrorKind;
use clap::Parser;
use std::path::PathBuf;
use tracing::warn;

const AFTER_HELP: &str = "\
Environment variables:
  PORT                  Server port (default: 3000)
  CCUI_WORK_DIR         Default working directory
  CCUI_DEFAULT_SHELL    Switch to the shell tab on startup (true/false)
  CCUI_SINGLE_PROJECT   Disable creating new projects (true/false)
  OPENAI_API_KEY        OpenAI API key (voice transcription)
  CCUI_CONFIG           Config file (default: <config dir>/ccui/config.yaml)
  CCUI_LOG              Log filter, e.g. debug or ccui=trace

Examples:
  ccui                         Start with defaults (port 3000)
  ccui --port 8080             Start on port 8080
  ccui --workspace ~/projects  Start with a working directory
  ccui --feedback .            Check the feedback service of this project

Access URL:
  http://localhost:3000 (or the chosen port)";

#[derive(Parser, Debug)]
#[command(name = "ccui")]
#[command(about = "Claude Code UI - start the local Claude Code web interface")]
#[command(disable_version_flag = true)]
#[command(after_help = AFTER_HELP)]
pub struct Cli {
    /// Show version information
    #[arg(short = 'v', long)]
    pub version: bool,

    /// Server port [env: PORT]
    #[arg(short, long, value_name = "PORT", value_parser = parse_port)]
    pub port: Option<u16>,

    /// Working directory passed to the server
    #[arg(short, long, env = "CCUI_WORK_DIR", value_name = "PATH")]
    pub workspace: Option<PathBuf>,

    /// Show configuration information
    #[arg(long)]
    pub config: bool,

    /// Show how to stop a running service
    #[arg(long)]
    pub stop: bool,

    /// Check that a project's feedback service is reachable
    #[arg(long, value_name = "PROJECT")]
    pub feedback: Option<PathBuf>,

    /// Open a project's feedback service in the browser
    #[arg(long, value_name = "PROJECT")]
    pub feedback_open: Option<PathBuf>,

    /// Ignored positional arguments
    #[arg(hide = true)]
    pub extra: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Version,
    Config,
    Stop,
    FeedbackOpen(PathBuf),
    Feedback(PathBuf),
    Launch,
}

impl Cli {
    /// Terminal actions short-circuit the launch, first match wins.
    pub fn action(&self) -> Action {
        if self.version {
            Action::Version
        } else if self.config {
            Action::Config
        } else if self.stop {
            Action::Stop
        } else if let Some(project) = &self.feedback_open {
            Action::FeedbackOpen(project.clone())
        } else if let Some(project) = &self.feedback {
            Action::Feedback(project.clone())
        } else {
            Action::Launch
        }
    }

    /// Port given on the command line, else a valid `PORT` from the
    /// environment. Used where a bad `PORT` must not block the command.
    pub fn port_or_env(&self) -> Option<u16> {
        self.port.or_else(|| match env_port(std::env::var("PORT").ok().as_deref()) {
            Ok(port) => port,
            Err(e) => {
                warn!("Ignoring PORT: {}", e);
                None
            }
        })
    }

    /// Port for a launch. An invalid `PORT` is an error unless `--port`
    /// overrides it.
    pub fn launch_port(&self) -> Result<Option<u16>, String> {
        self.launch_port_with(std::env::var("PORT").ok().as_deref())
    }

    fn launch_port_with(&self, env_value: Option<&str>) -> Result<Option<u16>, String> {
        match self.port {
            Some(port) => Ok(Some(port)),
            None => env_port(env_value),
        }
    }
}

/// Validate a `PORT` value; unset or empty means no port.
pub fn env_port(value: Option<&str>) -> Result<Option<u16>, String> {
    match value {
        None => Ok(None),
        Some(v) if v.trim().is_empty() => Ok(None),
        Some(v) => parse_port(v)
            .map(Some)
            .map_err(|e| format!("invalid value for PORT: {}", e)),
    }
}

fn parse_port(value: &str) -> Result<u16, String> {
    match value.trim().parse::<u16>() {
        Ok(port) if port >= 1 => Ok(port),
        _ => Err(format!(
            "invalid port number '{}' (expected an integer between 1 and 65535)",
            value
        )),
    }
}

/// Process exit status for a parse failure: help output is a success,
/// everything else exits 1.
pub fn exit_code_for(err: &clap::Error) -> u8 {
    match err.kind() {
        ErrorKind::DisplayHelp
        | ErrorKind::DisplayVersion
        | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => 0,
        _ => 1,
    }
}
