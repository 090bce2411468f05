use anyhow::{Context, Result};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use crate::config::Config;
use crate::feedback::{
    self, FeedbackMonitor, FeedbackPort, FeedbackPortError, FrameLoader, FrameState,
    MonitorSettings,
};
use crate::output;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Choice {
    Retry,
    Open,
    Quit,
}

fn parse_choice(line: &str) -> Option<Choice> {
    match line.trim().to_ascii_lowercase().as_str() {
        "r" | "retry" => Some(Choice::Retry),
        "o" | "open" => Some(Choice::Open),
        "q" | "quit" | "" => Some(Choice::Quit),
        _ => None,
    }
}

/// Shown when a project has no usable feedback port; no load is attempted.
pub fn not_configured_panel(reason: Option<&FeedbackPortError>) -> Vec<String> {
    let reason = reason.map(|e| e.to_string()).unwrap_or_else(|| {
        format!(
            "Create {} in the project root and write the feedback service port into it.",
            feedback::FEEDBACK_PID_FILE
        )
    });

    vec![
        "Feedback service not configured".to_string(),
        reason,
        "Setup:".to_string(),
        format!("  1. Create {} in the project root", feedback::FEEDBACK_PID_FILE),
        "  2. Write the port number into it, e.g. 8080".to_string(),
    ]
}

pub fn failure_panel(port: u16, state: FrameState) -> Vec<String> {
    let reason = match state {
        FrameState::Failed(reason) => reason.description(),
        _ => "unknown failure",
    };

    vec![
        "Feedback service connection failed".to_string(),
        format!(
            "Cannot connect to the feedback service (port: {}): {}. Check that it is running.",
            port, reason
        ),
        format!("Target: {}", feedback::target_url(port)),
    ]
}

fn print_not_configured(reason: Option<&FeedbackPortError>) {
    let panel = not_configured_panel(reason);
    output::warn(&panel[0]);
    for line in &panel[1..] {
        output::detail(line);
    }
}

/// A project that does not exist has no pid file either, so it gets the same
/// not-configured panel.
fn resolve_port(project: &Path) -> Option<u16> {
    let project = project
        .canonicalize()
        .unwrap_or_else(|_| project.to_path_buf());

    match feedback::resolve(Some(&project)) {
        FeedbackPort::Ready(port) => Some(port),
        FeedbackPort::Unconfigured(reason) => {
            print_not_configured(Some(&reason));
            None
        }
        FeedbackPort::Absent => {
            print_not_configured(None);
            None
        }
    }
}

pub async fn execute(project: PathBuf, config: &Config) -> Result<u8> {
    let Some(port) = resolve_port(&project) else {
        return Ok(1);
    };

    let mut monitor = FeedbackMonitor::new(MonitorSettings::from_config(&config.feedback))
        .context("Failed to set up the feedback loader")?;
    let interactive = std::io::stdin().is_terminal();
    check(&mut monitor, port, interactive).await
}

async fn check<L: FrameLoader>(
    monitor: &mut FeedbackMonitor<L>,
    port: u16,
    interactive: bool,
) -> Result<u8> {
    output::info(format!(
        "Loading feedback service at {}...",
        feedback::target_url(port)
    ));
    monitor.select_port(Some(port));

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let state = monitor.wait_for_outcome().await;
        if state == FrameState::Loaded {
            output::success(format!(
                "Feedback service is up: {}",
                feedback::target_url(port)
            ));
            return Ok(0);
        }

        let panel = failure_panel(port, state);
        output::error(&panel[0]);
        for line in &panel[1..] {
            output::detail(line);
        }

        if !interactive {
            return Ok(1);
        }

        loop {
            output::detail("[r] Reconnect  [o] Open in new window  [q] Quit");
            let Some(line) = stdin.next_line().await? else {
                return Ok(1);
            };
            match parse_choice(&line) {
                Some(Choice::Retry) => {
                    output::info("Reconnecting...");
                    monitor.retry();
                    break;
                }
                Some(Choice::Open) => {
                    if let Some(url) = monitor.detector().escape_url() {
                        if let Err(e) = feedback::open_in_browser(&url) {
                            warn!("Failed to open browser: {}", e);
                            output::error(format!(
                                "Could not open a browser, visit {} manually",
                                url
                            ));
                        }
                    }
                }
                Some(Choice::Quit) => return Ok(1),
                None => continue,
            }
        }
    }
}

pub fn open(project: PathBuf) -> Result<u8> {
    let Some(port) = resolve_port(&project) else {
        return Ok(1);
    };

    let url = feedback::target_url(port);
    feedback::open_in_browser(&url)
        .with_context(|| format!("Failed to open {} in a browser", url))?;
    output::success(format!("Opened {}", url));
    Ok(0)
}
