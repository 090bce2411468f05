use clap::Parser;
use std::process::ExitCode;
use tracing::warn;

mod cli;
mod commands;
mod config;
mod feedback;
mod launcher;
mod logging;
mod output;

use cli::{Action, Cli};
use config::Config;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = cli::exit_code_for(&err);
            let _ = err.print();
            if code != 0 {
                output::info("Run ccui --help for usage");
            }
            return ExitCode::from(code);
        }
    };

    let action = cli.action();
    if action == Action::Version {
        return finish(commands::version::execute());
    }

    let (config, load_error) = Config::load_or_default(None);
    let _log_guard = logging::init(config.log_file.as_deref());
    if let Some(e) = load_error {
        warn!("Using default configuration: {:#}", e);
    }

    for arg in &cli.extra {
        tracing::debug!("Ignoring positional argument {:?}", arg);
    }

    let result = match action {
        Action::Version => commands::version::execute(),
        Action::Config => commands::config::execute(&config),
        Action::Stop => commands::stop::execute(cli.port_or_env().unwrap_or(config.port)),
        Action::FeedbackOpen(project) => commands::feedback::open(project),
        Action::Feedback(project) => commands::feedback::execute(project, &config).await,
        Action::Launch => {
            let port = match cli.launch_port() {
                Ok(port) => port,
                Err(e) => {
                    output::error(e);
                    output::info("Run ccui --help for usage");
                    return ExitCode::from(1);
                }
            };
            commands::launch::execute(port, cli.workspace, config).await
        }
    };

    finish(result)
}

fn finish(result: anyhow::Result<u8>) -> ExitCode {
    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            output::error(format!("Startup failed: {:#}", e));
            ExitCode::from(1)
        }
    }
}
