use anyhow::Result;
use crossterm::style::Stylize;
use std::path::PathBuf;
use tracing::error;

use crate::config::Config;
use crate::launcher::{LaunchError, LaunchOptions, Launcher, ServerSpawner};
use crate::output;

pub async fn execute(
    port: Option<u16>,
    workspace: Option<PathBuf>,
    config: Config,
) -> Result<u8> {
    let options = LaunchOptions::resolve(port, workspace, &config);
    let launcher = Launcher::new(config);
    run(&launcher, &options).await
}

pub async fn run<S: ServerSpawner>(launcher: &Launcher<S>, options: &LaunchOptions) -> Result<u8> {
    let plan = match launcher.prepare(options) {
        Ok(plan) => plan,
        Err(e) => return Ok(report(&e)),
    };

    output::title("Starting Claude Code UI...");
    output::info(format!("Port: {}", plan.port));
    if let Some(workspace) = &plan.workspace {
        output::info(format!("Workspace: {}", workspace.display()));
    }
    output::info(format!("Install location: {}", plan.cwd.display()));

    println!();
    output::success("Starting server...");
    println!("{}", format!("🌐 Open: {}", plan.access_url()).cyan());
    println!("{}", "💡 Press Ctrl+C to stop the server".yellow());
    println!();

    match launcher.run(&plan).await {
        Ok(outcome) if outcome.is_success() => Ok(0),
        Ok(outcome) => {
            match outcome.signal {
                Some(signal) => error!("Server terminated by signal {}", signal),
                None => error!("Server exited with code {}", outcome.code),
            }
            output::error(format!("Server process exited with code {}", outcome.code));
            Ok(outcome.code)
        }
        Err(e) => Ok(report(&e)),
    }
}

fn report(err: &LaunchError) -> u8 {
    output::error(err);
    for line in err.remediation() {
        output::detail(line);
    }
    err.exit_code()
}
