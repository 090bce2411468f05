use async_trait::async_trait;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use super::LaunchError;
use crate::output;

/// Everything needed to start the server, fixed before anything is spawned.
#[derive(Debug, Clone)]
pub struct SpawnPlan {
    pub program: String,
    pub script: PathBuf,
    pub cwd: PathBuf,
    pub env: BTreeMap<OsString, OsString>,
    pub port: u16,
    pub workspace: Option<PathBuf>,
}

impl SpawnPlan {
    #[cfg(test)]
    pub fn env_var(&self, key: &str) -> Option<&str> {
        self.env.get(std::ffi::OsStr::new(key)).and_then(|v| v.to_str())
    }

    pub fn access_url(&self) -> String {
        format!("http://localhost:{}", self.port)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitOutcome {
    pub code: u8,
    pub signal: Option<i32>,
}

impl ExitOutcome {
    #[cfg(test)]
    pub fn success() -> Self {
        Self {
            code: 0,
            signal: None,
        }
    }

    pub fn from_status(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return Self {
                code: u8::try_from(code).unwrap_or(1),
                signal: None,
            };
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return Self {
                    code: u8::try_from(128 + signal).unwrap_or(1),
                    signal: Some(signal),
                };
            }
        }

        Self {
            code: 1,
            signal: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

#[async_trait]
pub trait ServerSpawner: Send + Sync {
    /// Run the server described by `plan` to completion.
    async fn run(&self, plan: &SpawnPlan) -> Result<ExitOutcome, LaunchError>;
}

/// Spawns the server as a child process sharing this terminal.
#[derive(Debug, Clone, Default)]
pub struct ProcessSpawner;

#[async_trait]
impl ServerSpawner for ProcessSpawner {
    async fn run(&self, plan: &SpawnPlan) -> Result<ExitOutcome, LaunchError> {
        let mut child = Command::new(&plan.program)
            .arg(&plan.script)
            .current_dir(&plan.cwd)
            .env_clear()
            .envs(&plan.env)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(LaunchError::Spawn)?;

        info!(
            "Spawned {} {} (pid {:?})",
            plan.program,
            plan.script.display(),
            child.id()
        );

        let status = supervise(&mut child).await.map_err(LaunchError::Wait)?;
        let outcome = ExitOutcome::from_status(status);
        debug!("Server exited: {:?}", outcome);
        Ok(outcome)
    }
}

/// Wait for the child, forwarding SIGINT/SIGTERM to it until it exits.
#[cfg(unix)]
async fn supervise(child: &mut Child) -> std::io::Result<ExitStatus> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let pid = child.id();

    loop {
        tokio::select! {
            status = child.wait() => return status,
            _ = sigint.recv() => forward_signal(pid, libc::SIGINT, "SIGINT"),
            _ = sigterm.recv() => forward_signal(pid, libc::SIGTERM, "SIGTERM"),
        }
    }
}

#[cfg(unix)]
fn forward_signal(pid: Option<u32>, signo: libc::c_int, name: &str) {
    output::info("Stopping server...");

    let Some(pid) = pid else {
        debug!("Child already reaped, not forwarding {}", name);
        return;
    };

    info!("Forwarding {} to server (pid {})", name, pid);
    let rc = unsafe { libc::kill(pid as libc::pid_t, signo) };
    if rc != 0 {
        warn!(
            "Failed to forward {} to pid {}: {}",
            name,
            pid,
            std::io::Error::last_os_error()
        );
    }
}

#[cfg(not(unix))]
async fn supervise(child: &mut Child) -> std::io::Result<ExitStatus> {
    let interrupted = tokio::select! {
        status = child.wait() => return status,
        res = tokio::signal::ctrl_c() => res.is_ok(),
    };

    if interrupted {
        output::info("Stopping server...");
        info!("Ctrl+C received, terminating server");
        child.start_kill()?;
    }
    child.wait().await
}
