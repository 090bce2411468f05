mod error;
mod port_guard;
mod spawner;

pub use error::LaunchError;
pub use port_guard::is_port_free;
pub use spawner::{ExitOutcome, ProcessSpawner, ServerSpawner, SpawnPlan};

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::config::Config;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOptions {
    pub port: u16,
    pub workspace: Option<PathBuf>,
}

impl LaunchOptions {
    /// Combine CLI values (which already fold in `PORT`/`CCUI_WORK_DIR`)
    /// with the config file.
    pub fn resolve(port: Option<u16>, workspace: Option<PathBuf>, config: &Config) -> Self {
        Self {
            port: port.unwrap_or(config.port),
            workspace: workspace.or_else(|| config.workspace.clone()),
        }
    }
}

pub struct Launcher<S: ServerSpawner = ProcessSpawner> {
    config: Config,
    spawner: S,
}

impl Launcher {
    pub fn new(config: Config) -> Self {
        Self::with_spawner(config, ProcessSpawner)
    }
}

impl<S: ServerSpawner> Launcher<S> {
    pub fn with_spawner(config: Config, spawner: S) -> Self {
        Self { config, spawner }
    }

    pub fn prepare(&self, options: &LaunchOptions) -> Result<SpawnPlan, LaunchError> {
        self.prepare_with_env(options, std::env::vars_os())
    }

    /// Check the port, derive the child environment from `base_env` and
    /// resolve the entry script. Nothing is spawned.
    pub fn prepare_with_env<I>(
        &self,
        options: &LaunchOptions,
        base_env: I,
    ) -> Result<SpawnPlan, LaunchError>
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        if !is_port_free(options.port) {
            return Err(LaunchError::PortInUse { port: options.port });
        }

        let mut env: BTreeMap<OsString, OsString> = base_env.into_iter().collect();
        env.insert(OsString::from("PORT"), OsString::from(options.port.to_string()));
        if let Some(workspace) = &options.workspace {
            env.insert(
                OsString::from("CCUI_WORK_DIR"),
                workspace.clone().into_os_string(),
            );
        }

        let script = self.config.server_script();
        if !script.is_file() {
            return Err(LaunchError::EntryScriptMissing { path: script });
        }

        debug!("Prepared spawn of {}", script.display());

        Ok(SpawnPlan {
            program: self.config.runtime.clone(),
            script,
            cwd: self.config.install_dir(),
            env,
            port: options.port,
            workspace: options.workspace.clone(),
        })
    }

    pub async fn run(&self, plan: &SpawnPlan) -> Result<ExitOutcome, LaunchError> {
        info!("Starting server on port {}", plan.port);
        self.spawner.run(plan).await
    }
}
