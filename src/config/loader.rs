use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    pub load_timeout_secs: u64,
    pub inspect_delay_ms: u64,
    pub error_markers: Vec<String>,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            load_timeout_secs: 10,
            inspect_delay_ms: 1000,
            error_markers: crate::feedback::DEFAULT_ERROR_MARKERS
                .iter()
                .map(|m| m.to_string())
                .collect(),
        }
    }
}

impl FeedbackConfig {
    pub fn load_timeout(&self) -> Duration {
        Duration::from_secs(self.load_timeout_secs)
    }

    pub fn inspect_delay(&self) -> Duration {
        Duration::from_millis(self.inspect_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub port: u16,
    pub workspace: Option<PathBuf>,
    pub runtime: String,
    pub install_dir: Option<PathBuf>,
    pub server_entry: PathBuf,
    pub log_file: Option<PathBuf>,
    pub feedback: FeedbackConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            workspace: None,
            runtime: "node".to_string(),
            install_dir: None,
            server_entry: PathBuf::from("server").join("index.js"),
            log_file: None,
            feedback: FeedbackConfig::default(),
        }
    }
}

impl Config {
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let path = config_path.unwrap_or_else(Self::default_config_path);

        if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            let config: Config = serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Like [`Config::load`], but a broken config file yields the defaults
    /// plus the error, so commands that do not need it keep working.
    pub fn load_or_default(config_path: Option<PathBuf>) -> (Self, Option<anyhow::Error>) {
        match Self::load(config_path) {
            Ok(config) => (config, None),
            Err(e) => (Config::default(), Some(e)),
        }
    }

    pub fn default_config_path() -> PathBuf {
        if let Some(config_path) = std::env::var_os("CCUI_CONFIG") {
            PathBuf::from(config_path)
        } else {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("ccui")
                .join("config.yaml")
        }
    }

    /// Directory the server is installed in.
    ///
    /// Resolution order: `install_dir` from the config file, `$CCUI_HOME`,
    /// then the parent of the directory holding the executable
    /// (`<install>/bin/ccui`).
    pub fn install_dir(&self) -> PathBuf {
        if let Some(dir) = &self.install_dir {
            return dir.clone();
        }
        if let Some(home) = std::env::var_os("CCUI_HOME") {
            return PathBuf::from(home);
        }
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().and_then(Path::parent).map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn server_script(&self) -> PathBuf {
        if self.server_entry.is_absolute() {
            self.server_entry.clone()
        } else {
            self.install_dir().join(&self.server_entry)
        }
    }

    #[cfg(test)]
    pub fn with_install_dir(mut self, dir: PathBuf) -> Self {
        self.install_dir = Some(dir);
        self
    }
}
