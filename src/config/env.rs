use std::ffi::OsString;

/// Snapshot of the environment variables the UI server consumes.
///
/// `OPENAI_API_KEY` is recorded by presence only so the value can never be
/// echoed back to the terminal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSummary {
    pub port: Option<String>,
    pub work_dir: Option<String>,
    pub default_shell: Option<String>,
    pub single_project: Option<String>,
    pub openai_api_key_set: bool,
}

impl EnvSummary {
    pub fn capture() -> Self {
        Self::from_lookup(|key| std::env::var_os(key))
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|v| v.to_string_lossy().into_owned())
                .filter(|v| !v.is_empty())
        };

        Self {
            port: read("PORT"),
            work_dir: read("CCUI_WORK_DIR"),
            default_shell: read("CCUI_DEFAULT_SHELL"),
            single_project: read("CCUI_SINGLE_PROJECT"),
            openai_api_key_set: read("OPENAI_API_KEY").is_some(),
        }
    }

    /// `(name, display value)` rows for the `--config` report.
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            (
                "PORT",
                self.port.clone().unwrap_or_else(|| "3000 (default)".to_string()),
            ),
            (
                "CCUI_WORK_DIR",
                self.work_dir.clone().unwrap_or_else(|| "not set".to_string()),
            ),
            (
                "CCUI_DEFAULT_SHELL",
                self.default_shell
                    .clone()
                    .unwrap_or_else(|| "false (default)".to_string()),
            ),
            (
                "CCUI_SINGLE_PROJECT",
                self.single_project
                    .clone()
                    .unwrap_or_else(|| "false (default)".to_string()),
            ),
            (
                "OPENAI_API_KEY",
                if self.openai_api_key_set { "set" } else { "not set" }.to_string(),
            ),
        ]
    }
}
