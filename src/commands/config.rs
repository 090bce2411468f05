use anyhow::Result;
use crossterm::style::Stylize;
use std::fmt::Write;

use crate::config::{Config, EnvSummary};

pub fn render(config: &Config, env: &EnvSummary) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}", "🔧 Claude Code UI configuration".cyan());
    let _ = writeln!(out, "{}", "═".repeat(62));
    let _ = writeln!(out);
    let _ = writeln!(out, "{} {}", "Install location:".white(), config.install_dir().display());
    let _ = writeln!(out, "{} {}", "Server entry:".white(), config.server_script().display());
    let _ = writeln!(out, "{} {}", "Runtime:".white(), config.runtime);
    let _ = writeln!(
        out,
        "{} {}",
        "Config file:".white(),
        Config::default_config_path().display()
    );
    let _ = writeln!(out, "{} {}", "ccui version:".white(), env!("CARGO_PKG_VERSION"));
    let _ = writeln!(
        out,
        "{} {} ({})",
        "Operating system:".white(),
        std::env::consts::OS,
        std::env::consts::FAMILY
    );
    let _ = writeln!(out, "{} {}", "Architecture:".white(), std::env::consts::ARCH);
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", "Environment variables:".white());
    for (name, value) in env.rows() {
        let _ = writeln!(out, "  {}: {}", name, value);
    }

    out
}

pub fn execute(config: &Config) -> Result<u8> {
    print!("{}", render(config, &EnvSummary::capture()));
    Ok(0)
}
