//! User-facing terminal output.
//!
//! Diagnostics go through `tracing`; these helpers are for the lines the
//! user is meant to read.

use crossterm::style::Stylize;

pub fn info(msg: impl std::fmt::Display) {
    println!("{} {}", "ℹ".blue(), msg);
}

pub fn success(msg: impl std::fmt::Display) {
    println!("{} {}", "✔".green(), msg);
}

pub fn error(msg: impl std::fmt::Display) {
    eprintln!("{} {}", "✖".red(), msg);
}

pub fn warn(msg: impl std::fmt::Display) {
    println!("{} {}", "⚠".yellow(), msg);
}

pub fn title(msg: impl std::fmt::Display) {
    println!("{}", format!("🚀 {}", msg).cyan());
}

/// Indented follow-up line under an `info`/`error` line.
pub fn detail(msg: impl std::fmt::Display) {
    println!("  {}", msg);
}
