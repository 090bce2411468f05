use anyhow::Result;

use crate::output;

/// Manual stop instructions for `port`.
///
/// `--stop` is advisory: it never signals a process, it only tells the
/// user how to find and kill the one holding the port.
pub fn instructions(port: u16) -> Vec<String> {
    vec![
        format!("Find the process: lsof -ti:{}", port),
        format!("Kill the process: kill -9 $(lsof -ti:{})", port),
    ]
}

pub fn execute(port: u16) -> Result<u8> {
    output::info(format!("Trying to stop the service on port {}...", port));
    output::warn("Stop the service manually (Ctrl+C), or find and kill the process:");
    for line in instructions(port) {
        output::detail(line);
    }
    Ok(0)
}
