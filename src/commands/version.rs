use anyhow::Result;

pub fn version_line() -> String {
    format!("Claude Code UI v{}", env!("CARGO_PKG_VERSION"))
}

pub fn execute() -> Result<u8> {
    println!("{}", version_line());
    Ok(0)
}
