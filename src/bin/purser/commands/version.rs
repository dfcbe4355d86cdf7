//! `purser version` command

use anyhow::Result;
use serde_json::json;

use purser::util::Shell;

pub fn execute(shell: &Shell) -> Result<()> {
    let version = env!("CARGO_PKG_VERSION");

    if shell.is_json() {
        shell.json_event(&json!({
            "reason": "version",
            "name": "purser",
            "version": version,
        }));
    } else {
        println!("purser {}", version);
    }

    Ok(())
}
