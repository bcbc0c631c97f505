// src/commands/open.rs
use anyhow::{Context, Result};
use std::process::Command;
use tracing::debug;

use crate::git::web_url;

use super::open_repo;

#[cfg(target_os = "macos")]
const OPENER: &str = "open";
#[cfg(target_os = "windows")]
const OPENER: &str = "explorer";
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const OPENER: &str = "xdg-open";

pub fn cmd_open() -> Result<()> {
    let repo = open_repo()?;
    let remote = repo.git.remote_url().context("No 'origin' remote configured")?;
    let url = web_url(&remote)
        .with_context(|| format!("Cannot derive a web URL from '{}'", remote))?;

    println!("{}", url);
    if let Err(e) = Command::new(OPENER).arg(&url).spawn() {
        debug!("Could not launch {}: {}", OPENER, e);
    }
    Ok(())
}
