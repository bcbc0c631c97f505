// src/commands/pause.rs
use anyhow::Result;

use crate::config::Config;
use crate::workflow::PARAM_REFBRANCH;

use super::{check_uncommitted, open_repo};

pub fn cmd_pause(config: &Config, main_branch: Option<&str>, force: bool) -> Result<()> {
    let mut repo = open_repo()?;
    let current = repo.store.require_current()?;

    let target = match main_branch.filter(|b| !b.is_empty()) {
        Some(b) => b.to_string(),
        None => repo.store.param(&current, PARAM_REFBRANCH)?,
    };

    check_uncommitted(
        &repo.git,
        config.global.uncommitted_files_detection,
        force,
        "pausing the workflow",
    )?;

    println!("Checking out {}...", target);
    repo.git.checkout(&target)?;
    repo.git.pull();

    repo.store.clear_current()?;
    println!("Workflow '{}' paused.", current);
    Ok(())
}
