// src/commands/use_work.rs
use anyhow::{Context, Result};

use super::{open_repo, show_summary};

pub fn cmd_use(work: &str) -> Result<()> {
    let mut repo = open_repo()?;

    let wf = repo
        .store
        .get(work)
        .with_context(|| format!("Workflow '{}' does not exist, see `workfac list`", work))?;

    println!("Checking out {}...", wf.branch);
    repo.git.checkout(&wf.branch)?;
    repo.git.pull();

    repo.store.set_current(&wf.name)?;
    show_summary(&wf);
    Ok(())
}
