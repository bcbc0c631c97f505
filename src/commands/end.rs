// src/commands/end.rs
use anyhow::{bail, Result};
use tracing::debug;

use crate::config::Config;
use crate::error::WorkflowError;

use super::{check_uncommitted, open_repo};

pub fn cmd_end(config: &Config, work: Option<&str>, force: bool) -> Result<()> {
    let mut repo = open_repo()?;
    let current = repo.store.current()?;

    let name = match (work.filter(|w| !w.is_empty()), current.as_deref()) {
        (Some(w), _) => w.to_string(),
        (None, Some(c)) => c.to_string(),
        (None, None) => return Err(WorkflowError::NoCurrent.into()),
    };

    if !repo.store.exists(&name)? {
        bail!("No matching workflow for '{}', see `workfac list`", name);
    }
    let wf = repo.store.get(&name)?;

    check_uncommitted(
        &repo.git,
        config.global.uncommitted_files_detection,
        force,
        "ending the workflow",
    )?;

    if repo.git.current_branch() == wf.branch {
        debug!("Leaving {} before deleting it", wf.branch);
        println!("Checking out {}...", wf.ref_branch);
        repo.git.checkout(&wf.ref_branch)?;
        repo.git.pull();
    }

    println!("Deleting branch {}...", wf.branch);
    repo.git.delete_branch(&wf.branch)?;
    repo.store.delete(&name)?;

    println!("Workflow '{}' ended.", name);
    Ok(())
}
