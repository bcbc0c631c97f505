// src/commands/init.rs
use anyhow::{bail, Result};
use tracing::info;

use crate::config::Config;
use crate::workflow::{check_standard, derive_workflow, NewWork};

use super::{default_ref_branch, open_repo, show_summary};

pub fn cmd_init(
    config: &Config,
    issue: &str,
    title: &str,
    branch_type: &str,
    commit_type: Option<&str>,
    ref_branch: Option<&str>,
) -> Result<()> {
    let global = &config.global;
    let mut repo = open_repo()?;

    let ref_branch = match ref_branch.filter(|r| !r.is_empty()) {
        Some(r) => r.to_string(),
        None => default_ref_branch(&mut repo, global),
    };

    let wf = derive_workflow(
        &NewWork { issue, title, branch_type, commit_type, ref_branch: &ref_branch },
        global,
    )?;

    check_standard(&wf.commit, &wf.branch, global)?;

    if repo.store.exists(&wf.name)? {
        bail!(
            "Workflow '{}' already exists. To resume it run:\n  workfac use {}",
            wf.name,
            wf.name
        );
    }

    println!("Checking out {}...", ref_branch);
    repo.git.checkout(&ref_branch)?;
    let pulled = repo.git.pull();
    if !pulled.trim().is_empty() {
        info!("Pull: {}", pulled.trim());
    }

    println!("Creating {}...", wf.branch);
    repo.git.checkout(&wf.branch)?;

    repo.store.define(&wf)?;
    repo.store.set_current(&wf.name)?;

    show_summary(&wf);
    Ok(())
}
