// src/commands/mod.rs
mod commit;
mod config;
mod end;
mod init;
mod list;
mod open;
mod pause;
mod status;
mod use_work;

pub use commit::{cmd_ai_commit, cmd_commit};
pub use config::cmd_config;
pub use end::cmd_end;
pub use init::cmd_init;
pub use list::cmd_list;
pub use open::cmd_open;
pub use pause::cmd_pause;
pub use status::cmd_status;
pub use use_work::cmd_use;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use dialoguer::Confirm;
use regex_lite::Regex;
use tracing::{debug, warn};

use crate::config::{GlobalConfig, UncommittedMode};
use crate::git::Git;
use crate::workflow::{compile_patterns, Workflow, WorkflowStore};

/// Git runner and workflow store for the repository in the current directory.
pub(crate) struct Repo {
    pub git: Git,
    pub store: WorkflowStore,
}

pub(crate) fn open_repo() -> Result<Repo> {
    let git = Git::cwd()?;
    if !git.is_repo() {
        bail!("Not a git repository");
    }
    let store = WorkflowStore::open(git.dir()).context("Failed to open repository config")?;
    Ok(Repo { git, store })
}

/// Cached remote default branch, refreshed from origin when stale.
pub(crate) fn default_ref_branch(repo: &mut Repo, global: &GlobalConfig) -> String {
    let now = Utc::now();
    match repo.store.cached_default_branch(now) {
        Ok(Some(branch)) => return branch,
        Ok(None) => {}
        Err(e) => warn!("Could not read cached default branch: {}", e),
    }

    match repo.git.remote_default_branch() {
        Some(branch) => {
            if let Err(e) = repo.store.store_default_branch(&branch, now) {
                warn!("Could not cache default branch: {}", e);
            }
            branch
        }
        None => {
            debug!("Remote default branch unavailable, using {}", global.default_branch);
            global.default_branch.clone()
        }
    }
}

pub(crate) fn ignore_patterns(global: &GlobalConfig) -> Result<Vec<Regex>> {
    compile_patterns(&global.commit_ignore_patterns).context("Invalid commit_ignore_patterns")
}

// =============================================================================
// UNCOMMITTED FILES
// =============================================================================
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Verdict {
    Proceed,
    Warn,
    Ask,
    Abort,
}

pub(crate) fn uncommitted_verdict(mode: UncommittedMode, dirty: bool, force: bool) -> Verdict {
    if force || !dirty {
        return Verdict::Proceed;
    }
    match mode {
        UncommittedMode::Disabled => Verdict::Proceed,
        UncommittedMode::Warning => Verdict::Warn,
        UncommittedMode::Interactive => Verdict::Ask,
        UncommittedMode::Fatal => Verdict::Abort,
    }
}

pub(crate) fn check_uncommitted(git: &Git, mode: UncommittedMode, force: bool, action: &str) -> Result<()> {
    if mode == UncommittedMode::Disabled {
        return Ok(());
    }
    if force {
        warn!("Skipping uncommitted files check (force mode)");
        return Ok(());
    }

    let files = git.uncommitted_files()?;
    let verdict = uncommitted_verdict(mode, !files.is_empty(), force);
    if verdict == Verdict::Proceed {
        return Ok(());
    }

    println!("Uncommitted files:");
    for f in &files {
        println!("  {}", f);
    }

    match verdict {
        Verdict::Proceed => Ok(()),
        Verdict::Warn => {
            warn!("Uncommitted files detected");
            Ok(())
        }
        Verdict::Ask => {
            let go = Confirm::new()
                .with_prompt("Continue with uncommitted files?")
                .default(false)
                .interact()
                .context("Failed to read confirmation")?;
            if !go {
                bail!("Operation cancelled by user");
            }
            Ok(())
        }
        Verdict::Abort => bail!(
            "Uncommitted files detected. Please commit or stash changes before {}.",
            action
        ),
    }
}

pub(crate) fn show_summary(wf: &Workflow) {
    println!("\n{}", "=".repeat(50));
    println!("  Workflow:   {}", wf.name);
    println!("  Branch:     {} (from {})", wf.branch, wf.ref_branch);
    println!("  Type:       {} -> {}", wf.branch_type, wf.commit_type);
    if let Some(issue) = wf.issue() {
        println!("  Issue:      {}", issue);
    }
    if !wf.title.is_empty() {
        println!("  Title:      {}", wf.title);
    }
    println!("  Commit:     \"{}\"", wf.commit);
    println!("{}", "=".repeat(50));
}
