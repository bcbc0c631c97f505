// src/commands/status.rs
use anyhow::Result;

use super::{open_repo, show_summary};

pub fn cmd_status() -> Result<()> {
    let repo = open_repo()?;

    match repo.store.current()? {
        Some(name) => show_summary(&repo.store.get(&name)?),
        None => println!("No current workflow."),
    }

    println!();
    print!("{}", repo.git.status_short()?);
    Ok(())
}
