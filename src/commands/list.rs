// src/commands/list.rs
use anyhow::Result;

use super::open_repo;

pub fn cmd_list() -> Result<()> {
    let repo = open_repo()?;
    let current = repo.store.current()?;
    let names = repo.store.list()?;

    if names.is_empty() {
        println!("No workflows.");
        return Ok(());
    }

    for name in names {
        let marker = if current.as_deref() == Some(name.as_str()) { "*" } else { " " };
        match repo.store.get(&name) {
            Ok(wf) => println!("{} {}  ({} from {})", marker, name, wf.commit.trim(), wf.ref_branch),
            Err(_) => println!("{} {}  (incomplete)", marker, name),
        }
    }
    Ok(())
}
