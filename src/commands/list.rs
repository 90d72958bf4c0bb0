use anyhow::{Context, Result};
use clap::Args as ClapArgs;

use crate::commands::common;
use crate::error::WtmError;
use crate::git::{GitBackend, GitCli, Worktree};
use crate::utils::truncate_path_str;

#[derive(ClapArgs)]
pub struct Args {
    /// Print worktrees as JSON
    #[arg(long)]
    pub json: bool,
}

fn flags(worktree: &Worktree) -> String {
    let mut flags = Vec::new();
    if worktree.detached {
        flags.push("detached");
    }
    if worktree.locked {
        flags.push("locked");
    }
    if worktree.prunable {
        flags.push("prunable");
    }
    flags.join(",")
}

pub async fn execute(args: Args) -> Result<()> {
    let git = GitCli::new(common::current_dir()?);
    if !git.is_repository().await {
        return Err(WtmError::NotARepository.into());
    }
    let worktrees = git.list_worktrees().await?;

    if args.json {
        let json =
            serde_json::to_string_pretty(&worktrees).context("Failed to serialize worktrees")?;
        println!("{}", json);
        return Ok(());
    }

    println!("{:<50} {:<30} {:<9} FLAGS", "PATH", "BRANCH", "HEAD");
    println!("{}", "-".repeat(100));

    for worktree in &worktrees {
        println!(
            "{:<50} {:<30} {:<9} {}",
            truncate_path_str(&worktree.path.to_string_lossy(), 50),
            worktree.branch_name().unwrap_or("(detached)"),
            worktree.short_head(),
            flags(worktree)
        );
    }

    Ok(())
}
