use anyhow::Result;
use clap::Args as ClapArgs;

use crate::commands::common;
use crate::config::Config;
use crate::error::WtmError;
use crate::git::{GitBackend, GitCli};
use crate::session::{TmuxBackend, TmuxManager};

#[derive(ClapArgs)]
pub struct Args {
    /// Branch whose worktree should be removed
    pub branch: String,

    /// Remove even with uncommitted changes
    #[arg(short, long)]
    pub force: bool,

    /// Leave the branch's tmux session running
    #[arg(long)]
    pub keep_session: bool,
}

pub async fn execute(args: Args, config: Config) -> Result<()> {
    let git = GitCli::new(common::current_dir()?);
    let worktree = common::find_worktree(&git, &args.branch).await?;

    git.worktree_remove(&worktree.path, args.force).await?;
    println!("Removed worktree {}", worktree.path.display());

    if args.keep_session {
        return Ok(());
    }

    let tmux = TmuxManager::default();
    let session_name = common::session_name(&config, &worktree.path);
    match tmux.has_session(&session_name).await {
        Ok(true) => {
            tmux.kill_session(&session_name).await?;
            println!("Killed tmux session {}", session_name);
        }
        Ok(false) | Err(WtmError::MultiplexerUnavailable) => {}
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
