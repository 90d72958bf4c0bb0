use anyhow::Result;
use clap::Args as ClapArgs;

use crate::commands::common::{self, TmuxArgs, WorktreeArgs};
use crate::config::Config;

#[derive(ClapArgs)]
pub struct Args {
    /// Existing local branch to check out
    pub branch: String,

    #[command(flatten)]
    pub worktree: WorktreeArgs,

    #[command(flatten)]
    pub tmux: TmuxArgs,
}

pub async fn execute(args: Args, config: Config) -> Result<i32> {
    let panes = args.tmux.pane_configuration(&config)?;
    let prompter = args.worktree.prompter();

    let mut creator = common::creator(&config, prompter)?;
    let path = creator
        .attach_worktree(&args.branch, args.worktree.skip_dir_check)
        .await?;

    println!("Checked out {} at {}", args.branch, path.display());

    match panes {
        Some(panes) => common::open_session(&config, &args.tmux, prompter, &path, panes).await,
        None => Ok(0),
    }
}
