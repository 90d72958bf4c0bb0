use anyhow::Result;
use clap::Args as ClapArgs;
use std::path::PathBuf;

use crate::commands::common::{self, TmuxArgs, WorktreeArgs};
use crate::config::Config;
use crate::git::{GitBackend, WorktreeCreator};
use crate::prompt::Prompter;
use crate::session::PaneConfiguration;

#[derive(ClapArgs)]
pub struct Args {
    /// Name of the new branch
    pub branch: String,

    /// Branch to fork from (default: config, then the current branch)
    #[arg(short, long)]
    pub base: Option<String>,

    #[command(flatten)]
    pub worktree: WorktreeArgs,

    #[command(flatten)]
    pub tmux: TmuxArgs,
}

pub async fn execute(args: Args, config: Config) -> Result<i32> {
    let prompter = args.worktree.prompter();
    let creator = common::creator(&config, prompter)?;
    let (path, panes) = create_worktree(&args, &config, creator).await?;

    match panes {
        Some(panes) => common::open_session(&config, &args.tmux, prompter, &path, panes).await,
        None => Ok(0),
    }
}

async fn create_worktree<G: GitBackend, P: Prompter>(
    args: &Args,
    config: &Config,
    mut creator: WorktreeCreator<G, P>,
) -> Result<(PathBuf, Option<PaneConfiguration>)> {
    // Reject bad pane options before the worktree exists.
    let panes = args.tmux.pane_configuration(config)?;
    let path = creator
        .create_worktree(
            &args.branch,
            args.base.as_deref(),
            args.worktree.skip_dir_check,
        )
        .await?;

    println!("Created worktree at {}", path.display());
    Ok((path, panes))
}
