use anyhow::Result;
use clap::Args as ClapArgs;

use crate::commands::common::{self, TmuxArgs};
use crate::config::Config;
use crate::git::GitCli;
use crate::prompt::AnyPrompter;

#[derive(ClapArgs)]
pub struct Args {
    /// Branch whose worktree the session should open in
    pub branch: String,

    /// Attach without asking when the session already exists
    #[arg(short, long)]
    pub yes: bool,

    #[command(flatten)]
    pub tmux: TmuxArgs,
}

pub async fn execute(mut args: Args, config: Config) -> Result<i32> {
    args.tmux.tmux = true;
    let panes = args.tmux.pane_configuration(&config)?.unwrap_or_default();

    let git = GitCli::new(common::current_dir()?);
    let worktree = common::find_worktree(&git, &args.branch).await?;

    let prompter = AnyPrompter::from_flags(args.yes, None);
    common::open_session(&config, &args.tmux, prompter, &worktree.path, panes).await
}
