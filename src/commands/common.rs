use anyhow::{bail, Context, Result};
use clap::Args as ClapArgs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::git::{ConflictResolution, GitBackend, GitCli, Worktree, WorktreeCreator};
use crate::prompt::{self, AnyPrompter};
use crate::session::{
    get_pane_configuration, AttachOutcome, Layout, PaneConfiguration, PaneOptions,
    SessionOrchestrator, SessionOutcome, SessionRequest, TmuxManager,
};
use crate::utils::session_name_for;

#[derive(ClapArgs, Debug, Default)]
pub struct WorktreeArgs {
    /// Answer prompts automatically: delete a conflicting directory and attach
    #[arg(short, long)]
    pub yes: bool,

    /// Resolve an existing target directory without asking
    #[arg(long, value_enum)]
    pub on_conflict: Option<ConflictResolution>,

    /// Do not check whether the target directory already exists
    #[arg(long)]
    pub skip_dir_check: bool,
}

impl WorktreeArgs {
    pub fn prompter(&self) -> AnyPrompter {
        AnyPrompter::from_flags(self.yes, self.on_conflict)
    }
}

#[derive(ClapArgs, Debug, Default)]
pub struct TmuxArgs {
    /// Open a tmux session rooted at the worktree
    #[arg(long)]
    pub tmux: bool,

    /// Two side-by-side panes instead of the default stacked pair
    #[arg(long)]
    pub tmux_horizontal: bool,

    /// Number of side-by-side panes (max 10)
    #[arg(long, value_name = "N")]
    pub tmux_h_panes: Option<u32>,

    /// Number of stacked panes (max 15)
    #[arg(long, value_name = "N")]
    pub tmux_v_panes: Option<u32>,

    /// tmux layout applied after splitting
    #[arg(long, value_enum, value_name = "LAYOUT")]
    pub tmux_layout: Option<Layout>,

    /// Leave the session running without attaching to it
    #[arg(long)]
    pub no_attach: bool,

    /// Start the configured AI assistant in the first pane
    #[arg(long)]
    pub assistant: bool,
}

impl TmuxArgs {
    fn requested(&self) -> bool {
        self.tmux
            || self.tmux_horizontal
            || self.tmux_h_panes.is_some()
            || self.tmux_v_panes.is_some()
            || self.tmux_layout.is_some()
            || self.assistant
    }

    /// Pre-flight pane validation. `None` when no session was asked for.
    pub fn pane_configuration(&self, config: &Config) -> Result<Option<PaneConfiguration>> {
        if !self.requested() {
            return Ok(None);
        }
        let options = PaneOptions {
            horizontal: self.tmux_horizontal,
            h_panes: self.tmux_h_panes,
            v_panes: self.tmux_v_panes,
            layout: self.tmux_layout.or(config.tmux.layout),
        };
        Ok(Some(get_pane_configuration(&options)?))
    }
}

pub fn current_dir() -> Result<PathBuf> {
    std::env::current_dir().context("Failed to resolve current directory")
}

pub fn creator(
    config: &Config,
    prompter: AnyPrompter,
) -> Result<WorktreeCreator<GitCli, AnyPrompter>> {
    Ok(WorktreeCreator::new(
        GitCli::new(current_dir()?),
        prompter,
        config.worktrees_dir.clone(),
    )
    .with_default_base_branch(config.default_base_branch.clone()))
}

/// Session name for a worktree, derived from its directory name.
pub fn session_name(config: &Config, worktree_path: &Path) -> String {
    let dir_name = worktree_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    session_name_for(&dir_name, config.session_prefix())
}

pub async fn find_worktree<G: GitBackend>(git: &G, branch: &str) -> Result<Worktree> {
    let worktrees = git.list_worktrees().await?;
    match worktrees
        .into_iter()
        .find(|w| w.branch_name() == Some(branch))
    {
        Some(worktree) => Ok(worktree),
        None => bail!("No worktree found for branch {}", branch),
    }
}

/// Returns the exit code of an attach that ran to completion, 0 otherwise.
pub async fn open_session(
    config: &Config,
    tmux_args: &TmuxArgs,
    prompter: AnyPrompter,
    worktree_path: &Path,
    panes: PaneConfiguration,
) -> Result<i32> {
    let session_name = session_name(config, worktree_path);
    let orchestrator =
        SessionOrchestrator::new(TmuxManager::default(), prompter, prompt::stdio_is_terminal());

    let request = SessionRequest {
        session_name: session_name.clone(),
        worktree_path: worktree_path.to_path_buf(),
        panes,
        interactive_attach: !tmux_args.no_attach,
        startup_command: tmux_args
            .assistant
            .then(|| config.assistant.command.clone()),
    };

    println!("Opening tmux session: {}", session_name);
    let outcome = orchestrator.create_session(&request).await?;

    match outcome {
        SessionOutcome::Created { .. } => {
            println!("Session {} ready ({} panes)", session_name, panes.pane_count)
        }
        SessionOutcome::AlreadyExists { .. } => {
            println!("Session {} already exists", session_name)
        }
    }

    if outcome.attached().is_none() {
        println!("Run 'tmux attach -t {}' to view it", session_name);
    }
    Ok(attach_exit_code(outcome.attached()))
}

fn attach_exit_code(attached: Option<AttachOutcome>) -> i32 {
    match attached {
        Some(AttachOutcome::Completed { exit_code }) => exit_code,
        Some(AttachOutcome::Replaced) | None => 0,
    }
}
