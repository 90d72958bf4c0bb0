use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::{checkout, create, list, remove, session};

#[derive(Parser)]
#[command(name = "wtm")]
#[command(about = "Worktree Manager - parallel git worktrees paired with tmux sessions")]
#[command(version)]
pub struct Cli {
    /// Custom config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log subprocess calls and decisions to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a worktree on a new branch
    Create(create::Args),

    /// Create a worktree for an existing branch
    Checkout(checkout::Args),

    /// Open a tmux session for an existing worktree
    Session(session::Args),

    /// List worktrees of the current repository
    List(list::Args),

    /// Remove a worktree and its tmux session
    Remove(remove::Args),

    /// List running wtm tmux sessions
    Sessions,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::ConflictResolution;
    use crate::session::Layout;

    #[test]
    fn parses_create_with_pane_options() {
        let cli = Cli::try_parse_from([
            "wtm",
            "create",
            "feature-x",
            "--base",
            "main",
            "--yes",
            "--tmux-h-panes",
            "4",
            "--tmux-layout",
            "main-vertical",
        ])
        .unwrap();

        match cli.command {
            Commands::Create(args) => {
                assert_eq!(args.branch, "feature-x");
                assert_eq!(args.base.as_deref(), Some("main"));
                assert!(args.worktree.yes);
                assert_eq!(args.tmux.tmux_h_panes, Some(4));
                assert_eq!(args.tmux.tmux_layout, Some(Layout::MainVertical));
            }
            _ => panic!("expected create"),
        }
    }

    #[test]
    fn parses_on_conflict_value() {
        let cli =
            Cli::try_parse_from(["wtm", "checkout", "release", "--on-conflict", "rename"]).unwrap();
        match cli.command {
            Commands::Checkout(args) => {
                assert_eq!(args.worktree.on_conflict, Some(ConflictResolution::Rename))
            }
            _ => panic!("expected checkout"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["wtm", "list", "--json", "-v", "-c", "/tmp/c.yaml"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.yaml")));
    }

    #[test]
    fn rejects_unknown_layout() {
        assert!(Cli::try_parse_from(["wtm", "create", "x", "--tmux-layout", "diagonal"]).is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
