use std::path::Path;

use super::tmux::TmuxBackend;
use crate::error::WtmResult;

/// Pane the assistant is started in; the one created with the session.
const ASSISTANT_PANE: u32 = 0;

/// Starts an AI assistant CLI inside a worktree session by typing the command
/// into its first pane.
pub struct AssistantLauncher<'a, T: TmuxBackend> {
    tmux: &'a T,
    command: String,
}

impl<'a, T: TmuxBackend> AssistantLauncher<'a, T> {
    pub fn new(tmux: &'a T, command: impl Into<String>) -> Self {
        Self {
            tmux,
            command: command.into(),
        }
    }

    pub fn command_line(&self, worktree_path: &Path) -> String {
        format!(
            "cd {} && {}",
            shell_single_quote(&worktree_path.display().to_string()),
            self.command
        )
    }

    pub async fn launch(&self, session_name: &str, worktree_path: &Path) -> WtmResult<()> {
        tracing::info!(
            "Launching '{}' in session {}",
            self.command,
            session_name
        );
        self.tmux
            .send_keys_with_enter(session_name, ASSISTANT_PANE, &self.command_line(worktree_path))
            .await
    }
}

fn shell_single_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::orchestrator::mock_tmux::MockTmux;
    use std::path::PathBuf;

    #[test]
    fn command_line_quotes_path() {
        let tmux = MockTmux::default();
        let launcher = AssistantLauncher::new(&tmux, "claude");
        assert_eq!(
            launcher.command_line(&PathBuf::from("/repo/worktrees/it's")),
            "cd '/repo/worktrees/it'\\''s' && claude",
            "command_line: single quotes in the path should be escaped"
        );
    }

    #[tokio::test]
    async fn launch_types_command_then_enter_in_first_pane() {
        let tmux = MockTmux::default();
        let launcher = AssistantLauncher::new(&tmux, "claude --continue");

        launcher
            .launch("feature", &PathBuf::from("/wt/feature"))
            .await
            .unwrap();

        assert_eq!(
            tmux.calls(),
            vec![
                "send-keys feature.0 cd '/wt/feature' && claude --continue".to_string(),
                "send-keys feature.0 Enter".to_string(),
            ],
            "launch: should send the command and then Enter to pane 0"
        );
    }

    #[test]
    fn shell_single_quote_plain() {
        assert_eq!(shell_single_quote("abc"), "'abc'");
    }
}
