use chrono::Utc;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use super::assistant::AssistantLauncher;
use super::panes::{Orientation, PaneConfiguration};
use super::tmux::{AttachOutcome, TmuxBackend, ENV_CREATED_AT, ENV_WORKTREE_PATH};
use crate::error::{WtmError, WtmResult};
use crate::prompt::Prompter;

/// tmux stderr fragments that mean the window ran out of room for a split.
const NO_SPACE_MARKERS: [&str; 2] = ["no space for new pane", "pane too small"];

#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub session_name: String,
    pub worktree_path: PathBuf,
    pub panes: PaneConfiguration,
    /// Offer/perform attach when running on a terminal.
    pub interactive_attach: bool,
    /// Typed into the first pane of a newly created session.
    pub startup_command: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Created { attached: Option<AttachOutcome> },
    AlreadyExists { attached: Option<AttachOutcome> },
}

impl SessionOutcome {
    pub fn attached(&self) -> Option<AttachOutcome> {
        match self {
            SessionOutcome::Created { attached } | SessionOutcome::AlreadyExists { attached } => {
                *attached
            }
        }
    }
}

/// Creates (or reuses) a session for a worktree:
/// CheckExisting -> CreateBase -> SplitPanes -> ApplyLayout -> (startup
/// command) -> Attach.
/// An existing session short-circuits to the optional attach prompt.
pub struct SessionOrchestrator<T: TmuxBackend, P: Prompter> {
    tmux: T,
    prompter: P,
    on_terminal: bool,
}

impl<T: TmuxBackend, P: Prompter> SessionOrchestrator<T, P> {
    pub fn new(tmux: T, prompter: P, on_terminal: bool) -> Self {
        Self {
            tmux,
            prompter,
            on_terminal,
        }
    }

    pub async fn create_session(&self, request: &SessionRequest) -> WtmResult<SessionOutcome> {
        let name = request.session_name.as_str();

        if self.tmux.has_session(name).await? {
            info!("tmux session {} already exists, leaving it as is", name);
            let attached = if request.interactive_attach
                && self.on_terminal
                && self.prompter.confirm_attach(name).await?
            {
                Some(self.tmux.attach(name).await?)
            } else {
                None
            };
            return Ok(SessionOutcome::AlreadyExists { attached });
        }

        self.tmux
            .new_session(name, request.worktree_path.as_path())
            .await?;
        if let Err(e) = self.populate(request).await {
            // A half-built session would be kept forever by the check above.
            warn!("Setting up tmux session {} failed, killing it", name);
            if let Err(kill_err) = self.tmux.kill_session(name).await {
                warn!("Failed to kill tmux session {}: {}", name, kill_err);
            }
            return Err(e);
        }

        info!(
            "Created tmux session {} with {} panes",
            name, request.panes.pane_count
        );

        let attached = if request.interactive_attach && self.on_terminal {
            Some(self.tmux.attach(name).await?)
        } else {
            None
        };
        Ok(SessionOutcome::Created { attached })
    }

    /// Tags, splits, lays out and starts the assistant in a freshly created
    /// session.
    async fn populate(&self, request: &SessionRequest) -> WtmResult<()> {
        let name = request.session_name.as_str();
        let cwd = request.worktree_path.as_path();
        self.tmux
            .set_env(name, ENV_WORKTREE_PATH, &cwd.to_string_lossy())
            .await?;
        self.tmux
            .set_env(name, ENV_CREATED_AT, &Utc::now().to_rfc3339())
            .await?;

        let PaneConfiguration {
            pane_count,
            orientation,
            layout,
        } = request.panes;

        for pane in 1..pane_count {
            debug!("Splitting pane {} of {} ({})", pane + 1, pane_count, orientation);
            self.tmux
                .split_window(name, orientation, cwd)
                .await
                .map_err(|e| translate_split_error(e, pane_count, pane, orientation))?;
            // Rebalance so the next split has room.
            self.tmux
                .select_layout(name, orientation.even_layout())
                .await?;
        }

        if let Some(layout) = layout {
            self.tmux.select_layout(name, layout).await?;
        }

        if let Some(command) = &request.startup_command {
            AssistantLauncher::new(&self.tmux, command.as_str())
                .launch(name, cwd)
                .await?;
        }
        Ok(())
    }
}

/// `created` is the number of panes that existed when the split failed.
fn translate_split_error(
    err: WtmError,
    count: u32,
    created: u32,
    orientation: Orientation,
) -> WtmError {
    let cause = match &err {
        WtmError::ExternalCommand {
            stderr: Some(stderr),
            ..
        } if NO_SPACE_MARKERS.iter().any(|m| stderr.contains(m)) => stderr.clone(),
        _ => return err,
    };
    WtmError::PaneLimitExceeded {
        count,
        orientation,
        reason: format!(
            "the window ran out of room after {} panes ({})",
            created, cause
        ),
    }
}

#[cfg(test)]
pub(crate) mod mock_tmux {
    use super::super::panes::{Layout, Orientation};
    use super::*;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    pub struct MockTmux {
        pub existing: Arc<Mutex<Vec<String>>>,
        pub calls: Arc<Mutex<Vec<String>>>,
        pub split_stderr: Arc<Mutex<Option<String>>>,
        pub fail_after_splits: Arc<Mutex<Option<usize>>>,
    }

    impl MockTmux {
        pub fn with_session(self, name: &str) -> Self {
            self.existing.lock().unwrap().push(name.to_string());
            self
        }

        pub fn failing_split(self, after: usize, stderr: &str) -> Self {
            *self.fail_after_splits.lock().unwrap() = Some(after);
            *self.split_stderr.lock().unwrap() = Some(stderr.to_string());
            self
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        pub fn count(&self, prefix: &str) -> usize {
            self.calls().iter().filter(|c| c.starts_with(prefix)).count()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl TmuxBackend for MockTmux {
        async fn has_session(&self, name: &str) -> WtmResult<bool> {
            self.record(format!("has-session {}", name));
            Ok(self.existing.lock().unwrap().iter().any(|s| s == name))
        }

        async fn new_session(&self, name: &str, cwd: &Path) -> WtmResult<()> {
            self.record(format!("new-session {} {}", name, cwd.display()));
            self.existing.lock().unwrap().push(name.to_string());
            Ok(())
        }

        async fn split_window(
            &self,
            name: &str,
            orientation: Orientation,
            cwd: &Path,
        ) -> WtmResult<()> {
            let done = self.count("split-window");
            if let Some(after) = *self.fail_after_splits.lock().unwrap() {
                if done >= after {
                    let stderr = self.split_stderr.lock().unwrap().clone().unwrap_or_default();
                    return Err(WtmError::external("tmux", "tmux split-window", stderr.as_bytes()));
                }
            }
            self.record(format!(
                "split-window {} {} {}",
                orientation.split_flag(),
                name,
                cwd.display()
            ));
            Ok(())
        }

        async fn select_layout(&self, name: &str, layout: Layout) -> WtmResult<()> {
            self.record(format!("select-layout {} {}", name, layout.as_tmux_name()));
            Ok(())
        }

        async fn set_env(&self, name: &str, key: &str, _value: &str) -> WtmResult<()> {
            self.record(format!("set-environment {} {}", name, key));
            Ok(())
        }

        async fn send_keys(&self, name: &str, pane: u32, keys: &str) -> WtmResult<()> {
            self.record(format!("send-keys {}.{} {}", name, pane, keys));
            Ok(())
        }

        async fn kill_session(&self, name: &str) -> WtmResult<()> {
            self.record(format!("kill-session {}", name));
            self.existing.lock().unwrap().retain(|s| s != name);
            Ok(())
        }

        async fn attach(&self, name: &str) -> WtmResult<AttachOutcome> {
            self.record(format!("attach {}", name));
            Ok(AttachOutcome::Completed { exit_code: 0 })
        }
    }
}


#[cfg(test)]
mod property_tests {
    use super::super::panes::{Orientation, PaneConfiguration, MAX_VERTICAL_PANES};
    use super::mock_tmux::MockTmux;
    use super::*;
    use crate::prompt::ForcedPrompter;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn splits_exactly_pane_count_minus_one(count in 1u32..=MAX_VERTICAL_PANES) {
            let tmux = MockTmux::default();
            let orch = SessionOrchestrator::new(tmux.clone(), ForcedPrompter::yes(), false);
            let req = SessionRequest {
                session_name: "prop".to_string(),
                worktree_path: PathBuf::from("/wt/prop"),
                panes: PaneConfiguration {
                    pane_count: count,
                    orientation: Orientation::Vertical,
                    layout: None,
                },
                interactive_attach: false,
                startup_command: None,
            };

            tokio_test::block_on(orch.create_session(&req)).unwrap();
            prop_assert_eq!(tmux.count("split-window") as u32, count - 1);
            prop_assert_eq!(tmux.count("new-session"), 1);
        }
    }
}
