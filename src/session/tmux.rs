use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use tokio::process::Command;
use tracing::debug;

use super::panes::{Layout, Orientation};
use crate::error::{WtmError, WtmResult};

pub const ENV_WORKTREE_PATH: &str = "WTM_WORKTREE_PATH";
pub const ENV_CREATED_AT: &str = "WTM_CREATED_AT";

#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub session_name: String,
    pub worktree_path: PathBuf,
    pub created_at: Option<DateTime<Utc>>,
}

/// Result of handing the terminal to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachOutcome {
    /// The terminal now shows the session; this process has nothing left to do.
    Replaced,
    /// The attach client ran as a child and exited.
    Completed { exit_code: i32 },
}

/// How `attach` reaches the session, detected once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachStrategy {
    /// Already inside tmux: `switch-client`.
    SwitchClient,
    /// Replace this process with `tmux attach-session`.
    Exec,
    /// Run `tmux attach-session` as a child and wait for it.
    Spawn,
}

impl AttachStrategy {
    pub fn detect() -> Self {
        Self::from_env(std::env::var_os("TMUX").is_some())
    }

    fn from_env(inside_tmux: bool) -> Self {
        if inside_tmux {
            AttachStrategy::SwitchClient
        } else if cfg!(unix) {
            AttachStrategy::Exec
        } else {
            AttachStrategy::Spawn
        }
    }
}

#[async_trait]
pub trait TmuxBackend: Send + Sync {
    async fn has_session(&self, name: &str) -> WtmResult<bool>;

    async fn new_session(&self, name: &str, cwd: &Path) -> WtmResult<()>;

    async fn split_window(&self, name: &str, orientation: Orientation, cwd: &Path)
        -> WtmResult<()>;

    async fn select_layout(&self, name: &str, layout: Layout) -> WtmResult<()>;

    async fn set_env(&self, name: &str, key: &str, value: &str) -> WtmResult<()>;

    async fn send_keys(&self, name: &str, pane: u32, keys: &str) -> WtmResult<()>;

    async fn send_keys_with_enter(&self, name: &str, pane: u32, keys: &str) -> WtmResult<()> {
        self.send_keys(name, pane, keys).await?;
        self.send_keys(name, pane, "Enter").await
    }

    async fn kill_session(&self, name: &str) -> WtmResult<()>;

    async fn attach(&self, name: &str) -> WtmResult<AttachOutcome>;
}

/// `TmuxBackend` that shells out to the `tmux` binary.
#[derive(Clone)]
pub struct TmuxManager {
    attach_strategy: AttachStrategy,
    program: PathBuf,
}

impl Default for TmuxManager {
    fn default() -> Self {
        Self::new(AttachStrategy::detect())
    }
}

/// Exact-match target, so `feature` never resolves to `feature-2`.
fn exact(name: &str) -> String {
    format!("={}", name)
}

fn window_target(name: &str) -> String {
    format!("={}:", name)
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

impl TmuxManager {
    pub fn new(attach_strategy: AttachStrategy) -> Self {
        Self {
            attach_strategy,
            program: PathBuf::from("tmux"),
        }
    }

    #[cfg(test)]
    fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    async fn output(&self, args: &[&str]) -> WtmResult<Output> {
        debug!("tmux {}", args.join(" "));
        Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => WtmError::MultiplexerUnavailable,
                _ => WtmError::Unknown(anyhow::Error::new(e).context("Failed to run tmux")),
            })
    }

    async fn run(&self, args: &[&str]) -> WtmResult<()> {
        let output = self.output(args).await?;
        if output.status.success() {
            return Ok(());
        }
        Err(WtmError::external(
            "tmux",
            format!("tmux {}", args.first().copied().unwrap_or_default()),
            &output.stderr,
        ))
    }

    async fn get_env(&self, name: &str, key: &str) -> WtmResult<Option<String>> {
        let output = self
            .output(&["show-environment", "-t", &exact(name), key])
            .await?;
        if !output.status.success() {
            return Ok(None);
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout
            .strip_prefix(&format!("{}=", key))
            .map(|v| v.trim().to_string()))
    }

    /// Sessions created by wtm, recognised by their worktree env marker.
    pub async fn list_sessions(&self) -> WtmResult<Vec<SessionInfo>> {
        let output = self
            .output(&["list-sessions", "-F", "#{session_name}"])
            .await?;
        if !output.status.success() {
            // "no server running" is just an empty list.
            return Ok(Vec::new());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut sessions = Vec::new();
        for name in stdout.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let Some(worktree_path) = self.get_env(name, ENV_WORKTREE_PATH).await? else {
                continue;
            };
            let created_at = self
                .get_env(name, ENV_CREATED_AT)
                .await?
                .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                .map(|dt| dt.with_timezone(&Utc));

            sessions.push(SessionInfo {
                session_name: name.to_string(),
                worktree_path: PathBuf::from(worktree_path),
                created_at,
            });
        }
        Ok(sessions)
    }

    async fn attach_spawned(&self, name: &str) -> WtmResult<AttachOutcome> {
        let mut child = Command::new(&self.program)
            .args(["attach-session", "-t", &exact(name)])
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => WtmError::MultiplexerUnavailable,
                _ => WtmError::Unknown(anyhow::Error::new(e).context("Failed to attach")),
            })?;

        // The child shares our process group and receives terminal signals
        // itself; swallow them here so we outlive it and report its status.
        loop {
            tokio::select! {
                status = child.wait() => {
                    let status = status.map_err(|e| WtmError::Unknown(e.into()))?;
                    return Ok(AttachOutcome::Completed {
                        exit_code: status.code().unwrap_or(1),
                    });
                }
                _ = tokio::signal::ctrl_c() => {
                    debug!("Interrupt received, waiting for tmux client to exit");
                }
            }
        }
    }

    #[cfg(unix)]
    fn attach_exec(&self, name: &str) -> WtmResult<AttachOutcome> {
        use std::os::unix::process::CommandExt;

        // exec only returns on failure.
        let err = std::process::Command::new(&self.program)
            .args(["attach-session", "-t", &exact(name)])
            .exec();
        Err(match err.kind() {
            ErrorKind::NotFound => WtmError::MultiplexerUnavailable,
            _ => WtmError::Unknown(anyhow::Error::new(err).context("Failed to exec tmux")),
        })
    }
}

#[async_trait]
impl TmuxBackend for TmuxManager {
    async fn has_session(&self, name: &str) -> WtmResult<bool> {
        let output = self.output(&["has-session", "-t", &exact(name)]).await?;
        Ok(output.status.success())
    }

    async fn new_session(&self, name: &str, cwd: &Path) -> WtmResult<()> {
        self.run(&["new-session", "-d", "-s", name, "-c", &path_arg(cwd)])
            .await
    }

    async fn split_window(
        &self,
        name: &str,
        orientation: Orientation,
        cwd: &Path,
    ) -> WtmResult<()> {
        self.run(&[
            "split-window",
            orientation.split_flag(),
            "-t",
            &window_target(name),
            "-c",
            &path_arg(cwd),
        ])
        .await
    }

    async fn select_layout(&self, name: &str, layout: Layout) -> WtmResult<()> {
        self.run(&[
            "select-layout",
            "-t",
            &window_target(name),
            layout.as_tmux_name(),
        ])
        .await
    }

    async fn set_env(&self, name: &str, key: &str, value: &str) -> WtmResult<()> {
        self.run(&["set-environment", "-t", &exact(name), key, value])
            .await
    }

    async fn send_keys(&self, name: &str, pane: u32, keys: &str) -> WtmResult<()> {
        self.run(&[
            "send-keys",
            "-t",
            &format!("{}.{}", window_target(name), pane),
            keys,
        ])
        .await
    }

    async fn kill_session(&self, name: &str) -> WtmResult<()> {
        self.run(&["kill-session", "-t", &exact(name)]).await
    }

    async fn attach(&self, name: &str) -> WtmResult<AttachOutcome> {
        match self.attach_strategy {
            AttachStrategy::SwitchClient => {
                self.run(&["switch-client", "-t", &exact(name)]).await?;
                Ok(AttachOutcome::Replaced)
            }
            #[cfg(unix)]
            AttachStrategy::Exec => self.attach_exec(name),
            #[cfg(not(unix))]
            AttachStrategy::Exec => self.attach_spawned(name).await,
            AttachStrategy::Spawn => self.attach_spawned(name).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_inside_tmux_switches_client() {
        assert_eq!(
            AttachStrategy::from_env(true),
            AttachStrategy::SwitchClient,
            "AttachStrategy: $TMUX set should switch the existing client"
        );
    }

    #[cfg(unix)]
    #[test]
    fn strategy_outside_tmux_execs_on_unix() {
        assert_eq!(AttachStrategy::from_env(false), AttachStrategy::Exec);
    }

    #[test]
    fn targets_are_exact_matches() {
        assert_eq!(exact("feature"), "=feature");
        assert_eq!(window_target("feature"), "=feature:");
    }

    #[cfg(unix)]
    fn stand_in_tmux(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("tmux");
        std::fs::write(&script, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn spawned_attach_reports_child_exit_code() {
        let tmp = tempfile::tempdir().unwrap();
        let args_file = tmp.path().join("args");
        let script = stand_in_tmux(
            tmp.path(),
            &format!("echo \"$@\" > '{}'\nexit 7", args_file.display()),
        );
        let manager = TmuxManager::new(AttachStrategy::Spawn).with_program(script);

        let outcome = manager.attach("feature").await.unwrap();

        assert_eq!(
            outcome,
            AttachOutcome::Completed { exit_code: 7 },
            "attach: spawned client exit code should be passed through"
        );
        assert_eq!(
            std::fs::read_to_string(&args_file).unwrap().trim(),
            "attach-session -t =feature"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn spawned_attach_success_is_exit_zero() {
        let tmp = tempfile::tempdir().unwrap();
        let script = stand_in_tmux(tmp.path(), "exit 0");
        let manager = TmuxManager::new(AttachStrategy::Spawn).with_program(script);

        assert_eq!(
            manager.attach("feature").await.unwrap(),
            AttachOutcome::Completed { exit_code: 0 }
        );
    }

    #[tokio::test]
    async fn missing_binary_is_multiplexer_unavailable() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = TmuxManager::new(AttachStrategy::Spawn)
            .with_program(tmp.path().join("no-such-tmux"));

        assert!(matches!(
            manager.attach("feature").await,
            Err(WtmError::MultiplexerUnavailable)
        ));
        assert!(matches!(
            manager.has_session("feature").await,
            Err(WtmError::MultiplexerUnavailable)
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failed_command_surfaces_stderr() {
        let tmp = tempfile::tempdir().unwrap();
        let script = stand_in_tmux(tmp.path(), "echo 'no space for new pane' >&2\nexit 1");
        let manager = TmuxManager::new(AttachStrategy::Spawn).with_program(script);

        let err = manager
            .split_window("feature", Orientation::Horizontal, tmp.path())
            .await
            .unwrap_err();
        match err {
            WtmError::ExternalCommand { stderr, .. } => {
                assert_eq!(stderr.as_deref(), Some("no space for new pane"))
            }
            other => panic!("expected ExternalCommand, got {:?}", other),
        }
    }

    #[test]
    fn tmux_manager_keeps_strategy() {
        let manager = TmuxManager::new(AttachStrategy::Spawn);
        assert_eq!(manager.attach_strategy, AttachStrategy::Spawn);
    }
}
