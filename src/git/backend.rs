use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use tokio::process::Command;
use tracing::debug;

use super::worktree::{parse_worktree_list, Worktree};
use crate::error::{WtmError, WtmResult};

/// What `worktree add` should check out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchSpec {
    /// `-b <name> [base]`: create the branch while adding the worktree.
    New { name: String, base: Option<String> },
    /// Check out a branch that already exists.
    Existing { name: String },
}

impl BranchSpec {
    pub fn name(&self) -> &str {
        match self {
            BranchSpec::New { name, .. } | BranchSpec::Existing { name } => name,
        }
    }
}

#[async_trait]
pub trait GitBackend: Send + Sync {
    async fn is_repository(&self) -> bool;

    /// Root of the main working tree, even when called from a linked worktree.
    async fn repository_root(&self) -> WtmResult<PathBuf>;

    async fn list_worktrees(&self) -> WtmResult<Vec<Worktree>>;

    async fn list_local_branches(&self) -> WtmResult<Vec<String>>;

    async fn current_branch(&self) -> WtmResult<Option<String>>;

    async fn worktree_add(&self, path: &Path, spec: &BranchSpec) -> WtmResult<()>;

    async fn worktree_remove(&self, path: &Path, force: bool) -> WtmResult<()>;
}

fn path_to_str(path: &Path) -> WtmResult<&str> {
    path.to_str().ok_or_else(|| {
        WtmError::Unknown(anyhow::anyhow!(
            "Path contains non-UTF8 characters: {:?}",
            path
        ))
    })
}

pub fn worktree_add_args<'a>(path: &'a str, spec: &'a BranchSpec) -> Vec<&'a str> {
    let mut args = vec!["worktree", "add"];
    match spec {
        BranchSpec::New { name, base } => {
            args.extend(["-b", name.as_str(), path]);
            if let Some(base) = base {
                args.push(base.as_str());
            }
        }
        BranchSpec::Existing { name } => args.extend([path, name.as_str()]),
    }
    args
}

/// `GitBackend` that shells out to the `git` binary from `cwd`.
#[derive(Clone)]
pub struct GitCli {
    cwd: PathBuf,
}

impl GitCli {
    pub fn new(cwd: PathBuf) -> Self {
        Self { cwd }
    }

    async fn run(&self, args: &[&str]) -> WtmResult<Output> {
        debug!("git {}", args.join(" "));
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.cwd)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => WtmError::ExternalCommand {
                    program: "git".to_string(),
                    message: "git is not installed or not on PATH".to_string(),
                    stderr: None,
                },
                _ => WtmError::Unknown(anyhow::Error::new(e).context("Failed to run git")),
            })?;

        if output.status.success() {
            return Ok(output);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("not a git repository") {
            return Err(WtmError::NotARepository);
        }
        Err(WtmError::external(
            "git",
            format!("git {}", args.join(" ")),
            &output.stderr,
        ))
    }

    async fn run_stdout(&self, args: &[&str]) -> WtmResult<String> {
        let output = self.run(args).await?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

#[async_trait]
impl GitBackend for GitCli {
    async fn is_repository(&self) -> bool {
        self.run(&["rev-parse", "--is-inside-work-tree"]).await.is_ok()
    }

    async fn repository_root(&self) -> WtmResult<PathBuf> {
        let stdout = self
            .run_stdout(&["rev-parse", "--path-format=absolute", "--git-common-dir"])
            .await?;
        let common_dir = PathBuf::from(stdout.trim());
        // A `.git` common dir sits inside the main working tree. Submodules
        // keep theirs under the superproject's `.git/modules/`.
        if common_dir.file_name().map_or(false, |n| n == ".git") {
            if let Some(parent) = common_dir.parent() {
                return Ok(parent.to_path_buf());
            }
        }
        let toplevel = self.run_stdout(&["rev-parse", "--show-toplevel"]).await?;
        Ok(PathBuf::from(toplevel.trim()))
    }

    async fn list_worktrees(&self) -> WtmResult<Vec<Worktree>> {
        let stdout = self.run_stdout(&["worktree", "list", "--porcelain"]).await?;
        Ok(parse_worktree_list(&stdout))
    }

    async fn list_local_branches(&self) -> WtmResult<Vec<String>> {
        let stdout = self
            .run_stdout(&["for-each-ref", "--format=%(refname:short)", "refs/heads/"])
            .await?;
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    async fn current_branch(&self) -> WtmResult<Option<String>> {
        let stdout = self.run_stdout(&["branch", "--show-current"]).await?;
        let branch = stdout.trim();
        Ok(if branch.is_empty() {
            None
        } else {
            Some(branch.to_string())
        })
    }

    async fn worktree_add(&self, path: &Path, spec: &BranchSpec) -> WtmResult<()> {
        let path_str = path_to_str(path)?;
        self.run(&worktree_add_args(path_str, spec)).await?;
        Ok(())
    }

    async fn worktree_remove(&self, path: &Path, force: bool) -> WtmResult<()> {
        let path_str = path_to_str(path)?;
        let mut args = vec!["worktree", "remove"];
        if force {
            args.push("--force");
        }
        args.push(path_str);
        self.run(&args).await?;
        Ok(())
    }
}
