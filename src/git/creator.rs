use clap::ValueEnum;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::backend::{BranchSpec, GitBackend};
use super::loop_guard::PathLoopGuard;
use super::naming::next_available_name;
use crate::error::{WtmError, WtmResult};
use crate::prompt::Prompter;
use crate::utils::worktree_dir_name;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictResolution {
    /// Remove the existing directory and create the worktree in its place
    Delete,
    /// Pick the next free name with a numeric suffix
    Rename,
    /// Abort without touching anything
    Cancel,
}

impl ConflictResolution {
    pub fn label(&self) -> &'static str {
        match self {
            ConflictResolution::Delete => "Delete the existing directory",
            ConflictResolution::Rename => "Use a new name with a numeric suffix",
            ConflictResolution::Cancel => "Cancel",
        }
    }
}

/// Target directory that already existed before `worktree add`.
#[derive(Debug, Clone)]
pub struct DirectoryConflict {
    pub desired_path: PathBuf,
    pub desired_branch_name: String,
    pub resolution: Option<ConflictResolution>,
}

impl DirectoryConflict {
    pub fn new(desired_path: PathBuf, desired_branch_name: String) -> Self {
        Self {
            desired_path,
            desired_branch_name,
            resolution: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    NewBranch,
    ExistingBranch,
}

/// Creates worktrees under `<repo root>/<worktrees_dir>/<sanitized branch>`,
/// resolving pre-existing directories before handing off to git.
pub struct WorktreeCreator<G: GitBackend, P: Prompter> {
    git: G,
    prompter: P,
    worktrees_dir: PathBuf,
    default_base_branch: Option<String>,
    guard: PathLoopGuard,
}

impl<G: GitBackend, P: Prompter> WorktreeCreator<G, P> {
    pub fn new(git: G, prompter: P, worktrees_dir: PathBuf) -> Self {
        Self {
            git,
            prompter,
            worktrees_dir,
            default_base_branch: None,
            guard: PathLoopGuard::new(),
        }
    }

    pub fn with_default_base_branch(mut self, base: Option<String>) -> Self {
        self.default_base_branch = base;
        self
    }

    #[cfg(test)]
    pub fn with_guard(mut self, guard: PathLoopGuard) -> Self {
        self.guard = guard;
        self
    }

    #[cfg(test)]
    pub fn guard_mut(&mut self) -> &mut PathLoopGuard {
        &mut self.guard
    }

    pub async fn worktrees_root(&self) -> WtmResult<PathBuf> {
        let repo_root = self.git.repository_root().await?;
        Ok(if self.worktrees_dir.is_absolute() {
            self.worktrees_dir.clone()
        } else {
            repo_root.join(&self.worktrees_dir)
        })
    }

    /// New branch `branch_name` forked from `base_branch`, falling back to the
    /// configured default and then the current branch.
    pub async fn create_worktree(
        &mut self,
        branch_name: &str,
        base_branch: Option<&str>,
        skip_directory_check: bool,
    ) -> WtmResult<PathBuf> {
        let (branch, path) = self
            .prepare(branch_name, Target::NewBranch, skip_directory_check)
            .await?;

        let base = match base_branch
            .map(str::to_string)
            .or_else(|| self.default_base_branch.clone())
        {
            Some(base) => Some(base),
            None => self.git.current_branch().await?,
        };

        self.add(&path, BranchSpec::New { name: branch, base })
            .await?;
        Ok(path)
    }

    /// Worktree for a branch that already exists. A rename only changes the
    /// directory; the branch checked out stays `existing_branch_name`.
    pub async fn attach_worktree(
        &mut self,
        existing_branch_name: &str,
        skip_directory_check: bool,
    ) -> WtmResult<PathBuf> {
        let (_, path) = self
            .prepare(existing_branch_name, Target::ExistingBranch, skip_directory_check)
            .await?;

        self.add(
            &path,
            BranchSpec::Existing {
                name: existing_branch_name.to_string(),
            },
        )
        .await?;
        Ok(path)
    }

    async fn add(&mut self, path: &Path, spec: BranchSpec) -> WtmResult<()> {
        info!("Adding worktree {} for branch {}", path.display(), spec.name());
        self.git.worktree_add(path, &spec).await
    }

    /// Every candidate path goes through the loop guard before anything is
    /// prompted for or deleted.
    fn check_loop_guard(&mut self, path: &Path) -> WtmResult<()> {
        if self.guard.track(path) {
            Ok(())
        } else {
            Err(WtmError::PathLoopDetected(path.display().to_string()))
        }
    }

    /// Resolves the final branch name and path, handling a directory that is
    /// already in the way.
    async fn prepare(
        &mut self,
        branch_name: &str,
        target: Target,
        skip_directory_check: bool,
    ) -> WtmResult<(String, PathBuf)> {
        let root = self.worktrees_root().await?;
        let mut branch = branch_name.to_string();
        let mut path = root.join(worktree_dir_name(&branch));
        self.check_loop_guard(&path)?;

        if skip_directory_check {
            return Ok((branch, path));
        }

        match self.check_existing(&path, &branch, true).await? {
            None | Some(ConflictResolution::Delete) => {}
            Some(ConflictResolution::Rename) => {
                let renamed = self.alternative_name(&root, &branch).await?;
                info!("Renaming {} to {} to avoid existing directory", branch, renamed);
                path = root.join(worktree_dir_name(&renamed));
                if target == Target::NewBranch {
                    branch = renamed;
                }
                self.check_loop_guard(&path)?;
                // Single re-check; the new name was picked to be free.
                match self.check_existing(&path, &branch, false).await? {
                    None | Some(ConflictResolution::Delete) => {}
                    Some(ConflictResolution::Rename) | Some(ConflictResolution::Cancel) => {
                        return Err(WtmError::DirectoryConflictCancelled(
                            path.display().to_string(),
                        ));
                    }
                }
            }
            Some(ConflictResolution::Cancel) => {
                return Err(WtmError::DirectoryConflictCancelled(
                    path.display().to_string(),
                ));
            }
        }

        Ok((branch, path))
    }

    /// Returns `None` when nothing is in the way. A chosen `Delete` has
    /// already been carried out when this returns.
    async fn check_existing(
        &self,
        path: &Path,
        branch: &str,
        allow_rename: bool,
    ) -> WtmResult<Option<ConflictResolution>> {
        let is_dir = match tokio::fs::metadata(path).await {
            Ok(meta) => meta.is_dir(),
            Err(e) => {
                debug!("stat {} failed ({}), treating as free", path.display(), e);
                false
            }
        };
        if !is_dir {
            return Ok(None);
        }

        let mut conflict = DirectoryConflict::new(path.to_path_buf(), branch.to_string());
        let resolution = self.prompter.resolve_conflict(&conflict, allow_rename).await?;
        conflict.resolution = Some(resolution);
        debug!("Directory conflict resolved: {:?}", conflict);

        if resolution == ConflictResolution::Delete {
            info!("Removing existing directory {}", path.display());
            tokio::fs::remove_dir_all(path).await.map_err(|e| {
                WtmError::Unknown(
                    anyhow::Error::new(e)
                        .context(format!("Failed to remove {}", path.display())),
                )
            })?;
        }

        Ok(conflict.resolution)
    }

    /// Branch names and the branch-like names of directories already under
    /// the worktrees root both count as taken.
    async fn alternative_name(&self, root: &Path, branch: &str) -> WtmResult<String> {
        let mut taken = self.git.list_local_branches().await?;
        if let Ok(mut entries) = tokio::fs::read_dir(root).await {
            while let Ok(Some(entry)) = entries.next_entry().await {
                taken.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        Ok(next_available_name(branch, &taken))
    }
}

#[cfg(test)]
pub(crate) mod mock_git {
    use super::*;
    use crate::git::Worktree;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    #[derive(Clone)]
    pub struct MockGit {
        pub root: PathBuf,
        pub branches: Vec<String>,
        pub current: Option<String>,
        pub current_error: Option<String>,
        pub added: Arc<Mutex<Vec<(PathBuf, BranchSpec)>>>,
        pub add_error: Arc<Mutex<Option<String>>>,
    }

    impl MockGit {
        pub fn new(root: &Path) -> Self {
            Self {
                root: root.to_path_buf(),
                branches: vec!["main".to_string()],
                current: Some("main".to_string()),
                current_error: None,
                added: Arc::new(Mutex::new(Vec::new())),
                add_error: Arc::new(Mutex::new(None)),
            }
        }

        pub fn with_branches(mut self, branches: &[&str]) -> Self {
            self.branches = branches.iter().map(|b| b.to_string()).collect();
            self
        }

        pub fn failing_add(self, stderr: &str) -> Self {
            *self.add_error.lock().unwrap() = Some(stderr.to_string());
            self
        }

        pub fn added(&self) -> Vec<(PathBuf, BranchSpec)> {
            self.added.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GitBackend for MockGit {
        async fn is_repository(&self) -> bool {
            true
        }

        async fn repository_root(&self) -> WtmResult<PathBuf> {
            Ok(self.root.clone())
        }

        async fn list_worktrees(&self) -> WtmResult<Vec<Worktree>> {
            Ok(Vec::new())
        }

        async fn list_local_branches(&self) -> WtmResult<Vec<String>> {
            Ok(self.branches.clone())
        }

        async fn current_branch(&self) -> WtmResult<Option<String>> {
            if let Some(stderr) = &self.current_error {
                return Err(WtmError::external(
                    "git",
                    "branch --show-current",
                    stderr.as_bytes(),
                ));
            }
            Ok(self.current.clone())
        }

        async fn worktree_add(&self, path: &Path, spec: &BranchSpec) -> WtmResult<()> {
            if let Some(stderr) = self.add_error.lock().unwrap().clone() {
                return Err(WtmError::external("git", "worktree add", stderr.as_bytes()));
            }
            self.added
                .lock()
                .unwrap()
                .push((path.to_path_buf(), spec.clone()));
            Ok(())
        }

        async fn worktree_remove(&self, _path: &Path, _force: bool) -> WtmResult<()> {
            Ok(())
        }
    }
}
