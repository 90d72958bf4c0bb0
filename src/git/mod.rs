mod backend;
mod creator;
mod loop_guard;
mod naming;
mod worktree;

pub use backend::{GitBackend, GitCli};
pub use creator::{ConflictResolution, DirectoryConflict, WorktreeCreator};
pub use worktree::Worktree;

#[cfg(test)]
pub(crate) use creator::mock_git;
