use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use tracing::warn;

pub const MAX_ATTEMPTS_PER_PATH: u32 = 3;
pub const MAX_PATH_DEPTH: usize = 10;

/// Counts directory-creation attempts per normalized path so a runaway
/// create/rename cycle stops instead of nesting forever.
///
/// One guard is owned per logical batch of creations; a fresh instance starts
/// a new batch.
#[derive(Debug, Default)]
pub struct PathLoopGuard {
    created_path_counts: HashMap<PathBuf, u32>,
}

impl PathLoopGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an attempt on `path`. Returns `false` when the path is nested
    /// deeper than [`MAX_PATH_DEPTH`] or was already attempted
    /// [`MAX_ATTEMPTS_PER_PATH`] times. Rejected attempts are counted too.
    pub fn track(&mut self, path: &Path) -> bool {
        let normalized = normalize_path(path);
        let count = self
            .created_path_counts
            .entry(normalized.clone())
            .or_insert(0);
        let previous = *count;
        *count += 1;

        let depth = path_depth(&normalized);
        if depth > MAX_PATH_DEPTH {
            warn!(
                "Path {} is nested {} levels deep (max {}), refusing to create it",
                normalized.display(),
                depth,
                MAX_PATH_DEPTH
            );
            return false;
        }

        if previous >= MAX_ATTEMPTS_PER_PATH {
            warn!(
                "Path {} was already attempted {} times, possible creation loop",
                normalized.display(),
                previous
            );
            return false;
        }

        true
    }

    #[cfg(test)]
    pub fn attempts(&self, path: &Path) -> u32 {
        self.created_path_counts
            .get(&normalize_path(path))
            .copied()
            .unwrap_or(0)
    }

    #[cfg(test)]
    pub fn reset(&mut self) {
        self.created_path_counts.clear();
    }
}

/// Lexical normalization: drops `.`, folds `..` into its parent and
/// rebuilds the path with platform separators. Does not touch the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(out.components().next_back(), Some(Component::Normal(_)))
                    && out.pop();
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn path_depth(path: &Path) -> usize {
    path.components()
        .filter(|c| matches!(c, Component::Normal(_) | Component::ParentDir))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_three_attempts_then_rejects() {
        let mut guard = PathLoopGuard::new();
        let path = Path::new("/repo/worktrees/feature");

        for attempt in 1..=3 {
            assert!(
                guard.track(path),
                "track: attempt {} should be allowed",
                attempt
            );
        }
        assert!(!guard.track(path), "track: 4th attempt should be rejected");
        assert!(!guard.track(path), "track: later attempts stay rejected");
    }

    #[test]
    fn reset_restarts_the_cycle() {
        let mut guard = PathLoopGuard::new();
        let path = Path::new("/repo/worktrees/feature");
        for _ in 0..4 {
            guard.track(path);
        }

        guard.reset();
        assert_eq!(guard.attempts(path), 0);
        for _ in 0..3 {
            assert!(guard.track(path), "track: should allow 3 attempts after reset");
        }
        assert!(!guard.track(path));
    }

    #[test]
    fn equivalent_spellings_share_a_counter() {
        let mut guard = PathLoopGuard::new();
        assert!(guard.track(Path::new("/repo/worktrees/feature")));
        assert!(guard.track(Path::new("/repo/./worktrees/feature")));
        assert!(guard.track(Path::new("/repo/worktrees/x/../feature")));
        assert!(
            !guard.track(Path::new("/repo//worktrees/feature/")),
            "track: normalized duplicates should count toward the same path"
        );
    }

    #[test]
    fn rejected_attempts_are_counted() {
        let mut guard = PathLoopGuard::new();
        let path = Path::new("/a");
        for _ in 0..5 {
            guard.track(path);
        }
        assert_eq!(guard.attempts(path), 5);
    }

    #[test]
    fn deep_path_rejected_on_first_call() {
        let mut guard = PathLoopGuard::new();
        let deep = Path::new("/a/b/c/d/e/f/g/h/i/j/k");
        assert!(
            !guard.track(deep),
            "track: path with 11 segments should be rejected immediately"
        );
    }

    #[test]
    fn depth_of_ten_is_allowed() {
        let mut guard = PathLoopGuard::new();
        assert!(guard.track(Path::new("/a/b/c/d/e/f/g/h/i/j")));
    }

    #[test]
    fn depth_counts_after_normalization() {
        let mut guard = PathLoopGuard::new();
        assert!(guard.track(Path::new("/a/b/c/d/e/f/g/h/i/j/k/..")));
    }

    #[test]
    fn independent_paths_do_not_interfere() {
        let mut guard = PathLoopGuard::new();
        for _ in 0..3 {
            guard.track(Path::new("/repo/worktrees/a"));
        }
        assert!(guard.track(Path::new("/repo/worktrees/b")));
    }

    #[test]
    fn normalize_path_relative_parent() {
        assert_eq!(normalize_path(Path::new("a/../../b")), PathBuf::from("../b"));
        assert_eq!(normalize_path(Path::new("/../a")), PathBuf::from("/a"));
        assert_eq!(normalize_path(Path::new("./a/./b")), PathBuf::from("a/b"));
    }
}
