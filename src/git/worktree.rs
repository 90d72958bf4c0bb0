use serde::Serialize;
use std::path::PathBuf;

/// One entry of `git worktree list --porcelain`. Read-only projection of git
/// state, rebuilt on every listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Worktree {
    pub path: PathBuf,
    pub branch_ref: Option<String>,
    pub head_commit: String,
    pub locked: bool,
    pub prunable: bool,
    pub detached: bool,
}

impl Worktree {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            branch_ref: None,
            head_commit: String::new(),
            locked: false,
            prunable: false,
            detached: false,
        }
    }

    /// Branch name without the `refs/heads/` prefix.
    pub fn branch_name(&self) -> Option<&str> {
        self.branch_ref
            .as_deref()
            .map(|r| r.strip_prefix("refs/heads/").unwrap_or(r))
    }

    pub fn short_head(&self) -> &str {
        let end = self.head_commit.len().min(8);
        &self.head_commit[..end]
    }
}

/// Parses porcelain output. Records are separated by blank lines; unknown
/// attribute lines are ignored so newer git versions don't break listing.
pub fn parse_worktree_list(output: &str) -> Vec<Worktree> {
    let mut worktrees = Vec::new();
    let mut current: Option<Worktree> = None;

    for line in output.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            if let Some(wt) = current.take() {
                worktrees.push(wt);
            }
            continue;
        }

        let (key, value) = match line.split_once(' ') {
            Some((k, v)) => (k, Some(v)),
            None => (line, None),
        };

        if key == "worktree" {
            if let Some(wt) = current.take() {
                worktrees.push(wt);
            }
            current = value.map(|v| Worktree::new(PathBuf::from(v)));
            continue;
        }

        let Some(wt) = current.as_mut() else {
            continue;
        };

        match key {
            "HEAD" => wt.head_commit = value.unwrap_or_default().to_string(),
            "branch" => wt.branch_ref = value.map(str::to_string),
            "detached" => wt.detached = true,
            "locked" => wt.locked = true,
            "prunable" => wt.prunable = true,
            _ => {}
        }
    }

    if let Some(wt) = current {
        worktrees.push(wt);
    }

    worktrees
}
