use regex::Regex;
use std::sync::OnceLock;

const UNNAMED: &str = "unnamed";

fn session_unsafe_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9_-]").expect("static regex is valid"))
}

/// Directory name used for a branch's worktree.
///
/// Path separators and characters that are unsafe in file names become `-`,
/// so `feature/login` lands in `feature-login`. Leading dots are dropped to
/// keep the result from resolving to `.` or `..`.
pub fn worktree_dir_name(branch_name: &str) -> String {
    let mapped: String = branch_name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c if c.is_whitespace() || c.is_control() => '-',
            c => c,
        })
        .collect();

    let trimmed = mapped.trim_start_matches('.');
    if trimmed.is_empty() {
        UNNAMED.to_string()
    } else {
        trimmed.to_string()
    }
}

/// tmux session name for a branch. tmux rejects `.` and `:` in targets, so
/// anything outside `[A-Za-z0-9_-]` is replaced with `-`.
pub fn session_name_for(branch_name: &str, prefix: Option<&str>) -> String {
    let base = session_unsafe_chars()
        .replace_all(branch_name, "-")
        .into_owned();
    let base = if base.is_empty() {
        UNNAMED.to_string()
    } else {
        base
    };

    match prefix.filter(|p| !p.is_empty()) {
        Some(prefix) => format!(
            "{}-{}",
            session_unsafe_chars().replace_all(prefix, "-"),
            base
        ),
        None => base,
    }
}

/// Truncates a string to max_chars characters, prefixing "..." if truncated.
/// Keeps the tail, which is the informative end of a filesystem path.
pub fn truncate_path_str(s: &str, max_chars: usize) -> String {
    let count = s.chars().count();
    if count <= max_chars {
        s.to_string()
    } else {
        let keep = max_chars.saturating_sub(3);
        let tail: String = s.chars().skip(count - keep).collect();
        format!("...{}", tail)
    }
}
