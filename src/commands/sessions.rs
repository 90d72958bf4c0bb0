use anyhow::Result;

use crate::session::TmuxManager;
use crate::utils::truncate_path_str;

pub async fn execute() -> Result<()> {
    let sessions = TmuxManager::default().list_sessions().await?;

    if sessions.is_empty() {
        println!("No wtm sessions running.");
        return Ok(());
    }

    println!("{:<30} {:<50} CREATED", "SESSION", "WORKTREE");
    println!("{}", "-".repeat(98));

    for session in sessions {
        let created = session
            .created_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "unknown".to_string());

        println!(
            "{:<30} {:<50} {}",
            session.session_name,
            truncate_path_str(&session.worktree_path.to_string_lossy(), 48),
            created
        );
    }

    Ok(())
}
