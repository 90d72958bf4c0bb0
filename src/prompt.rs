use anyhow::Context;
use async_trait::async_trait;
use dialoguer::{Confirm, Select};
use std::io::IsTerminal;

use crate::error::WtmResult;
use crate::git::{ConflictResolution, DirectoryConflict};

/// The only two questions the core ever asks.
#[async_trait]
pub trait Prompter: Send + Sync {
    /// `allow_rename` is false on the single re-check after a rename.
    async fn resolve_conflict(
        &self,
        conflict: &DirectoryConflict,
        allow_rename: bool,
    ) -> WtmResult<ConflictResolution>;

    async fn confirm_attach(&self, session_name: &str) -> WtmResult<bool>;
}

pub fn stdio_is_terminal() -> bool {
    std::io::stdin().is_terminal() && std::io::stdout().is_terminal()
}

/// Asks on the terminal through dialoguer. Escape counts as cancel.
#[derive(Debug, Clone, Copy)]
pub struct InteractivePrompter;

#[async_trait]
impl Prompter for InteractivePrompter {
    async fn resolve_conflict(
        &self,
        conflict: &DirectoryConflict,
        allow_rename: bool,
    ) -> WtmResult<ConflictResolution> {
        let mut choices = vec![ConflictResolution::Delete];
        if allow_rename {
            choices.push(ConflictResolution::Rename);
        }
        choices.push(ConflictResolution::Cancel);

        let message = format!(
            "Directory {} for branch {} already exists. What do you want to do?",
            conflict.desired_path.display(),
            conflict.desired_branch_name
        );
        let labels: Vec<&'static str> = choices.iter().map(|c| c.label()).collect();

        let selection = tokio::task::spawn_blocking(move || {
            Select::new()
                .with_prompt(message)
                .items(&labels)
                .default(0)
                .interact_opt()
        })
        .await
        .context("Prompt task panicked")?
        .context("Failed to read conflict resolution")?;

        Ok(selection
            .and_then(|i| choices.get(i).copied())
            .unwrap_or(ConflictResolution::Cancel))
    }

    async fn confirm_attach(&self, session_name: &str) -> WtmResult<bool> {
        let message = format!("Attach to tmux session '{}'?", session_name);
        let answer = tokio::task::spawn_blocking(move || {
            Confirm::new().with_prompt(message).default(true).interact()
        })
        .await
        .context("Prompt task panicked")?
        .context("Failed to read attach confirmation")?;
        Ok(answer)
    }
}

/// Non-interactive answers supplied up front (`--yes`, `--on-conflict`).
#[derive(Debug, Clone, Copy)]
pub struct ForcedPrompter {
    pub conflict: ConflictResolution,
    pub attach: bool,
}

impl ForcedPrompter {
    /// `--yes`: delete on conflict and attach without asking.
    pub fn yes() -> Self {
        Self {
            conflict: ConflictResolution::Delete,
            attach: true,
        }
    }
}

#[async_trait]
impl Prompter for ForcedPrompter {
    async fn resolve_conflict(
        &self,
        _conflict: &DirectoryConflict,
        allow_rename: bool,
    ) -> WtmResult<ConflictResolution> {
        match self.conflict {
            ConflictResolution::Rename if !allow_rename => Ok(ConflictResolution::Cancel),
            other => Ok(other),
        }
    }

    async fn confirm_attach(&self, _session_name: &str) -> WtmResult<bool> {
        Ok(self.attach)
    }
}

/// Chosen once at startup from the CLI flags.
#[derive(Debug, Clone, Copy)]
pub enum AnyPrompter {
    Interactive(InteractivePrompter),
    Forced(ForcedPrompter),
}

impl AnyPrompter {
    pub fn from_flags(yes: bool, on_conflict: Option<ConflictResolution>) -> Self {
        match (yes, on_conflict) {
            (_, Some(conflict)) => AnyPrompter::Forced(ForcedPrompter {
                conflict,
                attach: yes,
            }),
            (true, None) => AnyPrompter::Forced(ForcedPrompter::yes()),
            (false, None) => AnyPrompter::Interactive(InteractivePrompter),
        }
    }
}

#[async_trait]
impl Prompter for AnyPrompter {
    async fn resolve_conflict(
        &self,
        conflict: &DirectoryConflict,
        allow_rename: bool,
    ) -> WtmResult<ConflictResolution> {
        match self {
            AnyPrompter::Interactive(p) => p.resolve_conflict(conflict, allow_rename).await,
            AnyPrompter::Forced(p) => p.resolve_conflict(conflict, allow_rename).await,
        }
    }

    async fn confirm_attach(&self, session_name: &str) -> WtmResult<bool> {
        match self {
            AnyPrompter::Interactive(p) => p.confirm_attach(session_name).await,
            AnyPrompter::Forced(p) => p.confirm_attach(session_name).await,
        }
    }
}
