use thiserror::Error;

use crate::session::Orientation;

#[derive(Debug, Error)]
pub enum WtmError {
    #[error("Not a git repository (or any of the parent directories)")]
    NotARepository,

    #[error("Operation cancelled: directory {0} already exists")]
    DirectoryConflictCancelled(String),

    #[error("Cannot create {count} {orientation} panes: {reason}")]
    PaneLimitExceeded {
        count: u32,
        orientation: Orientation,
        reason: String,
    },

    #[error("Invalid pane options: {0}")]
    InvalidPaneOptions(String),

    #[error("Refusing to create {0}: repeated or too deeply nested directory creation")]
    PathLoopDetected(String),

    #[error("tmux is not installed or not on PATH")]
    MultiplexerUnavailable,

    #[error("{program} failed: {message}")]
    ExternalCommand {
        program: String,
        message: String,
        stderr: Option<String>,
    },

    #[error(transparent)]
    Unknown(#[from] anyhow::Error),
}

impl WtmError {
    pub fn external(program: &str, message: impl Into<String>, stderr: &[u8]) -> Self {
        let stderr = String::from_utf8_lossy(stderr).trim().to_string();
        Self::ExternalCommand {
            program: program.to_string(),
            message: message.into(),
            stderr: if stderr.is_empty() { None } else { Some(stderr) },
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::DirectoryConflictCancelled(_))
    }

    /// Text printed on stderr at the command boundary.
    pub fn report(&self) -> String {
        match self {
            Self::DirectoryConflictCancelled(_) => "Operation cancelled".to_string(),
            Self::MultiplexerUnavailable => format!(
                "{}\nInstall it with your package manager, e.g. `brew install tmux` or `apt install tmux`",
                self
            ),
            Self::ExternalCommand {
                stderr: Some(stderr),
                ..
            } => format!("{}\n{}", self, stderr),
            Self::Unknown(err) => format!("{:#}", err),
            _ => self.to_string(),
        }
    }
}

pub type WtmResult<T> = std::result::Result<T, WtmError>;
