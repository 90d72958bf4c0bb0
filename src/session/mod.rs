mod assistant;
mod orchestrator;
mod panes;
mod tmux;

pub use orchestrator::{SessionOrchestrator, SessionOutcome, SessionRequest};
pub use panes::{get_pane_configuration, Layout, Orientation, PaneConfiguration, PaneOptions};
pub use tmux::{AttachOutcome, TmuxBackend, TmuxManager};
