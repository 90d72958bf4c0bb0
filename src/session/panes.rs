use clap::ValueEnum;
use serde::Deserialize;
use std::fmt;

use crate::error::{WtmError, WtmResult};

pub const DEFAULT_PANE_COUNT: u32 = 2;
pub const MAX_HORIZONTAL_PANES: u32 = 10;
pub const MAX_VERTICAL_PANES: u32 = 15;

/// Horizontal panes sit side by side (left-right), vertical panes are
/// stacked (top-bottom).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    pub fn max_panes(self) -> u32 {
        match self {
            Orientation::Horizontal => MAX_HORIZONTAL_PANES,
            Orientation::Vertical => MAX_VERTICAL_PANES,
        }
    }

    /// `split-window` flag producing a new pane in this direction.
    pub fn split_flag(self) -> &'static str {
        match self {
            Orientation::Horizontal => "-h",
            Orientation::Vertical => "-v",
        }
    }

    /// Layout that spreads panes evenly in this direction.
    pub fn even_layout(self) -> Layout {
        match self {
            Orientation::Horizontal => Layout::EvenHorizontal,
            Orientation::Vertical => Layout::EvenVertical,
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Horizontal => write!(f, "horizontal"),
            Orientation::Vertical => write!(f, "vertical"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Layout {
    EvenHorizontal,
    EvenVertical,
    MainHorizontal,
    MainVertical,
    Tiled,
}

impl Layout {
    pub fn as_tmux_name(self) -> &'static str {
        match self {
            Layout::EvenHorizontal => "even-horizontal",
            Layout::EvenVertical => "even-vertical",
            Layout::MainHorizontal => "main-horizontal",
            Layout::MainVertical => "main-vertical",
            Layout::Tiled => "tiled",
        }
    }
}

/// Pane flags as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct PaneOptions {
    /// Plain two-pane side-by-side split.
    pub horizontal: bool,
    pub h_panes: Option<u32>,
    pub v_panes: Option<u32>,
    pub layout: Option<Layout>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaneConfiguration {
    pub pane_count: u32,
    pub orientation: Orientation,
    pub layout: Option<Layout>,
}

impl Default for PaneConfiguration {
    fn default() -> Self {
        Self {
            pane_count: DEFAULT_PANE_COUNT,
            orientation: Orientation::Vertical,
            layout: None,
        }
    }
}

/// Fails when `count` panes cannot fit in `orientation`.
pub fn validate_pane_count(count: u32, orientation: Orientation) -> WtmResult<()> {
    let max = orientation.max_panes();
    if count > max {
        return Err(WtmError::PaneLimitExceeded {
            count,
            orientation,
            reason: format!("at most {} fit in a typical terminal", max),
        });
    }
    Ok(())
}

/// Normalizes the CLI flags. Runs before any worktree or session is touched,
/// so every error here leaves the system unchanged.
pub fn get_pane_configuration(options: &PaneOptions) -> WtmResult<PaneConfiguration> {
    let requested = [
        options.horizontal,
        options.h_panes.is_some(),
        options.v_panes.is_some(),
    ]
    .iter()
    .filter(|set| **set)
    .count();

    if requested > 1 {
        return Err(WtmError::InvalidPaneOptions(
            "choose only one of --tmux-horizontal, --tmux-h-panes and --tmux-v-panes"
                .to_string(),
        ));
    }

    let (pane_count, orientation) = match (options.horizontal, options.h_panes, options.v_panes) {
        (true, _, _) => (DEFAULT_PANE_COUNT, Orientation::Horizontal),
        (_, Some(n), _) => (n, Orientation::Horizontal),
        (_, _, Some(n)) => (n, Orientation::Vertical),
        _ => {
            return Ok(PaneConfiguration {
                layout: options.layout,
                ..PaneConfiguration::default()
            })
        }
    };

    if pane_count == 0 {
        return Err(WtmError::InvalidPaneOptions(
            "pane count must be at least 1".to_string(),
        ));
    }
    validate_pane_count(pane_count, orientation)?;

    Ok(PaneConfiguration {
        pane_count,
        orientation,
        layout: options.layout,
    })
}
