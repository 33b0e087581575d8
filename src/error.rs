//! Error types for layout validation and registry state.

use crate::ids::{ID_MAX_LEN, PER_PLAYER_ID_MAX_LEN};

/// Validation failures raised while building or parsing a layout.
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("Invalid layout id {0:?} (expected [A-Za-z0-9_-], 2-{ID_MAX_LEN} chars)")]
    InvalidId(String),

    #[error("Invalid icon id {0:?} (expected [A-Za-z0-9_-], 2-{ID_MAX_LEN} chars)")]
    InvalidIconId(String),

    #[error("Row count {0} out of range (1-6)")]
    InvalidRows(usize),

    #[error("Position {position} out of range for layout of size {size}")]
    PositionOutOfRange { position: usize, size: usize },

    #[error("Icon {id:?} has no position")]
    MissingPosition { id: String },

    #[error("Icon id {id:?} already used at position {existing}")]
    DuplicateIconId { id: String, existing: usize },

    #[error("Invalid fill window {start}..={end} for layout of size {size}")]
    InvalidRange { start: usize, end: usize, size: usize },

    #[error("Icon {id:?} has stack count {amount} (expected 1-64)")]
    InvalidStackCount { id: String, amount: i64 },

    #[error("Fillable layout incomplete: missing {0}")]
    IncompleteLayout(&'static str),

    #[error("Page switcher {id:?} at position {position} lies inside the fill window")]
    PageSwitcherConflict { id: String, position: usize },

    #[error("Missing title for main language {0:?}")]
    MissingMainLanguageTitle(String),

    #[error("Icon {id:?}: {reason}")]
    InvalidIcon { id: String, reason: String },

    #[error("Malformed layout source: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Registry state errors; the caller decides whether to retry with another id.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Instance id {0:?} is already registered")]
    DuplicateId(String),

    #[error("Invalid instance id {0:?}")]
    InvalidId(String),

    #[error("Invalid per-player id {0:?} (layout id must be 2-{PER_PLAYER_ID_MAX_LEN} chars)")]
    InvalidPerPlayerId(String),

    #[error("No instance registered as {0:?}")]
    NotFound(String),

    #[error("Registry has been shut down")]
    ShutDown,
}

#[derive(Debug, thiserror::Error)]
pub enum GuiError {
    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}
