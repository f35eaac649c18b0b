//! Engine error type.
//!
//! Every variant describes a mutation that was rejected at the boundary. The
//! state the mutation targeted is left exactly as it was.

use crate::doc::ItemId;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    /// Zoom <= 0, non-finite zoom, or a non-finite pan/offset.
    #[error("invalid camera state: {0}")]
    InvalidCamera(String),
    #[error("item not found: {0}")]
    ItemNotFound(ItemId),
    /// A patch or new item carried a value the store refuses to hold.
    #[error("invalid item update: {0}")]
    InvalidPatch(String),
}

impl EngineError {
    /// Stable machine-readable code for surfacing to the host UI.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidCamera(_) => "E_INVALID_CAMERA",
            Self::ItemNotFound(_) => "E_ITEM_NOT_FOUND",
            Self::InvalidPatch(_) => "E_INVALID_PATCH",
        }
    }
}
