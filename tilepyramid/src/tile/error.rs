//! Tile error types.

use thiserror::Error;

/// A payload arrived but could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DecodeError {
    message: String,
}

impl DecodeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Terminal failure recorded on a tile.
///
/// Both variants are final: tiles do not retry. Cancellation is not an
/// error and never produces one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TileError {
    /// The provider failed to fetch the payload.
    #[error("{0}")]
    Transport(String),

    /// The payload was fetched but failed format-specific parsing.
    #[error("ParseError: {0}")]
    Decode(#[from] DecodeError),
}

impl TileError {
    pub fn is_transport(&self) -> bool {
        matches!(self, TileError::Transport(_))
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, TileError::Decode(_))
    }
}
