//! Errors reported by rendering backends.

use thiserror::Error;

/// Failures reported across the engine contract.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// No compatible GPU surface is available.
    #[error("Rendering surface unsupported: {0}")]
    Unsupported(String),

    /// The engine module could not be loaded.
    #[error("Engine module failed to load: {0}")]
    ModuleLoad(String),

    /// The asset could not be fetched.
    #[error("Asset fetch failed: {0}")]
    Network(String),

    /// The asset was fetched but could not be decoded.
    #[error("Asset decode failed: {0}")]
    Decode(String),

    /// The context was already released.
    #[error("Context already disposed")]
    Disposed,

    /// The engine failed while releasing native resources.
    #[error("Engine teardown failed: {0}")]
    Teardown(String),
}
