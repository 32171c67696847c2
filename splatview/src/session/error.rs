//! Session error types.

use std::fmt;
use thiserror::Error;

use crate::engine::BackendError;
use crate::surface::SurfaceSize;

/// Why a viewer ended in its error state. Payload of the error callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewerErrorKind {
    /// The scene failed to download or decode.
    AssetLoadFailed,
    /// The engine could not create a rendering context.
    ContextCreationFailed,
    /// The loading watchdog fired before the session settled.
    AcquisitionTimeout,
}

impl ViewerErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewerErrorKind::AssetLoadFailed => "asset-load-failed",
            ViewerErrorKind::ContextCreationFailed => "context-creation-failed",
            ViewerErrorKind::AcquisitionTimeout => "acquisition-timeout",
        }
    }
}

impl fmt::Display for ViewerErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of one acquisition.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SessionError {
    /// The surface had no area when acquisition started.
    #[error("Surface {size} has no area to render into")]
    SurfaceNotMeasured { size: SurfaceSize },

    /// The engine refused to create a context.
    #[error("Failed to create rendering context: {0}")]
    ContextCreation(#[source] BackendError),

    /// The scene could not be loaded.
    #[error("Failed to load scene: {0}")]
    AssetLoad(#[source] BackendError),
}

impl SessionError {
    /// Error kind reported to the viewer's caller.
    pub fn kind(&self) -> ViewerErrorKind {
        match self {
            SessionError::SurfaceNotMeasured { .. } | SessionError::ContextCreation(_) => {
                ViewerErrorKind::ContextCreationFailed
            }
            SessionError::AssetLoad(_) => ViewerErrorKind::AssetLoadFailed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let unmeasured = SessionError::SurfaceNotMeasured {
            size: SurfaceSize::new(0, 0),
        };
        assert_eq!(unmeasured.kind(), ViewerErrorKind::ContextCreationFailed);

        let creation = SessionError::ContextCreation(BackendError::Unsupported("webgl2".into()));
        assert_eq!(creation.kind(), ViewerErrorKind::ContextCreationFailed);

        let load = SessionError::AssetLoad(BackendError::Network("503".into()));
        assert_eq!(load.kind(), ViewerErrorKind::AssetLoadFailed);
    }

    #[test]
    fn test_display() {
        let err = SessionError::SurfaceNotMeasured {
            size: SurfaceSize::new(0, 300),
        };
        assert_eq!(err.to_string(), "Surface 0x300 has no area to render into");
        assert_eq!(
            ViewerErrorKind::AcquisitionTimeout.to_string(),
            "acquisition-timeout"
        );
    }
}
