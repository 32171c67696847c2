//! Asset descriptors supplied by the catalog.
//!
//! An [`AssetRef`] names one 3D model and the poster image shown while it
//! loads (or instead of it). A [`MountConfig`] adds the per-mount switches the
//! page passes alongside the asset.
//!
//! Identity of an asset is its URL: two refs with the same URL describe the
//! same model, and a host only tears down its session when the URL changes.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors from building an asset descriptor.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssetError {
    /// Asset URL was empty or whitespace.
    #[error("asset url is empty")]
    EmptyUrl,

    /// Extension did not match any known model format.
    #[error("cannot infer model format from '{0}' (expected .ply, .ksplat, .glb or .usdz)")]
    UnknownFormat(String),

    /// Unknown asset kind name.
    #[error("unknown asset kind '{0}' (expected 'point-cloud' or 'mesh')")]
    UnknownKind(String),
}

/// How an asset is rendered by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// Gaussian splat / point cloud scene.
    PointCloud,
    /// Triangle mesh scene.
    Mesh,
}

impl AssetKind {
    /// Short name used in logs and config keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::PointCloud => "point-cloud",
            AssetKind::Mesh => "mesh",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetKind {
    type Err = AssetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "point-cloud" | "pointcloud" | "splat" => Ok(AssetKind::PointCloud),
            "mesh" => Ok(AssetKind::Mesh),
            other => Err(AssetError::UnknownKind(other.to_string())),
        }
    }
}

/// On-the-wire model formats served by the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelFormat {
    Ply,
    Ksplat,
    Glb,
    Usdz,
}

impl ModelFormat {
    /// Infers the format from the URL's file extension.
    ///
    /// Query strings and fragments are ignored, matching is case-insensitive.
    pub fn from_url(url: &str) -> Option<Self> {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let file = path.rsplit('/').next().unwrap_or(path);
        let (_, ext) = file.rsplit_once('.')?;

        match ext.to_ascii_lowercase().as_str() {
            "ply" => Some(ModelFormat::Ply),
            "ksplat" => Some(ModelFormat::Ksplat),
            "glb" => Some(ModelFormat::Glb),
            "usdz" => Some(ModelFormat::Usdz),
            _ => None,
        }
    }

    /// The asset kind the engine uses for this format.
    pub fn kind(&self) -> AssetKind {
        match self {
            ModelFormat::Ply | ModelFormat::Ksplat => AssetKind::PointCloud,
            ModelFormat::Glb | ModelFormat::Usdz => AssetKind::Mesh,
        }
    }
}

/// Immutable reference to one 3D asset and its poster image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRef {
    url: String,
    kind: AssetKind,
    poster_url: String,
}

impl AssetRef {
    /// Creates an asset reference.
    pub fn new(
        url: impl Into<String>,
        kind: AssetKind,
        poster_url: impl Into<String>,
    ) -> Result<Self, AssetError> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(AssetError::EmptyUrl);
        }
        Ok(Self {
            url,
            kind,
            poster_url: poster_url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn kind(&self) -> AssetKind {
        self.kind
    }

    pub fn poster_url(&self) -> &str {
        &self.poster_url
    }

    /// True when both refs name the same model.
    pub fn same_identity(&self, other: &AssetRef) -> bool {
        self.url == other.url
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.url, self.kind)
    }
}

/// Per-mount configuration handed to [`crate::viewer::ViewerHost::render`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountConfig {
    /// Asset to display.
    pub asset: AssetRef,
    /// Whether ambient rotation should run until the user takes control.
    pub auto_rotate: bool,
    /// Whether the poster should be fetched eagerly (above-the-fold hero).
    pub priority: bool,
}

impl MountConfig {
    /// Creates a mount config with auto-rotation on and normal priority.
    pub fn new(asset: AssetRef) -> Self {
        Self {
            asset,
            auto_rotate: true,
            priority: false,
        }
    }

    /// Builds a mount config, inferring the asset kind from the URL.
    pub fn from_url(url: &str, poster_url: &str) -> Result<Self, AssetError> {
        let format =
            ModelFormat::from_url(url).ok_or_else(|| AssetError::UnknownFormat(url.to_string()))?;
        Ok(Self::new(AssetRef::new(url, format.kind(), poster_url)?))
    }

    pub fn with_auto_rotate(mut self, enabled: bool) -> Self {
        self.auto_rotate = enabled;
        self
    }

    pub fn with_priority(mut self, priority: bool) -> Self {
        self.priority = priority;
        self
    }
}
