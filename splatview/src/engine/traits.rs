//! Engine contract traits.

use super::error::BackendError;
use crate::asset::{AssetKind, AssetRef};
use crate::config::RenderConfig;
use crate::surface::SurfaceSize;
use std::future::Future;
use std::pin::Pin;

/// Boxed, sendable future returned across the engine contract.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Parameters for constructing a rendering context.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextParams {
    /// Measured surface size at creation time. Never zero-area.
    pub size: SurfaceSize,
    /// Kind of asset the context will display.
    pub kind: AssetKind,
    /// Camera, controls and clear colour.
    pub render: RenderConfig,
}

/// Factory for rendering contexts.
///
/// Implementations wrap an engine that is loaded lazily (a dynamic module
/// import in a browser). Creating a context may fail when the environment has
/// no compatible GPU surface.
pub trait RenderBackend: Send + Sync + 'static {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Loads the engine and constructs a context sized to `params.size`.
    ///
    /// Dropping the returned future before it resolves must not leave any
    /// native resource behind.
    fn create_context(
        &self,
        params: ContextParams,
    ) -> BoxFuture<Result<Box<dyn RenderContext>, BackendError>>;
}

/// One live rendering context.
///
/// A context owns every native resource it creates: the GPU context, geometry
/// buffers, and the control bindings. All of them are released by
/// [`RenderContext::dispose`].
pub trait RenderContext: Send {
    /// Stable label for logging.
    fn label(&self) -> String;

    /// Starts streaming and decoding `asset` into this context.
    ///
    /// The returned future does not borrow the context, so the context can be
    /// disposed while the load is still in flight. Dropping the future cancels
    /// the load.
    fn load_scene(&mut self, asset: &AssetRef) -> BoxFuture<Result<(), BackendError>>;

    /// Updates viewport and camera aspect ratio. `size` is never zero-area.
    fn resize(&mut self, size: SurfaceSize);

    /// Toggles ambient rotation of the displayed content.
    fn set_auto_rotate(&mut self, enabled: bool, speed: f32);

    /// Advances controls and draws one frame.
    fn render_frame(&mut self);

    /// Releases every native resource. Called at most once by the session.
    fn dispose(&mut self) -> Result<(), BackendError>;
}
