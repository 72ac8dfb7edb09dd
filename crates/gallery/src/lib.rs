//! Core of the shader-study gallery.
//!
//! The crate models everything the browser page does apart from talking to
//! WebGL and the DOM directly:
//!
//! ```text
//!   registry ──▶ catalog (GLSL resolved) ──▶ RenderApp<B: RenderBackend>
//!                                              ▲            │
//!         GalleryUi ── SelectionSink ──────────┘            └─▶ ReadinessFlag
//!         LaunchParams (mode / shader / size query)               (capture mode)
//! ```
//!
//! Hosts provide a [`RenderBackend`] that draws one full-screen quad per
//! frame, call [`RenderApp::tick`] from their animation-frame callback and
//! forward viewport changes to [`RenderApp::resize`]. [`HeadlessBackend`]
//! runs the state machine without a GPU.

mod app;
mod backend;
mod catalog;
mod query;
mod readiness;
mod registry;
mod ui;
mod uniforms;

pub use app::{AppError, RenderApp};
pub use backend::{BackendError, HeadlessBackend, MaterialHandle, RenderBackend, Viewport};
pub use catalog::{
    normalize_reference, CatalogError, DirectorySources, EmbeddedSources, ShaderCatalog,
    ShaderDefinition, SourceLoader,
};
pub use query::{
    capture_url, normalize_base_path, LaunchParams, RunMode, DEFAULT_CAPTURE_SIZE, MODE_PARAM,
    SHADER_PARAM, SIZE_PARAM, THUMBNAIL_MODE,
};
pub use readiness::{Readiness, ReadinessFlag, READY_ATTRIBUTE, READY_CHECK_SCRIPT};
pub use registry::{
    default_thumbnail_path, shader_registry, Resizable, ResizeContext, ShaderEntry,
    ShaderProgram, Updatable, UpdateContext,
};
pub use ui::{
    FullscreenRequest, GalleryUi, SelectionSink, StripButton, WheelDelta, WheelOutcome,
};
pub use uniforms::{Uniform, UniformMap, UniformValue};
