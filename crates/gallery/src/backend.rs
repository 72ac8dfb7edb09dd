//! Seam between the render state machine and whatever graphics binding draws
//! the full-screen quad. The binding layer (camera, scene and material object
//! model) lives outside this crate; `RenderApp` only needs the handful of
//! operations below.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::catalog::ShaderDefinition;
use crate::readiness::Readiness;
use crate::uniforms::UniformMap;

/// Drawable surface size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const fn square(size: u32) -> Self {
        Self::new(size, size)
    }

    pub fn as_vec2(self) -> [f32; 2] {
        [self.width as f32, self.height as f32]
    }
}

/// Opaque identifier for a material created by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MaterialHandle(pub u64);

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("failed to compile shader '{id}': {reason}")]
    Compile { id: String, reason: String },

    #[error("material {0:?} is not live")]
    UnknownMaterial(MaterialHandle),

    #[error("{0}")]
    Other(String),
}

/// Graphics operations used by [`crate::RenderApp`].
pub trait RenderBackend {
    /// Resize the drawing surface and refresh the camera projection.
    fn set_viewport(&mut self, viewport: Viewport);

    /// Compile a shader material bound to a full-screen quad.
    fn create_material(
        &mut self,
        definition: &ShaderDefinition,
        uniforms: &UniformMap,
    ) -> Result<MaterialHandle, BackendError>;

    /// Dispose of the material and its GPU resources.
    fn release_material(&mut self, material: MaterialHandle);

    /// Issue the single draw call for the quad.
    fn draw(&mut self, material: MaterialHandle, uniforms: &UniformMap)
        -> Result<(), BackendError>;

    /// Mirror the capture readiness state onto the host document.
    fn publish_readiness(&mut self, _state: Readiness) {}
}

/// Backend that performs no GPU work but tracks material lifetimes.
///
/// Useful for dry runs of the state machine and for asserting the
/// one-material-at-a-time invariant.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    next_handle: u64,
    live: BTreeSet<MaterialHandle>,
    peak_live: usize,
    viewport: Option<Viewport>,
    created: usize,
    released: usize,
    draws: usize,
    last_uniforms: Option<UniformMap>,
    published: Vec<Readiness>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_materials(&self) -> usize {
        self.live.len()
    }

    /// Highest number of materials that were ever alive at once.
    pub fn peak_live(&self) -> usize {
        self.peak_live
    }

    pub fn created(&self) -> usize {
        self.created
    }

    pub fn released(&self) -> usize {
        self.released
    }

    pub fn draws(&self) -> usize {
        self.draws
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    /// Uniform state submitted with the most recent draw.
    pub fn last_uniforms(&self) -> Option<&UniformMap> {
        self.last_uniforms.as_ref()
    }

    /// Every readiness state published so far, oldest first.
    pub fn published_readiness(&self) -> &[Readiness] {
        &self.published
    }

    /// The `<body>` attribute a browser host would currently expose.
    pub fn body_attribute(&self) -> Option<(&'static str, &'static str)> {
        self.published.last().map(|state| state.attribute())
    }
}

impl RenderBackend for HeadlessBackend {
    fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = Some(viewport);
    }

    fn create_material(
        &mut self,
        definition: &ShaderDefinition,
        _uniforms: &UniformMap,
    ) -> Result<MaterialHandle, BackendError> {
        if definition.fragment_source().trim().is_empty() {
            return Err(BackendError::Compile {
                id: definition.id().to_string(),
                reason: "fragment source is empty".to_string(),
            });
        }
        self.next_handle += 1;
        let handle = MaterialHandle(self.next_handle);
        self.live.insert(handle);
        self.peak_live = self.peak_live.max(self.live.len());
        self.created += 1;
        Ok(handle)
    }

    fn release_material(&mut self, material: MaterialHandle) {
        if self.live.remove(&material) {
            self.released += 1;
        }
    }

    fn draw(
        &mut self,
        material: MaterialHandle,
        uniforms: &UniformMap,
    ) -> Result<(), BackendError> {
        if !self.live.contains(&material) {
            return Err(BackendError::UnknownMaterial(material));
        }
        self.draws += 1;
        self.last_uniforms = Some(uniforms.clone());
        Ok(())
    }

    fn publish_readiness(&mut self, state: Readiness) {
        self.published.push(state);
    }
}
