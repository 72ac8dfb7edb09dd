//! Static catalogue of the shaders the gallery knows about.
//!
//! Each [`ShaderEntry`] names its GLSL sources and carries a [`ShaderProgram`]
//! tag. The tag decides which uniforms a fresh activation receives and which
//! optional hooks ([`Updatable`], [`Resizable`]) the render loop dispatches to.

use crate::backend::{RenderBackend, Viewport};
use crate::uniforms::{UniformMap, UniformValue};

/// Per-frame data handed to [`Updatable::update`].
pub struct UpdateContext<'a> {
    pub uniforms: &'a mut UniformMap,
    /// Seconds since the first activation.
    pub elapsed_time: f32,
    /// Seconds since the previous tick; zero on activation.
    pub delta_time: f32,
    pub renderer: &'a dyn RenderBackend,
}

/// Data handed to [`Resizable::on_resize`] when the viewport changes.
pub struct ResizeContext<'a> {
    pub uniforms: &'a mut UniformMap,
    pub size: Viewport,
}

/// Shaders that animate their uniforms every frame.
pub trait Updatable {
    fn update(&self, context: &mut UpdateContext<'_>);
}

/// Shaders whose uniforms depend on the viewport geometry.
pub trait Resizable {
    fn on_resize(&self, context: &mut ResizeContext<'_>);
}

/// Behaviour tag for a registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderProgram {
    /// Animated colour gradation driven by `u_time` and `u_resolution`.
    Gradation,
}

impl ShaderProgram {
    /// Produce the uniform set for a new activation.
    pub fn create_uniforms(self) -> UniformMap {
        match self {
            ShaderProgram::Gradation => UniformMap::new()
                .with("u_time", UniformValue::Float(0.0))
                .with("u_resolution", UniformValue::Vec2([1.0, 1.0])),
        }
    }

    pub fn updatable(&self) -> Option<&dyn Updatable> {
        match self {
            ShaderProgram::Gradation => Some(self),
        }
    }

    pub fn resizable(&self) -> Option<&dyn Resizable> {
        match self {
            ShaderProgram::Gradation => Some(self),
        }
    }
}

impl Updatable for ShaderProgram {
    fn update(&self, context: &mut UpdateContext<'_>) {
        match self {
            ShaderProgram::Gradation => {
                if let Some(cell) = context.uniforms.get_mut("u_time") {
                    cell.value = UniformValue::Float(context.elapsed_time);
                }
            }
        }
    }
}

impl Resizable for ShaderProgram {
    fn on_resize(&self, context: &mut ResizeContext<'_>) {
        match self {
            ShaderProgram::Gradation => {
                // A cell of the wrong shape is replaced rather than skipped.
                if let Some(cell) = context.uniforms.get_mut("u_resolution") {
                    cell.value = UniformValue::Vec2(context.size.as_vec2());
                }
            }
        }
    }
}

/// Registry record describing one shader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderEntry {
    /// Stable identifier; doubles as query key and thumbnail file stem.
    pub id: &'static str,
    pub name: &'static str,
    pub description: Option<&'static str>,
    pub vertex_path: &'static str,
    pub fragment_path: &'static str,
    /// Public URL path of the thumbnail, e.g. `/thumbnails/gradation.png`.
    pub thumbnail: Option<&'static str>,
    pub program: ShaderProgram,
}

impl ShaderEntry {
    /// Thumbnail path, falling back to `/thumbnails/<id>.png`.
    pub fn thumbnail_path(&self) -> String {
        match self.thumbnail {
            Some(path) => path.to_string(),
            None => default_thumbnail_path(self.id),
        }
    }
}

pub fn default_thumbnail_path(id: &str) -> String {
    format!("/thumbnails/{id}.png")
}

const REGISTRY: &[ShaderEntry] = &[ShaderEntry {
    id: "gradation",
    name: "Gradation",
    description: Some("Simple animated color gradation shader"),
    vertex_path: "./passthrough.vert.glsl",
    fragment_path: "./gradation.frag.glsl",
    thumbnail: Some("/thumbnails/gradation.png"),
    program: ShaderProgram::Gradation,
}];

/// All registered shaders in display order.
pub fn shader_registry() -> &'static [ShaderEntry] {
    REGISTRY
}
