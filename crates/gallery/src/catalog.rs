//! Turns registry entries into fully resolved [`ShaderDefinition`]s.
//!
//! Resolution is eager: every entry's vertex and fragment source is loaded up
//! front and any missing, empty or non-UTF-8 file aborts catalog creation.
//! Sources come from a [`SourceLoader`]; [`EmbeddedSources`] serves the GLSL
//! compiled into this crate and [`DirectorySources`] reads a shader directory.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::registry::{shader_registry, ShaderEntry};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("unable to resolve shader source for \"{0}\"; ensure the file exists and is listed in the registry")]
    MissingSource(String),

    #[error("shader source for \"{0}\" must be UTF-8 text")]
    NotText(String),

    #[error("shader source for \"{0}\" is empty")]
    EmptySource(String),

    #[error("shader id \"{0}\" is registered more than once")]
    DuplicateId(String),

    #[error("failed to read shader source {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Normalise a source reference to the `./name.glsl` form.
pub fn normalize_reference(reference: &str) -> String {
    let trimmed = reference.trim();
    if trimmed.starts_with("./") {
        trimmed.to_string()
    } else {
        format!("./{}", trimmed.trim_start_matches('/'))
    }
}

/// Supplies raw bytes for a normalised source reference.
pub trait SourceLoader {
    fn load(&self, reference: &str) -> Result<Vec<u8>, CatalogError>;
}

const EMBEDDED: &[(&str, &str)] = &[
    (
        "./passthrough.vert.glsl",
        include_str!("../shaders/passthrough.vert.glsl"),
    ),
    (
        "./gradation.frag.glsl",
        include_str!("../shaders/gradation.frag.glsl"),
    ),
];

/// GLSL bundled into the binary at compile time.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedSources;

impl SourceLoader for EmbeddedSources {
    fn load(&self, reference: &str) -> Result<Vec<u8>, CatalogError> {
        EMBEDDED
            .iter()
            .find(|(name, _)| *name == reference)
            .map(|(_, source)| source.as_bytes().to_vec())
            .ok_or_else(|| CatalogError::MissingSource(reference.to_string()))
    }
}

/// Loads sources from a directory on disk.
#[derive(Debug, Clone)]
pub struct DirectorySources {
    root: PathBuf,
}

impl DirectorySources {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl SourceLoader for DirectorySources {
    fn load(&self, reference: &str) -> Result<Vec<u8>, CatalogError> {
        let relative = reference.trim_start_matches("./");
        let path = self.root.join(relative);
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(CatalogError::MissingSource(reference.to_string()))
            }
            Err(source) => Err(CatalogError::Io { path, source }),
        }
    }
}

/// Registry entry plus its resolved GLSL text.
#[derive(Debug, Clone)]
pub struct ShaderDefinition {
    entry: ShaderEntry,
    vertex_source: String,
    fragment_source: String,
}

impl ShaderDefinition {
    pub fn entry(&self) -> &ShaderEntry {
        &self.entry
    }

    pub fn id(&self) -> &str {
        self.entry.id
    }

    pub fn name(&self) -> &str {
        self.entry.name
    }

    pub fn vertex_source(&self) -> &str {
        &self.vertex_source
    }

    pub fn fragment_source(&self) -> &str {
        &self.fragment_source
    }
}

/// Immutable list of resolved shaders, in registry order.
#[derive(Debug, Clone)]
pub struct ShaderCatalog {
    definitions: Vec<ShaderDefinition>,
}

impl ShaderCatalog {
    /// Resolve the built-in registry against the embedded sources.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::resolve(shader_registry(), &EmbeddedSources)
    }

    pub fn resolve(
        entries: &[ShaderEntry],
        loader: &impl SourceLoader,
    ) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        let mut definitions = Vec::with_capacity(entries.len());
        for entry in entries {
            if !seen.insert(entry.id) {
                return Err(CatalogError::DuplicateId(entry.id.to_string()));
            }
            let vertex_source = resolve_source(loader, entry.vertex_path)?;
            let fragment_source = resolve_source(loader, entry.fragment_path)?;
            tracing::debug!(shader = entry.id, "resolved shader sources");
            definitions.push(ShaderDefinition {
                entry: entry.clone(),
                vertex_source,
                fragment_source,
            });
        }
        Ok(Self { definitions })
    }

    pub fn find(&self, id: &str) -> Option<&ShaderDefinition> {
        self.definitions.iter().find(|definition| definition.id() == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.definitions
            .iter()
            .position(|definition| definition.id() == id)
    }

    pub fn get(&self, index: usize) -> Option<&ShaderDefinition> {
        self.definitions.get(index)
    }

    pub fn first(&self) -> Option<&ShaderDefinition> {
        self.definitions.first()
    }

    pub fn as_slice(&self) -> &[ShaderDefinition] {
        &self.definitions
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ShaderDefinition> {
        self.definitions.iter()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

fn resolve_source(loader: &impl SourceLoader, reference: &str) -> Result<String, CatalogError> {
    let normalized = normalize_reference(reference);
    let bytes = loader.load(&normalized)?;
    let text = String::from_utf8(bytes).map_err(|_| CatalogError::NotText(normalized.clone()))?;
    if text.trim().is_empty() {
        return Err(CatalogError::EmptySource(normalized));
    }
    Ok(text)
}
