//! URL query protocol shared by the gallery page and the capture tool.
//!
//! `mode=thumbnail` selects the fixed-size capture mode, `shader=<id>` picks
//! the initial shader and `size=<n>` sets the square viewport in pixels.

use url::Url;

use crate::catalog::{ShaderCatalog, ShaderDefinition};

pub const MODE_PARAM: &str = "mode";
pub const SHADER_PARAM: &str = "shader";
pub const SIZE_PARAM: &str = "size";
pub const THUMBNAIL_MODE: &str = "thumbnail";

pub const DEFAULT_CAPTURE_SIZE: u32 = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Viewport follows the host window; gallery controls are shown.
    Interactive,
    /// Fixed square viewport, no UI, readiness flag published.
    Thumbnail { size: u32 },
}

impl RunMode {
    pub fn is_capture(self) -> bool {
        matches!(self, RunMode::Thumbnail { .. })
    }
}

/// Launch parameters decoded from the page URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchParams {
    pub mode: RunMode,
    pub shader: Option<String>,
}

impl Default for LaunchParams {
    fn default() -> Self {
        Self {
            mode: RunMode::Interactive,
            shader: None,
        }
    }
}

impl LaunchParams {
    pub fn from_url(url: &Url) -> Self {
        Self::from_query(url.query().unwrap_or_default())
    }

    /// Decode a raw query string (without the leading `?`).
    pub fn from_query(query: &str) -> Self {
        let mut mode = None;
        let mut shader = None;
        let mut size = None;
        for (key, value) in url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
            match key.as_ref() {
                MODE_PARAM => mode = Some(value.into_owned()),
                SHADER_PARAM if !value.trim().is_empty() => {
                    shader = Some(value.trim().to_string())
                }
                SIZE_PARAM => size = Some(value.into_owned()),
                _ => {}
            }
        }

        let mode = if mode.as_deref() == Some(THUMBNAIL_MODE) {
            RunMode::Thumbnail {
                size: parse_size(size.as_deref()),
            }
        } else {
            RunMode::Interactive
        };

        Self { mode, shader }
    }

    /// Pick the initial shader, falling back to the first catalog entry.
    pub fn initial_shader<'a>(&self, catalog: &'a ShaderCatalog) -> Option<&'a ShaderDefinition> {
        if let Some(id) = self.shader.as_deref() {
            if let Some(definition) = catalog.find(id) {
                return Some(definition);
            }
            tracing::warn!(shader = id, "unknown shader requested; using first catalog entry");
        }
        catalog.first()
    }
}

fn parse_size(raw: Option<&str>) -> u32 {
    raw.and_then(|value| value.trim().parse::<u32>().ok())
        .filter(|size| *size > 0)
        .unwrap_or(DEFAULT_CAPTURE_SIZE)
}

/// Build the capture URL for `shader` under `base_path` on `origin`.
pub fn capture_url(
    origin: &Url,
    base_path: &str,
    shader: &str,
    size: u32,
) -> Result<Url, url::ParseError> {
    let mut url = origin.join(&format!("{}index.html", normalize_base_path(base_path)))?;
    url.query_pairs_mut()
        .append_pair(MODE_PARAM, THUMBNAIL_MODE)
        .append_pair(SHADER_PARAM, shader)
        .append_pair(SIZE_PARAM, &size.to_string());
    Ok(url)
}

/// Force a base path into `/segment/` form; empty input maps to `/`.
pub fn normalize_base_path(base_path: &str) -> String {
    let trimmed = base_path.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}/")
    }
}
