//! Maps request paths onto files below the build output directory.
//!
//! Resolution is purely lexical before touching the filesystem: `..` segments
//! that would climb above the root reject the request instead of being
//! clamped, so nothing outside the root is ever stat'ed or read.

use std::path::{Path, PathBuf};

use gallery::normalize_base_path;
use tokio::fs;

pub const INDEX_DOCUMENT: &str = "index.html";

/// Build output tree served under an application base path.
#[derive(Debug, Clone)]
pub struct SiteRoot {
    root: PathBuf,
    base_path: String,
}

impl SiteRoot {
    /// `base_path` is normalised to `/segment/` form (`/` when empty).
    pub fn new(root: impl Into<PathBuf>, base_path: &str) -> Self {
        Self {
            root: root.into(),
            base_path: normalize_base_path(base_path),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn index_document(&self) -> PathBuf {
        self.root.join(INDEX_DOCUMENT)
    }

    fn is_root_document(&self, pathname: &str) -> bool {
        pathname == "/"
            || pathname == "/index.html"
            || pathname == self.base_path
            || pathname.strip_prefix(self.base_path.as_str()) == Some(INDEX_DOCUMENT)
    }

    /// Resolve a decoded request path to an existing file, or `None` for 404.
    pub async fn resolve(&self, pathname: &str) -> Option<PathBuf> {
        if self.is_root_document(pathname) {
            return Some(self.index_document());
        }

        let relative = pathname
            .strip_prefix(self.base_path.as_str())
            .unwrap_or_else(|| pathname.trim_start_matches('/'));
        let relative = if relative.is_empty() {
            PathBuf::from(INDEX_DOCUMENT)
        } else {
            normalize_relative(relative)?
        };
        let candidate = self.root.join(relative);

        let metadata = fs::metadata(&candidate).await.ok()?;
        if metadata.is_dir() {
            let index = candidate.join(INDEX_DOCUMENT);
            let index_meta = fs::metadata(&index).await.ok()?;
            return index_meta.is_file().then_some(index);
        }
        Some(candidate)
    }
}

/// Collapse `.`/`..` segments; `None` if the path leaves the root.
pub fn normalize_relative(path: &str) -> Option<PathBuf> {
    if path.contains('\0') {
        return None;
    }
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            other if other.contains(':') => return None,
            other => segments.push(other),
        }
    }
    if segments.is_empty() {
        return Some(PathBuf::from(INDEX_DOCUMENT));
    }
    Some(segments.iter().collect())
}
