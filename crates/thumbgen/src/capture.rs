use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use gallery::{capture_url, ShaderCatalog, ShaderDefinition};
use image::ImageFormat;
use thiserror::Error;
use tokio::fs;
use url::Url;

use crate::browser::{BrowserError, CapturePage};
use crate::options::CaptureOptions;
use crate::paths::ProjectPaths;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to open {url} for shader '{id}'")]
    Navigation {
        id: String,
        url: Url,
        #[source]
        source: BrowserError,
    },

    #[error("shader '{id}' did not report ready within {timeout_ms} ms")]
    ReadinessTimeout { id: String, timeout_ms: u64 },

    #[error("canvas for shader '{id}' did not become visible within {timeout_ms} ms")]
    CanvasTimeout { id: String, timeout_ms: u64 },

    #[error("browser error while capturing shader '{id}'")]
    Browser {
        id: String,
        #[source]
        source: BrowserError,
    },

    #[error("screenshot for shader '{id}' is not a valid PNG")]
    InvalidPng {
        id: String,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to write {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Url(#[from] url::ParseError),
}

/// One thumbnail to produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureTarget {
    pub id: String,
    /// Public URL path recorded in the registry.
    pub thumbnail_path: String,
    /// Where the PNG lands on disk.
    pub output_path: PathBuf,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CaptureReport {
    pub captured: Vec<String>,
    pub skipped: Vec<String>,
}

/// Registry entries to process, in registry order.
pub fn select_entries<'a>(
    catalog: &'a ShaderCatalog,
    only: Option<&BTreeSet<String>>,
) -> Vec<&'a ShaderDefinition> {
    let Some(only) = only else {
        return catalog.iter().collect();
    };
    for id in only {
        if catalog.find(id).is_none() {
            tracing::warn!(shader = %id, "--only names an unknown shader");
        }
    }
    catalog
        .iter()
        .filter(|definition| only.contains(definition.id()))
        .collect()
}

pub fn plan_targets(entries: &[&ShaderDefinition], paths: &ProjectPaths) -> Vec<CaptureTarget> {
    entries
        .iter()
        .map(|definition| {
            let thumbnail_path = definition.entry().thumbnail_path();
            CaptureTarget {
                id: definition.id().to_string(),
                output_path: paths.resolve_thumbnail(&thumbnail_path),
                thumbnail_path,
            }
        })
        .collect()
}

/// Capture every target sequentially, stopping at the first failure.
pub async fn capture_all<P: CapturePage>(
    page: &mut P,
    targets: &[CaptureTarget],
    options: &CaptureOptions,
    origin: &Url,
    base_path: &str,
) -> Result<CaptureReport, CaptureError> {
    let mut report = CaptureReport::default();
    for target in targets {
        if !options.force && fs::try_exists(&target.output_path).await.unwrap_or(false) {
            tracing::info!(
                "[skip] {} -> {} (already exists)",
                target.id,
                target.thumbnail_path
            );
            report.skipped.push(target.id.clone());
            continue;
        }
        let started = Instant::now();
        capture_one(page, target, options, origin, base_path).await?;
        tracing::info!(
            elapsed = %humantime::format_duration(truncate_to_millis(started.elapsed())),
            "[done] {} -> {}",
            target.id,
            target.thumbnail_path
        );
        report.captured.push(target.id.clone());
    }
    Ok(report)
}

async fn capture_one<P: CapturePage>(
    page: &mut P,
    target: &CaptureTarget,
    options: &CaptureOptions,
    origin: &Url,
    base_path: &str,
) -> Result<(), CaptureError> {
    if let Some(parent) = target.output_path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|source| CaptureError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
    }

    let url = capture_url(origin, base_path, &target.id, options.viewport_px)?;
    tracing::info!("[open] {} -> {}", target.id, url);
    page.navigate(&url)
        .await
        .map_err(|source| CaptureError::Navigation {
            id: target.id.clone(),
            url: url.clone(),
            source,
        })?;

    match tokio::time::timeout(options.timeout(), poll_ready(page, &target.id)).await {
        Ok(result) => result?,
        Err(_) => {
            forward_console(page, &target.id).await;
            return Err(CaptureError::ReadinessTimeout {
                id: target.id.clone(),
                timeout_ms: options.timeout_ms,
            })
        }
    }

    if options.delay_ms > 0 {
        tokio::time::sleep(options.delay()).await;
    }

    match tokio::time::timeout(options.timeout(), poll_canvas(page, &target.id)).await {
        Ok(result) => result?,
        Err(_) => {
            forward_console(page, &target.id).await;
            return Err(CaptureError::CanvasTimeout {
                id: target.id.clone(),
                timeout_ms: options.timeout_ms,
            })
        }
    }

    let png = page
        .screenshot_canvas()
        .await
        .map_err(|source| CaptureError::Browser {
            id: target.id.clone(),
            source,
        })?;
    verify_png(&target.id, &png, options.viewport_px)?;
    write_atomically(&target.output_path, &png).await
}

async fn poll_ready<P: CapturePage>(page: &mut P, id: &str) -> Result<(), CaptureError> {
    loop {
        let ready = page.is_ready().await.map_err(|source| CaptureError::Browser {
            id: id.to_string(),
            source,
        })?;
        forward_console(page, id).await;
        if ready {
            return Ok(());
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

async fn poll_canvas<P: CapturePage>(page: &mut P, id: &str) -> Result<(), CaptureError> {
    loop {
        let visible = page
            .canvas_visible()
            .await
            .map_err(|source| CaptureError::Browser {
                id: id.to_string(),
                source,
            })?;
        forward_console(page, id).await;
        if visible {
            return Ok(());
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Re-log whatever the page printed since the last poll.
async fn forward_console<P: CapturePage>(page: &mut P, id: &str) {
    match page.drain_console().await {
        Ok(entries) => {
            for entry in entries {
                entry.emit(id);
            }
        }
        Err(err) => tracing::debug!(shader = id, %err, "could not read the browser console"),
    }
}

fn verify_png(id: &str, bytes: &[u8], expected_px: u32) -> Result<(), CaptureError> {
    let decoded = image::load_from_memory_with_format(bytes, ImageFormat::Png).map_err(|source| {
        CaptureError::InvalidPng {
            id: id.to_string(),
            source,
        }
    })?;
    if decoded.width() != expected_px || decoded.height() != expected_px {
        // Device scale factors can inflate element screenshots.
        tracing::warn!(
            shader = id,
            width = decoded.width(),
            height = decoded.height(),
            expected = expected_px,
            "captured thumbnail size differs from the requested viewport"
        );
    }
    Ok(())
}

/// Write next to the destination then rename so readers never see a partial PNG.
async fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), CaptureError> {
    let io_err = |source| CaptureError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut partial = path.as_os_str().to_owned();
    partial.push(".partial");
    let partial = PathBuf::from(partial);
    fs::write(&partial, bytes).await.map_err(io_err)?;
    if let Err(err) = fs::rename(&partial, path).await {
        let _ = fs::remove_file(&partial).await;
        return Err(io_err(err));
    }
    Ok(())
}

fn truncate_to_millis(elapsed: Duration) -> Duration {
    Duration::from_millis(elapsed.as_millis().min(u128::from(u64::MAX)) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn atomic_write_replaces_existing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("thumb.png");
        std::fs::write(&path, b"old").unwrap();

        write_atomically(&path, b"new").await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"new");
        assert!(!temp.path().join("thumb.png.partial").exists());
    }

    #[test]
    fn garbage_bytes_are_not_a_png() {
        let err = verify_png("broken", b"definitely not a png", 16).unwrap_err();
        assert!(matches!(err, CaptureError::InvalidPng { ref id, .. } if id == "broken"));
    }
}
