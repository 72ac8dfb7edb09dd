use std::fs;

use anyhow::{bail, Context, Result};
use gallery::ShaderCatalog;
use preview::{PreviewServer, ServerHandle, SiteRoot};
use tracing_subscriber::EnvFilter;

use crate::browser::{CapturePage, WebDriverPage};
use crate::capture::{capture_all, plan_targets, select_entries, CaptureReport, CaptureTarget};
use crate::cli::Cli;
use crate::config::ThumbgenConfig;
use crate::options::CaptureOptions;
use crate::paths::ProjectPaths;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

pub async fn run(cli: Cli) -> Result<()> {
    let options = CaptureOptions::from_cli(&cli);
    let paths = ProjectPaths::discover()?;
    let config = ThumbgenConfig::load_or_default(&paths.config_file())?.with_env_overrides();
    tracing::debug!(
        root = %paths.root().display(),
        dist = %paths.dist_dir().display(),
        public = %paths.public_dir().display(),
        webdriver = %config.browser.webdriver_url,
        "resolved thumbnail paths"
    );

    ensure_build_artifacts(&paths)?;
    let thumbnails_dir = paths.thumbnails_dir();
    fs::create_dir_all(&thumbnails_dir).with_context(|| {
        format!(
            "failed to create thumbnails directory at {}",
            thumbnails_dir.display()
        )
    })?;

    let catalog = ShaderCatalog::builtin().context("failed to load the shader registry")?;
    let entries = select_entries(&catalog, options.only.as_ref());
    if entries.is_empty() {
        tracing::info!("No shaders matched the provided filters. Nothing to do.");
        return Ok(());
    }
    let targets = plan_targets(&entries, &paths);

    let site = SiteRoot::new(paths.dist_dir(), &config.preview.base_path);
    let mut server = PreviewServer::new(site)
        .start()
        .await
        .context("failed to start the preview server")?;
    let page = match WebDriverPage::launch(&config.browser, options.viewport_px).await {
        Ok(page) => page,
        Err(err) => {
            server.close().await;
            return Err(err).context("failed to launch the headless browser");
        }
    };

    let report = run_session(page, server, &targets, &options, &config.preview.base_path).await?;
    tracing::info!(
        captured = report.captured.len(),
        skipped = report.skipped.len(),
        "thumbnail generation finished"
    );
    Ok(())
}

/// Fail early when the gallery bundle has not been built.
pub fn ensure_build_artifacts(paths: &ProjectPaths) -> Result<()> {
    let index = paths.index_document();
    if !index.is_file() {
        bail!(
            "Build output not found in \"{}\". Run the gallery build (e.g. \"npm run build\") before generating thumbnails.",
            index.display()
        );
    }
    Ok(())
}

/// Drive `page` across every target, then release the page and the server
/// whether or not the captures succeeded.
pub async fn run_session<P: CapturePage>(
    mut page: P,
    mut server: ServerHandle,
    targets: &[CaptureTarget],
    options: &CaptureOptions,
    base_path: &str,
) -> Result<CaptureReport> {
    let origin = server.origin().clone();
    match origin.join(base_path) {
        Ok(gallery) => tracing::info!("Preview server available at {gallery}"),
        Err(_) => tracing::info!("Preview server available at {origin}"),
    }
    tracing::info!("Capturing {} thumbnail(s)...", targets.len());

    let outcome = capture_all(&mut page, targets, options, &origin, base_path).await;

    if let Err(err) = page.close().await {
        tracing::warn!(error = %err, "failed to close the browser session");
    }
    server.close().await;

    Ok(outcome?)
}
