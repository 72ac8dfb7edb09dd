use std::collections::{BTreeSet, VecDeque};
use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use gallery::{EmbeddedSources, ShaderCatalog, ShaderEntry, ShaderProgram};
use image::{ImageFormat, Rgba, RgbaImage};
use preview::{PreviewServer, SiteRoot};
use tempfile::TempDir;
use thumbgen::run::run_session;
use thumbgen::{
    capture_all, plan_targets, select_entries, BrowserError, CaptureError, CaptureOptions,
    CapturePage, CaptureTarget, ConsoleEntry, ConsoleLevel, ProjectPaths,
};
use url::Url;

const BASE: &str = "/shader-study/";

fn entry(id: &'static str) -> ShaderEntry {
    ShaderEntry {
        id,
        name: id,
        description: None,
        vertex_path: "./passthrough.vert.glsl",
        fragment_path: "./gradation.frag.glsl",
        thumbnail: None,
        program: ShaderProgram::Gradation,
    }
}

fn catalog() -> ShaderCatalog {
    ShaderCatalog::resolve(&[entry("a"), entry("b"), entry("c")], &EmbeddedSources)
        .expect("catalog")
}

fn png(size: u32) -> Vec<u8> {
    let image = RgbaImage::from_pixel(size, size, Rgba([40, 90, 200, 255]));
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Png).unwrap();
    bytes.into_inner()
}

fn options(size: u32) -> CaptureOptions {
    CaptureOptions {
        delay_ms: 0,
        timeout_ms: 1_000,
        viewport_px: size,
        ..CaptureOptions::default()
    }
}

fn origin() -> Url {
    Url::parse("http://127.0.0.1:4000").unwrap()
}

struct FakePage {
    navigations: Vec<Url>,
    ready: bool,
    canvas: bool,
    png: Vec<u8>,
    closes: Arc<AtomicUsize>,
    /// Batches handed out one per console drain.
    console: VecDeque<Vec<ConsoleEntry>>,
    forwarded: Vec<ConsoleEntry>,
}

impl FakePage {
    fn rendering(png: Vec<u8>) -> Self {
        Self {
            navigations: Vec::new(),
            ready: true,
            canvas: true,
            png,
            closes: Arc::new(AtomicUsize::new(0)),
            console: VecDeque::new(),
            forwarded: Vec::new(),
        }
    }

    fn visited_shaders(&self) -> Vec<String> {
        self.navigations
            .iter()
            .filter_map(|url| {
                url.query_pairs()
                    .find(|(key, _)| key == "shader")
                    .map(|(_, value)| value.into_owned())
            })
            .collect()
    }
}

impl CapturePage for FakePage {
    async fn navigate(&mut self, url: &Url) -> Result<(), BrowserError> {
        self.navigations.push(url.clone());
        Ok(())
    }

    async fn is_ready(&mut self) -> Result<bool, BrowserError> {
        Ok(self.ready)
    }

    async fn canvas_visible(&mut self) -> Result<bool, BrowserError> {
        Ok(self.canvas)
    }

    async fn screenshot_canvas(&mut self) -> Result<Vec<u8>, BrowserError> {
        Ok(self.png.clone())
    }

    async fn drain_console(&mut self) -> Result<Vec<ConsoleEntry>, BrowserError> {
        let batch = self.console.pop_front().unwrap_or_default();
        self.forwarded.extend(batch.iter().cloned());
        Ok(batch)
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn targets_for(root: &Path, only: Option<&[&str]>) -> Vec<CaptureTarget> {
    let catalog = catalog();
    let only: Option<BTreeSet<String>> =
        only.map(|ids| ids.iter().map(|id| id.to_string()).collect());
    let entries = select_entries(&catalog, only.as_ref());
    plan_targets(&entries, &ProjectPaths::from_root(root))
}

#[tokio::test]
async fn only_filter_captures_matching_shaders_in_registry_order() {
    let temp = TempDir::new().unwrap();
    let targets = targets_for(temp.path(), Some(&["c", "a", "missing"]));
    let mut page = FakePage::rendering(png(32));

    let report = capture_all(&mut page, &targets, &options(32), &origin(), BASE)
        .await
        .unwrap();

    assert_eq!(report.captured, vec!["a", "c"]);
    assert_eq!(page.visited_shaders(), vec!["a", "c"]);
    let thumbnails = temp.path().join("public/thumbnails");
    assert!(thumbnails.join("a.png").is_file());
    assert!(!thumbnails.join("b.png").exists());
    assert!(thumbnails.join("c.png").is_file());

    let first = &page.navigations[0];
    assert_eq!(first.path(), "/shader-study/index.html");
    assert_eq!(first.query(), Some("mode=thumbnail&shader=a&size=32"));
}

#[tokio::test]
async fn existing_thumbnails_are_skipped_without_navigation() {
    let temp = TempDir::new().unwrap();
    let targets = targets_for(temp.path(), Some(&["a"]));
    fs::create_dir_all(temp.path().join("public/thumbnails")).unwrap();
    fs::write(&targets[0].output_path, b"keep me").unwrap();
    let mut page = FakePage::rendering(png(32));

    let report = capture_all(&mut page, &targets, &options(32), &origin(), BASE)
        .await
        .unwrap();

    assert_eq!(report.skipped, vec!["a"]);
    assert!(report.captured.is_empty());
    assert!(page.navigations.is_empty());
    assert_eq!(fs::read(&targets[0].output_path).unwrap(), b"keep me");
}

#[tokio::test]
async fn force_overwrites_on_every_run() {
    let temp = TempDir::new().unwrap();
    let targets = targets_for(temp.path(), Some(&["b"]));
    fs::create_dir_all(temp.path().join("public/thumbnails")).unwrap();
    fs::write(&targets[0].output_path, b"stale").unwrap();
    let forced = CaptureOptions {
        force: true,
        ..options(16)
    };
    let expected = png(16);
    let mut page = FakePage::rendering(expected.clone());

    capture_all(&mut page, &targets, &forced, &origin(), BASE)
        .await
        .unwrap();
    capture_all(&mut page, &targets, &forced, &origin(), BASE)
        .await
        .unwrap();

    assert_eq!(page.navigations.len(), 2);
    assert_eq!(fs::read(&targets[0].output_path).unwrap(), expected);
}

#[tokio::test]
async fn invalid_screenshot_leaves_no_file_behind() {
    let temp = TempDir::new().unwrap();
    let targets = targets_for(temp.path(), Some(&["a"]));
    let mut page = FakePage::rendering(b"not a png".to_vec());

    let err = capture_all(&mut page, &targets, &options(32), &origin(), BASE)
        .await
        .unwrap_err();

    assert!(matches!(err, CaptureError::InvalidPng { .. }));
    assert!(!targets[0].output_path.exists());
}

#[tokio::test(start_paused = true)]
async fn hidden_canvas_times_out() {
    let temp = TempDir::new().unwrap();
    let targets = targets_for(temp.path(), Some(&["a"]));
    let mut page = FakePage::rendering(png(32));
    page.canvas = false;

    let err = capture_all(&mut page, &targets, &options(32), &origin(), BASE)
        .await
        .unwrap_err();

    assert!(matches!(err, CaptureError::CanvasTimeout { timeout_ms: 1_000, .. }));
    assert!(!targets[0].output_path.exists());
}

#[tokio::test(start_paused = true)]
async fn readiness_timeout_still_releases_browser_and_server() {
    let temp = TempDir::new().unwrap();
    let dist = temp.path().join("dist");
    fs::create_dir_all(&dist).unwrap();
    fs::write(dist.join("index.html"), "<!doctype html>").unwrap();

    let server = PreviewServer::new(SiteRoot::new(&dist, BASE))
        .start()
        .await
        .unwrap();
    let addr = server.local_addr();
    let targets = targets_for(temp.path(), None);
    let mut page = FakePage::rendering(png(32));
    page.ready = false;
    let closes = Arc::clone(&page.closes);

    let err = run_session(page, server, &targets, &options(32), BASE)
        .await
        .unwrap_err();

    let capture = err.downcast_ref::<CaptureError>().expect("capture error");
    assert!(matches!(
        capture,
        CaptureError::ReadinessTimeout { id, timeout_ms: 1_000 } if id == "a"
    ));
    assert_eq!(closes.load(Ordering::SeqCst), 1);
    assert!(tokio::net::TcpStream::connect(addr).await.is_err());
    assert!(!temp.path().join("public/thumbnails/a.png").exists());
}

#[tokio::test]
async fn console_output_is_drained_while_polling() {
    let temp = TempDir::new().unwrap();
    let targets = targets_for(temp.path(), Some(&["a"]));
    let mut page = FakePage::rendering(png(32));
    page.console = VecDeque::from([
        vec![ConsoleEntry::new(ConsoleLevel::Info, "compiling gradation")],
        vec![ConsoleEntry::new(ConsoleLevel::Warning, "WebGL: slow readback")],
    ]);

    capture_all(&mut page, &targets, &options(32), &origin(), BASE)
        .await
        .unwrap();

    assert!(page.console.is_empty());
    assert_eq!(
        page.forwarded
            .iter()
            .map(|entry| entry.message.as_str())
            .collect::<Vec<_>>(),
        vec!["compiling gradation", "WebGL: slow readback"]
    );
}

#[tokio::test(start_paused = true)]
async fn page_errors_raised_before_a_readiness_timeout_are_forwarded() {
    let temp = TempDir::new().unwrap();
    let targets = targets_for(temp.path(), Some(&["a"]));
    let mut page = FakePage::rendering(png(32));
    page.ready = false;
    page.console = std::iter::repeat_with(Vec::new).take(3).collect();
    page.console
        .push_back(vec![ConsoleEntry::page_error("Uncaught Error: link failed")]);

    let err = capture_all(&mut page, &targets, &options(32), &origin(), BASE)
        .await
        .unwrap_err();

    assert!(matches!(err, CaptureError::ReadinessTimeout { .. }));
    assert_eq!(
        page.forwarded,
        vec![ConsoleEntry::page_error("Uncaught Error: link failed")]
    );
}
