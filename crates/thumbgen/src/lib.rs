//! Thumbnail capture for the shader gallery.
//!
//! `generate-thumbnails` serves the built bundle from a throwaway
//! [`preview`] server, opens each shader in thumbnail mode inside a headless
//! browser and stores a PNG of the canvas under `public/thumbnails/`.
//! Browser access sits behind [`CapturePage`] so the capture loop can run
//! against a scripted page in tests.

pub mod browser;
pub mod capture;
pub mod cli;
pub mod config;
pub mod options;
pub mod paths;
pub mod run;

pub use browser::{
    BrowserError, CapturePage, ConsoleEntry, ConsoleLevel, WebDriverPage, CANVAS_SELECTOR,
};
pub use capture::{
    capture_all, plan_targets, select_entries, CaptureError, CaptureReport, CaptureTarget,
};
pub use cli::Cli;
pub use config::ThumbgenConfig;
pub use options::CaptureOptions;
pub use paths::ProjectPaths;
