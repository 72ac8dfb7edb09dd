use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use gallery::normalize_base_path;
use serde::{Deserialize, Serialize};

pub const ENV_WEBDRIVER_URL: &str = "SHADER_STUDY_WEBDRIVER_URL";

pub const DEFAULT_BASE_PATH: &str = "/shader-study/";
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";
pub const DEFAULT_BROWSER_ARGS: &[&str] = &[
    "--headless=new",
    "--ignore-gpu-blocklist",
    "--use-angle=swiftshader",
    "--use-gl=swiftshader-webgl",
    "--hide-scrollbars",
];

/// Optional `thumbgen.toml` next to the project root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThumbgenConfig {
    pub preview: PreviewSection,
    pub browser: BrowserSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewSection {
    /// Public base path the bundle was built for.
    pub base_path: String,
}

impl Default for PreviewSection {
    fn default() -> Self {
        Self {
            base_path: DEFAULT_BASE_PATH.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSection {
    /// WebDriver endpoint that can spawn a Chromium session.
    pub webdriver_url: String,
    /// Extra command line switches handed to the browser.
    pub args: Vec<String>,
}

impl Default for BrowserSection {
    fn default() -> Self {
        Self {
            webdriver_url: DEFAULT_WEBDRIVER_URL.to_string(),
            args: DEFAULT_BROWSER_ARGS.iter().map(|arg| arg.to_string()).collect(),
        }
    }
}

impl ThumbgenConfig {
    pub fn load_or_default(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("failed to read config file at {}", path.display()))?;
            toml::from_str::<Self>(&contents)
                .with_context(|| format!("failed to parse config file at {}", path.display()))?
        } else {
            Self::default()
        };
        config.preview.base_path = normalize_base_path(&config.preview.base_path);
        Ok(config)
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = env::var(ENV_WEBDRIVER_URL) {
            if !url.trim().is_empty() {
                self.browser.webdriver_url = url.trim().to_string();
            }
        }
        self
    }
}
