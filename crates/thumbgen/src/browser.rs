use fantoccini::error::{CmdError, NewSessionError};
use fantoccini::wd::WebDriverCompatibleCommand;
use fantoccini::{Client, ClientBuilder, Locator};
use gallery::READY_CHECK_SCRIPT;
use serde_json::{json, Value};
use thiserror::Error;
use url::Url;

use crate::config::BrowserSection;

/// Element the gallery renders into.
pub const CANVAS_SELECTOR: &str = "#app";

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("failed to start a browser session via {url}")]
    Session {
        url: String,
        #[source]
        source: NewSessionError,
    },

    #[error(transparent)]
    Command(#[from] CmdError),

    #[error("browser page error: {0}")]
    Page(String),
}

/// Severity of a browser console entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleLevel {
    Error,
    Warning,
    Info,
    Debug,
}

impl ConsoleLevel {
    /// Map a WebDriver log level (`SEVERE`, `WARNING`, `INFO`, ...).
    pub fn from_webdriver(level: &str) -> Self {
        match level {
            "SEVERE" => ConsoleLevel::Error,
            "WARNING" => ConsoleLevel::Warning,
            "DEBUG" | "FINE" | "FINER" | "FINEST" => ConsoleLevel::Debug,
            _ => ConsoleLevel::Info,
        }
    }
}

/// One message the page wrote to its console, or an uncaught page error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleEntry {
    pub level: ConsoleLevel,
    /// `true` for uncaught exceptions rather than `console.*` calls.
    pub page_error: bool,
    pub message: String,
}

impl ConsoleEntry {
    pub fn new(level: ConsoleLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            page_error: false,
            message: message.into(),
        }
    }

    pub fn page_error(message: impl Into<String>) -> Self {
        Self {
            level: ConsoleLevel::Error,
            page_error: true,
            message: message.into(),
        }
    }

    /// Parse one entry of a WebDriver `browser` log.
    pub fn from_log_value(value: &Value) -> Option<Self> {
        let message = value.get("message")?.as_str()?;
        let level = value
            .get("level")
            .and_then(Value::as_str)
            .map(ConsoleLevel::from_webdriver)
            .unwrap_or(ConsoleLevel::Info);
        let page_error = value.get("source").and_then(Value::as_str) == Some("javascript");
        Some(Self {
            level,
            page_error,
            message: message.to_string(),
        })
    }

    /// Tag used in the forwarded log line, e.g. `browser:warning`.
    pub fn tag(&self) -> &'static str {
        if self.page_error {
            return "browser:pageerror";
        }
        match self.level {
            ConsoleLevel::Error => "browser:error",
            ConsoleLevel::Warning => "browser:warning",
            ConsoleLevel::Info => "browser:log",
            ConsoleLevel::Debug => "browser:debug",
        }
    }

    /// Re-emit the entry through `tracing` at a matching level.
    pub fn emit(&self, shader: &str) {
        let tag = self.tag();
        let message = &self.message;
        match self.level {
            ConsoleLevel::Error => tracing::error!(shader, "[{tag}] {message}"),
            ConsoleLevel::Warning => tracing::warn!(shader, "[{tag}] {message}"),
            ConsoleLevel::Info => tracing::info!(shader, "[{tag}] {message}"),
            ConsoleLevel::Debug => tracing::debug!(shader, "[{tag}] {message}"),
        }
    }
}

/// The handful of page operations a capture needs.
#[allow(async_fn_in_trait)]
pub trait CapturePage {
    async fn navigate(&mut self, url: &Url) -> Result<(), BrowserError>;

    /// Whether the document has raised its thumbnail ready flag.
    async fn is_ready(&mut self) -> Result<bool, BrowserError>;

    async fn canvas_visible(&mut self) -> Result<bool, BrowserError>;

    /// PNG bytes of the canvas element only.
    async fn screenshot_canvas(&mut self) -> Result<Vec<u8>, BrowserError>;

    /// Console output and page errors produced since the previous call.
    async fn drain_console(&mut self) -> Result<Vec<ConsoleEntry>, BrowserError>;

    /// Release the page; calling it again is a no-op.
    async fn close(&mut self) -> Result<(), BrowserError>;
}

/// A headless Chromium tab driven over WebDriver.
pub struct WebDriverPage {
    client: Option<Client>,
    console_log: bool,
}

impl WebDriverPage {
    pub async fn launch(settings: &BrowserSection, viewport_px: u32) -> Result<Self, BrowserError> {
        let capabilities = chrome_capabilities(&settings.args, viewport_px);
        let capabilities = match capabilities {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        let client = ClientBuilder::native()
            .capabilities(capabilities)
            .connect(&settings.webdriver_url)
            .await
            .map_err(|source| BrowserError::Session {
                url: settings.webdriver_url.clone(),
                source,
            })?;
        tracing::debug!(webdriver = %settings.webdriver_url, "browser session started");

        let mut page = Self {
            client: Some(client),
            console_log: true,
        };
        if let Err(err) = page.client()?.set_window_size(viewport_px, viewport_px).await {
            // Headless Chrome honours --window-size even when resizing is refused.
            tracing::debug!(%err, "window resize rejected");
        }
        Ok(page)
    }

    fn client(&mut self) -> Result<&Client, BrowserError> {
        self.client
            .as_ref()
            .ok_or_else(|| BrowserError::Page("browser session already closed".to_string()))
    }
}

impl CapturePage for WebDriverPage {
    async fn navigate(&mut self, url: &Url) -> Result<(), BrowserError> {
        self.client()?.goto(url.as_str()).await?;
        Ok(())
    }

    async fn is_ready(&mut self) -> Result<bool, BrowserError> {
        let value = self.client()?.execute(READY_CHECK_SCRIPT, vec![]).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn canvas_visible(&mut self) -> Result<bool, BrowserError> {
        match self.client()?.find(Locator::Css(CANVAS_SELECTOR)).await {
            Ok(canvas) => Ok(canvas.is_displayed().await?),
            Err(err) if err.is_no_such_element() => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    async fn screenshot_canvas(&mut self) -> Result<Vec<u8>, BrowserError> {
        let canvas = self.client()?.find(Locator::Css(CANVAS_SELECTOR)).await?;
        Ok(canvas.screenshot().await?)
    }

    async fn drain_console(&mut self) -> Result<Vec<ConsoleEntry>, BrowserError> {
        if !self.console_log {
            return Ok(Vec::new());
        }
        let value = match self.client()?.issue_cmd(BrowserLog).await {
            Ok(value) => value,
            Err(err) => {
                // Drivers without the log endpoint answer every call the same way.
                tracing::debug!(%err, "browser console log unavailable; forwarding disabled");
                self.console_log = false;
                return Ok(Vec::new());
            }
        };
        let entries = value
            .as_array()
            .map(|entries| entries.iter().filter_map(ConsoleEntry::from_log_value).collect())
            .unwrap_or_default();
        Ok(entries)
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        if let Some(client) = self.client.take() {
            client.close().await?;
        }
        Ok(())
    }
}

/// Chromium's `browser` log, fetched and cleared in one request.
#[derive(Debug)]
struct BrowserLog;

impl WebDriverCompatibleCommand for BrowserLog {
    fn endpoint(&self, base_url: &Url, session_id: Option<&str>) -> Result<Url, url::ParseError> {
        base_url.join(&format!("session/{}/se/log", session_id.unwrap_or_default()))
    }

    fn method_and_body(&self, _request_url: &Url) -> (http::Method, Option<String>) {
        (http::Method::POST, Some(json!({ "type": "browser" }).to_string()))
    }
}

fn chrome_capabilities(args: &[String], viewport_px: u32) -> Value {
    let mut args: Vec<String> = args.to_vec();
    args.push(format!("--window-size={viewport_px},{viewport_px}"));
    json!({
        "browserName": "chrome",
        "goog:chromeOptions": {
            "args": args,
            "excludeSwitches": ["enable-logging"]
        },
        "goog:loggingPrefs": { "browser": "ALL" }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capabilities_carry_args_and_window_size() {
        let caps = chrome_capabilities(&["--headless=new".to_string()], 256);
        assert_eq!(caps["browserName"], "chrome");
        let args = caps["goog:chromeOptions"]["args"].as_array().unwrap();
        assert_eq!(args[0], "--headless=new");
        assert_eq!(args[1], "--window-size=256,256");
        assert_eq!(caps["goog:loggingPrefs"]["browser"], "ALL");
    }

    #[test]
    fn webdriver_log_entries_are_parsed() {
        let warning = json!({
            "level": "WARNING",
            "message": "WebGL: INVALID_OPERATION",
            "source": "console-api",
            "timestamp": 1
        });
        let entry = ConsoleEntry::from_log_value(&warning).unwrap();
        assert_eq!(entry.level, ConsoleLevel::Warning);
        assert_eq!(entry.tag(), "browser:warning");

        let thrown = json!({
            "level": "SEVERE",
            "message": "Uncaught Error: shader compile failed",
            "source": "javascript"
        });
        let entry = ConsoleEntry::from_log_value(&thrown).unwrap();
        assert_eq!(entry, ConsoleEntry::page_error("Uncaught Error: shader compile failed"));
        assert_eq!(entry.tag(), "browser:pageerror");

        assert!(ConsoleEntry::from_log_value(&json!({ "level": "INFO" })).is_none());
    }

    #[test]
    fn browser_log_command_targets_the_session() {
        let base = Url::parse("http://localhost:9515/").unwrap();
        let endpoint = BrowserLog.endpoint(&base, Some("abc")).unwrap();
        assert_eq!(endpoint.as_str(), "http://localhost:9515/session/abc/se/log");
        let (method, body) = BrowserLog.method_and_body(&endpoint);
        assert_eq!(method, http::Method::POST);
        assert_eq!(body.as_deref(), Some(r#"{"type":"browser"}"#));
    }
}
