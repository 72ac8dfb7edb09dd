use std::collections::BTreeSet;
use std::time::Duration;

use crate::cli::Cli;

pub const DEFAULT_DELAY_MS: u64 = 250;
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_THUMBNAIL_SIZE: u32 = 512;

/// Settings for one capture run, fixed once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureOptions {
    /// Overwrite thumbnails that already exist.
    pub force: bool,
    /// Settle delay after the readiness flag flips.
    pub delay_ms: u64,
    /// Bound for the readiness and canvas waits.
    pub timeout_ms: u64,
    /// Square viewport and output size in pixels.
    pub viewport_px: u32,
    /// Restrict the run to these shader ids.
    pub only: Option<BTreeSet<String>>,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            force: false,
            delay_ms: DEFAULT_DELAY_MS,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            viewport_px: DEFAULT_THUMBNAIL_SIZE,
            only: None,
        }
    }
}

impl CaptureOptions {
    /// Normalise raw CLI values; anything unparsable or out of range keeps its default.
    pub fn from_cli(cli: &Cli) -> Self {
        let defaults = Self::default();
        Self {
            force: cli.force,
            delay_ms: parse_non_negative(cli.delay.as_deref()).unwrap_or(defaults.delay_ms),
            timeout_ms: parse_positive(cli.timeout.as_deref()).unwrap_or(defaults.timeout_ms),
            viewport_px: parse_positive(cli.size.as_deref())
                .and_then(|size| u32::try_from(size).ok())
                .unwrap_or(defaults.viewport_px),
            only: cli.only.as_deref().and_then(parse_id_list),
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn parse_non_negative(raw: Option<&str>) -> Option<u64> {
    let raw = raw?.trim_start();
    let (negative, rest) = match raw.as_bytes().first() {
        Some(b'-') => (true, &raw[1..]),
        Some(b'+') => (false, &raw[1..]),
        _ => (false, raw),
    };
    // Only the leading digit run counts; trailing text is ignored.
    let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    let value = rest[..digits].parse::<u64>().ok()?;
    (!negative || value == 0).then_some(value)
}

fn parse_positive(raw: Option<&str>) -> Option<u64> {
    parse_non_negative(raw).filter(|value| *value > 0)
}

fn parse_id_list(raw: &str) -> Option<BTreeSet<String>> {
    let ids: BTreeSet<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect();
    (!ids.is_empty()).then_some(ids)
}
