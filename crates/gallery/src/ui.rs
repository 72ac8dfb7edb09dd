//! DOM-free model of the gallery controls.
//!
//! The host page renders [`GalleryUi`] as a scrollable strip of shader
//! buttons plus fullscreen and visibility toggles, forwards DOM events to the
//! methods below and applies the returned outcomes. Selections flow into the
//! render core through [`SelectionSink`].

use std::time::Instant;

use crate::app::{AppError, RenderApp};
use crate::backend::RenderBackend;
use crate::catalog::ShaderCatalog;
use crate::query::normalize_base_path;

/// Receives "selection changed" events from the UI.
pub trait SelectionSink {
    type Error;

    fn select_shader(&mut self, id: &str) -> Result<(), Self::Error>;
}

impl<B: RenderBackend> SelectionSink for RenderApp<B> {
    type Error = AppError;

    fn select_shader(&mut self, id: &str) -> Result<(), AppError> {
        self.activate(id, Instant::now()).map(|_| ())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StripButton {
    pub id: String,
    pub label: String,
    pub tooltip: Option<String>,
    pub thumbnail_url: String,
    pub active: bool,
}

/// Raw wheel deltas as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelDelta {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelOutcome {
    /// New horizontal scroll offset of the strip.
    pub scroll_left: f64,
    /// Always set: the page must not scroll vertically under the strip.
    pub prevent_default: bool,
}

/// What the host should do when the fullscreen button is pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FullscreenRequest {
    Enter,
    Exit,
}

#[derive(Debug, Clone)]
pub struct GalleryUi {
    buttons: Vec<StripButton>,
    fullscreen: bool,
    strip_visible: bool,
    scroll_left: f64,
}

impl GalleryUi {
    pub fn build(catalog: &ShaderCatalog, base_path: &str, active: Option<&str>) -> Self {
        let base = normalize_base_path(base_path);
        let buttons = catalog
            .iter()
            .map(|definition| {
                let entry = definition.entry();
                let thumbnail = entry.thumbnail_path();
                StripButton {
                    id: entry.id.to_string(),
                    label: entry.name.to_string(),
                    tooltip: entry.description.map(str::to_string),
                    thumbnail_url: format!("{base}{}", thumbnail.trim_start_matches('/')),
                    active: Some(entry.id) == active,
                }
            })
            .collect();
        Self {
            buttons,
            fullscreen: false,
            strip_visible: true,
            scroll_left: 0.0,
        }
    }

    pub fn buttons(&self) -> &[StripButton] {
        &self.buttons
    }

    pub fn active_id(&self) -> Option<&str> {
        self.buttons
            .iter()
            .find(|button| button.active)
            .map(|button| button.id.as_str())
    }

    /// Handle a click on a strip button. Returns `false` for a repeat click.
    pub fn select<S: SelectionSink>(&mut self, id: &str, sink: &mut S) -> Result<bool, S::Error> {
        if self.active_id() == Some(id) {
            return Ok(false);
        }
        sink.select_shader(id)?;
        for button in &mut self.buttons {
            button.active = button.id == id;
        }
        Ok(true)
    }

    /// Map any wheel axis onto horizontal strip scrolling.
    pub fn on_wheel(&mut self, delta: WheelDelta, max_scroll: f64) -> WheelOutcome {
        let step = if delta.y.abs() > delta.x.abs() {
            delta.y
        } else {
            delta.x
        };
        self.scroll_left = (self.scroll_left + step).clamp(0.0, max_scroll.max(0.0));
        WheelOutcome {
            scroll_left: self.scroll_left,
            prevent_default: true,
        }
    }

    /// Request derived from the last observed fullscreen state.
    pub fn fullscreen_request(&self) -> FullscreenRequest {
        if self.fullscreen {
            FullscreenRequest::Exit
        } else {
            FullscreenRequest::Enter
        }
    }

    /// Record the host's `fullscreenchange` event.
    pub fn on_fullscreen_change(&mut self, is_fullscreen: bool) {
        self.fullscreen = is_fullscreen;
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn fullscreen_label(&self) -> &'static str {
        if self.fullscreen {
            "Exit fullscreen"
        } else {
            "Fullscreen"
        }
    }

    pub fn toggle_strip(&mut self) -> bool {
        self.strip_visible = !self.strip_visible;
        self.strip_visible
    }

    pub fn is_strip_visible(&self) -> bool {
        self.strip_visible
    }

    pub fn strip_toggle_label(&self) -> &'static str {
        if self.strip_visible {
            "Hide shaders"
        } else {
            "Show shaders"
        }
    }
}
