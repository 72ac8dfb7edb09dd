//! Document-level readiness flag polled by the thumbnail capture tool.

/// `data-*` attribute on `<body>` that carries the readiness state.
pub const READY_ATTRIBUTE: &str = "data-thumbnail-ready";

/// Script evaluated in the page; returns `true` once the flag reads `ready`.
pub const READY_CHECK_SCRIPT: &str =
    "return !!document.body && document.body.dataset.thumbnailReady === 'ready';";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Readiness {
    #[default]
    Pending,
    Ready,
}

impl Readiness {
    pub fn as_str(self) -> &'static str {
        match self {
            Readiness::Pending => "pending",
            Readiness::Ready => "ready",
        }
    }

    /// Attribute name and value to set on `<body>` for this state.
    pub fn attribute(self) -> (&'static str, &'static str) {
        (READY_ATTRIBUTE, self.as_str())
    }
}

/// One-way `pending -> ready` latch, set after the first captured frame.
///
/// The flag is never reset; a fresh page load starts a new flag.
#[derive(Debug, Default)]
pub struct ReadinessFlag {
    state: Readiness,
}

impl ReadinessFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> Readiness {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == Readiness::Ready
    }

    /// Returns `true` only for the call that performed the transition.
    pub fn mark_ready(&mut self) -> bool {
        if self.is_ready() {
            return false;
        }
        self.state = Readiness::Ready;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_exactly_once() {
        let mut flag = ReadinessFlag::new();
        assert_eq!(flag.state().as_str(), "pending");
        assert!(flag.mark_ready());
        assert!(!flag.mark_ready());
        assert_eq!(flag.state().as_str(), "ready");
    }

    #[test]
    fn attribute_matches_the_ready_check_dataset_key() {
        assert_eq!(Readiness::Ready.attribute(), ("data-thumbnail-ready", "ready"));
        assert!(READY_CHECK_SCRIPT.contains("thumbnailReady"));
    }
}
