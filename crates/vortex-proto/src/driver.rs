//! The UI driver capability trait and its handle/query model.
//!
//! The harness never talks to the accessibility backend directly; every
//! lookup and manipulation goes through [`UiDriver`]. All UI elements,
//! windows included, are represented by the same opaque [`ControlHandle`] —
//! operations that only make sense for some control kinds fail with
//! [`DriverError::Unsupported`](crate::DriverError::Unsupported) rather than
//! doing nothing.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// The kinds of controls the conversion workflow touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlKind {
    Window,
    Dialog,
    Button,
    Pane,
    RadioButton,
    CheckBox,
    Edit,
    TreeItem,
}

/// Opaque handle to a UI element tracked by a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControlHandle {
    id: u64,
    kind: ControlKind,
}

impl ControlHandle {
    /// Creates a handle. Only driver implementations should mint these.
    pub fn new(id: u64, kind: ControlKind) -> Self {
        Self { id, kind }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> ControlKind {
        self.kind
    }
}

/// How a window or control title is matched during lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TitleMatch {
    /// Exact string equality.
    Exact(String),
    /// Regex match anywhere in the title (the original harness used
    /// `title_re` lookups for project windows whose titles embed timestamps).
    Pattern(String),
}

impl TitleMatch {
    /// Builds a pattern matcher, validating the regex eagerly.
    pub fn pattern(pattern: impl Into<String>) -> std::result::Result<Self, regex::Error> {
        let pattern = pattern.into();
        Regex::new(&pattern)?;
        Ok(TitleMatch::Pattern(pattern))
    }

    /// Whether `title` satisfies this matcher.
    pub fn matches(&self, title: &str) -> bool {
        match self {
            TitleMatch::Exact(expected) => title == expected,
            // Validated at construction; a pattern that somehow fails to
            // compile matches nothing.
            TitleMatch::Pattern(pattern) => {
                Regex::new(pattern).is_ok_and(|re| re.is_match(title))
            }
        }
    }
}

impl fmt::Display for TitleMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TitleMatch::Exact(s) => write!(f, "'{s}'"),
            TitleMatch::Pattern(p) => write!(f, "/{p}/"),
        }
    }
}

/// A child-control lookup: kind plus optional title and automation id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlQuery {
    pub kind: ControlKind,
    pub title: Option<TitleMatch>,
    pub auto_id: Option<String>,
}

impl ControlQuery {
    pub fn new(kind: ControlKind) -> Self {
        Self {
            kind,
            title: None,
            auto_id: None,
        }
    }

    /// Shorthand for the common kind + exact title lookup.
    pub fn titled(kind: ControlKind, title: impl Into<String>) -> Self {
        Self::new(kind).with_title(TitleMatch::Exact(title.into()))
    }

    pub fn with_title(mut self, title: TitleMatch) -> Self {
        self.title = Some(title);
        self
    }

    pub fn with_auto_id(mut self, auto_id: impl Into<String>) -> Self {
        self.auto_id = Some(auto_id.into());
        self
    }
}

impl fmt::Display for ControlQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(title) = &self.title {
            write!(f, " {title}")?;
        }
        if let Some(auto_id) = &self.auto_id {
            write!(f, " [auto_id={auto_id}]")?;
        }
        Ok(())
    }
}

/// Target state for [`UiDriver::wait_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitState {
    pub visible: bool,
    pub enabled: bool,
}

impl WaitState {
    /// Wait for visibility only.
    pub const VISIBLE: WaitState = WaitState {
        visible: true,
        enabled: false,
    };

    /// Wait for visible and enabled (the usual pre-click wait).
    pub const VISIBLE_ENABLED: WaitState = WaitState {
        visible: true,
        enabled: true,
    };
}

/// Current state of a toggleable control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToggleState {
    On,
    Off,
    Indeterminate,
}

/// Keystrokes the workflow may send when dismissing dialogs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    Enter,
    Space,
    AltF4,
}

/// Capability contract with the accessibility backend.
///
/// All operations are point-in-time: there are no events or subscriptions,
/// which is why conversion completion is detected by polling
/// [`exists`](UiDriver::exists) / [`is_visible`](UiDriver::is_visible).
/// Implementations must be safe to share across tasks.
#[async_trait]
pub trait UiDriver: Send + Sync {
    /// Finds a top-level window by title.
    async fn find_window(&self, title: &TitleMatch) -> Result<ControlHandle>;

    /// Finds a control anywhere under `parent`.
    async fn find_child(&self, parent: &ControlHandle, query: &ControlQuery)
    -> Result<ControlHandle>;

    /// Waits until the control reaches `state`, or fails with
    /// [`DriverError::Timeout`](crate::DriverError::Timeout).
    async fn wait_state(
        &self,
        handle: &ControlHandle,
        state: WaitState,
        timeout: Duration,
    ) -> Result<()>;

    /// Clicks/invokes the control.
    async fn activate(&self, handle: &ControlHandle) -> Result<()>;

    /// Flips a checkbox. Fails with `Unsupported` on non-toggleable kinds.
    async fn toggle(&self, handle: &ControlHandle) -> Result<()>;

    /// Reads the current toggle state.
    async fn toggle_state(&self, handle: &ControlHandle) -> Result<ToggleState>;

    /// Replaces the text of an edit control.
    async fn set_text(&self, handle: &ControlHandle, text: &str) -> Result<()>;

    /// Sends a keystroke to the element.
    async fn send_key(&self, handle: &ControlHandle, key: Key) -> Result<()>;

    /// Asks the element to close (windows and dialogs only).
    async fn close(&self, handle: &ControlHandle) -> Result<()>;

    /// Whether the element still exists. Never errors; a stale handle
    /// simply does not exist.
    async fn exists(&self, handle: &ControlHandle) -> bool;

    /// Whether the element exists and is visible.
    async fn is_visible(&self, handle: &ControlHandle) -> bool;

    /// Current window text of the element.
    async fn window_title(&self, handle: &ControlHandle) -> Result<String>;

    /// OS process id owning the element (used for resource sampling).
    async fn process_id(&self, handle: &ControlHandle) -> Result<u32>;

    /// Brings the element's window to the foreground.
    async fn focus(&self, handle: &ControlHandle) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_title_match() {
        let m = TitleMatch::Exact("VORTEX Client".into());
        assert!(m.matches("VORTEX Client"));
        assert!(!m.matches("VORTEX Client - modeling"));
    }

    #[test]
    fn pattern_title_match() {
        let m = TitleMatch::pattern(r".*pro103.*").unwrap();
        assert!(m.matches("modeling_20251231 - pro103, 8 stations"));
        assert!(!m.matches("unrelated window"));
    }

    #[test]
    fn invalid_pattern_rejected_eagerly() {
        assert!(TitleMatch::pattern("(unclosed").is_err());
    }

    #[test]
    fn query_display_includes_all_parts() {
        let q = ControlQuery::titled(ControlKind::Button, "Export").with_auto_id("uiButton3");
        let text = q.to_string();
        assert!(text.contains("Button"));
        assert!(text.contains("Export"));
        assert!(text.contains("uiButton3"));
    }

    #[test]
    fn handle_preserves_kind() {
        let h = ControlHandle::new(7, ControlKind::CheckBox);
        assert_eq!(h.id(), 7);
        assert_eq!(h.kind(), ControlKind::CheckBox);
    }
}
