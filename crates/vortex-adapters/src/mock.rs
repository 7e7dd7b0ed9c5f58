//! Scripted mock driver for cost-free workflow testing.
//!
//! [`MockUiDriver`] holds an in-memory tree of UI elements that tests script
//! up front: windows, panes, radio groups, checkboxes, the folder browser,
//! and a completion dialog that appears a configurable delay after the
//! conversion is kicked off. Every manipulation is journaled so tests can
//! assert ordering and idempotence (e.g. that an already-checked checkbox
//! was not toggled again).
//!
//! The mock enforces the same capability rules a real backend would:
//! toggling a button or typing into a pane fails with
//! [`DriverError::Unsupported`] instead of silently succeeding.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::debug;
use vortex_proto::{
    ControlHandle, ControlKind, ControlQuery, DriverError, Key, Result, TitleMatch, ToggleState,
    UiDriver, WaitState,
};

/// Poll granularity for [`UiDriver::wait_state`] against scripted state.
const WAIT_SLICE: Duration = Duration::from_millis(25);

/// Fake process id reported for every mock window.
const MOCK_PID: u32 = 4242;

#[derive(Debug, Clone)]
struct Node {
    parent: Option<u64>,
    kind: ControlKind,
    title: String,
    auto_id: Option<String>,
    visible: bool,
    enabled: bool,
    toggle: Option<ToggleState>,
    fail_activation: bool,
    present: bool,
    /// Delay after the conversion trigger before this node exists.
    appears_after: Option<Duration>,
    /// Whether dismissal actions actually remove the node.
    dismissable: bool,
    /// Activating this node starts the completion-dialog clock.
    conversion_trigger: bool,
}

#[derive(Debug, Default)]
struct Inner {
    nodes: Vec<Node>,
    triggered_at: Option<Instant>,
    journal: Vec<String>,
}

impl Inner {
    fn node(&self, handle: &ControlHandle) -> Result<&Node> {
        self.nodes
            .get(handle.id() as usize)
            .ok_or_else(|| DriverError::StaleHandle {
                what: format!("mock node #{}", handle.id()),
            })
    }

    fn node_mut(&mut self, handle: &ControlHandle) -> Result<&mut Node> {
        let id = handle.id();
        self.nodes
            .get_mut(id as usize)
            .ok_or_else(|| DriverError::StaleHandle {
                what: format!("mock node #{id}"),
            })
    }

    /// A node exists only if it and all its ancestors are present and any
    /// scheduled appearance delay has elapsed.
    fn is_present(&self, id: u64) -> bool {
        let mut current = id as usize;
        loop {
            let Some(node) = self.nodes.get(current) else {
                return false;
            };
            if !node.present {
                return false;
            }
            if let Some(delay) = node.appears_after {
                let appeared = self
                    .triggered_at
                    .is_some_and(|started| started.elapsed() >= delay);
                if !appeared {
                    return false;
                }
            }
            match node.parent {
                Some(parent) => current = parent as usize,
                None => return true,
            }
        }
    }

    fn is_descendant(&self, id: u64, ancestor: u64) -> bool {
        let mut current = id;
        while let Some(node) = self.nodes.get(current as usize) {
            match node.parent {
                Some(parent) if parent == ancestor => return true,
                Some(parent) => current = parent,
                None => return false,
            }
        }
        false
    }

    fn matches(&self, id: u64, node: &Node, query: &ControlQuery) -> bool {
        if node.kind != query.kind || !self.is_present(id) {
            return false;
        }
        if let Some(title) = &query.title {
            if !title.matches(&node.title) {
                return false;
            }
        }
        if let Some(auto_id) = &query.auto_id {
            if node.auto_id.as_deref() != Some(auto_id.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Scripted in-memory [`UiDriver`].
///
/// Cloning shares the underlying tree, so a clone handed to a workflow and
/// the original held by a test observe the same state.
#[derive(Debug, Clone, Default)]
pub struct MockUiDriver {
    inner: Arc<Mutex<Inner>>,
}

impl MockUiDriver {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn insert(&self, node: Node) -> ControlHandle {
        let mut state = self.state();
        let kind = node.kind;
        let id = state.nodes.len() as u64;
        state.nodes.push(node);
        ControlHandle::new(id, kind)
    }

    /// Adds a top-level window.
    pub fn add_window(&self, title: impl Into<String>) -> ControlHandle {
        self.insert(Node {
            parent: None,
            kind: ControlKind::Window,
            title: title.into(),
            auto_id: None,
            visible: true,
            enabled: true,
            toggle: None,
            fail_activation: false,
            present: true,
            appears_after: None,
            dismissable: true,
            conversion_trigger: false,
        })
    }

    /// Adds a child element under `parent`.
    pub fn add_child(
        &self,
        parent: ControlHandle,
        kind: ControlKind,
        title: impl Into<String>,
    ) -> ControlHandle {
        self.insert(Node {
            parent: Some(parent.id()),
            kind,
            title: title.into(),
            auto_id: None,
            visible: true,
            enabled: true,
            toggle: matches!(kind, ControlKind::CheckBox | ControlKind::RadioButton)
                .then_some(ToggleState::Off),
            fail_activation: false,
            present: true,
            appears_after: None,
            dismissable: true,
            conversion_trigger: false,
        })
    }

    /// Assigns an automation id to an element.
    pub fn set_auto_id(&self, handle: ControlHandle, auto_id: impl Into<String>) {
        if let Ok(node) = self.state().node_mut(&handle) {
            node.auto_id = Some(auto_id.into());
        }
    }

    /// Presets a toggleable control's state.
    pub fn set_toggle_state(&self, handle: ControlHandle, toggle: ToggleState) {
        if let Ok(node) = self.state().node_mut(&handle) {
            node.toggle = Some(toggle);
        }
    }

    /// Makes activation of this control fail with a backend error.
    pub fn fail_activation(&self, handle: ControlHandle) {
        if let Ok(node) = self.state().node_mut(&handle) {
            node.fail_activation = true;
        }
    }

    /// Keeps the element in the tree but permanently disabled.
    pub fn set_disabled(&self, handle: ControlHandle) {
        if let Ok(node) = self.state().node_mut(&handle) {
            node.enabled = false;
        }
    }

    /// Marks the control whose activation starts the conversion clock
    /// (the folder-browser confirm button in the real application).
    pub fn mark_conversion_trigger(&self, handle: ControlHandle) {
        if let Ok(node) = self.state().node_mut(&handle) {
            node.conversion_trigger = true;
        }
    }

    /// Schedules a completion dialog under `parent` that exists once
    /// `delay` has elapsed after the conversion trigger was activated.
    pub fn add_completion_dialog(
        &self,
        parent: ControlHandle,
        auto_id: impl Into<String>,
        delay: Duration,
    ) -> ControlHandle {
        let handle = self.add_child(parent, ControlKind::Dialog, "Export finished");
        if let Ok(node) = self.state().node_mut(&handle) {
            node.auto_id = Some(auto_id.into());
            node.appears_after = Some(delay);
        }
        handle
    }

    /// Makes every dismissal action on the element succeed without
    /// actually removing it.
    pub fn set_undismissable(&self, handle: ControlHandle) {
        if let Ok(node) = self.state().node_mut(&handle) {
            node.dismissable = false;
        }
    }

    /// Removes the element (and, by ancestry, its subtree) from the tree.
    pub fn remove(&self, handle: ControlHandle) {
        if let Ok(node) = self.state().node_mut(&handle) {
            node.present = false;
        }
    }

    /// The ordered manipulation journal (`activate:`, `toggle:`,
    /// `set_text:`, `key:`, `close:` entries).
    pub fn journal(&self) -> Vec<String> {
        self.state().journal.clone()
    }

    /// Number of `toggle:` journal entries for a control title.
    pub fn toggle_count(&self, title: &str) -> usize {
        let entry = format!("toggle:{title}");
        self.state().journal.iter().filter(|e| **e == entry).count()
    }

    fn record(&self, entry: String) {
        debug!(entry = %entry, "mock journal");
        self.state().journal.push(entry);
    }

    fn dismiss(&self, handle: &ControlHandle) {
        let mut state = self.state();
        let dismissable = state.node(handle).map(|n| n.dismissable).unwrap_or(false);
        if dismissable {
            if let Ok(node) = state.node_mut(handle) {
                node.present = false;
            }
        }
    }
}

#[async_trait]
impl UiDriver for MockUiDriver {
    async fn find_window(&self, title: &TitleMatch) -> Result<ControlHandle> {
        let state = self.state();
        for (id, node) in state.nodes.iter().enumerate() {
            let id = id as u64;
            if node.parent.is_none()
                && node.kind == ControlKind::Window
                && state.is_present(id)
                && title.matches(&node.title)
            {
                return Ok(ControlHandle::new(id, node.kind));
            }
        }
        Err(DriverError::NotFound {
            what: format!("window {title}"),
        })
    }

    async fn find_child(
        &self,
        parent: &ControlHandle,
        query: &ControlQuery,
    ) -> Result<ControlHandle> {
        let state = self.state();
        for (id, node) in state.nodes.iter().enumerate() {
            let id = id as u64;
            if state.is_descendant(id, parent.id()) && state.matches(id, node, query) {
                return Ok(ControlHandle::new(id, node.kind));
            }
        }
        Err(DriverError::NotFound {
            what: query.to_string(),
        })
    }

    async fn wait_state(
        &self,
        handle: &ControlHandle,
        state: WaitState,
        timeout: Duration,
    ) -> Result<()> {
        let started = Instant::now();
        loop {
            {
                let inner = self.state();
                if inner.is_present(handle.id()) {
                    if let Ok(node) = inner.node(handle) {
                        let visible_ok = !state.visible || node.visible;
                        let enabled_ok = !state.enabled || node.enabled;
                        if visible_ok && enabled_ok {
                            return Ok(());
                        }
                    }
                }
            }
            if started.elapsed() >= timeout {
                let what = self
                    .state()
                    .node(handle)
                    .map(|n| format!("{:?} '{}'", n.kind, n.title))
                    .unwrap_or_else(|_| format!("mock node #{}", handle.id()));
                return Err(DriverError::Timeout {
                    what,
                    waited: started.elapsed(),
                });
            }
            tokio::time::sleep(WAIT_SLICE).await;
        }
    }

    async fn activate(&self, handle: &ControlHandle) -> Result<()> {
        let (title, fail, trigger, kind) = {
            let state = self.state();
            let node = state.node(handle)?;
            if !state.is_present(handle.id()) {
                return Err(DriverError::NotFound {
                    what: format!("{:?} '{}'", node.kind, node.title),
                });
            }
            (
                node.title.clone(),
                node.fail_activation,
                node.conversion_trigger,
                node.kind,
            )
        };

        if kind == ControlKind::Edit {
            return Err(DriverError::Unsupported {
                operation: "activate",
                kind,
            });
        }
        if fail {
            return Err(DriverError::Backend(format!(
                "activation rejected by element '{title}'"
            )));
        }

        // Radio activation selects within its mutually exclusive group.
        if kind == ControlKind::RadioButton {
            let mut state = self.state();
            let parent = state.node(handle)?.parent;
            for node in &mut state.nodes {
                if node.kind == ControlKind::RadioButton && node.parent == parent {
                    node.toggle = Some(ToggleState::Off);
                }
            }
            state.node_mut(handle)?.toggle = Some(ToggleState::On);
        }

        if trigger {
            self.state().triggered_at = Some(Instant::now());
        }
        // Activating a dismissable dialog's confirm button closes the dialog.
        if kind == ControlKind::Button {
            let dialog = {
                let state = self.state();
                state.node(handle)?.parent.and_then(|pid| {
                    let parent = state.nodes.get(pid as usize)?;
                    (parent.kind == ControlKind::Dialog)
                        .then_some(ControlHandle::new(pid, parent.kind))
                })
            };
            if let Some(dialog) = dialog {
                self.dismiss(&dialog);
            }
        }

        self.record(format!("activate:{title}"));
        Ok(())
    }

    async fn toggle(&self, handle: &ControlHandle) -> Result<()> {
        let title = {
            let mut state = self.state();
            let kind = state.node(handle)?.kind;
            if kind != ControlKind::CheckBox {
                return Err(DriverError::Unsupported {
                    operation: "toggle",
                    kind,
                });
            }
            let node = state.node_mut(handle)?;
            node.toggle = Some(match node.toggle {
                Some(ToggleState::On) => ToggleState::Off,
                _ => ToggleState::On,
            });
            node.title.clone()
        };
        self.record(format!("toggle:{title}"));
        Ok(())
    }

    async fn toggle_state(&self, handle: &ControlHandle) -> Result<ToggleState> {
        let state = self.state();
        let node = state.node(handle)?;
        node.toggle.ok_or(DriverError::Unsupported {
            operation: "toggle_state",
            kind: node.kind,
        })
    }

    async fn set_text(&self, handle: &ControlHandle, text: &str) -> Result<()> {
        let title = {
            let state = self.state();
            let node = state.node(handle)?;
            if node.kind != ControlKind::Edit {
                return Err(DriverError::Unsupported {
                    operation: "set_text",
                    kind: node.kind,
                });
            }
            node.title.clone()
        };
        self.record(format!("set_text:{title}={text}"));
        Ok(())
    }

    async fn send_key(&self, handle: &ControlHandle, key: Key) -> Result<()> {
        let (kind, title) = {
            let state = self.state();
            let node = state.node(handle)?;
            (node.kind, node.title.clone())
        };
        if !matches!(kind, ControlKind::Window | ControlKind::Dialog) {
            return Err(DriverError::Unsupported {
                operation: "send_key",
                kind,
            });
        }
        if kind == ControlKind::Dialog {
            self.dismiss(handle);
        }
        self.record(format!("key:{title}:{key:?}"));
        Ok(())
    }

    async fn close(&self, handle: &ControlHandle) -> Result<()> {
        let (kind, title) = {
            let state = self.state();
            let node = state.node(handle)?;
            (node.kind, node.title.clone())
        };
        if !matches!(kind, ControlKind::Window | ControlKind::Dialog) {
            return Err(DriverError::Unsupported {
                operation: "close",
                kind,
            });
        }
        self.dismiss(handle);
        self.record(format!("close:{title}"));
        Ok(())
    }

    async fn exists(&self, handle: &ControlHandle) -> bool {
        self.state().is_present(handle.id())
    }

    async fn is_visible(&self, handle: &ControlHandle) -> bool {
        let state = self.state();
        state.is_present(handle.id()) && state.node(handle).map(|n| n.visible).unwrap_or(false)
    }

    async fn window_title(&self, handle: &ControlHandle) -> Result<String> {
        let state = self.state();
        Ok(state.node(handle)?.title.clone())
    }

    async fn process_id(&self, handle: &ControlHandle) -> Result<u32> {
        self.state().node(handle)?;
        Ok(MOCK_PID)
    }

    async fn focus(&self, handle: &ControlHandle) -> Result<()> {
        let state = self.state();
        let node = state.node(handle)?;
        if !matches!(node.kind, ControlKind::Window | ControlKind::Dialog) {
            return Err(DriverError::Unsupported {
                operation: "focus",
                kind: node.kind,
            });
        }
        Ok(())
    }
}
