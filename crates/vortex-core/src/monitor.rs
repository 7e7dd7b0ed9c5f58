//! Completion-dialog polling monitor.
//!
//! The accessibility backend has no events, so conversion completion is
//! detected cooperatively: every `poll_interval` the monitor queries the
//! completion dialog under the main window and stops when it exists and is
//! visible, or when the conversion deadline passes. Progress is surfaced
//! through a rate-limited callback rather than console writes, so callers
//! decide how (and whether) to render it.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};
use vortex_proto::{ControlHandle, ControlKind, ControlQuery, Key, UiDriver};

use crate::config::HarnessConfig;

/// One way of getting rid of the completion dialog.
///
/// The dialog is a custom form and which dismissal it honors varies between
/// application versions, so the monitor walks an explicit ordered list
/// instead of hardcoding one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DismissStrategy {
    /// Activate a button inside the dialog.
    ConfirmButton,
    Enter,
    Space,
    Close,
    AltF4,
}

impl DismissStrategy {
    /// Attempt order. Gentlest first; `AltF4` is the last resort.
    pub const ALL: [DismissStrategy; 5] = [
        DismissStrategy::ConfirmButton,
        DismissStrategy::Enter,
        DismissStrategy::Space,
        DismissStrategy::Close,
        DismissStrategy::AltF4,
    ];
}

/// Result of waiting for the conversion to finish.
#[derive(Debug, Clone, Copy)]
pub enum MonitorOutcome {
    /// The completion dialog appeared after `waited`.
    Completed {
        waited: Duration,
        dialog: ControlHandle,
    },
    /// The deadline passed without the dialog appearing.
    TimedOut { waited: Duration, limit: Duration },
}

/// Polls for the completion dialog and dismisses it.
pub struct ConversionMonitor<'a> {
    driver: &'a dyn UiDriver,
    /// Main application window the dialog is searched under.
    parent: ControlHandle,
    dialog_id: String,
    timeout: Duration,
    poll_interval: Duration,
    progress_every: Duration,
}

impl<'a> ConversionMonitor<'a> {
    pub fn new(driver: &'a dyn UiDriver, parent: ControlHandle, config: &HarnessConfig) -> Self {
        Self {
            driver,
            parent,
            dialog_id: config.completion_dialog_id.clone(),
            timeout: config.conversion_timeout(),
            poll_interval: config.poll_interval(),
            progress_every: config.progress_every(),
        }
    }

    /// Waits until the completion dialog shows up or the deadline passes.
    ///
    /// `on_progress` receives the elapsed wait at most once per
    /// `progress_every`.
    pub async fn wait(&self, on_progress: &mut dyn FnMut(Duration)) -> MonitorOutcome {
        let query = ControlQuery::new(ControlKind::Dialog).with_auto_id(self.dialog_id.clone());
        let started = Instant::now();
        let mut last_progress = Duration::ZERO;

        loop {
            if let Ok(dialog) = self.driver.find_child(&self.parent, &query).await {
                if self.driver.is_visible(&dialog).await {
                    let waited = started.elapsed();
                    info!(waited = ?waited, "completion dialog appeared");
                    return MonitorOutcome::Completed { waited, dialog };
                }
            }

            let elapsed = started.elapsed();
            if elapsed >= self.timeout {
                return MonitorOutcome::TimedOut {
                    waited: elapsed,
                    limit: self.timeout,
                };
            }
            if elapsed - last_progress >= self.progress_every {
                on_progress(elapsed);
                last_progress = elapsed;
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Dismisses the dialog, returning the first strategy after which it no
    /// longer exists. A `None` is logged but not fatal: the conversion
    /// itself already succeeded, a lingering dialog only inconveniences the
    /// next case.
    pub async fn dismiss(&self, dialog: ControlHandle) -> Option<DismissStrategy> {
        for strategy in DismissStrategy::ALL {
            // Individual action failures (unsupported key, vanished button)
            // are part of probing; only the existence check decides.
            let attempt = match strategy {
                DismissStrategy::ConfirmButton => {
                    match self
                        .driver
                        .find_child(&dialog, &ControlQuery::new(ControlKind::Button))
                        .await
                    {
                        Ok(button) => self.driver.activate(&button).await,
                        Err(err) => Err(err),
                    }
                }
                DismissStrategy::Enter => self.driver.send_key(&dialog, Key::Enter).await,
                DismissStrategy::Space => self.driver.send_key(&dialog, Key::Space).await,
                DismissStrategy::Close => self.driver.close(&dialog).await,
                DismissStrategy::AltF4 => self.driver.send_key(&dialog, Key::AltF4).await,
            };
            if let Err(err) = attempt {
                debug!(strategy = ?strategy, error = %err, "dismiss attempt failed");
            }
            if !self.driver.exists(&dialog).await {
                debug!(strategy = ?strategy, "completion dialog dismissed");
                return Some(strategy);
            }
        }
        warn!("completion dialog resisted every dismissal strategy");
        None
    }
}
