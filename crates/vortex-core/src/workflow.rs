//! Conversion workflow state machine.
//!
//! One [`ConversionWorkflow`] drives the external application through a
//! single case: connect, locate the project window, open the export dialog,
//! configure it from the case parameters, pick the output folder, then wait
//! for the completion dialog. Step errors never escape the case boundary —
//! [`execute`](ConversionWorkflow::execute) always returns a complete
//! [`CaseResult`], so one broken case cannot take down a batch.

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};
use vortex_proto::{
    ControlHandle, ControlKind, ControlQuery, DriverError, TitleMatch, ToggleState, UiDriver,
    WaitState,
};

use crate::case::TestCaseConfig;
use crate::config::HarnessConfig;
use crate::monitor::{ConversionMonitor, MonitorOutcome};
use crate::result::{CaseResult, CaseStatus, StepStatus};

/// Where the workflow currently is. Advanced only by the owning workflow;
/// exposed for inspection and progress rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    Connected,
    WindowLocated,
    ExportInvoked,
    OptionsConfigured,
    PathSelected,
    Converting,
    Completed { success: bool },
}

/// A failed workflow step.
///
/// Structural failures (control missing, wait or conversion timed out,
/// unsupported operation) mean the application did not behave as the case
/// expects and map to [`CaseStatus::Failed`]; anything else is an
/// environment or harness problem and maps to [`CaseStatus::Errored`].
#[derive(Debug, Error)]
pub enum StepError {
    #[error("step '{step}': {source}")]
    Failed {
        step: &'static str,
        #[source]
        source: DriverError,
    },

    #[error("step '{step}': unexpected driver failure: {source}")]
    Unexpected {
        step: &'static str,
        #[source]
        source: DriverError,
    },

    #[error("conversion did not finish within {limit:.0?} (waited {waited:.1?})")]
    ConversionTimedOut { waited: Duration, limit: Duration },
}

impl StepError {
    fn from_driver(step: &'static str, source: DriverError) -> Self {
        if source.is_structural() {
            StepError::Failed { step, source }
        } else {
            StepError::Unexpected { step, source }
        }
    }

    /// The step this error surfaced in.
    pub fn step(&self) -> &'static str {
        match self {
            StepError::Failed { step, .. } | StepError::Unexpected { step, .. } => step,
            StepError::ConversionTimedOut { .. } => steps::MONITOR_CONVERSION,
        }
    }

    /// The final case status this error implies.
    pub fn case_status(&self) -> CaseStatus {
        match self {
            StepError::Failed { .. } | StepError::ConversionTimedOut { .. } => CaseStatus::Failed,
            StepError::Unexpected { .. } => CaseStatus::Errored,
        }
    }
}

/// Canonical step names, used both for records and log lines.
mod steps {
    pub const CONNECT: &str = "connect";
    pub const LOCATE_WINDOW: &str = "locate_window";
    pub const INVOKE_EXPORT: &str = "invoke_export";
    pub const SELECT_POINT_CLOUD: &str = "select_point_cloud";
    pub const CONFIGURE_EXPORT: &str = "configure_export";
    pub const SELECT_OUTPUT_PATH: &str = "select_output_path";
    pub const MONITOR_CONVERSION: &str = "monitor_conversion";
}

/// Drives one case through the application.
pub struct ConversionWorkflow<'a> {
    driver: &'a dyn UiDriver,
    config: &'a HarnessConfig,
    state: WorkflowState,
    process_id: Option<u32>,
}

impl<'a> ConversionWorkflow<'a> {
    pub fn new(driver: &'a dyn UiDriver, config: &'a HarnessConfig) -> Self {
        Self {
            driver,
            config,
            state: WorkflowState::Idle,
            process_id: None,
        }
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    /// Process id of the application, known once `connect` has run.
    pub fn process_id(&self) -> Option<u32> {
        self.process_id
    }

    /// Runs the whole workflow for one case.
    ///
    /// `on_wait` receives rate-limited elapsed-time ticks while the
    /// conversion is in progress.
    pub async fn execute(
        &mut self,
        case: &TestCaseConfig,
        on_wait: &mut dyn FnMut(Duration),
    ) -> CaseResult {
        info!(case = %case.id, "case started");
        self.state = WorkflowState::Idle;
        let mut result = CaseResult::started(case.clone());

        match self.run(case, &mut result, on_wait).await {
            Ok(()) => {
                self.state = WorkflowState::Completed { success: true };
                result.finish(CaseStatus::Passed);
                info!(case = %case.id, duration = ?result.duration, "case passed");
            }
            Err(err) => {
                self.state = WorkflowState::Completed { success: false };
                let status = err.case_status();
                result.record_step(err.step(), StepStatus::Failed, err.to_string());
                result.error = Some(err.to_string());
                result.finish(status);
                warn!(case = %case.id, status = ?status, error = %err, "case did not pass");
            }
        }
        result
    }

    async fn run(
        &mut self,
        case: &TestCaseConfig,
        result: &mut CaseResult,
        on_wait: &mut dyn FnMut(Duration),
    ) -> Result<(), StepError> {
        // Step 1: attach to the application's main window. Must be ready
        // for input, not merely painted, before anything is driven.
        let main = self
            .find_top(
                steps::CONNECT,
                TitleMatch::Exact(self.config.app_window_title.clone()),
                WaitState::VISIBLE_ENABLED,
                self.config.main_window_wait(),
            )
            .await?;
        self.driver
            .focus(&main)
            .await
            .map_err(|e| StepError::from_driver(steps::CONNECT, e))?;
        self.process_id = self.driver.process_id(&main).await.ok();
        self.state = WorkflowState::Connected;
        result.record_step(
            steps::CONNECT,
            StepStatus::Passed,
            match self.process_id {
                Some(pid) => format!("main window focused (pid {pid})"),
                None => "main window focused".to_string(),
            },
        );

        // Step 2: the project sub-window. Its title embeds the project name
        // and station count, hence the pattern lookup.
        let project = self
            .find_top(
                steps::LOCATE_WINDOW,
                self.pattern(steps::LOCATE_WINDOW, &self.config.project_window_pattern)?,
                WaitState::VISIBLE,
                self.config.window_wait(),
            )
            .await?;
        self.state = WorkflowState::WindowLocated;
        result.record_step(steps::LOCATE_WINDOW, StepStatus::Passed, "project window found");

        // Step 3: open the export dialog.
        let export_button = self
            .control(
                steps::INVOKE_EXPORT,
                project,
                ControlQuery::titled(ControlKind::Button, self.config.labels.export_button.clone()),
            )
            .await?;
        self.activate(steps::INVOKE_EXPORT, export_button).await?;
        self.state = WorkflowState::ExportInvoked;
        result.record_step(steps::INVOKE_EXPORT, StepStatus::Passed, "export invoked");

        // Step 4: pick the point cloud category in the options window.
        let options = self
            .find_top(
                steps::SELECT_POINT_CLOUD,
                self.pattern(
                    steps::SELECT_POINT_CLOUD,
                    &self.config.options_window_pattern,
                )?,
                WaitState::VISIBLE,
                self.config.window_wait(),
            )
            .await?;
        let pane = self
            .control(
                steps::SELECT_POINT_CLOUD,
                options,
                ControlQuery::titled(
                    ControlKind::Pane,
                    self.config.labels.point_cloud_pane.clone(),
                ),
            )
            .await?;
        self.activate(steps::SELECT_POINT_CLOUD, pane).await?;
        result.record_step(
            steps::SELECT_POINT_CLOUD,
            StepStatus::Passed,
            "point cloud category selected",
        );

        // Step 5: configure the export window from the case parameters.
        let export = self
            .find_top(
                steps::CONFIGURE_EXPORT,
                self.pattern(steps::CONFIGURE_EXPORT, &self.config.export_window_pattern)?,
                WaitState::VISIBLE,
                self.config.window_wait(),
            )
            .await?;
        let detail = self.configure_export(case, export).await?;
        self.state = WorkflowState::OptionsConfigured;
        result.record_step(steps::CONFIGURE_EXPORT, StepStatus::Passed, detail);

        // Step 6: pick the output folder. The confirm click is the last
        // UI-deterministic event, so the conversion timer starts there.
        let folder = case.folder_name(self.config.folder_name_max_len);
        self.select_output_path(&folder).await?;
        result.output_folder = Some(folder.clone());
        result.conversion_started_at = Some(chrono::Utc::now());
        self.state = WorkflowState::PathSelected;
        result.record_step(
            steps::SELECT_OUTPUT_PATH,
            StepStatus::Passed,
            format!("output folder '{folder}' confirmed"),
        );

        // Step 7: wait for completion and dismiss the dialog.
        self.state = WorkflowState::Converting;
        let monitor = ConversionMonitor::new(self.driver, main, self.config);
        match monitor.wait(on_wait).await {
            MonitorOutcome::Completed { waited, dialog } => {
                result.conversion_ended_at = Some(chrono::Utc::now());
                let dismissed = monitor.dismiss(dialog).await;
                result.record_step(
                    steps::MONITOR_CONVERSION,
                    StepStatus::Passed,
                    match dismissed {
                        Some(strategy) => {
                            format!("completed after {waited:.1?}, dismissed via {strategy:?}")
                        }
                        None => format!("completed after {waited:.1?}, dialog left open"),
                    },
                );
                Ok(())
            }
            MonitorOutcome::TimedOut { waited, limit } => {
                Err(StepError::ConversionTimedOut { waited, limit })
            }
        }
    }

    /// Sets every control in the export window from the case config.
    /// Returns a summary for the step record.
    async fn configure_export(
        &self,
        case: &TestCaseConfig,
        export: ControlHandle,
    ) -> Result<String, StepError> {
        const STEP: &str = steps::CONFIGURE_EXPORT;
        let labels = &self.config.labels;
        let mut detail = Vec::new();

        self.select_radio(STEP, export, case.output_format.ui_label())
            .await?;
        detail.push(format!("format={}", case.output_format.ui_label()));

        if case.thinning_enabled {
            let toggle = self
                .control(
                    STEP,
                    export,
                    ControlQuery::titled(ControlKind::CheckBox, labels.thinning_toggle.clone()),
                )
                .await?;
            detail.push(format!("thinning={}", self.ensure_checked(STEP, toggle).await?));
            // The options panel repaints after the toggle; the sub-choices
            // are not hittable until it settles.
            tokio::time::sleep(self.config.settle_delay()).await;

            if case.voxel_thinning.is_enabled() {
                self.select_radio(STEP, export, &labels.voxel_radio).await?;
                detail.push("voxel".into());
            }
            if case.random_thinning.is_enabled() {
                self.select_radio(STEP, export, &labels.random_radio).await?;
                detail.push("random".into());
            }
        }

        self.select_radio(STEP, export, case.output_type.ui_label())
            .await?;
        detail.push(format!("output={}", case.output_type.ui_label()));

        self.select_radio(STEP, export, case.texture.ui_label())
            .await?;
        detail.push(format!("texture={}", case.texture.ui_label()));

        if case.denoise_enabled {
            let denoise = self
                .control(
                    STEP,
                    export,
                    ControlQuery::titled(ControlKind::CheckBox, labels.denoise_checkbox.clone()),
                )
                .await?;
            detail.push(format!("denoise={}", self.ensure_checked(STEP, denoise).await?));
        }
        if case.thickness_optimization_enabled {
            let thickness = self
                .control(
                    STEP,
                    export,
                    ControlQuery::titled(ControlKind::CheckBox, labels.thickness_checkbox.clone()),
                )
                .await?;
            detail.push(format!(
                "thickness={}",
                self.ensure_checked(STEP, thickness).await?
            ));
        }

        let confirm = self
            .control(
                STEP,
                export,
                ControlQuery::titled(ControlKind::Button, labels.export_confirm.clone()),
            )
            .await?;
        self.activate(STEP, confirm).await?;

        Ok(detail.join(", "))
    }

    /// Folder-browser sequence: device, new folder, name, confirm.
    async fn select_output_path(&self, folder: &str) -> Result<(), StepError> {
        const STEP: &str = steps::SELECT_OUTPUT_PATH;
        let labels = &self.config.labels;

        let browser = self
            .find_top(
                STEP,
                self.pattern(STEP, &self.config.browser_window_pattern)?,
                WaitState::VISIBLE,
                self.config.window_wait(),
            )
            .await?;

        // Expand the device root first; the device entries are not hittable
        // until the tree has opened it.
        let root = self
            .control(
                STEP,
                browser,
                ControlQuery::titled(ControlKind::TreeItem, labels.device_root.clone()),
            )
            .await?;
        self.activate(STEP, root).await?;

        let device = self
            .control(
                STEP,
                browser,
                ControlQuery::titled(ControlKind::TreeItem, self.config.output_device.clone()),
            )
            .await?;
        self.activate(STEP, device).await?;

        let new_folder = self
            .control(
                STEP,
                browser,
                ControlQuery::titled(ControlKind::Button, labels.new_folder_button.clone()),
            )
            .await?;
        self.activate(STEP, new_folder).await?;

        let name_edit = self
            .control(
                STEP,
                browser,
                ControlQuery::new(ControlKind::Edit).with_auto_id(labels.folder_name_auto_id.clone()),
            )
            .await?;
        self.driver
            .set_text(&name_edit, folder)
            .await
            .map_err(|e| StepError::from_driver(STEP, e))?;

        let confirm = self
            .control(
                STEP,
                browser,
                ControlQuery::titled(ControlKind::Button, labels.confirm_button.clone()),
            )
            .await?;
        self.activate(STEP, confirm).await
    }

    /// Finds a top-level window and waits until it reaches `state`.
    async fn find_top(
        &self,
        step: &'static str,
        title: TitleMatch,
        state: WaitState,
        wait: Duration,
    ) -> Result<ControlHandle, StepError> {
        debug!(step, window = %title, "looking up window");
        let handle = self
            .driver
            .find_window(&title)
            .await
            .map_err(|e| StepError::from_driver(step, e))?;
        self.driver
            .wait_state(&handle, state, wait)
            .await
            .map_err(|e| StepError::from_driver(step, e))?;
        Ok(handle)
    }

    /// Finds a child control and waits until it is actionable.
    async fn control(
        &self,
        step: &'static str,
        parent: ControlHandle,
        query: ControlQuery,
    ) -> Result<ControlHandle, StepError> {
        debug!(step, control = %query, "looking up control");
        let handle = self
            .driver
            .find_child(&parent, &query)
            .await
            .map_err(|e| StepError::from_driver(step, e))?;
        self.driver
            .wait_state(&handle, WaitState::VISIBLE_ENABLED, self.config.control_wait())
            .await
            .map_err(|e| StepError::from_driver(step, e))?;
        Ok(handle)
    }

    async fn activate(&self, step: &'static str, handle: ControlHandle) -> Result<(), StepError> {
        self.driver
            .activate(&handle)
            .await
            .map_err(|e| StepError::from_driver(step, e))
    }

    /// Finds a radio button under `parent` by label and selects it.
    async fn select_radio(
        &self,
        step: &'static str,
        parent: ControlHandle,
        label: &str,
    ) -> Result<(), StepError> {
        let radio = self
            .control(step, parent, ControlQuery::titled(ControlKind::RadioButton, label))
            .await?;
        self.activate(step, radio).await
    }

    /// Checks a checkbox only if it is not already checked. An unreadable
    /// toggle state falls back to toggling unconditionally.
    async fn ensure_checked(
        &self,
        step: &'static str,
        handle: ControlHandle,
    ) -> Result<&'static str, StepError> {
        match self.driver.toggle_state(&handle).await {
            Ok(ToggleState::On) => Ok("already on"),
            Ok(_) => {
                self.driver
                    .toggle(&handle)
                    .await
                    .map_err(|e| StepError::from_driver(step, e))?;
                Ok("on")
            }
            Err(DriverError::Unsupported { .. }) => {
                self.driver
                    .toggle(&handle)
                    .await
                    .map_err(|e| StepError::from_driver(step, e))?;
                Ok("on (state unreadable)")
            }
            Err(other) => Err(StepError::from_driver(step, other)),
        }
    }

    /// Compiles a configured window-title pattern.
    fn pattern(&self, step: &'static str, pattern: &str) -> Result<TitleMatch, StepError> {
        TitleMatch::pattern(pattern).map_err(|err| StepError::Unexpected {
            step,
            source: DriverError::Backend(format!("invalid window pattern '{pattern}': {err}")),
        })
    }
}
