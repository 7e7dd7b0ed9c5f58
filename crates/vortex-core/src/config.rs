//! Harness configuration.
//!
//! A partial YAML file deserializes against per-field defaults, so a config
//! only needs to name what it overrides:
//!
//! ```yaml
//! project_window_pattern: ".*site42.*"
//! conversion_timeout_secs: 600
//! sample_resources: true
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("config field '{field}' must be a finite, non-negative number of seconds (got {value})")]
    InvalidDuration { field: &'static str, value: f64 },
}

/// Control labels of the target application's UI.
///
/// These are part of the contract with the external application and change
/// with its localization, so they live in configuration rather than code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiLabels {
    #[serde(default = "default_export_button")]
    pub export_button: String,
    #[serde(default = "default_point_cloud_pane")]
    pub point_cloud_pane: String,
    #[serde(default = "default_thinning_toggle")]
    pub thinning_toggle: String,
    #[serde(default = "default_voxel_radio")]
    pub voxel_radio: String,
    #[serde(default = "default_random_radio")]
    pub random_radio: String,
    #[serde(default = "default_denoise_checkbox")]
    pub denoise_checkbox: String,
    #[serde(default = "default_thickness_checkbox")]
    pub thickness_checkbox: String,
    #[serde(default = "default_export_confirm")]
    pub export_confirm: String,
    #[serde(default = "default_device_root")]
    pub device_root: String,
    #[serde(default = "default_new_folder_button")]
    pub new_folder_button: String,
    #[serde(default = "default_folder_name_auto_id")]
    pub folder_name_auto_id: String,
    #[serde(default = "default_confirm_button")]
    pub confirm_button: String,
}

impl Default for UiLabels {
    fn default() -> Self {
        Self {
            export_button: default_export_button(),
            point_cloud_pane: default_point_cloud_pane(),
            thinning_toggle: default_thinning_toggle(),
            voxel_radio: default_voxel_radio(),
            random_radio: default_random_radio(),
            denoise_checkbox: default_denoise_checkbox(),
            thickness_checkbox: default_thickness_checkbox(),
            export_confirm: default_export_confirm(),
            device_root: default_device_root(),
            new_folder_button: default_new_folder_button(),
            folder_name_auto_id: default_folder_name_auto_id(),
            confirm_button: default_confirm_button(),
        }
    }
}

fn default_export_button() -> String {
    "Export".into()
}
fn default_point_cloud_pane() -> String {
    "Point cloud".into()
}
fn default_thinning_toggle() -> String {
    "Enable".into()
}
fn default_voxel_radio() -> String {
    "Voxel thinning".into()
}
fn default_random_radio() -> String {
    "Random thinning".into()
}
fn default_denoise_checkbox() -> String {
    "Denoise".into()
}
fn default_thickness_checkbox() -> String {
    "Thickness optimization".into()
}
fn default_export_confirm() -> String {
    "Export".into()
}
fn default_device_root() -> String {
    "This PC".into()
}
fn default_new_folder_button() -> String {
    "New folder".into()
}
fn default_folder_name_auto_id() -> String {
    "1".into()
}
fn default_confirm_button() -> String {
    "OK".into()
}

/// Full harness configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Exact title of the application's top-level window.
    #[serde(default = "default_app_window_title")]
    pub app_window_title: String,

    /// Regex matching the project sub-window (its title embeds project
    /// names and timestamps, so exact matching is useless).
    #[serde(default = "default_project_window_pattern")]
    pub project_window_pattern: String,

    #[serde(default = "default_options_window_pattern")]
    pub options_window_pattern: String,

    #[serde(default = "default_export_window_pattern")]
    pub export_window_pattern: String,

    #[serde(default = "default_browser_window_pattern")]
    pub browser_window_pattern: String,

    /// Automation id of the completion dialog.
    #[serde(default = "default_completion_dialog_id")]
    pub completion_dialog_id: String,

    /// Conversion deadline. Generous on purpose: exports are long-running
    /// and variable, and a short limit manufactures false failures.
    #[serde(default = "default_conversion_timeout_secs")]
    pub conversion_timeout_secs: f64,

    /// Completion dialog polling interval.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: f64,

    /// Pause after enabling thinning; the options panel repaints
    /// asynchronously and the sub-choices are not hittable before it ends.
    #[serde(default = "default_settle_delay_secs")]
    pub settle_delay_secs: f64,

    /// Bounded wait for sub-windows to appear.
    #[serde(default = "default_window_wait_secs")]
    pub window_wait_secs: f64,

    /// Bounded wait for individual controls.
    #[serde(default = "default_control_wait_secs")]
    pub control_wait_secs: f64,

    /// Bounded wait for the main application window on connect.
    #[serde(default = "default_main_window_wait_secs")]
    pub main_window_wait_secs: f64,

    /// Pause between cases so the application settles.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: f64,

    /// Tree item selected as the output device in the folder browser.
    #[serde(default = "default_output_device")]
    pub output_device: String,

    #[serde(default = "default_folder_name_max_len")]
    pub folder_name_max_len: usize,

    /// Rate limit for conversion-wait progress events.
    #[serde(default = "default_progress_every_secs")]
    pub progress_every_secs: f64,

    #[serde(default)]
    pub sample_resources: bool,

    #[serde(default = "default_sample_interval_secs")]
    pub sample_interval_secs: f64,

    #[serde(default)]
    pub labels: UiLabels,
}

fn default_app_window_title() -> String {
    "VORTEX Client".into()
}
fn default_project_window_pattern() -> String {
    ".*stations.*".into()
}
fn default_options_window_pattern() -> String {
    ".*Options.*".into()
}
fn default_export_window_pattern() -> String {
    ".*Point cloud export.*".into()
}
fn default_browser_window_pattern() -> String {
    ".*Browse for folder.*".into()
}
fn default_completion_dialog_id() -> String {
    "MessageForm".into()
}
fn default_conversion_timeout_secs() -> f64 {
    1200.0
}
fn default_poll_interval_secs() -> f64 {
    0.5
}
fn default_settle_delay_secs() -> f64 {
    1.0
}
fn default_window_wait_secs() -> f64 {
    5.0
}
fn default_control_wait_secs() -> f64 {
    2.0
}
fn default_main_window_wait_secs() -> f64 {
    10.0
}
fn default_cooldown_secs() -> f64 {
    3.0
}
fn default_output_device() -> String {
    "Data (D:)".into()
}
fn default_folder_name_max_len() -> usize {
    50
}
fn default_progress_every_secs() -> f64 {
    5.0
}
fn default_sample_interval_secs() -> f64 {
    1.0
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            app_window_title: default_app_window_title(),
            project_window_pattern: default_project_window_pattern(),
            options_window_pattern: default_options_window_pattern(),
            export_window_pattern: default_export_window_pattern(),
            browser_window_pattern: default_browser_window_pattern(),
            completion_dialog_id: default_completion_dialog_id(),
            conversion_timeout_secs: default_conversion_timeout_secs(),
            poll_interval_secs: default_poll_interval_secs(),
            settle_delay_secs: default_settle_delay_secs(),
            window_wait_secs: default_window_wait_secs(),
            control_wait_secs: default_control_wait_secs(),
            main_window_wait_secs: default_main_window_wait_secs(),
            cooldown_secs: default_cooldown_secs(),
            output_device: default_output_device(),
            folder_name_max_len: default_folder_name_max_len(),
            progress_every_secs: default_progress_every_secs(),
            sample_resources: false,
            sample_interval_secs: default_sample_interval_secs(),
            labels: UiLabels::default(),
        }
    }
}

impl HarnessConfig {
    /// Loads configuration from a YAML file, filling unset fields with
    /// defaults. Duration fields are range-checked here so a bad value
    /// fails the load instead of panicking mid-run.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_yaml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every `*_secs` field is a valid `Duration` source.
    /// `Duration::from_secs_f64` panics on negative or non-finite input,
    /// so the accessors below rely on this having been enforced.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let durations = [
            ("conversion_timeout_secs", self.conversion_timeout_secs),
            ("poll_interval_secs", self.poll_interval_secs),
            ("settle_delay_secs", self.settle_delay_secs),
            ("window_wait_secs", self.window_wait_secs),
            ("control_wait_secs", self.control_wait_secs),
            ("main_window_wait_secs", self.main_window_wait_secs),
            ("cooldown_secs", self.cooldown_secs),
            ("progress_every_secs", self.progress_every_secs),
            ("sample_interval_secs", self.sample_interval_secs),
        ];
        for (field, value) in durations {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidDuration { field, value });
            }
        }
        Ok(())
    }

    pub fn conversion_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.conversion_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs_f64(self.poll_interval_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs_f64(self.settle_delay_secs)
    }

    pub fn window_wait(&self) -> Duration {
        Duration::from_secs_f64(self.window_wait_secs)
    }

    pub fn control_wait(&self) -> Duration {
        Duration::from_secs_f64(self.control_wait_secs)
    }

    pub fn main_window_wait(&self) -> Duration {
        Duration::from_secs_f64(self.main_window_wait_secs)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs_f64(self.cooldown_secs)
    }

    pub fn progress_every(&self) -> Duration {
        Duration::from_secs_f64(self.progress_every_secs)
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_secs_f64(self.sample_interval_secs)
    }
}
