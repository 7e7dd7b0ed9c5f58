//! Scripted driver for dry runs.
//!
//! `--driver mock` runs the whole pipeline against an in-memory application
//! surface instead of a live accessibility backend: every window and control
//! the workflow touches exists, and each case's conversion "finishes" after a
//! short simulated delay. Useful for validating case sheets, configs, and
//! report output without the target application.

use std::time::Duration;

use vortex_adapters::MockUiDriver;
use vortex_core::HarnessConfig;
use vortex_proto::ControlKind;

/// Simulated conversion time per case.
const SIMULATED_CONVERSION: Duration = Duration::from_millis(200);

/// Builds a mock driver exposing the full application surface, with one
/// completion dialog scheduled per case (a dismissed dialog stays gone).
///
/// Window titles match the default configuration patterns; control labels
/// come from the config so overridden labels keep working.
pub fn scripted_driver(config: &HarnessConfig, case_count: usize) -> MockUiDriver {
    let mock = MockUiDriver::new();
    let labels = &config.labels;

    let main = mock.add_window(config.app_window_title.clone());

    let project = mock.add_window("demo project - 4 stations");
    mock.add_child(project, ControlKind::Button, labels.export_button.clone());

    let options = mock.add_window("Export Options");
    mock.add_child(options, ControlKind::Pane, labels.point_cloud_pane.clone());

    let export = mock.add_window("Point cloud export");
    for label in ["pts", "e57", "las"] {
        mock.add_child(export, ControlKind::RadioButton, label);
    }
    mock.add_child(export, ControlKind::CheckBox, labels.thinning_toggle.clone());
    mock.add_child(export, ControlKind::RadioButton, labels.voxel_radio.clone());
    mock.add_child(export, ControlKind::RadioButton, labels.random_radio.clone());
    for label in ["Single station", "Merged", "Single station + merged"] {
        mock.add_child(export, ControlKind::RadioButton, label);
    }
    for label in [
        "Grayscale",
        "Reflectance",
        "Reflectance + color",
        "Reflectance + grayscale",
    ] {
        mock.add_child(export, ControlKind::RadioButton, label);
    }
    mock.add_child(export, ControlKind::CheckBox, labels.denoise_checkbox.clone());
    mock.add_child(
        export,
        ControlKind::CheckBox,
        labels.thickness_checkbox.clone(),
    );
    mock.add_child(export, ControlKind::Button, labels.export_confirm.clone());

    let browser = mock.add_window("Browse for folder");
    mock.add_child(browser, ControlKind::TreeItem, labels.device_root.clone());
    mock.add_child(browser, ControlKind::TreeItem, config.output_device.clone());
    mock.add_child(browser, ControlKind::Button, labels.new_folder_button.clone());
    let name_edit = mock.add_child(browser, ControlKind::Edit, "folder name");
    mock.set_auto_id(name_edit, labels.folder_name_auto_id.clone());
    let confirm = mock.add_child(browser, ControlKind::Button, labels.confirm_button.clone());
    mock.mark_conversion_trigger(confirm);

    for _ in 0..case_count {
        let dialog =
            mock.add_completion_dialog(main, config.completion_dialog_id.clone(), SIMULATED_CONVERSION);
        mock.add_child(dialog, ControlKind::Button, "OK");
    }

    mock
}

#[cfg(test)]
mod tests {
    use super::*;
    use vortex_proto::{TitleMatch, UiDriver};

    #[tokio::test]
    async fn surface_matches_default_config() {
        let config = HarnessConfig::default();
        let mock = scripted_driver(&config, 1);

        let main = TitleMatch::Exact(config.app_window_title.clone());
        assert!(mock.find_window(&main).await.is_ok());

        let project = TitleMatch::pattern(&config.project_window_pattern).unwrap();
        assert!(mock.find_window(&project).await.is_ok());

        let browser = TitleMatch::pattern(&config.browser_window_pattern).unwrap();
        assert!(mock.find_window(&browser).await.is_ok());
    }
}
