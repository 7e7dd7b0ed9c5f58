//! End-to-end workflow scenarios against the scripted mock driver.

use std::time::Duration;

use vortex_adapters::MockUiDriver;
use vortex_core::{
    BatchRunner, CaseStatus, ConversionWorkflow, HarnessConfig, OutputFormat, OutputType,
    StepStatus, TestCaseConfig, Texture, TriState,
};
use vortex_proto::{ControlHandle, ControlKind, ToggleState};

/// Handles into the scripted application tree.
struct App {
    main: ControlHandle,
    export_confirm: ControlHandle,
    denoise: ControlHandle,
    voxel_radio: ControlHandle,
}

/// Builds the full application surface the workflow expects: main window,
/// project window, options window, export window with every radio and
/// checkbox, and the folder browser whose confirm button kicks off the
/// conversion. Completion dialogs are scheduled separately, one per case.
fn scripted_app(mock: &MockUiDriver) -> App {
    let main = mock.add_window("VORTEX Client");

    let project = mock.add_window("modeling_20250828 - pro103, 8 stations");
    mock.add_child(project, ControlKind::Button, "Export");

    let options = mock.add_window("Export Options");
    mock.add_child(options, ControlKind::Pane, "Point cloud");

    let export = mock.add_window("Point cloud export");
    for label in ["pts", "e57", "las"] {
        mock.add_child(export, ControlKind::RadioButton, label);
    }
    mock.add_child(export, ControlKind::CheckBox, "Enable");
    let voxel_radio = mock.add_child(export, ControlKind::RadioButton, "Voxel thinning");
    mock.add_child(export, ControlKind::RadioButton, "Random thinning");
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
    let denoise = mock.add_child(export, ControlKind::CheckBox, "Denoise");
    mock.add_child(export, ControlKind::CheckBox, "Thickness optimization");
    let export_confirm = mock.add_child(export, ControlKind::Button, "Export");

    let browser = mock.add_window("Browse for folder");
    mock.add_child(browser, ControlKind::TreeItem, "This PC");
    mock.add_child(browser, ControlKind::TreeItem, "Data (D:)");
    mock.add_child(browser, ControlKind::Button, "New folder");
    let name_edit = mock.add_child(browser, ControlKind::Edit, "folder name");
    mock.set_auto_id(name_edit, "1");
    let browser_confirm = mock.add_child(browser, ControlKind::Button, "OK");
    mock.mark_conversion_trigger(browser_confirm);

    App {
        main,
        export_confirm,
        denoise,
        voxel_radio,
    }
}

/// Schedules one completion dialog (with a confirm button) that appears
/// `delay` after the conversion trigger fires. Dismissal removes it for
/// good, so multi-case batches schedule one per case.
fn schedule_dialog(mock: &MockUiDriver, main: ControlHandle, delay: Duration) -> ControlHandle {
    let dialog = mock.add_completion_dialog(main, "MessageForm", delay);
    mock.add_child(dialog, ControlKind::Button, "OK");
    dialog
}

fn fast_config() -> HarnessConfig {
    let mut config = HarnessConfig::default();
    config.main_window_wait_secs = 0.5;
    config.window_wait_secs = 0.5;
    config.control_wait_secs = 0.5;
    config.settle_delay_secs = 0.01;
    config.poll_interval_secs = 0.05;
    config.progress_every_secs = 0.2;
    config.conversion_timeout_secs = 30.0;
    config.cooldown_secs = 0.05;
    config
}

fn full_case(id: &str) -> TestCaseConfig {
    TestCaseConfig {
        id: id.into(),
        output_format: OutputFormat::E57,
        thinning_enabled: true,
        voxel_thinning: TriState::Enabled,
        random_thinning: TriState::Unset,
        output_type: OutputType::Merged,
        texture: Texture::Reflectance,
        denoise_enabled: true,
        thickness_optimization_enabled: false,
        expected_result: "success".into(),
        notes: String::new(),
    }
}

#[tokio::test]
async fn full_export_case_passes_with_conversion_duration() {
    let mock = MockUiDriver::new();
    let app = scripted_app(&mock);
    schedule_dialog(&mock, app.main, Duration::from_secs(2));
    let config = fast_config();

    let mut workflow = ConversionWorkflow::new(&mock, &config);
    let result = workflow.execute(&full_case("TC001"), &mut |_| {}).await;

    assert_eq!(result.status, CaseStatus::Passed, "error: {:?}", result.error);
    assert!(result.error.is_none());

    let conversion = result.conversion_duration.unwrap();
    assert!(
        conversion >= Duration::from_millis(1900) && conversion < Duration::from_secs(3),
        "conversion took {conversion:?}"
    );

    let folder = result.output_folder.as_deref().unwrap();
    assert!(folder.starts_with("fmt-e57_thin-voxel_out-merged_tex-refl_dn-on"));
    assert!(folder.len() <= 50);

    let steps: Vec<&str> = result.steps.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(
        steps,
        [
            "connect",
            "locate_window",
            "invoke_export",
            "select_point_cloud",
            "configure_export",
            "select_output_path",
            "monitor_conversion",
        ]
    );
    assert!(result.steps.iter().all(|s| s.status == StepStatus::Passed));

    // The scripted UI saw the expected manipulations.
    let journal = mock.journal();
    assert!(journal.contains(&"activate:e57".to_string()));
    assert!(journal.contains(&"activate:Voxel thinning".to_string()));
    assert!(journal.iter().any(|e| e.starts_with("set_text:folder name=fmt-e57")));
    assert_eq!(mock.toggle_count("Denoise"), 1);
    assert_eq!(mock.toggle_count("Thickness optimization"), 0);

    // Browser navigation opens the device root before picking the device.
    let root = journal.iter().position(|e| e == "activate:This PC").unwrap();
    let device = journal.iter().position(|e| e == "activate:Data (D:)").unwrap();
    assert!(root < device, "journal: {journal:?}");
}

#[tokio::test]
async fn connect_requires_an_enabled_main_window() {
    let mock = MockUiDriver::new();
    let app = scripted_app(&mock);
    schedule_dialog(&mock, app.main, Duration::from_millis(100));
    // Painted but not accepting input, e.g. still starting up.
    mock.set_disabled(app.main);
    let config = fast_config();

    let mut workflow = ConversionWorkflow::new(&mock, &config);
    let result = workflow.execute(&full_case("TC001"), &mut |_| {}).await;

    assert_eq!(result.status, CaseStatus::Failed);
    let last = result.steps.last().unwrap();
    assert_eq!(last.name, "connect");
    assert_eq!(last.status, StepStatus::Failed);
    assert!(result.error.as_deref().unwrap().contains("timed out"));
}

#[tokio::test]
async fn already_checked_checkbox_is_not_toggled_again() {
    let mock = MockUiDriver::new();
    let app = scripted_app(&mock);
    schedule_dialog(&mock, app.main, Duration::from_millis(100));
    mock.set_toggle_state(app.denoise, ToggleState::On);
    let config = fast_config();

    let mut workflow = ConversionWorkflow::new(&mock, &config);
    let result = workflow.execute(&full_case("TC001"), &mut |_| {}).await;

    assert_eq!(result.status, CaseStatus::Passed, "error: {:?}", result.error);
    assert_eq!(mock.toggle_count("Denoise"), 0);
    let configure = result
        .steps
        .iter()
        .find(|s| s.name == "configure_export")
        .unwrap();
    assert!(configure.detail.contains("denoise=already on"), "{}", configure.detail);
}

#[tokio::test]
async fn conversion_timeout_fails_with_elapsed_and_limit() {
    let mock = MockUiDriver::new();
    scripted_app(&mock);
    // No completion dialog at all.
    let mut config = fast_config();
    config.conversion_timeout_secs = 5.0;
    config.poll_interval_secs = 0.5;

    let started = std::time::Instant::now();
    let mut workflow = ConversionWorkflow::new(&mock, &config);
    let result = workflow.execute(&full_case("TC001"), &mut |_| {}).await;
    let elapsed = started.elapsed();

    assert_eq!(result.status, CaseStatus::Failed);
    let error = result.error.as_deref().unwrap();
    assert!(error.contains("5s"), "{error}");
    assert!(error.contains("did not finish"), "{error}");

    // Terminates within timeout + one poll interval (plus setup overhead).
    assert!(elapsed >= Duration::from_secs(5));
    assert!(elapsed < Duration::from_secs(7), "took {elapsed:?}");

    // The conversion never completed, so no duration was recorded.
    assert!(result.conversion_duration.is_none());
}

#[tokio::test]
async fn progress_ticks_arrive_while_waiting() {
    let mock = MockUiDriver::new();
    let app = scripted_app(&mock);
    schedule_dialog(&mock, app.main, Duration::from_secs(1));
    let config = fast_config();

    let mut ticks: Vec<Duration> = Vec::new();
    let mut workflow = ConversionWorkflow::new(&mock, &config);
    let result = workflow
        .execute(&full_case("TC001"), &mut |elapsed| ticks.push(elapsed))
        .await;

    assert_eq!(result.status, CaseStatus::Passed, "error: {:?}", result.error);
    // ~1 s wait with a tick at most every 200 ms.
    assert!(!ticks.is_empty());
    assert!(ticks.len() <= 8, "got {} ticks", ticks.len());
}

#[tokio::test]
async fn undismissable_dialog_still_passes() {
    let mock = MockUiDriver::new();
    let app = scripted_app(&mock);
    // A dialog with no confirm button that shrugs off every dismissal.
    let dialog = mock.add_completion_dialog(app.main, "MessageForm", Duration::from_millis(100));
    mock.set_undismissable(dialog);
    let config = fast_config();

    let mut workflow = ConversionWorkflow::new(&mock, &config);
    let result = workflow.execute(&full_case("TC001"), &mut |_| {}).await;

    assert_eq!(result.status, CaseStatus::Passed, "error: {:?}", result.error);
    let monitor = result
        .steps
        .iter()
        .find(|s| s.name == "monitor_conversion")
        .unwrap();
    assert!(monitor.detail.contains("dialog left open"), "{}", monitor.detail);
}

#[tokio::test]
async fn missing_thinning_radio_fails_with_step_postmortem() {
    let mock = MockUiDriver::new();
    let app = scripted_app(&mock);
    schedule_dialog(&mock, app.main, Duration::from_millis(100));
    // The export window lost its voxel radio.
    mock.remove(app.voxel_radio);
    let config = fast_config();

    let mut workflow = ConversionWorkflow::new(&mock, &config);
    let result = workflow.execute(&full_case("TC001"), &mut |_| {}).await;

    assert_eq!(result.status, CaseStatus::Failed);
    let last = result.steps.last().unwrap();
    assert_eq!(last.name, "configure_export");
    assert_eq!(last.status, StepStatus::Failed);
    assert!(last.detail.contains("Voxel thinning"), "{}", last.detail);
    assert!(result.error.as_deref().unwrap().contains("Voxel thinning"));
}

#[tokio::test]
async fn backend_error_marks_case_errored_and_batch_continues() {
    let mock = MockUiDriver::new();
    let app = scripted_app(&mock);
    // Activation failure on the export confirm button poisons every case,
    // so both cases error; the point is that the second one still runs.
    mock.fail_activation(app.export_confirm);
    let config = fast_config();

    let cases = vec![full_case("TC001"), full_case("TC002")];
    let mut runner = BatchRunner::new(&mock, &config);
    let report = runner.run(&cases).await;

    assert_eq!(report.total, 2);
    assert_eq!(report.errored, 2);
    let ids: Vec<&str> = report.cases.iter().map(|c| c.config.id.as_str()).collect();
    assert_eq!(ids, ["TC001", "TC002"]);
    for case in &report.cases {
        assert_eq!(case.status, CaseStatus::Errored);
        assert!(
            case.error
                .as_deref()
                .unwrap()
                .contains("activation rejected")
        );
    }
}

#[tokio::test]
async fn batch_runs_cases_in_order_with_one_dialog_each() {
    let mock = MockUiDriver::new();
    let app = scripted_app(&mock);
    // One dialog per case: dismissal removes a dialog for good.
    schedule_dialog(&mock, app.main, Duration::from_millis(100));
    schedule_dialog(&mock, app.main, Duration::from_millis(100));
    let config = fast_config();

    let mut second = full_case("TC002");
    second.output_format = OutputFormat::Las;
    second.texture = Texture::ReflectanceGrayscale;

    let cases = vec![full_case("TC001"), second];
    let mut runner = BatchRunner::new(&mock, &config);
    let report = runner.run(&cases).await;

    assert_eq!(report.total, 2);
    assert_eq!(report.passed, 2, "errors: {:?}", report.cases.iter().map(|c| &c.error).collect::<Vec<_>>());
    let ids: Vec<&str> = report.cases.iter().map(|c| c.config.id.as_str()).collect();
    assert_eq!(ids, ["TC001", "TC002"]);
    assert!(report.all_passed());
    assert!(report.conversion_stats().is_some());
}
