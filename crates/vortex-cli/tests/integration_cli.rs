//! Integration tests running the built `vortex-harness` binary.

use std::path::Path;
use std::process::{Command, Output};

fn harness() -> Command {
    Command::new(env!("CARGO_BIN_EXE_vortex-harness"))
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

const VALID_SHEET: &str = "\
case_id,output_format,thinning,voxel_thinning,random_thinning,output_type,texture,denoise,thickness_optimization,expected_result,notes
TC001,e57,enabled,enabled,,merged,reflectance,enabled,disabled,success,
TC002,pts,disabled,,,single-station,grayscale,disabled,disabled,success,
";

/// Timings tuned so a mock run finishes in well under a second per case.
const FAST_CONFIG: &str = "\
poll_interval_secs: 0.05
settle_delay_secs: 0.01
cooldown_secs: 0.05
";

fn write_file(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn check_accepts_a_valid_sheet() {
    let dir = tempfile::tempdir().unwrap();
    let sheet = write_file(dir.path(), "cases.csv", VALID_SHEET);

    let output = harness()
        .args(["check", "--cases"])
        .arg(&sheet)
        .args(["--color", "never"])
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("TC001"), "{out}");
    assert!(out.contains("TC002"), "{out}");
    assert!(out.contains("2 cases valid"), "{out}");
}

#[test]
fn check_rejects_unknown_literals() {
    let dir = tempfile::tempdir().unwrap();
    let sheet = write_file(
        dir.path(),
        "cases.csv",
        "case_id,output_format,thinning,voxel_thinning,random_thinning,output_type,texture,denoise,thickness_optimization\n\
         TC001,xyz,disabled,,,merged,reflectance,disabled,disabled\n",
    );

    let output = harness()
        .args(["check", "--cases"])
        .arg(&sheet)
        .args(["--color", "never"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.contains("TC001"), "{err}");
    assert!(err.contains("output_format"), "{err}");
    assert!(err.contains("xyz"), "{err}");
}

#[test]
fn check_rejects_thinning_without_mode() {
    let dir = tempfile::tempdir().unwrap();
    let sheet = write_file(
        dir.path(),
        "cases.csv",
        "case_id,output_format,thinning,voxel_thinning,random_thinning,output_type,texture,denoise,thickness_optimization\n\
         TC001,e57,enabled,,,merged,reflectance,disabled,disabled\n",
    );

    let output = harness()
        .args(["check", "--cases"])
        .arg(&sheet)
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(stderr(&output).contains("no thinning mode"), "{}", stderr(&output));
}

#[test]
fn run_with_mock_driver_writes_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let sheet = write_file(dir.path(), "cases.csv", VALID_SHEET);
    let config = write_file(dir.path(), "harness.yml", FAST_CONFIG);
    let report_dir = dir.path().join("reports");

    let output = harness()
        .args(["--color", "never", "--config"])
        .arg(&config)
        .args(["run", "--driver", "mock", "--format", "all", "--cases"])
        .arg(&sheet)
        .arg("--report-dir")
        .arg(&report_dir)
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "stdout: {}\nstderr: {}",
        stdout(&output),
        stderr(&output)
    );
    let out = stdout(&output);
    assert!(out.contains("PASSED"), "{out}");
    assert!(out.contains("2 of 2 cases"), "{out}");

    let mut extensions: Vec<String> = std::fs::read_dir(&report_dir)
        .unwrap()
        .map(|e| {
            e.unwrap()
                .path()
                .extension()
                .unwrap()
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    extensions.sort();
    assert_eq!(extensions, ["csv", "html", "json"]);
}

#[test]
fn run_exits_nonzero_on_invalid_sheet() {
    let dir = tempfile::tempdir().unwrap();
    let sheet = write_file(dir.path(), "cases.csv", "case_id,output_format\nTC001,e57\n");

    let output = harness()
        .args(["run", "--cases"])
        .arg(&sheet)
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(stderr(&output).contains("missing required column"), "{}", stderr(&output));
}

#[test]
fn sample_cases_round_trips_through_check() {
    let dir = tempfile::tempdir().unwrap();
    let sheet = dir.path().join("sample.csv");

    let generate = harness()
        .args(["sample-cases", "--out"])
        .arg(&sheet)
        .output()
        .unwrap();
    assert!(generate.status.success(), "stderr: {}", stderr(&generate));

    let check = harness()
        .args(["check", "--cases"])
        .arg(&sheet)
        .args(["--color", "never"])
        .output()
        .unwrap();
    assert!(check.status.success(), "stderr: {}", stderr(&check));
    assert!(stdout(&check).contains("6 cases valid"));
}

#[test]
fn quiet_run_prints_one_line() {
    let dir = tempfile::tempdir().unwrap();
    let sheet = write_file(dir.path(), "cases.csv", VALID_SHEET);
    let config = write_file(dir.path(), "harness.yml", FAST_CONFIG);
    let report_dir = dir.path().join("reports");

    let output = harness()
        .args(["--quiet", "--color", "never", "--config"])
        .arg(&config)
        .args(["run", "--format", "json", "--cases"])
        .arg(&sheet)
        .arg("--report-dir")
        .arg(&report_dir)
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert_eq!(out.trim(), "✓ 2/2 passed", "{out}");
}
