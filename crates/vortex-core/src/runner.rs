//! Sequential batch execution.
//!
//! Cases run strictly one after another (the application under test cannot
//! service two conversions at once) with a cooldown pause in between so it
//! settles before the next case starts. A case failure or error never aborts
//! the batch; only a case-sheet load error does, and that happens before the
//! runner is ever built.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use tracing::info;
use vortex_proto::UiDriver;

use crate::case::TestCaseConfig;
use crate::config::HarnessConfig;
use crate::report::RunReport;
use crate::result::{CaseResult, CaseStatus, StepRecord};
use crate::sampler::{ResourceSample, SamplerHandle};
use crate::workflow::ConversionWorkflow;

/// Progress notifications emitted while a batch runs. Purely a rendering
/// stream; dropping every event changes nothing about the run.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    RunStarted {
        total: usize,
    },
    CaseStarted {
        index: usize,
        total: usize,
        case_id: String,
    },
    /// Rate-limited tick while waiting for a conversion to finish.
    ConversionWaiting {
        case_id: String,
        elapsed: Duration,
    },
    /// Emitted once per recorded step when its case completes.
    StepRecorded {
        case_id: String,
        step: StepRecord,
    },
    CaseCompleted {
        index: usize,
        total: usize,
        case_id: String,
        status: CaseStatus,
        duration: Option<Duration>,
        conversion_duration: Option<Duration>,
        error: Option<String>,
    },
    RunCompleted {
        total: usize,
        passed: usize,
        failed: usize,
        errored: usize,
    },
}

/// Callback receiving [`ProgressEvent`]s.
pub type ProgressCallback = Box<dyn Fn(ProgressEvent) + Send + Sync>;

/// Runs a batch of cases against one driver.
pub struct BatchRunner<'a> {
    driver: &'a dyn UiDriver,
    config: &'a HarnessConfig,
    progress: Option<ProgressCallback>,
    samples: HashMap<String, Vec<ResourceSample>>,
}

impl<'a> BatchRunner<'a> {
    pub fn new(driver: &'a dyn UiDriver, config: &'a HarnessConfig) -> Self {
        Self {
            driver,
            config,
            progress: None,
            samples: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Resource samples collected for a case, when sampling was enabled.
    pub fn samples(&self, case_id: &str) -> Option<&[ResourceSample]> {
        self.samples.get(case_id).map(Vec::as_slice)
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(callback) = &self.progress {
            callback(event);
        }
    }

    /// Executes every case in order and folds the results into a report.
    pub async fn run(&mut self, cases: &[TestCaseConfig]) -> RunReport {
        let started_at = Utc::now();
        let total = cases.len();
        info!(total, "batch started");
        self.emit(ProgressEvent::RunStarted { total });

        let mut results: Vec<CaseResult> = Vec::with_capacity(total);
        // Pid learned from the previous case's connect; the first case
        // samples system-wide only.
        let mut last_pid: Option<u32> = None;

        for (index, case) in cases.iter().enumerate() {
            self.emit(ProgressEvent::CaseStarted {
                index,
                total,
                case_id: case.id.clone(),
            });

            let sampler = self
                .config
                .sample_resources
                .then(|| SamplerHandle::start(last_pid, self.config.sample_interval()));

            let mut workflow = ConversionWorkflow::new(self.driver, self.config);
            let result = {
                let progress = &self.progress;
                let case_id = case.id.clone();
                let mut on_wait = |elapsed| {
                    if let Some(callback) = progress {
                        callback(ProgressEvent::ConversionWaiting {
                            case_id: case_id.clone(),
                            elapsed,
                        });
                    }
                };
                workflow.execute(case, &mut on_wait).await
            };
            last_pid = workflow.process_id();

            // Always stopped and drained, whatever the case outcome.
            if let Some(sampler) = sampler {
                self.samples.insert(case.id.clone(), sampler.stop());
            }

            for step in &result.steps {
                self.emit(ProgressEvent::StepRecorded {
                    case_id: case.id.clone(),
                    step: step.clone(),
                });
            }
            self.emit(ProgressEvent::CaseCompleted {
                index,
                total,
                case_id: case.id.clone(),
                status: result.status,
                duration: result.duration,
                conversion_duration: result.conversion_duration,
                error: result.error.clone(),
            });
            results.push(result);

            // No cooldown after the last case.
            if index + 1 < total {
                tokio::time::sleep(self.config.cooldown()).await;
            }
        }

        let report = RunReport::from_cases(results, started_at, Utc::now());
        info!(
            total = report.total,
            passed = report.passed,
            failed = report.failed,
            errored = report.errored,
            "batch finished"
        );
        self.emit(ProgressEvent::RunCompleted {
            total: report.total,
            passed: report.passed,
            failed: report.failed,
            errored: report.errored,
        });
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::{OutputFormat, OutputType, Texture, TriState};
    use std::sync::{Arc, Mutex};

    fn quick_config() -> HarnessConfig {
        let mut config = HarnessConfig::default();
        config.cooldown_secs = 0.05;
        config.main_window_wait_secs = 0.1;
        config.window_wait_secs = 0.1;
        config.control_wait_secs = 0.1;
        config
    }

    fn simple_case(id: &str) -> TestCaseConfig {
        TestCaseConfig {
            id: id.into(),
            output_format: OutputFormat::E57,
            thinning_enabled: false,
            voxel_thinning: TriState::Unset,
            random_thinning: TriState::Unset,
            output_type: OutputType::Merged,
            texture: Texture::Reflectance,
            denoise_enabled: false,
            thickness_optimization_enabled: false,
            expected_result: String::new(),
            notes: String::new(),
        }
    }

    #[tokio::test]
    async fn failed_case_does_not_stop_the_batch() {
        // No UI at all: every case fails at connect, but all of them run.
        let mock = vortex_adapters::MockUiDriver::new();
        let config = quick_config();
        let cases = vec![simple_case("TC001"), simple_case("TC002")];

        let mut runner = BatchRunner::new(&mock, &config);
        let report = runner.run(&cases).await;

        assert_eq!(report.total, 2);
        assert_eq!(report.failed, 2);
        assert_eq!(report.cases[0].config.id, "TC001");
        assert_eq!(report.cases[1].config.id, "TC002");
    }

    #[tokio::test]
    async fn emits_progress_events_in_order() {
        let mock = vortex_adapters::MockUiDriver::new();
        let config = quick_config();
        let cases = vec![simple_case("TC001")];

        let events: Arc<Mutex<Vec<String>>> = Arc::default();
        let sink = Arc::clone(&events);
        let mut runner = BatchRunner::new(&mock, &config).with_progress(Box::new(move |event| {
            let tag = match event {
                ProgressEvent::RunStarted { .. } => "run_started",
                ProgressEvent::CaseStarted { .. } => "case_started",
                ProgressEvent::ConversionWaiting { .. } => "waiting",
                ProgressEvent::StepRecorded { .. } => "step",
                ProgressEvent::CaseCompleted { .. } => "case_completed",
                ProgressEvent::RunCompleted { .. } => "run_completed",
            };
            sink.lock().unwrap().push(tag.into());
        }));
        runner.run(&cases).await;

        let events = events.lock().unwrap();
        assert_eq!(events.first().map(String::as_str), Some("run_started"));
        assert_eq!(events.get(1).map(String::as_str), Some("case_started"));
        assert_eq!(events.last().map(String::as_str), Some("run_completed"));
        assert!(events.iter().any(|e| e == "step"));
        assert!(events.iter().any(|e| e == "case_completed"));
    }

    #[tokio::test]
    async fn sampling_attaches_samples_per_case() {
        let mock = vortex_adapters::MockUiDriver::new();
        let mut config = quick_config();
        config.sample_resources = true;
        config.sample_interval_secs = 0.02;
        let cases = vec![simple_case("TC001")];

        let mut runner = BatchRunner::new(&mock, &config);
        runner.run(&cases).await;

        let samples = runner.samples("TC001").unwrap();
        assert!(!samples.is_empty());
        assert!(runner.samples("TC999").is_none());
    }
}
