//! Per-case execution results.
//!
//! A [`CaseResult`] is created when a workflow starts, mutated only by that
//! workflow (single writer), and frozen when the case completes. Batch code
//! only ever sees completed results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::case::TestCaseConfig;

/// Outcome of a single workflow step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Passed,
    Failed,
}

/// One step attempt, appended in execution order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub name: String,
    pub status: StepStatus,
    /// Detail text: selection made, handle found, or failure cause.
    pub detail: String,
    pub at: DateTime<Utc>,
}

/// Final status of a case.
///
/// `Failed` means a known step did not succeed (control missing, wait or
/// conversion timed out); `Errored` means an unanticipated condition
/// surfaced. The distinction matters for triage: failures point at the
/// application, errors at the harness or its environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    NotRun,
    Passed,
    Failed,
    Errored,
}

/// Everything recorded about one executed case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseResult {
    pub config: TestCaseConfig,
    pub status: CaseStatus,
    pub steps: Vec<StepRecord>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Whole-case wall clock, derived from `started_at`/`ended_at`.
    #[serde(default, with = "opt_duration_serde")]
    pub duration: Option<Duration>,
    /// Conversion window: from confirming the output folder (the last
    /// UI-deterministic event) to the completion dialog appearing.
    pub conversion_started_at: Option<DateTime<Utc>>,
    pub conversion_ended_at: Option<DateTime<Utc>>,
    #[serde(default, with = "opt_duration_serde")]
    pub conversion_duration: Option<Duration>,
    /// Generated output folder name, set once step 6 derives it.
    pub output_folder: Option<String>,
    /// Failure or error message; `None` on passed cases.
    pub error: Option<String>,
}

impl CaseResult {
    /// Creates the result shell for a case about to run.
    pub fn started(config: TestCaseConfig) -> Self {
        Self {
            config,
            status: CaseStatus::NotRun,
            steps: Vec::new(),
            started_at: Utc::now(),
            ended_at: None,
            duration: None,
            conversion_started_at: None,
            conversion_ended_at: None,
            conversion_duration: None,
            output_folder: None,
            error: None,
        }
    }

    /// Appends a step record. Insertion order is the execution order.
    pub fn record_step(
        &mut self,
        name: impl Into<String>,
        status: StepStatus,
        detail: impl Into<String>,
    ) {
        self.steps.push(StepRecord {
            name: name.into(),
            status,
            detail: detail.into(),
            at: Utc::now(),
        });
    }

    /// Seals the result with a final status, computing derived durations.
    pub fn finish(&mut self, status: CaseStatus) {
        let ended = Utc::now();
        self.status = status;
        self.ended_at = Some(ended);
        self.duration = (ended - self.started_at).to_std().ok();
        if let (Some(started), Some(ended)) = (self.conversion_started_at, self.conversion_ended_at)
        {
            self.conversion_duration = (ended - started).to_std().ok();
        }
    }

    pub fn passed(&self) -> bool {
        self.status == CaseStatus::Passed
    }
}

/// Serde helper for optional durations as fractional seconds.
pub(crate) mod opt_duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.map(|d| d.as_secs_f64()).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<f64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs_f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::{OutputFormat, OutputType, Texture, TriState};

    fn config() -> TestCaseConfig {
        TestCaseConfig {
            id: "TC001".into(),
            output_format: OutputFormat::Pts,
            thinning_enabled: false,
            voxel_thinning: TriState::Unset,
            random_thinning: TriState::Unset,
            output_type: OutputType::Merged,
            texture: Texture::Grayscale,
            denoise_enabled: false,
            thickness_optimization_enabled: false,
            expected_result: String::new(),
            notes: String::new(),
        }
    }

    #[test]
    fn steps_preserve_insertion_order() {
        let mut result = CaseResult::started(config());
        result.record_step("connect", StepStatus::Passed, "pid 4242");
        result.record_step("locate window", StepStatus::Failed, "not found");

        assert_eq!(result.steps.len(), 2);
        assert_eq!(result.steps[0].name, "connect");
        assert_eq!(result.steps[1].status, StepStatus::Failed);
    }

    #[test]
    fn finish_derives_durations() {
        let mut result = CaseResult::started(config());
        result.conversion_started_at = Some(result.started_at);
        result.conversion_ended_at = Some(result.started_at + chrono::Duration::seconds(2));
        result.finish(CaseStatus::Passed);

        assert!(result.passed());
        assert!(result.ended_at.is_some());
        assert!(result.duration.is_some());
        assert_eq!(result.conversion_duration, Some(Duration::from_secs(2)));
    }

    #[test]
    fn serializes_durations_as_seconds() {
        let mut result = CaseResult::started(config());
        result.conversion_started_at = Some(result.started_at);
        result.conversion_ended_at = Some(result.started_at + chrono::Duration::seconds(3));
        result.finish(CaseStatus::Passed);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["conversion_duration"], serde_json::json!(3.0));
        assert_eq!(json["status"], "passed");
    }
}
