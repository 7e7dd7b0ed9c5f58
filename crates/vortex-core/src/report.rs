//! Run report aggregation.
//!
//! A [`RunReport`] is a pure fold over completed case results: no I/O, no
//! mutation after construction. Rendering (terminal, JSON, CSV, HTML) lives
//! in the binary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::result::{CaseResult, CaseStatus};

/// Aggregate over the conversion durations of passed cases.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConversionStats {
    #[serde(with = "duration_serde")]
    pub mean: Duration,
    #[serde(with = "duration_serde")]
    pub min: Duration,
    #[serde(with = "duration_serde")]
    pub max: Duration,
    /// How many cases contributed a conversion duration.
    pub samples: usize,
}

/// Immutable summary of one batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
    pub cases: Vec<CaseResult>,
}

impl RunReport {
    /// Folds completed results into a report.
    pub fn from_cases(
        cases: Vec<CaseResult>,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
    ) -> Self {
        let mut passed = 0;
        let mut failed = 0;
        let mut errored = 0;
        for case in &cases {
            match case.status {
                CaseStatus::Passed => passed += 1,
                CaseStatus::Failed => failed += 1,
                CaseStatus::Errored => errored += 1,
                CaseStatus::NotRun => {}
            }
        }
        Self {
            started_at,
            ended_at,
            total: cases.len(),
            passed,
            failed,
            errored,
            cases,
        }
    }

    /// Fraction of cases that passed; `0.0` for an empty run.
    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        {
            self.passed as f64 / self.total as f64
        }
    }

    /// Whether every case passed (and at least one ran).
    pub fn all_passed(&self) -> bool {
        self.total > 0 && self.passed == self.total
    }

    /// Wall clock of the whole run.
    pub fn duration(&self) -> Duration {
        (self.ended_at - self.started_at).to_std().unwrap_or_default()
    }

    /// Conversion duration aggregate over the cases that recorded one.
    /// `None` when no case did (all failed before conversion, or timed out).
    pub fn conversion_stats(&self) -> Option<ConversionStats> {
        let durations: Vec<Duration> = self
            .cases
            .iter()
            .filter_map(|c| c.conversion_duration)
            .collect();
        let samples = durations.len();
        if samples == 0 {
            return None;
        }
        let sum: Duration = durations.iter().sum();
        let min = durations.iter().min().copied()?;
        let max = durations.iter().max().copied()?;
        Some(ConversionStats {
            mean: sum / u32::try_from(samples).unwrap_or(u32::MAX),
            min,
            max,
            samples,
        })
    }
}

/// Serde helper for durations as fractional seconds.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Duration::from_secs_f64(f64::deserialize(deserializer)?))
    }
}
