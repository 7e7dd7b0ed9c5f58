//! CSV case sheet reader.
//!
//! Pure parse + validate: no side effects, configs returned in source row
//! order (execution order is significant — later cases assume the previous
//! case's cleanup completed), and no row is ever dropped silently.
//!
//! Literal policy: unrecognized enum literals are rejected at load time with
//! a [`ValidationError::UnknownLiteral`] naming the case and field. The
//! whole batch fails before any case runs; per-case leniency here would let
//! a typo silently run the wrong scenario.

use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::case::{OutputFormat, OutputType, TestCaseConfig, Texture, TriState};

/// Required case sheet columns, by header name.
const REQUIRED_COLUMNS: [&str; 9] = [
    "case_id",
    "output_format",
    "thinning",
    "voxel_thinning",
    "random_thinning",
    "output_type",
    "texture",
    "denoise",
    "thickness_optimization",
];

/// Errors raised while loading a case sheet. All of them abort the batch
/// before any case executes.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("case sheet is missing required column '{name}'")]
    MissingColumn { name: String },

    #[error("case sheet reuses case id '{case}'")]
    DuplicateId { case: String },

    #[error("case {case}: unrecognized {field} literal '{value}'")]
    UnknownLiteral {
        case: String,
        field: &'static str,
        value: String,
    },

    #[error("case {case}: thinning is enabled but no thinning mode is selected")]
    ThinningModeMissing { case: String },

    #[error("case {case}: thinning mode selected but thinning is not enabled")]
    ThinningModeUnexpected { case: String },

    #[error("failed to read case sheet: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed case sheet: {0}")]
    Csv(#[from] csv::Error),
}

/// Reads and validates case sheets.
pub struct CaseReader;

impl CaseReader {
    /// Reads a case sheet from a file path.
    pub fn read_path(path: impl AsRef<Path>) -> Result<Vec<TestCaseConfig>, ValidationError> {
        let file = File::open(path.as_ref())?;
        Self::read_from(file)
    }

    /// Reads a case sheet from any reader.
    pub fn read_from(source: impl Read) -> Result<Vec<TestCaseConfig>, ValidationError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(source);

        let headers = reader.headers()?.clone();
        let column = |name: &str| -> Option<usize> {
            headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(name))
        };

        for name in REQUIRED_COLUMNS {
            if column(name).is_none() {
                return Err(ValidationError::MissingColumn { name: name.into() });
            }
        }

        // The presence check above guarantees these resolve; the fallback
        // index is never reached.
        let idx_id = column("case_id").unwrap_or_default();
        let idx_format = column("output_format").unwrap_or_default();
        let idx_thinning = column("thinning").unwrap_or_default();
        let idx_voxel = column("voxel_thinning").unwrap_or_default();
        let idx_random = column("random_thinning").unwrap_or_default();
        let idx_output = column("output_type").unwrap_or_default();
        let idx_texture = column("texture").unwrap_or_default();
        let idx_denoise = column("denoise").unwrap_or_default();
        let idx_thickness = column("thickness_optimization").unwrap_or_default();
        let idx_expected = column("expected_result");
        let idx_notes = column("notes");

        let mut cases = Vec::new();
        let mut seen_ids = HashSet::new();
        for (row, record) in reader.records().enumerate() {
            let record = record?;
            let cell = |idx: usize| record.get(idx).unwrap_or("").trim();

            // Rows without an id get a synthesized positional one.
            let id = match cell(idx_id) {
                "" => format!("TC{:03}", row + 1),
                explicit => explicit.to_string(),
            };
            // Ids key per-case artifacts (samples, report rows) downstream,
            // so a reused one must not load.
            if !seen_ids.insert(id.clone()) {
                return Err(ValidationError::DuplicateId { case: id });
            }

            let case = TestCaseConfig {
                output_format: OutputFormat::parse_literal(cell(idx_format)).ok_or_else(|| {
                    ValidationError::UnknownLiteral {
                        case: id.clone(),
                        field: "output_format",
                        value: cell(idx_format).into(),
                    }
                })?,
                thinning_enabled: parse_enabled(cell(idx_thinning)).ok_or_else(|| {
                    ValidationError::UnknownLiteral {
                        case: id.clone(),
                        field: "thinning",
                        value: cell(idx_thinning).into(),
                    }
                })?,
                voxel_thinning: TriState::parse_literal(cell(idx_voxel)).ok_or_else(|| {
                    ValidationError::UnknownLiteral {
                        case: id.clone(),
                        field: "voxel_thinning",
                        value: cell(idx_voxel).into(),
                    }
                })?,
                random_thinning: TriState::parse_literal(cell(idx_random)).ok_or_else(|| {
                    ValidationError::UnknownLiteral {
                        case: id.clone(),
                        field: "random_thinning",
                        value: cell(idx_random).into(),
                    }
                })?,
                output_type: OutputType::parse_literal(cell(idx_output)).ok_or_else(|| {
                    ValidationError::UnknownLiteral {
                        case: id.clone(),
                        field: "output_type",
                        value: cell(idx_output).into(),
                    }
                })?,
                texture: Texture::parse_literal(cell(idx_texture)).ok_or_else(|| {
                    ValidationError::UnknownLiteral {
                        case: id.clone(),
                        field: "texture",
                        value: cell(idx_texture).into(),
                    }
                })?,
                denoise_enabled: parse_enabled(cell(idx_denoise)).ok_or_else(|| {
                    ValidationError::UnknownLiteral {
                        case: id.clone(),
                        field: "denoise",
                        value: cell(idx_denoise).into(),
                    }
                })?,
                thickness_optimization_enabled: parse_enabled(cell(idx_thickness)).ok_or_else(
                    || ValidationError::UnknownLiteral {
                        case: id.clone(),
                        field: "thickness_optimization",
                        value: cell(idx_thickness).into(),
                    },
                )?,
                expected_result: idx_expected.map(cell).unwrap_or("").to_string(),
                notes: idx_notes.map(cell).unwrap_or("").to_string(),
                id,
            };

            case.validate()?;
            cases.push(case);
        }

        debug!(count = cases.len(), "case sheet loaded");
        Ok(cases)
    }
}

/// Parses a boolean column: `enabled` / `disabled` (empty counts as
/// disabled — sheets routinely leave the cell blank for "off").
fn parse_enabled(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "enabled" => Some(true),
        "disabled" | "" => Some(false),
        _ => None,
    }
}
