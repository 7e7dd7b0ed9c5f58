//! Test case configuration: the parameters of one conversion scenario.
//!
//! Literals follow the case sheet vocabulary (`pts`, `merged`,
//! `reflectance+color`, ...). Parsing is strict: an unrecognized literal is
//! an error at load time, never silently mapped to a default — the reader
//! surfaces it as a [`ValidationError`](crate::ValidationError) naming the
//! case and field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::reader::ValidationError;

/// Point cloud output file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Pts,
    E57,
    Las,
}

impl OutputFormat {
    /// The radio-button label in the export window.
    pub fn ui_label(self) -> &'static str {
        match self {
            OutputFormat::Pts => "pts",
            OutputFormat::E57 => "e57",
            OutputFormat::Las => "las",
        }
    }

    /// Parses a case sheet literal.
    pub fn parse_literal(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pts" => Some(OutputFormat::Pts),
            "e57" => Some(OutputFormat::E57),
            "las" => Some(OutputFormat::Las),
            _ => None,
        }
    }

    /// Short tag used in generated folder names.
    fn folder_tag(self) -> &'static str {
        self.ui_label()
    }
}

/// Station handling for the exported cloud.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputType {
    SingleStation,
    Merged,
    SingleAndMerged,
}

impl OutputType {
    pub fn ui_label(self) -> &'static str {
        match self {
            OutputType::SingleStation => "Single station",
            OutputType::Merged => "Merged",
            OutputType::SingleAndMerged => "Single station + merged",
        }
    }

    pub fn parse_literal(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "single-station" | "single station" | "single" => Some(OutputType::SingleStation),
            "merged" => Some(OutputType::Merged),
            "single+merged" | "single-station+merged" | "single station + merged" => {
                Some(OutputType::SingleAndMerged)
            }
            _ => None,
        }
    }

    fn folder_tag(self) -> &'static str {
        match self {
            OutputType::SingleStation => "single",
            OutputType::Merged => "merged",
            OutputType::SingleAndMerged => "single+merged",
        }
    }
}

/// Texture source applied to the exported points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Texture {
    Grayscale,
    Reflectance,
    ReflectanceColor,
    ReflectanceGrayscale,
}

impl Texture {
    pub fn ui_label(self) -> &'static str {
        match self {
            Texture::Grayscale => "Grayscale",
            Texture::Reflectance => "Reflectance",
            Texture::ReflectanceColor => "Reflectance + color",
            Texture::ReflectanceGrayscale => "Reflectance + grayscale",
        }
    }

    pub fn parse_literal(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "grayscale" => Some(Texture::Grayscale),
            "reflectance" => Some(Texture::Reflectance),
            "reflectance+color" => Some(Texture::ReflectanceColor),
            "reflectance+grayscale" => Some(Texture::ReflectanceGrayscale),
            _ => None,
        }
    }

    fn folder_tag(self) -> &'static str {
        match self {
            Texture::Grayscale => "gray",
            Texture::Reflectance => "refl",
            Texture::ReflectanceColor => "refl+color",
            Texture::ReflectanceGrayscale => "refl+gray",
        }
    }
}

/// Tri-state for the thinning sub-choices: the sheet cell may be `enabled`,
/// `disabled`, or empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriState {
    Enabled,
    Disabled,
    #[default]
    Unset,
}

impl TriState {
    pub fn parse_literal(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" => Some(TriState::Unset),
            "enabled" => Some(TriState::Enabled),
            "disabled" => Some(TriState::Disabled),
            _ => None,
        }
    }

    pub fn is_enabled(self) -> bool {
        self == TriState::Enabled
    }
}

/// Validated parameters of one conversion scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCaseConfig {
    /// Unique within a batch.
    pub id: String,
    pub output_format: OutputFormat,
    pub thinning_enabled: bool,
    pub voxel_thinning: TriState,
    pub random_thinning: TriState,
    pub output_type: OutputType,
    pub texture: Texture,
    pub denoise_enabled: bool,
    pub thickness_optimization_enabled: bool,
    /// Informational only.
    #[serde(default)]
    pub expected_result: String,
    /// Informational only.
    #[serde(default)]
    pub notes: String,
}

impl TestCaseConfig {
    /// Enforces the thinning consistency invariant:
    /// `thinning_enabled` iff at least one sub-choice is enabled.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let any_mode = self.voxel_thinning.is_enabled() || self.random_thinning.is_enabled();
        if self.thinning_enabled && !any_mode {
            return Err(ValidationError::ThinningModeMissing {
                case: self.id.clone(),
            });
        }
        if !self.thinning_enabled && any_mode {
            return Err(ValidationError::ThinningModeUnexpected {
                case: self.id.clone(),
            });
        }
        Ok(())
    }

    /// Deterministic, human-readable output folder name for this case at
    /// the given instant, truncated to `max_len` for filesystem limits.
    ///
    /// Fields are concatenated in a fixed order (format, thinning mode,
    /// output type, texture, denoise, thickness) with an `MMDDHHMM`
    /// timestamp suffix for uniqueness across repeated runs.
    pub fn folder_name_at(&self, at: DateTime<Utc>, max_len: usize) -> String {
        let thinning = if self.thinning_enabled {
            match (
                self.voxel_thinning.is_enabled(),
                self.random_thinning.is_enabled(),
            ) {
                (true, true) => "thin-voxel+random",
                (true, false) => "thin-voxel",
                (false, true) => "thin-random",
                // validate() rejects this combination before execution.
                (false, false) => "thin-none",
            }
        } else {
            "thin-off"
        };

        let parts = [
            format!("fmt-{}", self.output_format.folder_tag()),
            thinning.to_string(),
            format!("out-{}", self.output_type.folder_tag()),
            format!("tex-{}", self.texture.folder_tag()),
            format!("dn-{}", if self.denoise_enabled { "on" } else { "off" }),
            format!(
                "tk-{}",
                if self.thickness_optimization_enabled {
                    "on"
                } else {
                    "off"
                }
            ),
            at.format("%m%d%H%M").to_string(),
        ];

        let mut name = parts.join("_");
        name.truncate(max_len);
        name
    }

    /// [`folder_name_at`](Self::folder_name_at) with the current time.
    pub fn folder_name(&self, max_len: usize) -> String {
        self.folder_name_at(Utc::now(), max_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn base_case() -> TestCaseConfig {
        TestCaseConfig {
            id: "TC001".into(),
            output_format: OutputFormat::E57,
            thinning_enabled: false,
            voxel_thinning: TriState::Unset,
            random_thinning: TriState::Unset,
            output_type: OutputType::Merged,
            texture: Texture::Reflectance,
            denoise_enabled: true,
            thickness_optimization_enabled: false,
            expected_result: "success".into(),
            notes: String::new(),
        }
    }

    #[test]
    fn literal_parsing_round_trip() {
        assert_eq!(OutputFormat::parse_literal(" E57 "), Some(OutputFormat::E57));
        assert_eq!(OutputFormat::parse_literal("xyz"), None);
        assert_eq!(
            OutputType::parse_literal("single+merged"),
            Some(OutputType::SingleAndMerged)
        );
        assert_eq!(
            Texture::parse_literal("reflectance+grayscale"),
            Some(Texture::ReflectanceGrayscale)
        );
        assert_eq!(TriState::parse_literal(""), Some(TriState::Unset));
        assert_eq!(TriState::parse_literal("maybe"), None);
    }

    #[test]
    fn validate_accepts_consistent_thinning() {
        let mut case = base_case();
        assert!(case.validate().is_ok());

        case.thinning_enabled = true;
        case.voxel_thinning = TriState::Enabled;
        assert!(case.validate().is_ok());
    }

    #[test]
    fn validate_rejects_thinning_without_mode() {
        let mut case = base_case();
        case.thinning_enabled = true;
        let err = case.validate().unwrap_err();
        assert!(matches!(err, ValidationError::ThinningModeMissing { .. }));
        assert!(err.to_string().contains("TC001"));
    }

    #[test]
    fn validate_rejects_mode_without_thinning() {
        let mut case = base_case();
        case.random_thinning = TriState::Enabled;
        assert!(matches!(
            case.validate().unwrap_err(),
            ValidationError::ThinningModeUnexpected { .. }
        ));
    }

    #[test]
    fn folder_name_is_deterministic_and_bounded() {
        let case = base_case();
        let at = Utc.with_ymd_and_hms(2025, 8, 28, 13, 42, 0).unwrap();

        let a = case.folder_name_at(at, 50);
        let b = case.folder_name_at(at, 50);
        assert_eq!(a, b);
        assert!(a.len() <= 50);
        assert!(a.starts_with("fmt-e57_thin-off_out-merged_tex-refl_dn-on"));
    }

    #[test]
    fn folder_name_encodes_thinning_modes() {
        let mut case = base_case();
        case.thinning_enabled = true;
        case.voxel_thinning = TriState::Enabled;
        case.random_thinning = TriState::Enabled;
        let at = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 0).unwrap();

        let name = case.folder_name_at(at, 200);
        assert!(name.contains("thin-voxel+random"));
        assert!(name.ends_with("01020304"));
    }

    #[test]
    fn folder_name_truncates_to_max() {
        let case = base_case();
        let at = Utc.with_ymd_and_hms(2025, 8, 28, 13, 42, 0).unwrap();
        assert_eq!(case.folder_name_at(at, 10).len(), 10);
    }
}
