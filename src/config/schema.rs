//! Configuration schema types for `vipp2dfa.toml`
//!
//! Defines the structure and validation rules for converter configuration.
//! Every section and field is optional; an empty file is a valid config.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How sub-form programs are wrapped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubformMode {
    /// Bare OUTLINE meant to be pulled in with `USE FORMAT ... EXTERNAL`
    #[default]
    Include,
    /// Self-contained `DOCFORMAT`
    Standalone,
}

/// Input record format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// `RECORD-LENGTH` of the input format
    #[serde(default = "default_record_length")]
    pub record_length: u32,
    /// Input code page
    #[serde(default = "default_code_page")]
    pub code_page: u32,
    /// `CHANNEL-CODE` value
    #[serde(default = "default_channel_code")]
    pub channel_code: String,
    /// Record that ends one document
    #[serde(default = "default_document_separator")]
    pub document_separator: String,
    /// Field delimiter when the source has no `SETDBSEP`
    #[serde(default = "default_delimiter")]
    pub default_delimiter: String,
    /// Number of `FLDn` names assumed without a WIZVAR header
    #[serde(default = "default_field_count")]
    pub default_field_count: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            record_length: default_record_length(),
            code_page: default_code_page(),
            channel_code: default_channel_code(),
            document_separator: default_document_separator(),
            default_delimiter: default_delimiter(),
            default_field_count: default_field_count(),
        }
    }
}

fn default_record_length() -> u32 {
    4096
}

fn default_code_page() -> u32 {
    1252
}

fn default_channel_code() -> String {
    "NO".to_string()
}

fn default_document_separator() -> String {
    "1".to_string()
}

fn default_delimiter() -> String {
    "|".to_string()
}

fn default_field_count() -> usize {
    20
}

/// Page layout defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Font used before any font selection
    #[serde(default = "default_font")]
    pub default_font: String,
    /// Sub-form wrapping
    #[serde(default)]
    pub subform_mode: SubformMode,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self { default_font: default_font(), subform_mode: SubformMode::default() }
    }
}

fn default_font() -> String {
    "ARIAL08".to_string()
}

/// One font-size band of the vertical position correction table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontBand {
    /// Largest font size (inclusive) in this band; `None` matches everything
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub up_to: Option<f64>,
    /// Point size naming the correction variable (`&CORFONT{points}`)
    pub points: u32,
    /// Correction value assigned at startup
    pub offset: f64,
}

impl FontBand {
    fn new(up_to: Option<f64>, points: u32, offset: f64) -> Self {
        Self { up_to, points, offset }
    }

    /// Name of the correction variable for this band.
    pub fn variable(&self) -> String {
        format!("&CORFONT{}", self.points)
    }

    fn contains(&self, size: f64) -> bool {
        self.up_to.map_or(true, |limit| size <= limit)
    }
}

/// Empirical vertical position corrections
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// `&CORSEGMENT` value applied to segment positions
    #[serde(default = "default_segment_correction")]
    pub segment_correction: f64,
    /// Ordered font-size bands
    #[serde(default = "default_font_bands")]
    pub font_bands: Vec<FontBand>,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self { segment_correction: default_segment_correction(), font_bands: default_font_bands() }
    }
}

impl CalibrationConfig {
    /// First band whose limit admits `size`.
    pub fn band_for(&self, size: f64) -> Option<&FontBand> {
        self.font_bands.iter().find(|band| band.contains(size))
    }
}

fn default_segment_correction() -> f64 {
    33.0
}

fn default_font_bands() -> Vec<FontBand> {
    vec![
        FontBand::new(Some(6.5), 6, -33.0),
        FontBand::new(Some(7.5), 7, -37.5),
        FontBand::new(Some(9.0), 8, -43.5),
        FontBand::new(Some(11.0), 10, -55.5),
        FontBand::new(None, 12, -66.0),
    ]
}

/// Subroutine expansion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubroutineConfig {
    /// Subroutines with at most this many commands are expanded in place
    #[serde(default = "default_inline_threshold")]
    pub inline_threshold: usize,
}

impl Default for SubroutineConfig {
    fn default() -> Self {
        Self { inline_threshold: default_inline_threshold() }
    }
}

fn default_inline_threshold() -> usize {
    5
}

/// Emitted lines matching any of these patterns are commented out
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MalformedConfig {
    /// Replaces the built-in pattern list
    #[serde(default = "default_malformed_patterns")]
    pub patterns: Vec<String>,
    /// Appended to `patterns`
    #[serde(default)]
    pub extra_patterns: Vec<String>,
}

impl Default for MalformedConfig {
    fn default() -> Self {
        Self { patterns: default_malformed_patterns(), extra_patterns: Vec::new() }
    }
}

impl MalformedConfig {
    /// Every configured pattern, built-in list first.
    pub fn all_patterns(&self) -> impl Iterator<Item = &String> {
        self.patterns.iter().chain(self.extra_patterns.iter())
    }
}

fn default_malformed_patterns() -> Vec<String> {
    [
        r"PAGEBRK IF",
        r"\{ /",
        r"\} %",
        r"SETPAGENUMBER",
        r" VSUB ",
        r" SETVAR \}",
        r"= -;",
        r"= =;",
        r" (?:eq|ne|gt|lt) \(.* = (?:VAR_|FLD)| = (?:VAR_|FLD).* (?:eq|ne|gt|lt) \(",
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
}

/// Output locations and batch behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving `.dfa` files
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    /// Write `conversion_report.json`
    #[serde(default)]
    pub report: bool,
    /// Copy referenced resources next to the output
    #[serde(default)]
    pub copy_resources: bool,
    /// Worker threads for batch mode; unset means available parallelism
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { dir: default_output_dir(), report: false, copy_resources: false, jobs: None }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

/// Root configuration structure for `vipp2dfa.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConverterConfig {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub subroutines: SubroutineConfig,
    #[serde(default)]
    pub malformed: MalformedConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "calibration.font_bands[2].up_to")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "vipp2dfa.toml: '{}' {}", self.field, self.message)
    }
}

impl ConverterConfig {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();
        let mut push = |field: String, message: &str| {
            errors.push(ConfigValidationError { field, message: message.to_string() });
        };

        if self.input.record_length == 0 {
            push("input.record_length".to_string(), "must be a positive integer");
        }
        if self.input.default_delimiter.chars().count() != 1 {
            push("input.default_delimiter".to_string(), "must be exactly one character");
        }
        if self.layout.default_font.trim().is_empty() {
            push("layout.default_font".to_string(), "must be a non-empty string");
        }

        // Bands must ascend, and only the last one may be a catch-all
        let bands = &self.calibration.font_bands;
        if bands.is_empty() {
            push("calibration.font_bands".to_string(), "must contain at least one band");
        }
        let mut previous: Option<f64> = None;
        for (idx, band) in bands.iter().enumerate() {
            match band.up_to {
                None if idx + 1 != bands.len() => {
                    push(format!("calibration.font_bands[{}].up_to", idx), "catch-all band must be last");
                }
                Some(limit) if previous.is_some_and(|p| limit <= p) => {
                    push(format!("calibration.font_bands[{}].up_to", idx), "bands must be in ascending order");
                }
                _ => {}
            }
            if band.up_to.is_some() {
                previous = band.up_to;
            }
        }

        for (idx, pattern) in self.malformed.patterns.iter().enumerate() {
            if Regex::new(pattern).is_err() {
                push(format!("malformed.patterns[{}]", idx), "is not a valid regular expression");
            }
        }
        for (idx, pattern) in self.malformed.extra_patterns.iter().enumerate() {
            if Regex::new(pattern).is_err() {
                push(format!("malformed.extra_patterns[{}]", idx), "is not a valid regular expression");
            }
        }

        if self.output.jobs == Some(0) {
            push("output.jobs".to_string(), "must be a positive integer");
        }

        errors
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}
