//! Immutable engine configuration
//!
//! Keyword lists, pattern sets, the official definition text and the image
//! tunables live here. A `ComplianceConfig` is built once, validated, and
//! handed to each evaluator at construction; nothing reads global state.

use crate::patterns;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or compiling a configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid pattern '{name}': {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },

    #[error("Malformed configuration: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Invalid setting {field}: {reason}")]
    OutOfRange { field: &'static str, reason: String },
}

/// A phrase-structure rule: a regex plus the bare terms it is built from.
/// The terms drive near-miss credit when the full phrase is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternRule {
    pub name: String,
    pub regex: String,
    pub terms: Vec<String>,
}

impl PatternRule {
    pub fn new(name: &str, regex: &str, terms: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            regex: regex.to_string(),
            terms: to_strings(terms),
        }
    }
}

/// Linear mapping of a similarity ratio onto the definition sub-score.
/// Ratios at or below `floor` earn nothing, at or above `ceiling` earn all.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityBand {
    pub floor: f64,
    pub ceiling: f64,
}

impl SimilarityBand {
    pub fn scale(&self, similarity: f64) -> f64 {
        if !similarity.is_finite() {
            return 0.0;
        }
        ((similarity - self.floor) / (self.ceiling - self.floor)).clamp(0.0, 1.0)
    }
}

impl Default for SimilarityBand {
    fn default() -> Self {
        Self {
            floor: 0.30,
            ceiling: 0.80,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefinitionConfig {
    pub official_definition: String,
    pub keywords: Vec<String>,
    /// Terms that mark a sentence as definition-like
    pub definition_terms: Vec<String>,
    pub stopwords: Vec<String>,
    /// Stemmed token rewrites applied before comparing token sets
    pub synonyms: Vec<(String, String)>,
    pub band: SimilarityBand,
}

impl Default for DefinitionConfig {
    fn default() -> Self {
        Self {
            official_definition: patterns::OFFICIAL_DEFINITION.to_string(),
            keywords: to_strings(patterns::DEFINITION_KEYWORDS),
            definition_terms: to_strings(patterns::DEFINITION_TERMS),
            stopwords: to_strings(patterns::STOPWORDS),
            synonyms: patterns::SYNONYMS
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
            band: SimilarityBand::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub keywords: Vec<String>,
    pub patterns: Vec<PatternRule>,
    /// Share of the pattern points granted for a near miss
    pub near_miss_factor: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            keywords: to_strings(patterns::DETECTION_KEYWORDS),
            patterns: patterns::detection_patterns(),
            near_miss_factor: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplaintConfig {
    pub complaint_keywords: Vec<String>,
    pub ai_keywords: Vec<String>,
}

impl Default for ComplaintConfig {
    fn default() -> Self {
        Self {
            complaint_keywords: to_strings(patterns::COMPLAINT_KEYWORDS),
            ai_keywords: to_strings(patterns::AI_CONTENT_KEYWORDS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProhibitedConfig {
    pub section_phrases: Vec<String>,
}

impl Default for ProhibitedConfig {
    fn default() -> Self {
        Self {
            section_phrases: to_strings(patterns::PROHIBITED_PHRASES),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelingConfig {
    pub label_keywords: Vec<String>,
    pub immediate_keywords: Vec<String>,
    pub prohibition_keywords: Vec<String>,
}

impl Default for LabelingConfig {
    fn default() -> Self {
        Self {
            label_keywords: to_strings(patterns::LABEL_KEYWORDS),
            immediate_keywords: to_strings(patterns::IMMEDIATE_KEYWORDS),
            prohibition_keywords: to_strings(patterns::PROHIBITION_KEYWORDS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SsmiConfig {
    pub declaration_keywords: Vec<String>,
    pub verification_keywords: Vec<String>,
    pub labeling_keywords: Vec<String>,
    pub ssmi_indicators: Vec<String>,
}

impl Default for SsmiConfig {
    fn default() -> Self {
        Self {
            declaration_keywords: to_strings(patterns::DECLARATION_KEYWORDS),
            verification_keywords: to_strings(patterns::VERIFICATION_KEYWORDS),
            labeling_keywords: to_strings(patterns::SSMI_LABELING_KEYWORDS),
            ssmi_indicators: to_strings(patterns::SSMI_INDICATORS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Terms that identify an AI-content label in metadata or OCR text
    pub vocabulary: Vec<String>,
    /// Long-side limit before analysis; larger images are downscaled
    pub max_dimension: u32,
    /// Corner window side as a fraction of the shorter image side
    pub corner_fraction: f64,
    /// Mean-luma difference that makes a corner anomalous
    pub brightness_delta: f64,
    /// Sobel magnitude (|gx| + |gy|) at which a pixel counts as an edge
    pub edge_threshold: u32,
    /// Luma tolerance of the flood fill that traces an overlay background
    pub fill_tolerance: u8,
    /// Share of a candidate's interior that must sit near its median luma
    pub uniform_fraction: f64,
    /// Share of a candidate's inner border that must be edge pixels
    pub boundary_edge_ratio: f64,
    pub min_region_fraction: f64,
    /// Upper size bound for edge and overlay candidates; corner patches
    /// are not capped
    pub max_region_fraction: f64,
    /// Corner crop side, as a fraction of each dimension, for OCR
    pub ocr_corner_fraction: f64,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            vocabulary: to_strings(patterns::AI_LABEL_VOCABULARY),
            max_dimension: 512,
            corner_fraction: 0.15,
            brightness_delta: 30.0,
            edge_threshold: 100,
            fill_tolerance: 24,
            uniform_fraction: 0.6,
            boundary_edge_ratio: 0.5,
            min_region_fraction: 0.002,
            max_region_fraction: 0.5,
            ocr_corner_fraction: 0.25,
        }
    }
}

/// Full engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplianceConfig {
    pub definition: DefinitionConfig,
    pub detection: DetectionConfig,
    pub complaints: ComplaintConfig,
    pub prohibited: ProhibitedConfig,
    pub labeling: LabelingConfig,
    pub ssmi: SsmiConfig,
    pub image: ImageConfig,
}

impl ComplianceConfig {
    /// Load an override document; absent fields keep their defaults
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: ComplianceConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let band = self.definition.band;
        if !(0.0..1.0).contains(&band.floor) || band.ceiling <= band.floor || band.ceiling > 1.0 {
            return Err(ConfigError::OutOfRange {
                field: "definition.band",
                reason: format!(
                    "expected 0 <= floor < ceiling <= 1, got {} and {}",
                    band.floor, band.ceiling
                ),
            });
        }
        if self.definition.official_definition.trim().is_empty() {
            return Err(ConfigError::OutOfRange {
                field: "definition.official_definition",
                reason: "must not be empty".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.detection.near_miss_factor) {
            return Err(ConfigError::OutOfRange {
                field: "detection.near_miss_factor",
                reason: format!("expected 0..=1, got {}", self.detection.near_miss_factor),
            });
        }

        let image = &self.image;
        if image.max_dimension < 16 {
            return Err(ConfigError::OutOfRange {
                field: "image.max_dimension",
                reason: format!("expected at least 16, got {}", image.max_dimension),
            });
        }
        for (field, value) in [
            ("image.corner_fraction", image.corner_fraction),
            ("image.ocr_corner_fraction", image.ocr_corner_fraction),
            ("image.uniform_fraction", image.uniform_fraction),
            ("image.boundary_edge_ratio", image.boundary_edge_ratio),
            ("image.max_region_fraction", image.max_region_fraction),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ConfigError::OutOfRange {
                    field,
                    reason: format!("expected 0 < value <= 1, got {}", value),
                });
            }
        }
        if !(image.min_region_fraction >= 0.0
            && image.min_region_fraction < image.max_region_fraction)
        {
            return Err(ConfigError::OutOfRange {
                field: "image.min_region_fraction",
                reason: "must be below image.max_region_fraction".to_string(),
            });
        }
        Ok(())
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ComplianceConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let config = ComplianceConfig::from_json_str(
            r#"{ "complaints": { "complaint_keywords": ["grievance"] } }"#,
        )
        .unwrap();
        assert_eq!(config.complaints.complaint_keywords, vec!["grievance"]);
        assert_eq!(
            config.complaints.ai_keywords,
            ComplaintConfig::default().ai_keywords
        );
        assert_eq!(config.image, ImageConfig::default());
    }

    #[test]
    fn test_rejects_inverted_similarity_band() {
        let err = ComplianceConfig::from_json_str(
            r#"{ "definition": { "band": { "floor": 0.9, "ceiling": 0.5 } } }"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::OutOfRange {
                field: "definition.band",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_malformed_json() {
        let err = ComplianceConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Malformed(_)));
    }

    #[test]
    fn test_similarity_band_is_linear_and_clamped() {
        let band = SimilarityBand::default();
        assert_eq!(band.scale(0.1), 0.0);
        assert_eq!(band.scale(0.3), 0.0);
        assert!((band.scale(0.55) - 0.5).abs() < 1e-9);
        assert_eq!(band.scale(0.8), 1.0);
        assert_eq!(band.scale(1.0), 1.0);
        assert_eq!(band.scale(f64::NAN), 0.0);
    }
}
