//! Compliance engine for synthetic-content labeling obligations
//!
//! Scores a platform's policy text against six rules and estimates how well
//! its homepage imagery carries an AI-content label, then folds both into a
//! `ComplianceReport`.

pub mod config;
pub mod extractors;
pub mod image;
pub mod patterns;
pub mod report;
pub mod rules;
pub mod scoring;
pub mod signals;

use crate::image::ocr::{detect_backend, OcrEngine, UnavailableOcr};
use chrono::{DateTime, Utc};
use config::{ComplianceConfig, ConfigError};
use report::ReportBuilder;
use rules::{build_rules, evaluate_isolated, ComplianceRule, RuleError};
use shared_types::{ComplianceReport, Document, ImageAnalysisResult, RuleResult, RuleResults};

pub use crate::image::{ImageCandidate, ImageError, ImageLabelDetector};

/// Everything the engine needs for one platform
#[derive(Debug, Clone)]
pub struct CheckRequest {
    pub platform_name: String,
    pub document: Document,
    pub homepage_url: Option<String>,
    pub images: Vec<ImageCandidate>,
}

impl CheckRequest {
    pub fn new(platform_name: &str, document: Document) -> Self {
        Self {
            platform_name: platform_name.to_string(),
            document,
            homepage_url: None,
            images: Vec::new(),
        }
    }

    pub fn with_homepage(mut self, url: &str) -> Self {
        self.homepage_url = Some(url.to_string());
        self
    }

    pub fn with_image(mut self, candidate: ImageCandidate) -> Self {
        self.images.push(candidate);
        self
    }
}

/// ComplianceEngine entry point
pub struct ComplianceEngine {
    rules: Vec<Box<dyn ComplianceRule>>,
    detector: ImageLabelDetector,
}

impl ComplianceEngine {
    /// Built-in configuration with whichever OCR backend is installed
    pub fn new() -> Self {
        Self::with_config(ComplianceConfig::default(), detect_backend())
            .expect("built-in configuration is valid")
    }

    /// Built-in configuration with the OCR stage disabled
    pub fn without_ocr() -> Self {
        Self::with_config(
            ComplianceConfig::default(),
            Box::new(UnavailableOcr::new("OCR disabled")),
        )
        .expect("built-in configuration is valid")
    }

    pub fn with_config(
        config: ComplianceConfig,
        ocr: Box<dyn OcrEngine>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let rules = build_rules(&config)?;
        tracing::debug!(rules = rules.len(), ocr = ocr.name(), "compliance engine ready");
        Ok(Self {
            rules,
            detector: ImageLabelDetector::new(config.image, ocr),
        })
    }

    /// Assemble an engine from custom evaluators
    pub fn from_parts(rules: Vec<Box<dyn ComplianceRule>>, detector: ImageLabelDetector) -> Self {
        Self { rules, detector }
    }

    pub fn detector(&self) -> &ImageLabelDetector {
        &self.detector
    }

    /// Run every rule in isolation. A rule that is missing, errors or
    /// panics comes back as a zero-score failure.
    pub fn evaluate_rules(&self, document: &Document) -> RuleResults {
        RuleResults::from_fn(|id| match self.rules.iter().find(|r| r.id() == id) {
            Some(rule) => evaluate_isolated(rule.as_ref(), document),
            None => {
                let err = RuleError::Missing(id);
                tracing::warn!(rule = id.key(), error = %err, "rule not registered");
                RuleResult::failed(id, id.citation(), &err.to_string())
            }
        })
    }

    /// Check raw policy text
    pub fn check_text(&self, text: &str) -> RuleResults {
        self.evaluate_rules(&Document::new(text, ""))
    }

    pub fn analyze_images(&self, candidates: &[ImageCandidate]) -> ImageAnalysisResult {
        self.detector.analyze_candidates(candidates)
    }

    pub fn check(&self, request: &CheckRequest) -> ComplianceReport {
        self.check_at(request, Utc::now())
    }

    /// Same as `check` with a caller-supplied report timestamp
    pub fn check_at(&self, request: &CheckRequest, timestamp: DateTime<Utc>) -> ComplianceReport {
        let rules = self.evaluate_rules(&request.document);
        let image_analysis = self.analyze_images(&request.images);

        ReportBuilder::new(&request.platform_name, timestamp)
            .homepage_url(request.homepage_url.as_deref())
            .images_analyzed(request.images.len())
            .build(&request.document, rules, image_analysis)
    }
}

impl Default for ComplianceEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImageConfig;
    use crate::patterns::OFFICIAL_DEFINITION;
    use chrono::TimeZone;
    use shared_types::{OverallStatus, RuleId, RuleStatus};

    const STRONG_POLICY: &str = "\
        Synthetically generated information means information that is artificially or \
        algorithmically created, generated, modified or altered using a computer resource, in a \
        manner that appears reasonably authentic or true. \
        We deploy automated tools to detect harmful synthetic content. \
        Users may file a complaint about AI-generated content with our Grievance Officer. \
        Deepfakes and misleading AI-generated content are prohibited, preserving our Section 79 \
        safe harbour. \
        Synthetic content must carry a visible label and embedded metadata covering at least 10% \
        of the surface area, immediately identifiable, and we prohibit removal or modification. \
        Users must declare whether content is synthetic, verified by technical measures, and we \
        ensure synthetic content carries a label.";

    struct ExplodingRule;

    impl ComplianceRule for ExplodingRule {
        fn id(&self) -> RuleId {
            RuleId::AutomatedTools
        }

        fn description(&self) -> &'static str {
            "Explodes"
        }

        fn check(&self, _document: &Document) -> Result<RuleResult, RuleError> {
            panic!("evaluator bug")
        }
    }

    fn engine() -> ComplianceEngine {
        ComplianceEngine::without_ocr()
    }

    #[test]
    fn test_default_configuration_builds() {
        assert!(ComplianceEngine::with_config(
            ComplianceConfig::default(),
            Box::new(UnavailableOcr::default())
        )
        .is_ok());
        assert_eq!(engine().detector().ocr_backend(), "unavailable");
    }

    #[test]
    fn test_invalid_configuration_is_rejected() {
        let mut config = ComplianceConfig::default();
        config.detection.patterns[0].regex = "(unclosed".to_string();
        let err = ComplianceEngine::with_config(config, Box::new(UnavailableOcr::default()));
        assert!(matches!(err, Err(ConfigError::InvalidPattern { .. })));
    }

    #[test]
    fn test_paraphrased_definition_scenario() {
        let results = engine().check_text(
            "We define synthetically generated information as algorithmically created content that appears authentic.",
        );
        let definition = results.get(RuleId::Definition);
        assert!(definition.score >= 80.0, "score was {}", definition.score);
        assert_eq!(definition.status, RuleStatus::Pass);
    }

    #[test]
    fn test_official_definition_scenario() {
        let results = engine().check_text(OFFICIAL_DEFINITION);
        let definition = results.get(RuleId::Definition);
        assert!(definition.score >= 95.0);
        assert!(!definition.evidence.is_empty());
    }

    #[test]
    fn test_strong_policy_is_compliant() {
        let results = engine().check_text(STRONG_POLICY);
        for result in results.iter() {
            assert_eq!(result.status, RuleStatus::Pass, "{}: {}", result.rule, result.score);
        }
    }

    #[test]
    fn test_faulty_rule_is_isolated() {
        let config = ComplianceConfig::default();
        let mut rules = build_rules(&config).unwrap();
        rules.retain(|r| r.id() != RuleId::AutomatedTools && r.id() != RuleId::Ssmi);
        rules.push(Box::new(ExplodingRule));
        let engine = ComplianceEngine::from_parts(
            rules,
            ImageLabelDetector::new(ImageConfig::default(), Box::new(UnavailableOcr::default())),
        );

        let results = engine.check_text(STRONG_POLICY);
        let exploded = results.get(RuleId::AutomatedTools);
        assert_eq!(exploded.score, 0.0);
        assert!(exploded.findings[0].message.contains("evaluator bug"));
        let missing = results.get(RuleId::Ssmi);
        assert_eq!(missing.score, 0.0);
        assert!(missing.findings[0].message.contains("no evaluator registered"));
        assert_eq!(results.get(RuleId::Labeling).status, RuleStatus::Pass);
    }

    #[test]
    fn test_report_without_images() {
        let request = CheckRequest::new(
            "Acme Social",
            Document::new(STRONG_POLICY, "https://acme.example/privacy"),
        )
        .with_homepage("https://acme.example");
        let at = Utc.with_ymd_and_hms(2025, 2, 1, 12, 0, 0).unwrap();
        let report = engine().check_at(&request, at);

        assert!(report.success);
        assert_eq!(report.overall_status, OverallStatus::Compliant);
        assert_eq!(report.images_analyzed, 0);
        assert!(!report.image_analysis.success);
        assert_eq!(
            report.image_analysis.error.as_deref(),
            Some("No homepage image available")
        );
        assert_eq!(report.homepage_url.as_deref(), Some("https://acme.example"));
    }

    #[test]
    fn test_empty_request_still_reports() {
        let request = CheckRequest::new("", Document::new("", ""));
        let report = engine().check(&request);
        assert!(!report.success);
        assert_eq!(report.platform_name, "Unknown Platform");
        assert_eq!(report.overall_score, 0.0);
        assert_eq!(report.overall_status, OverallStatus::NonCompliant);
    }
}
