//! Rule 4(2) - Deployment of automated tools for detection

use super::{ComplianceRule, RuleError, Scorecard};
use crate::config::{ConfigError, DetectionConfig};
use crate::signals::{
    keyword_score, matched_keywords, pattern_score, sentence_around, CompiledPattern,
};
use shared_types::{Document, Finding, RuleId, RuleResult};

const PATTERN_POINTS: f64 = 60.0;
const KEYWORD_POINTS: f64 = 40.0;

pub struct AutomatedToolsRule {
    keywords: Vec<String>,
    patterns: Vec<CompiledPattern>,
    near_miss_factor: f64,
}

impl AutomatedToolsRule {
    pub fn new(config: &DetectionConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            keywords: config.keywords.clone(),
            patterns: CompiledPattern::compile_all(&config.patterns)?,
            near_miss_factor: config.near_miss_factor,
        })
    }
}

impl ComplianceRule for AutomatedToolsRule {
    fn id(&self) -> RuleId {
        RuleId::AutomatedTools
    }

    fn description(&self) -> &'static str {
        "Deployment of Automated Tools for Detection"
    }

    fn check(&self, document: &Document) -> Result<RuleResult, RuleError> {
        let mut card = Scorecard::new();
        let text = document.text();

        let patterns = pattern_score(text, &self.patterns, PATTERN_POINTS, self.near_miss_factor);
        let message = if !patterns.hits.is_empty() {
            let names: Vec<&str> = patterns.hits.iter().map(|h| h.name.as_str()).collect();
            format!(
                "Found {} pattern matches for automated detection tools ({})",
                patterns.hits.len(),
                names.join(", ")
            )
        } else if patterns.points > 0.0 {
            format!(
                "Detection terms mentioned without automated-detection phrasing ({:.0}% term overlap)",
                patterns.near_miss * 100.0
            )
        } else {
            "No mention of automated detection tools found".to_string()
        };
        card.finding(Finding::scored(message, PATTERN_POINTS, patterns.points));
        for hit in &patterns.hits {
            if let Some(sentence) = sentence_around(text, hit.start) {
                card.evidence(sentence);
            }
        }

        let found = matched_keywords(document.lowered(), &self.keywords);
        let keyword_points = keyword_score(document.lowered(), &self.keywords, KEYWORD_POINTS);
        card.finding(Finding::scored(
            format!("Found {}/{} relevant keywords", found.len(), self.keywords.len()),
            KEYWORD_POINTS,
            keyword_points,
        ));

        let total = patterns.points + keyword_points;
        let recommendation = if total >= 70.0 {
            "Automated detection tools are adequately mentioned.".to_string()
        } else {
            "Explicitly mention deployment of automated tools/systems for detecting harmful \
             synthetic content, including AI-powered detection mechanisms."
                .to_string()
        };

        card.finish(self, 3, recommendation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::RuleStatus;

    fn check(text: &str) -> RuleResult {
        AutomatedToolsRule::new(&DetectionConfig::default())
            .unwrap()
            .check(&Document::new(text, ""))
            .unwrap()
    }

    #[test]
    fn test_detects_automated_tooling() {
        let result = check(
            "We deploy automated tools to detect harmful synthetic content. \
             Our AI detection systems flag deepfakes before they spread.",
        );
        assert_eq!(result.score, 100.0);
        assert_eq!(result.status, RuleStatus::Pass);
        assert!(!result.evidence.is_empty());
        assert!(result.evidence.len() <= 3);
    }

    #[test]
    fn test_keywords_alone_are_partial_credit() {
        let result = check("Harmful posts are reviewed. Synthetic images are common. We detect spam.");
        assert!(result.score > 0.0 && result.score < 70.0, "score was {}", result.score);
        assert!(result.evidence.is_empty());
    }

    #[test]
    fn test_email_does_not_count_as_ai() {
        let result = check("Send an email to our team.");
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn test_custom_pattern_set() {
        let config = DetectionConfig {
            patterns: vec![crate::config::PatternRule::new(
                "classifier",
                r"\bclassifiers?\b",
                &["classifier"],
            )],
            ..DetectionConfig::default()
        };
        let rule = AutomatedToolsRule::new(&config).unwrap();
        let result = rule
            .check(&Document::new("A classifier reviews uploads.", ""))
            .unwrap();
        assert_eq!(result.findings[0].points, 60.0);
    }
}
