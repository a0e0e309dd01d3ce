//! Rule 3(1)(b) Proviso - Prohibition of harmful AI-generated content

use super::{ComplianceRule, RuleError, Scorecard};
use crate::config::ProhibitedConfig;
use crate::signals::{matched_keywords, sentence_around};
use lazy_static::lazy_static;
use regex::Regex;
use shared_types::{Document, Finding, RuleId, RuleResult};

const SECTION_POINTS: f64 = 30.0;
const DEEPFAKE_POINTS: f64 = 35.0;
const MISLEADING_POINTS: f64 = 20.0;
const SECTION_79_POINTS: f64 = 15.0;

lazy_static! {
    /// "deepfake", "deep fakes", "deep-fake"
    static ref DEEPFAKE_PATTERN: Regex = Regex::new(r"(?i)\bdeep[\s-]?fakes?\b").unwrap();

    /// Misleading or manipulated material, within one sentence
    static ref MISLEADING_PATTERN: Regex = Regex::new(
        r"(?i)\b(?:misleading|manipulated)\b[^.!?]{0,80}?\b(?:information|content|media)"
    )
    .unwrap();

    /// IT Act safe-harbour provision
    static ref SECTION_79_PATTERN: Regex = Regex::new(r"(?i)\bsection\s+79\b").unwrap();
}

pub struct ProhibitedContentRule {
    section_phrases: Vec<String>,
}

impl ProhibitedContentRule {
    pub fn new(config: &ProhibitedConfig) -> Self {
        Self {
            section_phrases: config.section_phrases.clone(),
        }
    }
}

impl ComplianceRule for ProhibitedContentRule {
    fn id(&self) -> RuleId {
        RuleId::ProhibitedContent
    }

    fn description(&self) -> &'static str {
        "Prohibition of Harmful AI-Generated Content"
    }

    fn check(&self, document: &Document) -> Result<RuleResult, RuleError> {
        let mut card = Scorecard::new();
        let text = document.text();

        let has_section = !matched_keywords(document.lowered(), &self.section_phrases).is_empty();
        card.finding(if has_section {
            Finding::hit("Platform mentions prohibited content", SECTION_POINTS)
        } else {
            Finding::miss("No prohibited-content section found", SECTION_POINTS)
        });

        let checks: [(&Regex, f64, &str, &str); 3] = [
            (
                &*DEEPFAKE_PATTERN,
                DEEPFAKE_POINTS,
                "Deepfakes explicitly mentioned as prohibited",
                "Deepfakes are not mentioned",
            ),
            (
                &*MISLEADING_PATTERN,
                MISLEADING_POINTS,
                "Misleading/manipulated AI content mentioned",
                "Misleading or manipulated content is not mentioned",
            ),
            (
                &*SECTION_79_PATTERN,
                SECTION_79_POINTS,
                "Section 79 safe harbour mentioned",
                "Section 79 is not mentioned",
            ),
        ];

        let mut total = if has_section { SECTION_POINTS } else { 0.0 };
        for (pattern, points, met, missing) in checks {
            match pattern.find(text) {
                Some(m) => {
                    card.finding(Finding::hit(met, points));
                    total += points;
                    if let Some(sentence) = sentence_around(text, m.start()) {
                        card.evidence(sentence);
                    }
                }
                None => card.finding(Finding::miss(missing, points)),
            }
        }

        let recommendation = if total >= 70.0 {
            "Prohibited content policy adequately covers harmful AI content.".to_string()
        } else {
            "Explicitly list deepfakes, misleading AI-generated content, and manipulated media as \
             prohibited content. Mention that removal maintains Section 79 safe harbour protection."
                .to_string()
        };

        card.finish(self, 3, recommendation)
    }
}
