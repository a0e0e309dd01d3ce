//! Rule 4(1A) - Significant social media intermediary obligations

use super::{missing_titles, ComplianceRule, RuleError, Scorecard};
use crate::config::SsmiConfig;
use crate::extractors::sentences::split_sentences;
use crate::signals::{contains_keyword, matched_keywords};
use shared_types::{Document, Finding, RuleId, RuleResult};

/// 33.33 + 33.33 + 33.34, so meeting all three lands on exactly 100
const SUB_CHECK_POINTS: [f64; 3] = [33.33, 33.33, 33.34];

pub struct SsmiRule {
    declaration_keywords: Vec<String>,
    verification_keywords: Vec<String>,
    labeling_keywords: Vec<String>,
    ssmi_indicators: Vec<String>,
}

impl SsmiRule {
    pub fn new(config: &SsmiConfig) -> Self {
        Self {
            declaration_keywords: config.declaration_keywords.clone(),
            verification_keywords: config.verification_keywords.clone(),
            labeling_keywords: config.labeling_keywords.clone(),
            ssmi_indicators: config.ssmi_indicators.clone(),
        }
    }
}

fn is_declaration_sentence(sentence: &str) -> bool {
    contains_keyword(sentence, "declaration") || contains_keyword(sentence, "declare")
}

impl ComplianceRule for SsmiRule {
    fn id(&self) -> RuleId {
        RuleId::Ssmi
    }

    fn description(&self) -> &'static str {
        "SSMI Requirements (50 Lakh+ Users)"
    }

    fn check(&self, document: &Document) -> Result<RuleResult, RuleError> {
        let mut card = Scorecard::new();
        let text = document.text();
        let lowered = document.lowered();

        let declaration_sentence = split_sentences(text)
            .into_iter()
            .find(|s| is_declaration_sentence(s.text));
        let user_declaration = declaration_sentence.is_some()
            && matched_keywords(lowered, &self.declaration_keywords).len() >= 2;
        card.requirement(
            "user_declaration",
            user_declaration,
            SUB_CHECK_POINTS[0],
            "User declaration for authentic vs synthetic content mentioned",
            "No user declaration of whether content is synthetic",
        );
        if let (true, Some(sentence)) = (user_declaration, declaration_sentence) {
            card.evidence(sentence.text);
        }

        card.requirement(
            "technical_verification",
            matched_keywords(lowered, &self.verification_keywords).len() >= 2,
            SUB_CHECK_POINTS[1],
            "Technical verification measures mentioned",
            "No technical measures to verify user declarations",
        );

        card.requirement(
            "synthetic_labeling",
            matched_keywords(lowered, &self.labeling_keywords).len() >= 2
                && contains_keyword(lowered, "synthetic"),
            SUB_CHECK_POINTS[2],
            "Ensures synthetic content labeling",
            "No commitment to label synthetic content",
        );

        if !matched_keywords(lowered, &self.ssmi_indicators).is_empty() {
            card.finding(Finding::note("Platform identifies as SSMI (50 lakh+ users)"));
        }

        let missing = missing_titles(card.sub_requirements());
        let recommendation = if missing.is_empty() {
            "SSMI requirements are adequately addressed.".to_string()
        } else {
            format!(
                "If platform has 50 lakh+ users, add: {}. Obtain user declarations, deploy \
                 technical verification, and ensure synthetic content labeling.",
                missing.join(", ")
            )
        };

        card.finish(self, 2, recommendation)
    }
}
