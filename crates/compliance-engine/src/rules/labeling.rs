//! Rule 3(3) - Due diligence for synthetic content labeling
//!
//! Four independent sub-checks of 25 points each. The rule reads the policy
//! text only; whether the platform's images actually carry labels is the
//! image detector's concern and does not cap this score.

use super::{missing_titles, ComplianceRule, RuleError, Scorecard};
use crate::config::LabelingConfig;
use crate::signals::{contains_keyword, extract_evidence, matched_keywords, sentence_around};
use lazy_static::lazy_static;
use regex::Regex;
use shared_types::{Document, RuleId, RuleResult};

const SUB_CHECK_POINTS: f64 = 25.0;

lazy_static! {
    /// Label size or display-time requirement
    static ref SURFACE_AREA_PATTERN: Regex =
        Regex::new(r"(?i)\b10\s*%|\bten\s+per\s*cent\b|\bsurface\s+area\b|\bduration\b").unwrap();
}

pub struct LabelingRule {
    label_keywords: Vec<String>,
    immediate_keywords: Vec<String>,
    prohibition_keywords: Vec<String>,
}

impl LabelingRule {
    pub fn new(config: &LabelingConfig) -> Self {
        Self {
            label_keywords: config.label_keywords.clone(),
            immediate_keywords: config.immediate_keywords.clone(),
            prohibition_keywords: config.prohibition_keywords.clone(),
        }
    }
}

impl ComplianceRule for LabelingRule {
    fn id(&self) -> RuleId {
        RuleId::Labeling
    }

    fn description(&self) -> &'static str {
        "Due Diligence - Synthetic Content Labeling Requirements"
    }

    fn check(&self, document: &Document) -> Result<RuleResult, RuleError> {
        let mut card = Scorecard::new();
        let text = document.text();
        let lowered = document.lowered();

        let label_required = matched_keywords(lowered, &self.label_keywords).len() >= 2;
        card.requirement(
            "label_required",
            label_required,
            SUB_CHECK_POINTS,
            "Platform requires labeling/metadata for AI content",
            "No labeling or metadata requirement for AI content",
        );
        if label_required {
            if let Some(sentence) = extract_evidence(text, &self.label_keywords, 0)
                .into_iter()
                .next()
            {
                card.evidence(sentence);
            }
        }

        let surface = SURFACE_AREA_PATTERN.find(text);
        card.requirement(
            "surface_area",
            surface.is_some(),
            SUB_CHECK_POINTS,
            "10% surface area/duration requirement mentioned",
            "No 10% surface area or duration requirement",
        );
        if let Some(m) = surface {
            if let Some(sentence) = sentence_around(text, m.start()) {
                card.evidence(sentence);
            }
        }

        card.requirement(
            "immediate_identification",
            !matched_keywords(lowered, &self.immediate_keywords).is_empty(),
            SUB_CHECK_POINTS,
            "Immediate identification requirement mentioned",
            "No requirement that labels be immediately identifiable",
        );

        let prohibition_count = matched_keywords(lowered, &self.prohibition_keywords).len();
        let names_tampering =
            contains_keyword(lowered, "removal") || contains_keyword(lowered, "modification");
        card.requirement(
            "prohibition_modification",
            prohibition_count >= 2 && names_tampering,
            SUB_CHECK_POINTS,
            "Prohibition of label modification/removal mentioned",
            "No prohibition on modifying or removing labels",
        );

        let missing = missing_titles(card.sub_requirements());
        let recommendation = if missing.is_empty() {
            "Labeling requirements are comprehensive.".to_string()
        } else {
            format!(
                "Add requirements for: {}. Ensure labels cover 10% surface area, enable immediate \
                 identification, and prohibit modification/removal.",
                missing.join(", ")
            )
        };

        card.finish(self, 2, recommendation)
    }
}
