//! Rule 4(4) - Complaint handling for AI-generated content

use super::{ComplianceRule, RuleError, Scorecard};
use crate::config::ComplaintConfig;
use crate::signals::{extract_evidence, matched_keywords};
use shared_types::{Document, Finding, RuleId, RuleResult};

const MECHANISM_POINTS: f64 = 40.0;
const AI_COMPLAINT_POINTS: f64 = 60.0;

pub struct ComplaintHandlingRule {
    complaint_keywords: Vec<String>,
    ai_keywords: Vec<String>,
}

impl ComplaintHandlingRule {
    pub fn new(config: &ComplaintConfig) -> Self {
        Self {
            complaint_keywords: config.complaint_keywords.clone(),
            ai_keywords: config.ai_keywords.clone(),
        }
    }
}

impl ComplianceRule for ComplaintHandlingRule {
    fn id(&self) -> RuleId {
        RuleId::ComplaintHandling
    }

    fn description(&self) -> &'static str {
        "Complaint Handling for AI-Generated Content"
    }

    fn check(&self, document: &Document) -> Result<RuleResult, RuleError> {
        let mut card = Scorecard::new();

        let mechanisms = matched_keywords(document.lowered(), &self.complaint_keywords);
        let has_mechanism = !mechanisms.is_empty();
        card.finding(if has_mechanism {
            Finding::hit(
                format!("Found complaint/grievance mechanism ({})", mechanisms.join(", ")),
                MECHANISM_POINTS,
            )
        } else {
            Finding::miss("No complaint or grievance mechanism found", MECHANISM_POINTS)
        });

        // Only sentences that are about complaints can tie the mechanism to AI content
        let ai_sentences: Vec<String> =
            extract_evidence(document.text(), &self.complaint_keywords, 0)
                .into_iter()
                .filter(|s| !matched_keywords(s, &self.ai_keywords).is_empty())
                .collect();
        let covers_ai = !ai_sentences.is_empty();
        card.finding(if covers_ai {
            Finding::hit(
                format!(
                    "Found {} mentions of AI/synthetic content in complaint handling",
                    ai_sentences.len()
                ),
                AI_COMPLAINT_POINTS,
            )
        } else {
            Finding::miss(
                "Complaint mechanism does not specifically mention AI-generated content",
                AI_COMPLAINT_POINTS,
            )
        });
        for sentence in ai_sentences {
            card.evidence(sentence);
        }

        let recommendation = if has_mechanism && covers_ai {
            "Complaint mechanism adequately covers AI-generated content.".to_string()
        } else {
            "Ensure the complaint/grievance mechanism explicitly states that complaints about \
             AI-generated or synthetic content are handled with the same priority as other content."
                .to_string()
        };

        card.finish(self, 2, recommendation)
    }
}
