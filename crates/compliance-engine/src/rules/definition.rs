//! Rule 2(1)(wa) - Definition of synthetically generated information
//!
//! 20 points for the defining keywords, 80 points for how closely the best
//! definition-like sentence tracks the official wording.

use super::{ComplianceRule, RuleError, Scorecard};
use crate::config::{DefinitionConfig, SimilarityBand};
use crate::extractors::sentences::split_sentences;
use crate::extractors::tokens::TokenNormalizer;
use crate::signals::{contains_keyword, fuzzy_similarity, keyword_score, matched_keywords};
use shared_types::{Document, Finding, RuleId, RuleResult};

const KEYWORD_POINTS: f64 = 20.0;
const DEFINITION_POINTS: f64 = 80.0;

pub struct DefinitionRule {
    official_definition: String,
    keywords: Vec<String>,
    definition_terms: Vec<String>,
    normalizer: TokenNormalizer,
    band: SimilarityBand,
}

impl DefinitionRule {
    pub fn new(config: &DefinitionConfig) -> Self {
        Self {
            official_definition: config.official_definition.clone(),
            keywords: config.keywords.clone(),
            definition_terms: config.definition_terms.clone(),
            normalizer: TokenNormalizer::from_config(config),
            band: config.band,
        }
    }

    /// Best (similarity, sentence) among definition-like sentences
    fn best_definition<'a>(&self, document: &'a Document) -> Option<(f64, &'a str)> {
        let mut best: Option<(f64, &str)> = None;
        for sentence in split_sentences(document.text()) {
            let term_count = self
                .definition_terms
                .iter()
                .filter(|t| contains_keyword(sentence.text, t))
                .count();
            let keyword_count = matched_keywords(sentence.text, &self.keywords).len();
            if term_count < 3 && keyword_count < 2 {
                continue;
            }

            let similarity =
                fuzzy_similarity(&self.normalizer, sentence.text, &self.official_definition);
            if best.map_or(true, |(score, _)| similarity > score) {
                best = Some((similarity, sentence.text));
            }
        }
        best
    }
}

impl ComplianceRule for DefinitionRule {
    fn id(&self) -> RuleId {
        RuleId::Definition
    }

    fn description(&self) -> &'static str {
        "Definition of Synthetically Generated Information"
    }

    fn check(&self, document: &Document) -> Result<RuleResult, RuleError> {
        let mut card = Scorecard::new();

        let found = matched_keywords(document.lowered(), &self.keywords);
        let keyword_points = keyword_score(document.lowered(), &self.keywords, KEYWORD_POINTS);
        card.finding(Finding::scored(
            if found.is_empty() {
                "No defining keywords found".to_string()
            } else {
                format!(
                    "Found {}/{} required keywords: {}",
                    found.len(),
                    self.keywords.len(),
                    found.join(", ")
                )
            },
            KEYWORD_POINTS,
            keyword_points,
        ));

        let (similarity, sentence) = self.best_definition(document).unwrap_or((0.0, ""));
        let definition_points = DEFINITION_POINTS * self.band.scale(similarity);
        let message = if definition_points >= DEFINITION_POINTS * 0.75 {
            format!("Found highly similar definition (similarity: {:.2}%)", similarity * 100.0)
        } else if definition_points > 0.0 {
            format!(
                "Found partially matching definition (similarity: {:.2}%)",
                similarity * 100.0
            )
        } else {
            "No clear definition of synthetically generated information found".to_string()
        };
        card.finding(Finding::scored(message, DEFINITION_POINTS, definition_points));
        if definition_points > 0.0 {
            card.evidence(sentence);
        }

        let total = keyword_points + definition_points;
        let recommendation = if total >= 70.0 {
            "Definition is adequate and compliant.".to_string()
        } else {
            format!(
                "Add clear definition: 'Synthetically Generated Information means {}.'",
                lowercase_first(&self.official_definition)
            )
        };

        card.finish(self, 1, recommendation)
    }
}

fn lowercase_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::OFFICIAL_DEFINITION;
    use shared_types::RuleStatus;

    fn check(text: &str) -> RuleResult {
        DefinitionRule::new(&DefinitionConfig::default())
            .check(&Document::new(text, "https://example.com/privacy"))
            .unwrap()
    }

    #[test]
    fn test_official_definition_scores_near_maximum() {
        let result = check(OFFICIAL_DEFINITION);
        assert!(result.score >= 95.0, "score was {}", result.score);
        assert_eq!(result.status, RuleStatus::Pass);
        assert!(result.evidence.iter().any(|e| e.contains(OFFICIAL_DEFINITION)));
    }

    #[test]
    fn test_paraphrased_definition_passes() {
        let result = check(
            "We define synthetically generated information as algorithmically created content that appears authentic.",
        );
        assert!(result.score >= 80.0, "score was {}", result.score);
        assert_eq!(result.status, RuleStatus::Pass);
        assert_eq!(result.evidence.len(), 1);
    }

    #[test]
    fn test_definition_embedded_in_policy() {
        let text = format!(
            "Welcome to our service. We collect cookies. {}. Contact us for details.",
            OFFICIAL_DEFINITION
        );
        let result = check(&text);
        assert!(result.score >= 95.0);
        assert_eq!(result.evidence, vec![format!("{}.", OFFICIAL_DEFINITION)]);
    }

    #[test]
    fn test_keywords_without_definition_score_low() {
        let result = check("Some posts may be synthetic. Others are generated by users.");
        assert!(result.score < 40.0, "score was {}", result.score);
        assert_eq!(result.status, RuleStatus::Fail);
    }

    #[test]
    fn test_closer_wording_scores_higher() {
        let close = check(
            "Synthetic information is artificially created or modified using a computer resource and appears authentic.",
        );
        let loose = check("Synthetic content is generated information.");
        assert!(close.score > loose.score, "{} <= {}", close.score, loose.score);
    }

    #[test]
    fn test_empty_text() {
        let result = check("");
        assert_eq!(result.score, 0.0);
        assert!(result.evidence.is_empty());
        assert!(result.recommendation.contains("Add clear definition"));
    }
}
