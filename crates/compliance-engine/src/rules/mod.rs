//! Rule evaluators for the synthetic-content obligations
//!
//! Each rule is an independent `ComplianceRule` built from its own section of
//! `ComplianceConfig`. Rules never see each other's output; the engine runs
//! them through `evaluate_isolated` so that a failing rule yields a zero
//! result for itself only.

pub mod automated_tools;
pub mod complaints;
pub mod definition;
pub mod labeling;
pub mod prohibited;
pub mod ssmi;

use crate::config::{ComplianceConfig, ConfigError};
use crate::scoring::round2;
use shared_types::{Document, Finding, RuleId, RuleResult, RuleStatus, SubRequirement};
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;

pub use automated_tools::AutomatedToolsRule;
pub use complaints::ComplaintHandlingRule;
pub use definition::DefinitionRule;
pub use labeling::LabelingRule;
pub use prohibited::ProhibitedContentRule;
pub use ssmi::SsmiRule;

/// Trait for compliance rules
pub trait ComplianceRule: Send + Sync {
    fn id(&self) -> RuleId;

    fn description(&self) -> &'static str;

    /// Score the document against this rule
    fn check(&self, document: &Document) -> Result<RuleResult, RuleError>;
}

/// Internal failure of a single evaluator
#[derive(Error, Debug)]
pub enum RuleError {
    #[error("{rule} produced a non-finite score")]
    NonFiniteScore { rule: RuleId },

    #[error("{rule} evaluator panicked: {message}")]
    Panicked { rule: RuleId, message: String },

    #[error("no evaluator registered for {0}")]
    Missing(RuleId),
}

/// Build the six evaluators, in report order
pub fn build_rules(config: &ComplianceConfig) -> Result<Vec<Box<dyn ComplianceRule>>, ConfigError> {
    Ok(vec![
        Box::new(DefinitionRule::new(&config.definition)),
        Box::new(AutomatedToolsRule::new(&config.detection)?),
        Box::new(ComplaintHandlingRule::new(&config.complaints)),
        Box::new(ProhibitedContentRule::new(&config.prohibited)),
        Box::new(LabelingRule::new(&config.labeling)),
        Box::new(SsmiRule::new(&config.ssmi)),
    ])
}

/// Run one rule, turning an error or a panic into a zero-score result
pub fn evaluate_isolated(rule: &dyn ComplianceRule, document: &Document) -> RuleResult {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| rule.check(document)))
        .unwrap_or_else(|payload| {
            Err(RuleError::Panicked {
                rule: rule.id(),
                message: panic_message(payload.as_ref()),
            })
        });

    match outcome {
        Ok(result) => {
            tracing::debug!(
                rule = rule.id().key(),
                score = result.score,
                status = ?result.status,
                "rule evaluated"
            );
            result
        }
        Err(err) => {
            tracing::warn!(rule = rule.id().key(), error = %err, "rule evaluation failed");
            RuleResult::failed(rule.id(), rule.description(), &err.to_string())
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Accumulates findings and evidence for one rule, then settles the score
#[derive(Debug, Default)]
pub(crate) struct Scorecard {
    findings: Vec<Finding>,
    evidence: Vec<String>,
    sub_requirements: Vec<SubRequirement>,
}

impl Scorecard {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn finding(&mut self, finding: Finding) {
        self.findings.push(finding);
    }

    pub(crate) fn evidence(&mut self, quote: impl Into<String>) {
        let quote = quote.into();
        if !quote.is_empty() && !self.evidence.contains(&quote) {
            self.evidence.push(quote);
        }
    }

    /// Record an all-or-nothing sub-check
    pub(crate) fn requirement(
        &mut self,
        name: &str,
        met: bool,
        weight: f64,
        met_message: &str,
        missing_message: &str,
    ) {
        self.sub_requirements.push(SubRequirement {
            name: name.to_string(),
            met,
        });
        self.findings.push(if met {
            Finding::hit(met_message, weight)
        } else {
            Finding::miss(missing_message, weight)
        });
    }

    pub(crate) fn sub_requirements(&self) -> &[SubRequirement] {
        &self.sub_requirements
    }

    /// Sum awarded points into a score in [0, 100] and build the result
    pub(crate) fn finish(
        self,
        rule: &dyn ComplianceRule,
        evidence_limit: usize,
        recommendation: String,
    ) -> Result<RuleResult, RuleError> {
        let raw: f64 = self.findings.iter().map(|f| f.points).sum();
        if !raw.is_finite() {
            return Err(RuleError::NonFiniteScore { rule: rule.id() });
        }
        let score = round2(raw.clamp(0.0, 100.0));
        let mut evidence = self.evidence;
        evidence.truncate(evidence_limit);

        Ok(RuleResult {
            rule_id: rule.id(),
            rule: rule.id().citation().to_string(),
            description: rule.description().to_string(),
            score,
            status: RuleStatus::from_score(score),
            findings: self.findings,
            evidence,
            recommendation,
            sub_requirements: self.sub_requirements,
        })
    }
}

/// `Surface Area, Immediate Identification` for the unmet sub-checks
pub(crate) fn missing_titles(requirements: &[SubRequirement]) -> Vec<String> {
    requirements
        .iter()
        .filter(|r| !r.met)
        .map(SubRequirement::title)
        .collect()
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: every rule stays within [0, 100] and its status matches its band
        #[test]
        fn rule_scores_stay_in_range(text in "\\PC{0,400}") {
            let doc = Document::new(&text, "");
            for rule in build_rules(&ComplianceConfig::default()).unwrap() {
                let result = evaluate_isolated(rule.as_ref(), &doc);
                prop_assert!((0.0..=100.0).contains(&result.score));
                prop_assert_eq!(result.status, RuleStatus::from_score(result.score));
            }
        }

        /// Property: policy-like word soup never breaks an evaluator
        #[test]
        fn rule_scores_on_policy_vocabulary(
            words in prop::collection::vec(
                prop::sample::select(vec![
                    "synthetic", "generated", "AI", "label", "deepfake", "complaint",
                    "automated", "tool", "detect", "10%", "removal", "declaration",
                    "technical", "verification", "prohibited", "Section 79", ".", "users",
                ]),
                0..60,
            )
        ) {
            let doc = Document::new(&words.join(" "), "");
            for rule in build_rules(&ComplianceConfig::default()).unwrap() {
                let result = rule.check(&doc).unwrap();
                prop_assert!((0.0..=100.0).contains(&result.score));
            }
        }
    }
}
