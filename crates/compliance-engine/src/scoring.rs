//! Score aggregation across the six rules

use shared_types::{OverallStatus, RuleResults, RuleStatus};

/// Round half away from zero to 2 decimals
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Unweighted mean of the rule scores, rounded to 2 decimals. Zero for an
/// empty slice.
pub fn overall_score(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    round2(scores.iter().sum::<f64>() / scores.len() as f64)
}

/// Aggregate view of one evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreSummary {
    pub overall_score: f64,
    pub overall_status: OverallStatus,
    pub passed: usize,
    pub partial: usize,
    pub failed: usize,
    pub summary: String,
}

pub fn aggregate(results: &RuleResults) -> ScoreSummary {
    let scores = results.scores();
    let overall_score = overall_score(&scores);
    let total = scores.len();
    let passed = results.count(RuleStatus::Pass);
    let partial = results.count(RuleStatus::Partial);
    let failed = results.count(RuleStatus::Fail);

    ScoreSummary {
        overall_score,
        overall_status: OverallStatus::from_score(overall_score),
        passed,
        partial,
        failed,
        summary: format!(
            "Overall Compliance Score: {:.2}% | Passed: {}/{} | Partial: {}/{} | Failed: {}/{}",
            overall_score, passed, total, partial, total, failed, total
        ),
    }
}
