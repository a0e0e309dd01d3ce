//! Assembly of the final compliance report
//!
//! Pure: the timestamp is supplied by the caller, so the same inputs always
//! serialize to the same bytes.

use crate::scoring::aggregate;
use chrono::{DateTime, SecondsFormat, Utc};
use shared_types::{ComplianceReport, Document, ImageAnalysisResult, RuleResults};

const UNKNOWN_PLATFORM: &str = "Unknown Platform";

pub struct ReportBuilder {
    platform_name: String,
    timestamp: DateTime<Utc>,
    homepage_url: Option<String>,
    images_analyzed: usize,
}

impl ReportBuilder {
    pub fn new(platform_name: &str, timestamp: DateTime<Utc>) -> Self {
        let platform_name = match platform_name.trim() {
            "" => UNKNOWN_PLATFORM.to_string(),
            name => name.to_string(),
        };
        Self {
            platform_name,
            timestamp,
            homepage_url: None,
            images_analyzed: 0,
        }
    }

    pub fn homepage_url(mut self, url: Option<&str>) -> Self {
        self.homepage_url = url.filter(|u| !u.is_empty()).map(str::to_string);
        self
    }

    pub fn images_analyzed(mut self, count: usize) -> Self {
        self.images_analyzed = count;
        self
    }

    pub fn build(
        self,
        document: &Document,
        rules: RuleResults,
        image_analysis: ImageAnalysisResult,
    ) -> ComplianceReport {
        let summary = aggregate(&rules);
        let success = !document.is_empty() || image_analysis.success;

        tracing::info!(
            platform = %self.platform_name,
            overall_score = summary.overall_score,
            overall_status = %summary.overall_status,
            "compliance report built"
        );

        ComplianceReport {
            success,
            platform_name: self.platform_name,
            timestamp: self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            overall_score: summary.overall_score,
            overall_status: summary.overall_status,
            summary: summary.summary,
            rules,
            image_analysis,
            privacy_policy_url: document.source_url().to_string(),
            homepage_url: self.homepage_url,
            images_analyzed: self.images_analyzed,
        }
    }
}
