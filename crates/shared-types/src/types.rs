use serde::{Deserialize, Serialize};
use std::fmt;

/// Policy text handed to the rule evaluators.
///
/// Whitespace is collapsed once at construction. `text` keeps the original
/// casing so evidence can be quoted verbatim; `lowered` is the matching copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    text: String,
    #[serde(skip)]
    lowered: String,
    source_url: String,
}

impl Document {
    pub fn new(text: &str, source_url: &str) -> Self {
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let lowered = text.to_lowercase();
        Self {
            text,
            lowered,
            source_url: source_url.trim().to_string(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn lowered(&self) -> &str {
        &self.lowered
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// One scored observation within a rule or an image stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub message: String,
    pub matched: bool,
    /// Maximum points this observation can contribute
    pub weight: f64,
    /// Points actually awarded (0..=weight)
    pub points: f64,
}

impl Finding {
    /// Observation that earned its full weight
    pub fn hit(message: impl Into<String>, weight: f64) -> Self {
        Self {
            message: message.into(),
            matched: true,
            weight,
            points: weight,
        }
    }

    /// Observation that earned nothing
    pub fn miss(message: impl Into<String>, weight: f64) -> Self {
        Self {
            message: message.into(),
            matched: false,
            weight,
            points: 0.0,
        }
    }

    /// Observation that earned part of its weight
    pub fn scored(message: impl Into<String>, weight: f64, points: f64) -> Self {
        let points = if points.is_finite() {
            points.clamp(0.0, weight)
        } else {
            0.0
        };
        Self {
            message: message.into(),
            matched: points > 0.0,
            weight,
            points,
        }
    }

    /// Informational observation that never affects a score
    pub fn note(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            matched: true,
            weight: 0.0,
            points: 0.0,
        }
    }
}

/// The six regulatory rules, in report order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RuleId {
    #[serde(rename = "rule_2_1_wa")]
    Definition,
    #[serde(rename = "rule_4_2")]
    AutomatedTools,
    #[serde(rename = "rule_4_4")]
    ComplaintHandling,
    #[serde(rename = "rule_3_1_b")]
    ProhibitedContent,
    #[serde(rename = "rule_3_3")]
    Labeling,
    #[serde(rename = "rule_4_1a")]
    Ssmi,
}

impl RuleId {
    pub const ALL: [RuleId; 6] = [
        RuleId::Definition,
        RuleId::AutomatedTools,
        RuleId::ComplaintHandling,
        RuleId::ProhibitedContent,
        RuleId::Labeling,
        RuleId::Ssmi,
    ];

    /// Report key, e.g. `rule_2_1_wa`
    pub fn key(&self) -> &'static str {
        match self {
            RuleId::Definition => "rule_2_1_wa",
            RuleId::AutomatedTools => "rule_4_2",
            RuleId::ComplaintHandling => "rule_4_4",
            RuleId::ProhibitedContent => "rule_3_1_b",
            RuleId::Labeling => "rule_3_3",
            RuleId::Ssmi => "rule_4_1a",
        }
    }

    /// Human citation, e.g. `Rule 2(1)(wa)`
    pub fn citation(&self) -> &'static str {
        match self {
            RuleId::Definition => "Rule 2(1)(wa)",
            RuleId::AutomatedTools => "Rule 4(2)",
            RuleId::ComplaintHandling => "Rule 4(4)",
            RuleId::ProhibitedContent => "Rule 3(1)(b) Proviso",
            RuleId::Labeling => "Rule 3(3)",
            RuleId::Ssmi => "Rule 4(1A)",
        }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.citation())
    }
}

/// Per-rule verdict band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleStatus {
    Pass,
    Partial,
    Fail,
}

impl RuleStatus {
    /// >= 70 Pass, >= 40 Partial, otherwise Fail
    pub fn from_score(score: f64) -> Self {
        if score >= 70.0 {
            RuleStatus::Pass
        } else if score >= 40.0 {
            RuleStatus::Partial
        } else {
            RuleStatus::Fail
        }
    }
}

/// A named sub-check of a rule made of independent requirements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubRequirement {
    pub name: String,
    pub met: bool,
}

impl SubRequirement {
    /// `surface_area` -> `Surface Area`
    pub fn title(&self) -> String {
        self.name
            .split('_')
            .filter(|part| !part.is_empty())
            .map(|part| {
                let mut chars = part.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleResult {
    pub rule_id: RuleId,
    pub rule: String,
    pub description: String,
    pub score: f64,
    pub status: RuleStatus,
    pub findings: Vec<Finding>,
    pub evidence: Vec<String>,
    pub recommendation: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_requirements: Vec<SubRequirement>,
}

impl RuleResult {
    /// Zero-score result used when an evaluator could not produce one
    pub fn failed(rule_id: RuleId, description: &str, reason: &str) -> Self {
        Self {
            rule_id,
            rule: rule_id.citation().to_string(),
            description: description.to_string(),
            score: 0.0,
            status: RuleStatus::Fail,
            findings: vec![Finding::miss(
                format!("Evaluation failed: {}", reason),
                100.0,
            )],
            evidence: Vec::new(),
            recommendation: format!(
                "{} could not be evaluated; review the policy manually.",
                rule_id.citation()
            ),
            sub_requirements: Vec::new(),
        }
    }
}

/// Results for all six rules. The fields are the report keys, so every key
/// is always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleResults {
    pub rule_2_1_wa: RuleResult,
    pub rule_4_2: RuleResult,
    pub rule_4_4: RuleResult,
    pub rule_3_1_b: RuleResult,
    pub rule_3_3: RuleResult,
    pub rule_4_1a: RuleResult,
}

impl RuleResults {
    pub fn from_fn(mut f: impl FnMut(RuleId) -> RuleResult) -> Self {
        Self {
            rule_2_1_wa: f(RuleId::Definition),
            rule_4_2: f(RuleId::AutomatedTools),
            rule_4_4: f(RuleId::ComplaintHandling),
            rule_3_1_b: f(RuleId::ProhibitedContent),
            rule_3_3: f(RuleId::Labeling),
            rule_4_1a: f(RuleId::Ssmi),
        }
    }

    pub fn get(&self, id: RuleId) -> &RuleResult {
        match id {
            RuleId::Definition => &self.rule_2_1_wa,
            RuleId::AutomatedTools => &self.rule_4_2,
            RuleId::ComplaintHandling => &self.rule_4_4,
            RuleId::ProhibitedContent => &self.rule_3_1_b,
            RuleId::Labeling => &self.rule_3_3,
            RuleId::Ssmi => &self.rule_4_1a,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &RuleResult> + '_ {
        RuleId::ALL.into_iter().map(move |id| self.get(id))
    }

    pub fn scores(&self) -> [f64; 6] {
        RuleId::ALL.map(|id| self.get(id).score)
    }

    pub fn count(&self, status: RuleStatus) -> usize {
        self.iter().filter(|r| r.status == status).count()
    }
}

/// Pixel rectangle inside an analyzed image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn intersection(&self, other: &Region) -> Option<Region> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        (right > x && bottom > y).then(|| Region {
            x,
            y,
            width: right - x,
            height: bottom - y,
        })
    }

    /// Intersection over union, 0.0 when disjoint
    pub fn iou(&self, other: &Region) -> f64 {
        let shared = self.intersection(other).map_or(0, |r| r.area());
        let union = self.area() + other.area() - shared;
        if union == 0 {
            0.0
        } else {
            shared as f64 / union as f64
        }
    }
}

/// A candidate label region found by one of the image stages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelRegion {
    /// Stage that produced the region (`corner`, `overlay`, `edges`, `ocr`)
    pub source: String,
    #[serde(flatten)]
    pub region: Region,
    pub coverage_percent: f64,
}

/// Embedded metadata field that mentions AI generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataField {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAnalysisResult {
    pub success: bool,
    pub has_label: bool,
    /// Percent of the image area covered by the largest label candidate
    pub label_coverage: f64,
    pub complies_with_10_percent: bool,
    pub signals: Vec<Finding>,
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<(u32, u32)>,
    #[serde(default)]
    pub metadata_fields: Vec<MetadataField>,
    #[serde(default)]
    pub ocr_lines: Vec<String>,
    #[serde(default)]
    pub regions: Vec<LabelRegion>,
}

impl ImageAnalysisResult {
    /// Result for input that could not be analyzed at all
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            has_label: false,
            label_coverage: 0.0,
            complies_with_10_percent: false,
            signals: Vec::new(),
            error: Some(error.into()),
            source_url: None,
            dimensions: None,
            metadata_fields: Vec::new(),
            ocr_lines: Vec::new(),
            regions: Vec::new(),
        }
    }

    /// Human-readable detection report
    pub fn to_text(&self) -> String {
        if !self.success {
            return format!(
                "Image analysis failed: {}",
                self.error.as_deref().unwrap_or("Unknown error")
            );
        }

        let mut output = String::new();
        output.push_str("=== AI Label Detection Report ===\n\n");

        if self.has_label {
            output.push_str("✓ AI label detected\n");
        } else {
            output.push_str("✗ No AI label detected\n");
        }
        output.push_str(&format!("Label coverage: {:.2}%\n", self.label_coverage));
        if self.complies_with_10_percent {
            output.push_str("✓ Meets 10% coverage requirement\n");
        } else {
            output.push_str("✗ Does not meet 10% coverage requirement\n");
        }

        if !self.metadata_fields.is_empty() {
            output.push_str("\nMetadata Analysis:\n");
            for field in &self.metadata_fields {
                output.push_str(&format!("  - {}: {}\n", field.field, field.value));
            }
        }

        if !self.ocr_lines.is_empty() {
            output.push_str("\nText Detection (OCR):\n");
            output.push_str("  AI-related text found in image:\n");
            for line in self.ocr_lines.iter().take(5) {
                output.push_str(&format!("    '{}'\n", line));
            }
        }

        if !self.regions.is_empty() {
            output.push_str("\nVisual Analysis:\n");
            output.push_str(&format!(
                "  {} potential watermark region(s) detected\n",
                self.regions.len()
            ));
        }

        output
    }
}

/// Aggregate verdict band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverallStatus {
    Compliant,
    #[serde(rename = "Partially Compliant")]
    PartiallyCompliant,
    #[serde(rename = "Non-Compliant")]
    NonCompliant,
}

impl OverallStatus {
    pub fn from_score(score: f64) -> Self {
        if score >= 70.0 {
            OverallStatus::Compliant
        } else if score >= 40.0 {
            OverallStatus::PartiallyCompliant
        } else {
            OverallStatus::NonCompliant
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OverallStatus::Compliant => "Compliant",
            OverallStatus::PartiallyCompliant => "Partially Compliant",
            OverallStatus::NonCompliant => "Non-Compliant",
        }
    }

    /// Display colour for hosts rendering the report
    pub fn color(&self) -> &'static str {
        match self {
            OverallStatus::Compliant => "success",
            OverallStatus::PartiallyCompliant => "warning",
            OverallStatus::NonCompliant => "danger",
        }
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub success: bool,
    pub platform_name: String,
    pub timestamp: String,
    pub overall_score: f64,
    pub overall_status: OverallStatus,
    pub summary: String,
    pub rules: RuleResults,
    pub image_analysis: ImageAnalysisResult,
    pub privacy_policy_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage_url: Option<String>,
    pub images_analyzed: usize,
}

impl ComplianceReport {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Generate a text report
    pub fn to_text(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("Compliance Report: {}\n", self.platform_name));
        output.push_str(&"=".repeat(60));
        output.push('\n');
        output.push_str(&format!("Checked: {}\n", self.timestamp));
        output.push_str(&format!(
            "Status: {} ({:.2}%)\n",
            self.overall_status, self.overall_score
        ));
        output.push_str(&self.summary);
        output.push_str("\n\n");

        for result in self.rules.iter() {
            output.push_str(&format!(
                "[{:?}] {} - {} ({:.2})\n",
                result.status, result.rule, result.description, result.score
            ));
            if result.status != RuleStatus::Pass {
                output.push_str(&format!("    -> {}\n", result.recommendation));
            }
        }

        output.push('\n');
        output.push_str(&self.image_analysis.to_text());
        output
    }
}
