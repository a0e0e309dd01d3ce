pub mod types;

pub use types::{
    ComplianceReport, Document, Finding, ImageAnalysisResult, LabelRegion, MetadataField,
    OverallStatus, Region, RuleId, RuleResult, RuleResults, RuleStatus, SubRequirement,
};

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_document_collapses_whitespace() {
        let doc = Document::new("  We   label\n\tAI content.  ", " https://example.com/privacy ");
        assert_eq!(doc.text(), "We label AI content.");
        assert_eq!(doc.lowered(), "we label ai content.");
        assert_eq!(doc.source_url(), "https://example.com/privacy");
        assert!(!doc.is_empty());
        assert!(Document::new(" \n ", "").is_empty());
    }

    #[test]
    fn test_rule_status_bands_inclusive_lower_bound() {
        assert_eq!(RuleStatus::from_score(100.0), RuleStatus::Pass);
        assert_eq!(RuleStatus::from_score(70.0), RuleStatus::Pass);
        assert_eq!(RuleStatus::from_score(69.99), RuleStatus::Partial);
        assert_eq!(RuleStatus::from_score(40.0), RuleStatus::Partial);
        assert_eq!(RuleStatus::from_score(39.99), RuleStatus::Fail);
        assert_eq!(RuleStatus::from_score(0.0), RuleStatus::Fail);
    }

    #[test]
    fn test_overall_status_bands_and_labels() {
        assert_eq!(OverallStatus::from_score(70.0), OverallStatus::Compliant);
        assert_eq!(OverallStatus::from_score(40.0), OverallStatus::PartiallyCompliant);
        assert_eq!(OverallStatus::from_score(39.99), OverallStatus::NonCompliant);
        assert_eq!(
            serde_json::to_string(&OverallStatus::PartiallyCompliant).unwrap(),
            "\"Partially Compliant\""
        );
        assert_eq!(OverallStatus::NonCompliant.color(), "danger");
    }

    #[test]
    fn test_scored_finding_clamps_points() {
        let finding = Finding::scored("keywords", 20.0, 25.0);
        assert_eq!(finding.points, 20.0);
        assert!(finding.matched);

        let finding = Finding::scored("keywords", 20.0, f64::NAN);
        assert_eq!(finding.points, 0.0);
        assert!(!finding.matched);
    }

    #[test]
    fn test_rule_results_serialize_with_fixed_keys() {
        let results = RuleResults::from_fn(|id| RuleResult::failed(id, "test", "none"));
        let value = serde_json::to_value(&results).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        let mut expected: Vec<&str> = RuleId::ALL.iter().map(|id| id.key()).collect();
        expected.sort();
        let mut keys = keys;
        keys.sort();
        assert_eq!(keys, expected);
        assert_eq!(value["rule_4_1a"]["rule_id"], "rule_4_1a");
    }

    #[test]
    fn test_sub_requirement_title() {
        let req = SubRequirement {
            name: "prohibition_modification".to_string(),
            met: false,
        };
        assert_eq!(req.title(), "Prohibition Modification");
    }

    #[test]
    fn test_region_iou() {
        let a = Region {
            x: 0,
            y: 0,
            width: 10,
            height: 10,
        };
        let b = Region { x: 5, ..a };
        let c = Region {
            x: 50,
            y: 50,
            width: 1,
            height: 1,
        };
        assert!((a.iou(&b) - 50.0 / 150.0).abs() < 1e-9);
        assert_eq!(a.iou(&c), 0.0);
        assert_eq!(a.iou(&a), 1.0);
    }

    #[test]
    fn test_failed_image_text_report() {
        let result = ImageAnalysisResult::failure("Unable to decode image");
        assert_eq!(result.to_text(), "Image analysis failed: Unable to decode image");
        assert!(!result.has_label);
        assert_eq!(result.label_coverage, 0.0);
    }
}
