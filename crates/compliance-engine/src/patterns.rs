//! Built-in keyword lists and phrase patterns for the synthetic-content rules

use crate::config::PatternRule;

/// Rule 2(1)(wa) wording of "synthetically generated information"
pub const OFFICIAL_DEFINITION: &str = "Information that is artificially or algorithmically \
created, generated, modified or altered using a computer resource, in a manner that appears \
reasonably authentic or true";

/// Keywords a definition of synthetic content is expected to use
pub const DEFINITION_KEYWORDS: &[&str] = &["synthetic", "generated", "artificial", "algorithmic"];

/// Terms that make a sentence definition-like
pub const DEFINITION_TERMS: &[&str] = &["information", "created", "computer", "authentic", "true"];

/// Words ignored when comparing a sentence against the official definition
pub const STOPWORDS: &[&str] = &[
    "a", "an", "the", "or", "and", "of", "in", "on", "is", "are", "be", "been", "as", "that",
    "this", "these", "to", "by", "we", "our", "us", "it", "its", "which", "using", "with", "any",
    "such", "for", "means", "mean", "refers", "refer", "define", "defines", "defined",
    "definition",
];

/// Stem rewrites so paraphrases land on the same token
pub const SYNONYMS: &[(&str, &str)] = &[
    ("synthetic", "artificial"),
    ("content", "information"),
    ("media", "information"),
    ("data", "information"),
    ("produc", "creat"),
    ("made", "creat"),
    ("manipulat", "alter"),
    ("chang", "alter"),
    ("genuin", "authentic"),
    ("real", "authentic"),
    ("seem", "appear"),
];

/// Rule 4(2) keywords
pub const DETECTION_KEYWORDS: &[&str] = &["automated", "tool", "detect", "ai", "synthetic", "harmful"];

/// Rule 4(2) phrase patterns
pub fn detection_patterns() -> Vec<PatternRule> {
    vec![
        PatternRule::new(
            "automated_tool",
            r"\bautomated\s+(?:tools?|systems?|mechanisms?|technolog(?:y|ies))\b",
            &["automated", "tool"],
        ),
        PatternRule::new(
            "detection_tool",
            r"\bdetection\s+(?:tools?|systems?|mechanisms?)\b",
            &["detection", "tool"],
        ),
        PatternRule::new(
            "ai_detection",
            r"\bai\s+(?:content|detection)\b",
            &["ai", "detection"],
        ),
        PatternRule::new(
            "synthetic_detection",
            r"\bsynthetic\s+(?:content|detection)\b",
            &["synthetic", "detection"],
        ),
        PatternRule::new(
            "automated_detect_synthetic",
            r"\bautomated\b[^.!?]{0,80}?\bdetect\w*[^.!?]{0,80}?\bsynthetic",
            &["automated", "detect", "synthetic"],
        ),
    ]
}

/// Rule 4(4) generic complaint mechanism keywords
pub const COMPLAINT_KEYWORDS: &[&str] = &["complaint", "grievance", "report", "appeal"];

/// Keywords that tie a complaint sentence to AI-generated content
pub const AI_CONTENT_KEYWORDS: &[&str] = &["ai", "synthetic", "generated", "deepfake", "artificial"];

/// Rule 3(1)(b) phrases that announce a prohibited-content section
pub const PROHIBITED_PHRASES: &[&str] = &["prohibited", "not permitted", "not allowed"];

/// Rule 3(3) label/metadata keywords
pub const LABEL_KEYWORDS: &[&str] = &["label", "metadata", "identifier", "mark"];

/// Rule 3(3) immediate identification keywords
pub const IMMEDIATE_KEYWORDS: &[&str] = &["immediate", "readily", "easily", "identifiable"];

/// Rule 3(3) label tampering prohibition keywords
pub const PROHIBITION_KEYWORDS: &[&str] =
    &["prohibit", "prevent", "not allow", "removal", "modification"];

/// Rule 4(1A) user declaration keywords
pub const DECLARATION_KEYWORDS: &[&str] =
    &["declaration", "declare", "user", "authentic", "synthetic"];

/// Rule 4(1A) technical verification keywords
pub const VERIFICATION_KEYWORDS: &[&str] = &["verification", "technical", "measure"];

/// Rule 4(1A) labeling keywords
pub const SSMI_LABELING_KEYWORDS: &[&str] = &["label", "ensure", "synthetic"];

/// Phrases by which a platform identifies itself as an SSMI
pub const SSMI_INDICATORS: &[&str] =
    &["50 lakh", "significant social media", "ssmi", "5 million"];

/// Terms that identify an AI-content label inside an image
pub const AI_LABEL_VOCABULARY: &[&str] = &[
    "ai",
    "generated",
    "synthetic",
    "artificial",
    "deepfake",
    "created by ai",
    "ai-generated",
    "made with ai",
    "dall-e",
    "midjourney",
    "stable diffusion",
    "generated image",
];
