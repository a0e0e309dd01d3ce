//! Text signal primitives shared by the rule evaluators
//!
//! Keyword presence, weighted phrase patterns, fuzzy similarity and evidence
//! extraction. Everything here is a pure function of its inputs.

use crate::config::{ConfigError, PatternRule};
use crate::extractors::sentences::{sentence_index_at, split_sentences};
use crate::extractors::tokens::TokenNormalizer;
use regex::{Regex, RegexBuilder};

/// Keywords this short only match as whole words ("ai" must not hit "email")
const WHOLE_WORD_MAX_LEN: usize = 3;

/// Case-insensitive keyword test. Short keywords match whole words only,
/// longer ones match anywhere (so "synthetic" also hits "synthetically").
pub fn contains_keyword(text: &str, keyword: &str) -> bool {
    let text = text.to_lowercase();
    let keyword = keyword.to_lowercase();
    if keyword.is_empty() {
        return false;
    }
    if keyword.chars().count() > WHOLE_WORD_MAX_LEN {
        return text.contains(&keyword);
    }
    text.match_indices(&keyword).any(|(idx, m)| {
        let before = text[..idx].chars().next_back();
        let after = text[idx + m.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

/// Distinct keywords present in `text`, in keyword order
pub fn matched_keywords<'k>(text: &str, keywords: &'k [String]) -> Vec<&'k str> {
    let mut found: Vec<&str> = Vec::new();
    for keyword in keywords {
        if !found.contains(&keyword.as_str()) && contains_keyword(text, keyword) {
            found.push(keyword);
        }
    }
    found
}

/// `max_points * matched / total`, capped at `max_points`
pub fn keyword_score(text: &str, keywords: &[String], max_points: f64) -> f64 {
    let total = {
        let mut distinct: Vec<&str> = keywords.iter().map(String::as_str).collect();
        distinct.sort_unstable();
        distinct.dedup();
        distinct.len()
    };
    if total == 0 {
        return 0.0;
    }
    let matched = matched_keywords(text, keywords).len();
    (max_points * matched as f64 / total as f64).min(max_points)
}

/// A phrase pattern compiled from configuration
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pub name: String,
    pub regex: Regex,
    pub terms: Vec<String>,
}

impl CompiledPattern {
    pub fn compile(rule: &PatternRule) -> Result<Self, ConfigError> {
        let regex = RegexBuilder::new(&rule.regex)
            .case_insensitive(true)
            .build()
            .map_err(|source| ConfigError::InvalidPattern {
                name: rule.name.clone(),
                source,
            })?;
        Ok(Self {
            name: rule.name.clone(),
            regex,
            terms: rule.terms.clone(),
        })
    }

    pub fn compile_all(rules: &[PatternRule]) -> Result<Vec<Self>, ConfigError> {
        rules.iter().map(Self::compile).collect()
    }

    /// Share of this pattern's bare terms present in `text`
    fn term_overlap(&self, text: &str) -> f64 {
        if self.terms.is_empty() {
            return 0.0;
        }
        let present = self
            .terms
            .iter()
            .filter(|t| contains_keyword(text, t))
            .count();
        present as f64 / self.terms.len() as f64
    }
}

/// First match of one pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternHit {
    pub name: String,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatternScore {
    pub points: f64,
    pub hits: Vec<PatternHit>,
    /// Best term overlap among patterns, used only when nothing matched
    pub near_miss: f64,
}

/// Full `max_points` when any pattern matches. Otherwise partial credit for
/// the best near miss: `max_points * near_miss_factor * term_overlap`.
pub fn pattern_score(
    text: &str,
    patterns: &[CompiledPattern],
    max_points: f64,
    near_miss_factor: f64,
) -> PatternScore {
    let hits: Vec<PatternHit> = patterns
        .iter()
        .filter_map(|p| {
            p.regex.find(text).map(|m| PatternHit {
                name: p.name.clone(),
                start: m.start(),
                end: m.end(),
            })
        })
        .collect();

    if !hits.is_empty() {
        return PatternScore {
            points: max_points,
            hits,
            near_miss: 0.0,
        };
    }

    let near_miss = patterns
        .iter()
        .map(|p| p.term_overlap(text))
        .fold(0.0, f64::max);
    PatternScore {
        points: (max_points * near_miss_factor * near_miss).clamp(0.0, max_points),
        hits,
        near_miss,
    }
}

/// Symmetric token-set similarity in [0, 1]: a blend of the overlap
/// coefficient and (double-weighted) Dice coefficient of the two stem sets.
/// Overlap credits a paraphrase that stays inside the reference; Dice
/// penalizes a size mismatch.
pub fn fuzzy_similarity(normalizer: &TokenNormalizer, candidate: &str, reference: &str) -> f64 {
    let a = normalizer.token_set(candidate);
    let b = normalizer.token_set(reference);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let shared = a.intersection(&b).count() as f64;
    let overlap = shared / a.len().min(b.len()) as f64;
    let dice = 2.0 * shared / (a.len() + b.len()) as f64;
    (overlap + 2.0 * dice) / 3.0
}

/// Sentences around each anchor, verbatim. `radius` adds that many
/// neighbouring sentences on each side. Overlapping windows are merged and
/// the result follows document order.
pub fn extract_evidence(text: &str, anchors: &[String], radius: usize) -> Vec<String> {
    let sentences = split_sentences(text);
    let mut windows: Vec<(usize, usize)> = Vec::new();

    for (idx, sentence) in sentences.iter().enumerate() {
        if anchors.iter().any(|a| contains_keyword(sentence.text, a)) {
            windows.push((
                idx.saturating_sub(radius),
                (idx + radius).min(sentences.len() - 1),
            ));
        }
    }

    merge_windows(windows)
        .into_iter()
        .map(|(first, last)| text[sentences[first].start..sentences[last].end].to_string())
        .collect()
}

/// Sentence containing byte `offset` of `text`, verbatim
pub fn sentence_around(text: &str, offset: usize) -> Option<String> {
    let sentences = split_sentences(text);
    sentence_index_at(&sentences, offset).map(|idx| sentences[idx].text.to_string())
}

fn merge_windows(mut windows: Vec<(usize, usize)>) -> Vec<(usize, usize)> {
    windows.sort_unstable();
    let mut merged: Vec<(usize, usize)> = Vec::new();
    for (first, last) in windows {
        match merged.last_mut() {
            Some(prev) if first <= prev.1 => prev.1 = prev.1.max(last),
            _ => merged.push((first, last)),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DefinitionConfig;
    use crate::patterns::{detection_patterns, OFFICIAL_DEFINITION};

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn similarity(candidate: &str, reference: &str) -> f64 {
        let normalizer = TokenNormalizer::from_config(&DefinitionConfig::default());
        fuzzy_similarity(&normalizer, candidate, reference)
    }

    #[test]
    fn test_short_keywords_need_word_boundaries() {
        assert!(contains_keyword("We label AI content", "ai"));
        assert!(contains_keyword("AI-generated media", "ai"));
        assert!(!contains_keyword("Send us an email", "ai"));
        assert!(!contains_keyword("We maintain records", "ai"));
    }

    #[test]
    fn test_long_keywords_match_substrings() {
        assert!(contains_keyword("Synthetically generated", "synthetic"));
        assert!(contains_keyword("DEEPFAKES are banned", "deepfake"));
    }

    #[test]
    fn test_keyword_score_is_proportional() {
        let keywords = strings(&["synthetic", "generated", "artificial", "algorithmic"]);
        assert_eq!(keyword_score("synthetic and generated", &keywords, 20.0), 10.0);
        assert_eq!(keyword_score("nothing relevant", &keywords, 20.0), 0.0);
        assert_eq!(
            keyword_score("synthetic generated artificial algorithmic", &keywords, 20.0),
            20.0
        );
    }

    #[test]
    fn test_keyword_score_counts_duplicates_once() {
        let keywords = strings(&["label", "label", "mark"]);
        assert_eq!(keyword_score("label", &keywords, 10.0), 5.0);
    }

    #[test]
    fn test_keyword_score_handles_empty_list() {
        assert_eq!(keyword_score("anything", &[], 40.0), 0.0);
    }

    #[test]
    fn test_pattern_score_full_match() {
        let patterns = CompiledPattern::compile_all(&detection_patterns()).unwrap();
        let score = pattern_score(
            "We use automated tools to detect harmful synthetic media.",
            &patterns,
            60.0,
            0.5,
        );
        assert_eq!(score.points, 60.0);
        assert!(score.hits.iter().any(|h| h.name == "automated_tool"));
    }

    #[test]
    fn test_pattern_score_near_miss_is_partial() {
        let patterns = CompiledPattern::compile_all(&detection_patterns()).unwrap();
        let score = pattern_score(
            "Our moderators review synthetic posts. Automation helps.",
            &patterns,
            60.0,
            0.5,
        );
        assert!(score.hits.is_empty());
        assert!(score.points > 0.0 && score.points < 60.0);
    }

    #[test]
    fn test_pattern_score_nothing() {
        let patterns = CompiledPattern::compile_all(&detection_patterns()).unwrap();
        let score = pattern_score("We sell shoes.", &patterns, 60.0, 0.5);
        assert_eq!(score.points, 0.0);
    }

    #[test]
    fn test_invalid_pattern_is_reported() {
        let rule = PatternRule::new("broken", r"(unclosed", &[]);
        let err = CompiledPattern::compile(&rule).unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn test_similarity_identity_and_symmetry() {
        assert!((similarity(OFFICIAL_DEFINITION, OFFICIAL_DEFINITION) - 1.0).abs() < 1e-12);
        let a = "AI generated content that appears real";
        let b = "content created by a computer that seems authentic";
        assert_eq!(similarity(a, b), similarity(b, a));
    }

    #[test]
    fn test_similarity_bounds() {
        assert_eq!(similarity("", OFFICIAL_DEFINITION), 0.0);
        let unrelated = similarity("We ship orders within five business days", OFFICIAL_DEFINITION);
        assert!(unrelated < 0.3, "unrelated text scored {}", unrelated);
    }

    #[test]
    fn test_similarity_is_monotonic_in_closeness() {
        let close = similarity(
            "information artificially created or modified using a computer resource that appears authentic",
            OFFICIAL_DEFINITION,
        );
        let looser = similarity(
            "information created using a computer",
            OFFICIAL_DEFINITION,
        );
        let far = similarity("we collect information about your device", OFFICIAL_DEFINITION);
        assert!(close > looser, "{} <= {}", close, looser);
        assert!(looser > far, "{} <= {}", looser, far);
        assert!(close >= 0.8);
    }

    #[test]
    fn test_extract_evidence_is_verbatim_and_merged() {
        let text = "We label AI media. Labels stay visible. We sell shoes. Deepfakes are banned.";
        let evidence = extract_evidence(text, &strings(&["label"]), 0);
        assert_eq!(evidence, vec!["We label AI media.", "Labels stay visible."]);

        let merged = extract_evidence(text, &strings(&["label"]), 1);
        assert_eq!(merged, vec!["We label AI media. Labels stay visible. We sell shoes."]);
    }

    #[test]
    fn test_extract_evidence_without_anchor_hits() {
        assert!(extract_evidence("Nothing here.", &strings(&["deepfake"]), 0).is_empty());
        assert!(extract_evidence("", &strings(&["deepfake"]), 1).is_empty());
    }

    #[test]
    fn test_sentence_around_offset() {
        let text = "First part. Section 79 applies here.";
        let offset = text.find("Section").unwrap();
        assert_eq!(sentence_around(text, offset).as_deref(), Some("Section 79 applies here."));
    }
}
