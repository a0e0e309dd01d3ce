// Word tokenizing and light stemming for fuzzy comparisons
use crate::config::DefinitionConfig;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Splits text into lower-case alphanumeric words
pub fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
}

/// Strips common English inflections so that "generated", "generates" and
/// "generate" share one stem. Deliberately crude: it only has to agree with
/// itself.
pub fn stem(word: &str) -> String {
    let mut w = word.to_string();

    if w.len() > 8 && w.ends_with("ically") {
        w.truncate(w.len() - 4);
    } else if w.len() > 7 && w.ends_with("ially") {
        w.truncate(w.len() - 2);
    } else if w.len() > 4 && w.ends_with("ly") {
        w.truncate(w.len() - 2);
    }

    if w.len() > 4 && w.ends_with("ed") {
        w.truncate(w.len() - 2);
    } else if w.len() > 5 && w.ends_with("ing") {
        w.truncate(w.len() - 3);
    } else if w.len() > 4 && w.ends_with("es") {
        w.truncate(w.len() - 2);
    } else if w.len() > 3 && w.ends_with('s') && !w.ends_with("ss") {
        w.truncate(w.len() - 1);
    } else if w.len() > 4 && w.ends_with('e') {
        w.truncate(w.len() - 1);
    }

    w
}

/// Turns sentences into comparable sets of stems
#[derive(Debug, Clone, Default)]
pub struct TokenNormalizer {
    stopwords: HashSet<String>,
    synonyms: HashMap<String, String>,
}

impl TokenNormalizer {
    pub fn new(stopwords: &[String], synonyms: &[(String, String)]) -> Self {
        Self {
            stopwords: stopwords.iter().map(|s| s.to_lowercase()).collect(),
            synonyms: synonyms
                .iter()
                .map(|(from, to)| (stem(&from.to_lowercase()), stem(&to.to_lowercase())))
                .collect(),
        }
    }

    pub fn from_config(config: &DefinitionConfig) -> Self {
        Self::new(&config.stopwords, &config.synonyms)
    }

    /// Distinct content stems of `text`, with synonyms folded
    pub fn token_set(&self, text: &str) -> BTreeSet<String> {
        words(text)
            .filter(|w| !self.stopwords.contains(w))
            .map(|w| {
                let stemmed = stem(&w);
                self.synonyms.get(&stemmed).cloned().unwrap_or(stemmed)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stem_folds_inflections() {
        assert_eq!(stem("generated"), "generat");
        assert_eq!(stem("generate"), "generat");
        assert_eq!(stem("generates"), "generat");
        assert_eq!(stem("algorithmically"), "algorithmic");
        assert_eq!(stem("artificially"), "artificial");
        assert_eq!(stem("artificial"), "artificial");
        assert_eq!(stem("synthetically"), "synthetic");
        assert_eq!(stem("appears"), "appear");
        assert_eq!(stem("true"), "true");
        assert_eq!(stem("access"), "access");
    }

    #[test]
    fn test_token_set_drops_stopwords_and_folds_synonyms() {
        let normalizer = TokenNormalizer::from_config(&DefinitionConfig::default());
        let tokens = normalizer.token_set("We label synthetic content that appears real.");
        let expected: BTreeSet<String> = ["label", "artificial", "information", "appear", "authentic"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(tokens, expected);
    }

    #[test]
    fn test_words_splits_on_punctuation() {
        let collected: Vec<String> = words("AI-generated, (synthetic) media!").collect();
        assert_eq!(collected, vec!["ai", "generated", "synthetic", "media"]);
    }
}
