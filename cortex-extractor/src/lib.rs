//! # cortex-extractor
//!
//! Scans free-form text (a conversation turn, a commit message) for
//! sentences worth remembering, classifying each by regex and scoring its
//! importance. Grounded on the reference implementation's
//! `ContextExtractor`, rewritten with the `regex` crate instead of
//! per-call `re.search`.

mod patterns;

use regex::Regex;

use cortex_core::constants::{MAX_IMPORTANCE, MIN_IMPORTANCE};
use cortex_core::memory::MemoryType;

use patterns::{importance_patterns, type_weight, HIGH_INDICATORS};

const MIN_SENTENCE_LEN: usize = 10;
const BASE_IMPORTANCE: i32 = 5;
const HIGH_INDICATOR_BONUS: i32 = 2;

/// A sentence pulled out of a larger text, classified and scored.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedMemory {
    pub memory_type: MemoryType,
    pub content: String,
    pub importance: i32,
    pub project: Option<String>,
}

struct CompiledRule {
    memory_type: MemoryType,
    patterns: Vec<Regex>,
}

/// Compiles the pattern table once and reuses it across calls to
/// [`Extractor::extract`].
pub struct Extractor {
    rules: Vec<CompiledRule>,
}

impl Extractor {
    pub fn new() -> Self {
        let rules = importance_patterns()
            .into_iter()
            .map(|(memory_type, patterns)| CompiledRule {
                memory_type,
                patterns: patterns.iter().map(|p| Regex::new(p).expect("extraction pattern must compile")).collect(),
            })
            .collect();
        Self { rules }
    }

    /// Split `text` into sentences and return one [`ExtractedMemory`] per
    /// sentence that matches a pattern, tagged with the first matching
    /// type in priority order (preference, decision, fact, error_fix,
    /// pattern).
    pub fn extract(&self, text: &str, project: Option<&str>) -> Vec<ExtractedMemory> {
        let mut extracted = Vec::new();

        for raw_sentence in split_sentences(text) {
            let sentence = raw_sentence.trim();
            if sentence.len() < MIN_SENTENCE_LEN {
                continue;
            }

            if let Some(memory_type) = self.classify(sentence) {
                let importance = calculate_importance(sentence, memory_type);
                extracted.push(ExtractedMemory {
                    memory_type,
                    content: sentence.to_string(),
                    importance,
                    project: project.map(str::to_string),
                });
            }
        }

        extracted
    }

    fn classify(&self, sentence: &str) -> Option<MemoryType> {
        for rule in &self.rules {
            if rule.patterns.iter().any(|re| re.is_match(sentence)) {
                return Some(rule.memory_type);
            }
        }
        None
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

fn split_sentences(text: &str) -> Vec<&str> {
    text.split(['.', '!', '?', '\n']).collect()
}

fn calculate_importance(sentence: &str, memory_type: MemoryType) -> i32 {
    let lower = sentence.to_lowercase();
    let mut importance = BASE_IMPORTANCE;
    if HIGH_INDICATORS.iter().any(|indicator| lower.contains(indicator)) {
        importance += HIGH_INDICATOR_BONUS;
    }
    importance = importance.max(type_weight(memory_type));
    importance.clamp(MIN_IMPORTANCE, MAX_IMPORTANCE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_a_preference_sentence() {
        let extractor = Extractor::new();
        let found = extractor.extract("I always prefer snake_case for python files.", None);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].memory_type, MemoryType::Preference);
    }

    #[test]
    fn short_sentences_are_skipped() {
        let extractor = Extractor::new();
        let found = extractor.extract("ok.", None);
        assert!(found.is_empty());
    }

    #[test]
    fn non_matching_text_produces_nothing() {
        let extractor = Extractor::new();
        let found = extractor.extract("The weather today is quite pleasant outside.", None);
        assert!(found.is_empty());
    }

    #[test]
    fn high_indicator_words_boost_importance() {
        let extractor = Extractor::new();
        let plain = extractor.extract("We decided to use postgres for storage.", None);
        let urgent = extractor.extract("We must always use postgres for storage.", None);
        assert!(urgent[0].importance >= plain[0].importance);
    }

    #[test]
    fn importance_never_exceeds_ten() {
        let extractor = Extractor::new();
        let found = extractor.extract("Critical: we must always never use this pattern, it is key.", None);
        assert!(found[0].importance <= 10);
    }

    #[test]
    fn first_matching_type_wins_priority_order() {
        let extractor = Extractor::new();
        // Matches both preference ("i prefer") and fact ("uses") patterns;
        // preference is earlier in the priority order.
        let found = extractor.extract("I prefer the project uses tabs over spaces for indentation.", None);
        assert_eq!(found[0].memory_type, MemoryType::Preference);
    }

    #[test]
    fn project_tag_is_carried_through() {
        let extractor = Extractor::new();
        let found = extractor.extract("We decided to ship on Friday this week.", Some("demo"));
        assert_eq!(found[0].project.as_deref(), Some("demo"));
    }
}
