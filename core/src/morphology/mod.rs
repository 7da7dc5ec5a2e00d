//! Token normalization and lemmatization.
//!
//! Every token is lowercased and reduced to its letters before it reaches an
//! [`Analyzer`]. The analyzer is picked by script: purely Cyrillic tokens go
//! to the Russian analyzer, purely Latin tokens to the English one, and
//! anything else is run through both with the results unioned.

mod lexicon;
mod stem;

pub use stem::StemAnalyzer;

use std::collections::{BTreeSet, HashMap};
use std::ops::Range;
use std::sync::Arc;
use unicode_normalization::UnicodeNormalization;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Russian,
    English,
}

/// Result of classifying one normalized word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordForm {
    pub lemma: String,
    pub function_word: bool,
}

/// A single-language morphological analyzer.
///
/// `classify` receives an already normalized word and returns `None` when no
/// normal form can be derived; such words are dropped from indexing.
pub trait Analyzer: Send + Sync {
    fn language(&self) -> Language;
    fn classify(&self, word: &str) -> Option<WordForm>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Script {
    Cyrillic,
    Latin,
    Mixed,
}

fn is_cyrillic(c: char) -> bool {
    matches!(c, '\u{0400}'..='\u{04FF}' | '\u{0500}'..='\u{052F}')
}

fn is_latin(c: char) -> bool {
    c.is_ascii_alphabetic() || (matches!(c, '\u{00C0}'..='\u{024F}') && c != '\u{00D7}' && c != '\u{00F7}')
}

fn script_of(word: &str) -> Script {
    if word.chars().all(is_cyrillic) {
        Script::Cyrillic
    } else if word.chars().all(is_latin) {
        Script::Latin
    } else {
        Script::Mixed
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphabetic() || matches!(c, '\u{0300}'..='\u{036F}')
}

/// Lowercase a raw token and keep only its letters.
pub fn normalize_word(token: &str) -> String {
    token
        .nfkc()
        .filter(|c| c.is_alphabetic())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Byte ranges of the letter runs in `text`, in order.
pub fn word_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut start: Option<usize> = None;
    for (idx, c) in text.char_indices() {
        match (is_word_char(c), start) {
            (true, None) => start = Some(idx),
            (false, Some(s)) => {
                spans.push(s..idx);
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        spans.push(s..text.len());
    }
    spans
}

/// Script-dispatching front end over one analyzer per language.
#[derive(Clone)]
pub struct Morphology {
    russian: Arc<dyn Analyzer>,
    english: Arc<dyn Analyzer>,
}

impl Morphology {
    pub fn new(russian: Arc<dyn Analyzer>, english: Arc<dyn Analyzer>) -> Self {
        Self { russian, english }
    }

    /// Snowball based analyzers for Russian and English.
    pub fn standard() -> Self {
        Self::new(Arc::new(StemAnalyzer::russian()), Arc::new(StemAnalyzer::english()))
    }

    fn analyzers(&self, word: &str) -> Vec<&dyn Analyzer> {
        match script_of(word) {
            Script::Cyrillic => vec![self.russian.as_ref()],
            Script::Latin => vec![self.english.as_ref()],
            Script::Mixed => vec![self.russian.as_ref(), self.english.as_ref()],
        }
    }

    /// Forms of a normalized word according to every applicable analyzer.
    pub fn classify(&self, word: &str) -> Vec<WordForm> {
        if word.is_empty() {
            return Vec::new();
        }
        self.analyzers(word).into_iter().filter_map(|a| a.classify(word)).collect()
    }

    /// True when any applicable analyzer considers the raw token a function word.
    pub fn is_function_word(&self, token: &str) -> bool {
        let word = normalize_word(token);
        self.classify(&word).iter().any(|f| f.function_word)
    }

    /// Lemmas of a raw token, excluding function-word readings.
    pub fn lemma_set(&self, token: &str) -> BTreeSet<String> {
        let word = normalize_word(token);
        self.classify(&word)
            .into_iter()
            .filter(|f| !f.function_word)
            .map(|f| f.lemma)
            .collect()
    }

    /// Lemma frequencies over every word of `text`.
    pub fn collect_lemmas(&self, text: &str) -> HashMap<String, u32> {
        let mut counts: HashMap<String, u32> = HashMap::new();
        let mut cache: HashMap<&str, BTreeSet<String>> = HashMap::new();
        for span in word_spans(text) {
            let token = &text[span];
            let lemmas = cache.entry(token).or_insert_with(|| self.lemma_set(token));
            for lemma in lemmas.iter() {
                *counts.entry(lemma.clone()).or_insert(0) += 1;
            }
        }
        counts
    }
}

impl Default for Morphology {
    fn default() -> Self {
        Self::standard()
    }
}
