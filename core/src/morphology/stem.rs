use super::lexicon::{ENGLISH_FUNCTION_WORDS, RUSSIAN_FUNCTION_WORDS};
use super::{Analyzer, Language, WordForm};
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;

/// Snowball-stemmer analyzer with a closed list of function words.
///
/// The lemmas it produces are stems, not dictionary forms: `happy` and
/// `happiness` both become `happi`. Queries go through the same analyzer, so
/// matching is consistent; a dictionary analyzer can be plugged in through
/// [`Analyzer`] where real lemmas are needed.
pub struct StemAnalyzer {
    language: Language,
    stemmer: Stemmer,
    function_words: &'static HashSet<&'static str>,
}

impl StemAnalyzer {
    pub fn russian() -> Self {
        Self {
            language: Language::Russian,
            stemmer: Stemmer::create(Algorithm::Russian),
            function_words: &RUSSIAN_FUNCTION_WORDS,
        }
    }

    pub fn english() -> Self {
        Self {
            language: Language::English,
            stemmer: Stemmer::create(Algorithm::English),
            function_words: &ENGLISH_FUNCTION_WORDS,
        }
    }
}

impl Analyzer for StemAnalyzer {
    fn language(&self) -> Language {
        self.language
    }

    fn classify(&self, word: &str) -> Option<WordForm> {
        if word.is_empty() {
            return None;
        }
        if self.function_words.contains(word) {
            return Some(WordForm { lemma: word.to_string(), function_word: true });
        }
        let stem = self.stemmer.stem(word);
        if stem.is_empty() {
            return None;
        }
        Some(WordForm { lemma: stem.into_owned(), function_word: false })
    }
}
