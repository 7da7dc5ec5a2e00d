//! Relevance scoring.

use crate::index::{LemmaId, Posting};
use crate::morphology::{normalize_word, word_spans, Morphology};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Consecutive matching words needed for the phrase boost.
pub const PHRASE_RUN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordClass {
    Match,
    Function,
    Other,
}

/// Memoized word classification against a fixed set of query lemmas.
pub struct WordIndex<'a> {
    morphology: &'a Morphology,
    lemmas: &'a HashSet<String>,
    seen: HashMap<String, WordClass>,
}

impl<'a> WordIndex<'a> {
    pub fn new(morphology: &'a Morphology, lemmas: &'a HashSet<String>) -> Self {
        Self { morphology, lemmas, seen: HashMap::new() }
    }

    pub fn class_of(&mut self, token: &str) -> WordClass {
        let word = normalize_word(token);
        if let Some(class) = self.seen.get(&word) {
            return *class;
        }
        let forms = self.morphology.classify(&word);
        let class = if forms.iter().any(|f| !f.function_word && self.lemmas.contains(&f.lemma)) {
            WordClass::Match
        } else if forms.iter().any(|f| f.function_word) {
            WordClass::Function
        } else {
            WordClass::Other
        };
        self.seen.insert(word, class);
        class
    }

    /// Surface words of `text` that map to a query lemma, as found and capitalized.
    pub fn surface_words(&mut self, text: &str, out: &mut HashSet<String>) {
        for span in word_spans(text) {
            let token = &text[span];
            if self.class_of(token) != WordClass::Match {
                continue;
            }
            let lower = normalize_word(token);
            out.insert(capitalize(&lower));
            out.insert(lower);
            out.insert(token.to_string());
        }
    }

    /// True when `text` holds at least [`PHRASE_RUN`] matching words in a row.
    /// Function words and punctuation between them do not break the run.
    pub fn has_phrase(&mut self, text: &str) -> bool {
        let mut run = 0;
        for span in word_spans(text) {
            match self.class_of(&text[span]) {
                WordClass::Match => {
                    run += 1;
                    if run >= PHRASE_RUN {
                        return true;
                    }
                }
                WordClass::Function => {}
                WordClass::Other => run = 0,
            }
        }
        false
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Sum of posting weights for the given lemma rows.
pub fn base_score(postings: &[Posting], lemma_ids: &BTreeSet<LemmaId>) -> f32 {
    postings.iter().filter(|p| lemma_ids.contains(&p.lemma_id)).map(|p| p.weight).sum()
}

/// Lift boosted scores above every unboosted one, then scale into `[0, 1]`.
pub fn normalize(scores: &mut [(f32, bool)]) -> Vec<f32> {
    let base_max = scores.iter().map(|(s, _)| *s).fold(0.0_f32, f32::max);
    for (score, boosted) in scores.iter_mut() {
        if *boosted {
            *score += base_max;
        }
    }
    let max = scores.iter().map(|(s, _)| *s).fold(0.0_f32, f32::max);
    scores
        .iter()
        .map(|(s, _)| if max > 0.0 { *s / max } else { 0.0 })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lemmas(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn detects_runs_across_function_words() {
        let m = Morphology::standard();
        let set = lemmas(&["quick", "brown", "fox"]);
        let mut idx = WordIndex::new(&m, &set);
        assert!(idx.has_phrase("A quick, brown and the fox jumped."));
        assert!(!idx.has_phrase("quick brown dog fox"));
        assert!(!idx.has_phrase("quick brown"));
    }

    #[test]
    fn collects_surface_forms() {
        let m = Morphology::standard();
        let set = lemmas(&["fox"]);
        let mut idx = WordIndex::new(&m, &set);
        let mut out = HashSet::new();
        idx.surface_words("Foxes and a fox.", &mut out);
        assert!(out.contains("foxes"));
        assert!(out.contains("Foxes"));
        assert!(out.contains("fox"));
        assert!(out.contains("Fox"));
        assert!(!out.contains("and"));
    }

    #[test]
    fn boosted_page_ranks_first() {
        let mut scores = vec![(4.0, false), (1.0, true), (2.0, false)];
        let rel = normalize(&mut scores);
        assert_eq!(rel[1], 1.0);
        assert!(rel[0] < rel[1]);
        assert!(rel.iter().all(|r| (0.0..=1.0).contains(r)));
    }

    #[test]
    fn base_score_sums_selected_lemmas() {
        let postings = vec![
            Posting { id: 1, page_id: 1, lemma_id: 1, weight: 2.0 },
            Posting { id: 2, page_id: 1, lemma_id: 2, weight: 3.0 },
            Posting { id: 3, page_id: 1, lemma_id: 3, weight: 5.0 },
        ];
        let ids: BTreeSet<LemmaId> = [1, 3].into_iter().collect();
        assert_eq!(base_score(&postings, &ids), 7.0);
    }
}
