//! Sentence snippets with highlighted query words.

use crate::morphology::word_spans;
use std::collections::HashSet;
use std::ops::Range;

pub const OPEN: &str = "<b>";
pub const CLOSE: &str = "</b>";
const ELLIPSIS: &str = "...";

#[derive(Debug, Clone, PartialEq)]
pub struct Snippet {
    pub text: String,
    /// Number of highlighted words.
    pub matches: usize,
}

fn is_match(words: &HashSet<String>, token: &str) -> bool {
    words.contains(token) || words.contains(&token.to_lowercase())
}

/// Split on `.`, `!` or `?` followed by whitespace. Returns the sentences
/// and whether any delimiter was seen.
pub fn split_sentences(text: &str) -> (Vec<&str>, bool) {
    let mut sentences = Vec::new();
    let mut found = false;
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((_, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        if let Some(&(next_idx, next)) = chars.peek() {
            if next.is_whitespace() {
                found = true;
                let sentence = text[start..next_idx].trim();
                if !sentence.is_empty() {
                    sentences.push(sentence);
                }
                start = next_idx;
            }
        }
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    (sentences, found)
}

/// Wrap every matching word in emphasis markers.
pub fn highlight(text: &str, words: &HashSet<String>) -> Snippet {
    let mut out = String::with_capacity(text.len() + 16);
    let mut last = 0;
    let mut matches = 0;
    for span in word_spans(text) {
        let token = &text[span.clone()];
        if !is_match(words, token) {
            continue;
        }
        out.push_str(&text[last..span.start]);
        out.push_str(OPEN);
        out.push_str(token);
        out.push_str(CLOSE);
        last = span.end;
        matches += 1;
    }
    out.push_str(&text[last..]);
    Snippet { text: out, matches }
}

fn first_match(text: &str, words: &HashSet<String>) -> Option<Range<usize>> {
    word_spans(text).into_iter().find(|span| is_match(words, &text[span.clone()]))
}

/// Byte range of at most `max_chars` characters around `focus`, widened or
/// narrowed to whitespace so that no word is cut, and always containing `focus`.
fn window(text: &str, focus: Range<usize>, max_chars: usize) -> Range<usize> {
    let offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();
    let total = offsets.len() - 1;
    if total <= max_chars {
        return 0..text.len();
    }
    let chars: Vec<char> = text.chars().collect();
    let char_at = |byte: usize| offsets.partition_point(|&o| o < byte);
    let focus_start = char_at(focus.start);
    let focus_end = char_at(focus.end).max(focus_start);

    let mut start = focus_start.saturating_sub(max_chars / 2);
    let mut end = (start + max_chars).min(total);
    if end - start < max_chars {
        start = end.saturating_sub(max_chars);
    }
    if end < focus_end {
        end = focus_end;
    }

    // move start forward past a partial word
    if start > 0 && !chars[start - 1].is_whitespace() {
        while start < focus_start && !chars[start - 1].is_whitespace() {
            start += 1;
        }
    }
    // move end back before a partial word
    if end < total && !chars[end].is_whitespace() {
        while end > focus_end && !chars[end].is_whitespace() {
            end -= 1;
        }
    }
    offsets[start]..offsets[end]
}

fn trimmed(text: &str, range: Range<usize>, words: &HashSet<String>) -> Snippet {
    let cut_left = range.start > 0;
    let cut_right = range.end < text.len();
    let mut snippet = highlight(text[range].trim(), words);
    if cut_left {
        snippet.text = format!("{ELLIPSIS}{}", snippet.text);
    }
    if cut_right {
        snippet.text.push_str(ELLIPSIS);
    }
    snippet
}

/// Snippets of `text`: one per sentence that contains a highlighted word,
/// each at most `max_chars` characters before markup. Text without any
/// sentence delimiter yields a single window centered on the first match.
pub fn snippets(text: &str, words: &HashSet<String>, max_chars: usize) -> Vec<Snippet> {
    let (sentences, delimited) = split_sentences(text);
    if !delimited {
        let trimmed_text = text.trim();
        return match first_match(trimmed_text, words) {
            Some(focus) => {
                let range = window(trimmed_text, focus, max_chars);
                vec![trimmed(trimmed_text, range, words)]
            }
            None => Vec::new(),
        };
    }
    sentences
        .into_iter()
        .filter_map(|sentence| {
            let focus = first_match(sentence, words)?;
            let range = window(sentence, focus, max_chars);
            Some(trimmed(sentence, range, words))
        })
        .collect()
}
