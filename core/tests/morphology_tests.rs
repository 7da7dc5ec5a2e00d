use sitesearch_core::morphology::Morphology;

#[test]
fn it_lemmatizes_both_scripts() {
    let m = Morphology::standard();
    let lemmas = m.collect_lemmas("Лисы бегают. Foxes run.");
    assert!(lemmas.contains_key("fox"));
    assert!(lemmas.contains_key("run"));
    assert_eq!(lemmas.len(), 4);
}

#[test]
fn it_skips_function_words() {
    let m = Morphology::standard();
    let lemmas = m.collect_lemmas("The fox and the dog, и кот в доме");
    assert!(!lemmas.contains_key("the"));
    assert!(!lemmas.contains_key("and"));
    assert!(!lemmas.contains_key("и"));
    assert!(!lemmas.contains_key("в"));
    assert!(m.is_function_word("The"));
    assert!(!m.is_function_word("fox"));
}

#[test]
fn it_unions_mixed_script_tokens() {
    let m = Morphology::standard();
    // Latin "c" followed by Cyrillic letters goes through both analyzers
    let set = m.lemma_set("cтол");
    assert!(!set.is_empty());
}
