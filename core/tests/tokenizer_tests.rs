use searchindex::tokenizer::tokenize_query;

#[test]
fn it_normalizes_and_stems() {
    let q = tokenize_query("Running Runners RUN! The café's menu.");
    let stems: Vec<String> = q.terms.into_iter().map(|t| t.stem).collect();
    // Repeated stems collapse to a single "run"
    assert_eq!(stems.iter().filter(|s| *s == "run").count(), 1);
    // The apostrophe splits the word
    assert!(stems.iter().any(|s| s.starts_with("caf")));
}

#[test]
fn it_filters_stopwords_and_numbers() {
    let q = tokenize_query("The quick brown fox and the lazy dog 2024");
    let words: Vec<String> = q.terms.into_iter().map(|t| t.word).collect();
    assert!(!words.contains(&"the".to_string()));
    assert!(!words.contains(&"and".to_string()));
    assert!(!words.contains(&"2024".to_string()));
    assert!(words.contains(&"fox".to_string()));
}

#[test]
fn it_separates_exclusions() {
    let q = tokenize_query("grpc -openmdao server");
    let words: Vec<&str> = q.terms.iter().map(|t| t.word.as_str()).collect();
    assert_eq!(words, vec!["grpc", "server"]);
    assert_eq!(q.excluded.len(), 1);
    assert_eq!(q.excluded[0].word, "openmdao");
}

#[test]
fn it_splits_on_punctuation() {
    let q = tokenize_query("philote-python");
    let words: Vec<&str> = q.terms.iter().map(|t| t.word.as_str()).collect();
    assert_eq!(words, vec!["philote", "python"]);
}
