use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

const WORD_PATTERN: &str = r"\b[a-zA-Z]+\b";

/// `None` only if the pattern fails to compile; that is logged once here.
pub(crate) static WORD: LazyLock<Option<Regex>> = LazyLock::new(|| match Regex::new(WORD_PATTERN) {
    Ok(re) => Some(re),
    Err(e) => {
        tracing::error!("Word pattern {:?} does not compile, indexing disabled: {}", WORD_PATTERN, e);
        None
    }
});

/// Distinct lower-cased alphabetic words longer than two characters.
pub fn tokenize_text(text: &str) -> HashSet<String> {
    let Some(re) = WORD.as_ref() else {
        return HashSet::new();
    };
    re.find_iter(&text.to_lowercase())
        .map(|m| m.as_str().to_string())
        .filter(|word| word.len() > 2)
        .collect()
}

pub fn tokenize_query(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .map(|word| {
            word.trim_matches(|c: char| !c.is_alphanumeric())
                .to_string()
        })
        .filter(|word| word.len() > 2)
        .collect()
}
