//! Text-budget helpers: trimming page bodies to fit the context window and
//! simplifying queries for the empty-result fallback.

use crate::config::TextBudgetConfig;

/// Trim `content` to at most `budget.per_content_trim_chars`, never below
/// `budget.min_trim_chunk_chars` unless the content itself is shorter.
pub fn trim_content(content: &str, budget: &TextBudgetConfig) -> String {
    if content.len() <= budget.per_content_trim_chars {
        return content.to_string();
    }
    let cut = budget.per_content_trim_chars.max(budget.min_trim_chunk_chars);
    let mut end = cut.min(content.len());
    while end > 0 && !content.is_char_boundary(end) {
        end -= 1;
    }
    content[..end].to_string()
}

/// Strip `site:`/quote operators and truncate to the first `max_words`
/// words; used for the single fallback retry after an empty search.
pub fn simplify_query(query: &str, max_words: usize) -> String {
    let stripped: String = query
        .split_whitespace()
        .filter(|w| !w.starts_with("site:") && !w.contains('"'))
        .map(|w| w.trim_matches('"'))
        .collect::<Vec<_>>()
        .join(" ");
    stripped
        .split_whitespace()
        .take(max_words)
        .collect::<Vec<_>>()
        .join(" ")
}

/// The "no useful content" short-circuit topic: first 3 words + " basics".
pub fn basics_topic(query: &str) -> String {
    let first_three: String = query.split_whitespace().take(3).collect::<Vec<_>>().join(" ");
    format!("{first_three} basics")
}

/// A sub-query is well-formed: 2-5 whitespace-separated tokens, no quoted
/// strings, no disallowed `site:` operators.
pub fn is_valid_sub_query(query: &str) -> bool {
    if query.contains('"') {
        return false;
    }
    let words: Vec<&str> = query.split_whitespace().collect();
    if !(2..=5).contains(&words.len()) {
        return false;
    }
    for w in &words {
        if w.starts_with("site:") && w != &"site:reddit.com" && w != &"site:quora.com" {
            return false;
        }
    }
    true
}
