use std::collections::HashMap;
use std::hash::Hash;

/// Keywords kept per document
pub const TOP_KEYWORDS: usize = 10;

/// Tokens must be longer than this many characters
pub const MIN_TOKEN_LEN: usize = 4;

pub const STOP_WORDS: [&str; 11] = [
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for",
];

/// Count occurrences and order by descending count.
///
/// Ties keep first-encountered order, so the result is deterministic for a
/// given input sequence.
pub fn rank_by_frequency<T, I>(items: I) -> Vec<(T, usize)>
where
    T: Eq + Hash + Clone,
    I: IntoIterator<Item = T>,
{
    let mut index: HashMap<T, usize> = HashMap::new();
    let mut counts: Vec<(T, usize)> = Vec::new();

    for item in items {
        if let Some(&slot) = index.get(&item) {
            counts[slot].1 += 1;
        } else {
            index.insert(item.clone(), counts.len());
            counts.push((item, 1));
        }
    }

    // stable sort preserves insertion order among equal counts
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

/// Lower-cased whitespace tokens with non-alphanumerics stripped
fn candidate_tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect::<String>()
        })
        .filter(|token| token.chars().count() > MIN_TOKEN_LEN && !STOP_WORDS.contains(&token.as_str()))
}

/// Top `limit` tokens of `text` by frequency
pub fn top_keywords(text: &str, limit: usize) -> Vec<String> {
    rank_by_frequency(candidate_tokens(text))
        .into_iter()
        .take(limit)
        .map(|(token, _)| token)
        .collect()
}

/// Per-document keyword list
pub fn extract_keywords(text: &str) -> Vec<String> {
    top_keywords(text, TOP_KEYWORDS)
}
