use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Strip diacritics via canonical decomposition, so that EXPEDICIÓN matches
/// EXPEDICION. Base characters and casing are preserved.
pub fn strip_diacritics(input: &str) -> String {
    input.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Count how many of the given keywords occur in the text, accent- and
/// case-insensitively. Presence counts once per keyword regardless of how
/// often it repeats; this is a cheap proxy for transcription quality.
pub fn keyword_score(text: &str, keywords: &[&str]) -> usize {
    let haystack = strip_diacritics(text).to_uppercase();
    keywords.iter().filter(|k| haystack.contains(*k)).count()
}
