//! Small utility helpers used across modules.

use std::collections::HashSet;

/// Words that carry no category signal when comparing meanings.
const STOP_WORDS: &[&str] = &["a", "an", "the", "of", "to", "be", "or", "and", "sth", "sb"];

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Keyword set of an English meaning string.
///
/// Lowercased, `;`/`,`/parentheses stripped, split on whitespace, stop words dropped.
pub fn meaning_keywords(meaning: &str) -> HashSet<String> {
  meaning
    .to_lowercase()
    .replace([';', ',', '(', ')'], " ")
    .split_whitespace()
    .filter(|w| !STOP_WORDS.contains(w))
    .map(str::to_string)
    .collect()
}

/// Number of keywords two meanings have in common.
pub fn shared_keyword_count(a: &HashSet<String>, b: &HashSet<String>) -> usize {
  a.intersection(b).count()
}

/// Number of distinct characters two surface forms have in common.
pub fn shared_char_count(a: &str, b: &str) -> usize {
  let left: HashSet<char> = a.chars().collect();
  let right: HashSet<char> = b.chars().collect();
  left.intersection(&right).count()
}

/// Log-safe truncation for large strings (char-boundary aware).
pub fn trunc_for_log(s: &str, max_chars: usize) -> String {
  if s.chars().count() <= max_chars {
    s.to_string()
  } else {
    let head: String = s.chars().take(max_chars).collect();
    format!("{}… ({} chars total)", head, s.chars().count())
  }
}
