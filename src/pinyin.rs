//! Reading backfill for corpus entries that ship without pinyin.
//!
//! Example:
//!   输入: "发展"
//!   输出: "fā zhǎn"
use pinyin::ToPinyin;

/// Tone-marked, space-separated pinyin for every Han character in `hanzi`.
/// Anything without a reading is copied through untouched.
///
/// Per-character only (no word segmentation), so polyphones get their
/// default reading.
pub fn reading_for(hanzi: &str) -> String {
    let mut out = String::with_capacity(hanzi.len() * 2);
    let mut prev_syllable = false;

    for ch in hanzi.chars() {
        match ch.to_pinyin() {
            Some(py) => {
                if prev_syllable {
                    out.push(' ');
                }
                out.push_str(py.with_tone());
                prev_syllable = true;
            }
            None => {
                out.push(ch);
                prev_syllable = false;
            }
        }
    }

    out
}
