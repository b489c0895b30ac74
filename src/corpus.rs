//! Corpus provider: per-level vocabulary and grammar, plus the radical map.
//!
//! Files live in the configured data directory:
//!   - `level_{n}.json`  `{ "vocabulary": [...], "grammar": [...] }`
//!   - `radicals.json`   flat `{ "爱": "爫", ... }`
//!
//! A provider is owned by exactly one session. Reloading a level replaces the
//! in-memory content for that level, so providers are never shared.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::domain::{is_valid_level, GrammarRule, Tier, VocabEntry};
use crate::error::ExamError;
use crate::pinyin::reading_for;

/// Levels merged into one distractor pool for the advanced tier.
pub const ADVANCED_BAND: std::ops::RangeInclusive<u8> = 7..=9;

#[derive(Deserialize)]
struct RawLevelFile {
  #[serde(default)] vocabulary: Vec<RawVocab>,
  #[serde(default)] grammar: Vec<RawGrammar>,
}

#[derive(Deserialize)]
struct RawVocab {
  hanzi: Option<String>,
  pinyin: Option<String>,
  meaning: Option<String>,
  #[serde(default)] pos: Vec<String>,
  #[serde(default)] radicals: Vec<String>,
  #[serde(default)] sentences: Vec<String>,
  #[serde(default)] frequency: Option<u32>,
}

#[derive(Deserialize)]
struct RawGrammar {
  name: Option<String>,
  description: Option<String>,
  structure: Option<String>,
  example: Option<String>,
}

fn required(value: Option<String>, level: u8, field: &str) -> Result<String, ExamError> {
  value.ok_or_else(|| ExamError::SchemaError { level, field: field.to_string() })
}

impl RawVocab {
  fn into_entry(self, level: u8) -> Result<VocabEntry, ExamError> {
    let hanzi = required(self.hanzi, level, "hanzi")?;
    if hanzi.trim().is_empty() {
      return Err(ExamError::SchemaError { level, field: "hanzi".into() });
    }
    let meaning = required(self.meaning, level, "meaning")?;
    let pinyin = match self.pinyin {
      Some(p) if !p.trim().is_empty() => p,
      _ => reading_for(&hanzi),
    };
    Ok(VocabEntry {
      hanzi,
      pinyin,
      meaning,
      level,
      radicals: self.radicals,
      sentences: self.sentences,
      pos: self.pos,
      frequency: self.frequency.unwrap_or(0),
    })
  }
}

impl RawGrammar {
  fn into_rule(self, level: u8) -> Result<GrammarRule, ExamError> {
    Ok(GrammarRule {
      name: required(self.name, level, "name")?,
      description: required(self.description, level, "description")?,
      structure: required(self.structure, level, "structure")?,
      example: required(self.example, level, "example")?,
      level,
    })
  }
}

#[derive(Debug, Default)]
pub struct CorpusProvider {
  data_dir: PathBuf,
  words: HashMap<u8, Vec<VocabEntry>>,
  grammar: HashMap<u8, Vec<GrammarRule>>,
  radicals: HashMap<String, String>,
}

impl CorpusProvider {
  pub fn new(data_dir: impl Into<PathBuf>) -> Self {
    Self { data_dir: data_dir.into(), ..Self::default() }
  }

  fn level_path(&self, level: u8) -> PathBuf {
    self.data_dir.join(format!("level_{}.json", level))
  }

  /// Load (or reload) one level file. Duplicate hanzi: first occurrence wins.
  #[instrument(level = "info", skip(self), fields(data_dir = %self.data_dir.display()))]
  pub fn load_level(&mut self, level: u8) -> Result<(), ExamError> {
    if !is_valid_level(level) {
      return Err(ExamError::InvalidLevel(level));
    }
    let path = self.level_path(level);
    if !path.exists() {
      return Err(ExamError::DataNotFound { level, path });
    }
    let text = std::fs::read_to_string(&path).map_err(|source| ExamError::Io { path: path.clone(), source })?;
    let raw: RawLevelFile = serde_json::from_str(&text)
      .map_err(|e| ExamError::MalformedData { level, message: e.to_string() })?;

    let mut seen = HashSet::new();
    let mut words = Vec::with_capacity(raw.vocabulary.len());
    let mut duplicates = 0usize;
    for rv in raw.vocabulary {
      let entry = rv.into_entry(level)?;
      if seen.insert(entry.hanzi.clone()) {
        words.push(entry);
      } else {
        duplicates += 1;
      }
    }
    let rules = raw
      .grammar
      .into_iter()
      .map(|g| g.into_rule(level))
      .collect::<Result<Vec<_>, _>>()?;

    info!(target: "corpus", level, words = words.len(), grammar = rules.len(), duplicates, "Level loaded");
    self.words.insert(level, words);
    self.grammar.insert(level, rules);
    Ok(())
  }

  /// Load everything a session at `level` needs. Advanced levels also pull in
  /// the other 7-9 bands; a missing sibling band only narrows the pool.
  #[instrument(level = "info", skip(self))]
  pub fn load_for_session(&mut self, level: u8) -> Result<(), ExamError> {
    self.load_level(level)?;
    if Tier::from_level(level) == Tier::Advanced {
      for sibling in ADVANCED_BAND.filter(|l| *l != level) {
        match self.load_level(sibling) {
          Ok(()) => {}
          Err(e) if e.is_not_found() => {
            warn!(target: "corpus", level, sibling, "Advanced band file missing; pool will be narrower");
          }
          Err(e) => return Err(e),
        }
      }
    }
    Ok(())
  }

  /// Best-effort: a missing or malformed radical map leaves the map empty.
  #[instrument(level = "info", skip(self))]
  pub fn load_radicals(&mut self) {
    let path = self.data_dir.join("radicals.json");
    let text = match std::fs::read_to_string(&path) {
      Ok(t) => t,
      Err(e) => {
        warn!(target: "corpus", path = %path.display(), error = %e, "Radical map not available; hints disabled");
        self.radicals.clear();
        return;
      }
    };
    match serde_json::from_str::<HashMap<String, String>>(&text) {
      Ok(map) => {
        debug!(target: "corpus", entries = map.len(), "Radical map loaded");
        self.radicals = map;
      }
      Err(e) => {
        warn!(target: "corpus", path = %path.display(), error = %e, "Radical map is malformed; hints disabled");
        self.radicals.clear();
      }
    }
  }

  pub fn words_for_level(&self, level: u8) -> &[VocabEntry] {
    self.words.get(&level).map(Vec::as_slice).unwrap_or(&[])
  }

  pub fn grammar_for_level(&self, level: u8) -> &[GrammarRule] {
    self.grammar.get(&level).map(Vec::as_slice).unwrap_or(&[])
  }

  /// Candidate pool for distractors at `level`.
  ///
  /// Advanced levels merge every loaded 7-9 band in ascending order. A hanzi
  /// present in several bands keeps its first position but takes the entry
  /// from the last band that defines it.
  pub fn pool_for_level(&self, level: u8) -> Vec<VocabEntry> {
    if Tier::from_level(level) != Tier::Advanced {
      return self.words_for_level(level).to_vec();
    }
    let mut merged: Vec<VocabEntry> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for band in ADVANCED_BAND {
      for entry in self.words_for_level(band) {
        match index.get(&entry.hanzi) {
          Some(&i) => merged[i] = entry.clone(),
          None => {
            index.insert(entry.hanzi.clone(), merged.len());
            merged.push(entry.clone());
          }
        }
      }
    }
    merged
  }

  pub fn radical_hint(&self, character: &str) -> Option<&str> {
    self.radicals.get(character).map(String::as_str)
  }

  /// First character of `text`, of any script, with a known radical.
  pub fn first_radical_in(&self, text: &str) -> Option<(char, &str)> {
    text.chars().find_map(|c| {
      let mut buf = [0u8; 4];
      self.radical_hint(c.encode_utf8(&mut buf)).map(|r| (c, r))
    })
  }

  #[cfg(test)]
  pub fn set_radicals(&mut self, map: HashMap<String, String>) {
    self.radicals = map;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testutil::{vocab_json, write_level, write_radicals, CorpusDir};

  #[test]
  fn loads_level_and_preserves_order() {
    let dir = CorpusDir::new();
    write_level(
      &dir,
      1,
      &[vocab_json("爱", "ài", "to love"), vocab_json("八", "bā", "eight"), vocab_json("爸爸", "bàba", "dad")],
      &[("是字句", "identity", "A 是 B", "我是学生")],
    );
    let mut corpus = CorpusProvider::new(dir.path());
    corpus.load_level(1).unwrap();

    let words = corpus.words_for_level(1);
    assert_eq!(words.len(), 3);
    assert_eq!(words[0].hanzi, "爱");
    assert_eq!(words[0].level, 1);
    assert_eq!(words[2].hanzi, "爸爸");
    let grammar = corpus.grammar_for_level(1);
    assert_eq!(grammar.len(), 1);
    assert_eq!(grammar[0].structure, "A 是 B");
    assert!(corpus.words_for_level(2).is_empty());
  }

  #[test]
  fn missing_level_is_data_not_found() {
    let dir = CorpusDir::new();
    let mut corpus = CorpusProvider::new(dir.path());
    let err = corpus.load_level(3).unwrap_err();
    assert!(err.is_not_found());
  }

  #[test]
  fn out_of_range_level_is_rejected() {
    let dir = CorpusDir::new();
    let mut corpus = CorpusProvider::new(dir.path());
    assert!(matches!(corpus.load_level(0), Err(ExamError::InvalidLevel(0))));
    assert!(matches!(corpus.load_level(12), Err(ExamError::InvalidLevel(12))));
  }

  #[test]
  fn missing_required_field_names_field_and_level() {
    let dir = CorpusDir::new();
    std::fs::write(
      dir.path().join("level_2.json"),
      r#"{ "vocabulary": [ { "hanzi": "吧", "pinyin": "ba" } ], "grammar": [] }"#,
    )
    .unwrap();
    let mut corpus = CorpusProvider::new(dir.path());
    match corpus.load_level(2) {
      Err(ExamError::SchemaError { level, field }) => {
        assert_eq!(level, 2);
        assert_eq!(field, "meaning");
      }
      other => panic!("expected SchemaError, got {other:?}"),
    }
  }

  #[test]
  fn grammar_fields_are_required() {
    let dir = CorpusDir::new();
    std::fs::write(
      dir.path().join("level_2.json"),
      r#"{ "vocabulary": [], "grammar": [ { "name": "把", "description": "d", "example": "e" } ] }"#,
    )
    .unwrap();
    let mut corpus = CorpusProvider::new(dir.path());
    assert!(matches!(
      corpus.load_level(2),
      Err(ExamError::SchemaError { field, .. }) if field == "structure"
    ));
  }

  #[test]
  fn invalid_json_is_malformed() {
    let dir = CorpusDir::new();
    std::fs::write(dir.path().join("level_1.json"), "{ not json").unwrap();
    let mut corpus = CorpusProvider::new(dir.path());
    assert!(matches!(corpus.load_level(1), Err(ExamError::MalformedData { level: 1, .. })));
  }

  #[test]
  fn duplicate_hanzi_first_occurrence_wins() {
    let dir = CorpusDir::new();
    write_level(&dir, 1, &[vocab_json("爱", "ài", "to love"), vocab_json("爱", "ài", "affection")], &[]);
    let mut corpus = CorpusProvider::new(dir.path());
    corpus.load_level(1).unwrap();
    let words = corpus.words_for_level(1);
    assert_eq!(words.len(), 1);
    assert_eq!(words[0].meaning, "to love");
  }

  #[test]
  fn reload_replaces_previous_content() {
    let dir = CorpusDir::new();
    write_level(&dir, 1, &[vocab_json("爱", "ài", "to love")], &[]);
    let mut corpus = CorpusProvider::new(dir.path());
    corpus.load_level(1).unwrap();
    write_level(&dir, 1, &[vocab_json("八", "bā", "eight"), vocab_json("爸爸", "bàba", "dad")], &[]);
    corpus.load_level(1).unwrap();
    let hanzi: Vec<_> = corpus.words_for_level(1).iter().map(|w| w.hanzi.as_str()).collect();
    assert_eq!(hanzi, vec!["八", "爸爸"]);
  }

  #[test]
  fn missing_pinyin_is_backfilled() {
    let dir = CorpusDir::new();
    std::fs::write(
      dir.path().join("level_1.json"),
      r#"{ "vocabulary": [ { "hanzi": "中国", "meaning": "China" } ] }"#,
    )
    .unwrap();
    let mut corpus = CorpusProvider::new(dir.path());
    corpus.load_level(1).unwrap();
    assert_eq!(corpus.words_for_level(1)[0].pinyin, "zhōng guó");
  }

  #[test]
  fn advanced_band_merges_last_loaded_wins() {
    let dir = CorpusDir::new();
    write_level(&dir, 7, &[vocab_json("阐述", "chǎnshù", "to expound (L7)"), vocab_json("范畴", "fànchóu", "category")], &[]);
    write_level(&dir, 8, &[vocab_json("阐述", "chǎnshù", "to expound (L8)")], &[]);
    write_level(&dir, 9, &[vocab_json("毋宁", "wúnìng", "rather")], &[("与其…毋宁…", "preference", "与其 A 毋宁 B", "与其等待，毋宁行动")]);

    let mut corpus = CorpusProvider::new(dir.path());
    corpus.load_for_session(9).unwrap();
    let pool = corpus.pool_for_level(9);
    let hanzi: Vec<_> = pool.iter().map(|w| w.hanzi.as_str()).collect();
    assert_eq!(hanzi, vec!["阐述", "范畴", "毋宁"]);
    assert_eq!(pool[0].level, 8);
    assert_eq!(pool[0].meaning, "to expound (L8)");
    // Grammar stays level-exact.
    assert_eq!(corpus.grammar_for_level(9).len(), 1);
    assert!(corpus.grammar_for_level(7).is_empty());
  }

  #[test]
  fn advanced_session_tolerates_missing_sibling_band() {
    let dir = CorpusDir::new();
    write_level(&dir, 9, &[vocab_json("毋宁", "wúnìng", "rather")], &[]);
    let mut corpus = CorpusProvider::new(dir.path());
    corpus.load_for_session(9).unwrap();
    assert_eq!(corpus.pool_for_level(9).len(), 1);
  }

  #[test]
  fn radicals_load_and_lookup() {
    let dir = CorpusDir::new();
    write_radicals(&dir, &[("爱", "爫"), ("好", "女")]);
    let mut corpus = CorpusProvider::new(dir.path());
    corpus.load_radicals();
    assert_eq!(corpus.radical_hint("爱"), Some("爫"));
    assert_eq!(corpus.radical_hint("XYZ"), None);
    assert_eq!(corpus.first_radical_in("Select: 你好"), Some(('好', "女")));
  }

  #[test]
  fn radical_lookup_is_not_limited_to_han_ranges() {
    let dir = CorpusDir::new();
    write_radicals(&dir, &[("A", "RadA"), ("〇", "二")]);
    let mut corpus = CorpusProvider::new(dir.path());
    corpus.load_radicals();
    assert_eq!(corpus.first_radical_in("Select for A"), Some(('A', "RadA")));
    assert_eq!(corpus.first_radical_in("二〇二四"), Some(('〇', "二")));
  }

  #[test]
  fn radical_map_failures_are_not_fatal() {
    let dir = CorpusDir::new();
    let mut corpus = CorpusProvider::new(dir.path());
    corpus.load_radicals();
    assert_eq!(corpus.radical_hint("爱"), None);

    std::fs::write(dir.path().join("radicals.json"), "[1, 2").unwrap();
    corpus.load_radicals();
    assert_eq!(corpus.radical_hint("爱"), None);
  }
}
