//! Test fixtures: corpus files written into a temp directory, plus in-memory entries.

use serde_json::{json, Value};
use tempfile::TempDir;

use crate::domain::VocabEntry;

pub struct CorpusDir(TempDir);

impl CorpusDir {
  pub fn new() -> Self {
    CorpusDir(tempfile::tempdir().unwrap())
  }

  pub fn path(&self) -> &std::path::Path {
    self.0.path()
  }
}

pub fn vocab_json(hanzi: &str, pinyin: &str, meaning: &str) -> Value {
  json!({ "hanzi": hanzi, "pinyin": pinyin, "meaning": meaning })
}

/// `grammar` tuples are (name, description, structure, example).
pub fn write_level(dir: &CorpusDir, level: u8, vocabulary: &[Value], grammar: &[(&str, &str, &str, &str)]) {
  let grammar: Vec<Value> = grammar
    .iter()
    .map(|(name, description, structure, example)| {
      json!({ "name": name, "description": description, "structure": structure, "example": example })
    })
    .collect();
  let body = json!({ "vocabulary": vocabulary, "grammar": grammar });
  std::fs::write(dir.path().join(format!("level_{}.json", level)), body.to_string()).unwrap();
}

pub fn write_radicals(dir: &CorpusDir, pairs: &[(&str, &str)]) {
  let map: serde_json::Map<String, Value> =
    pairs.iter().map(|(c, r)| (c.to_string(), Value::from(*r))).collect();
  std::fs::write(dir.path().join("radicals.json"), Value::Object(map).to_string()).unwrap();
}

pub fn entry(hanzi: &str, meaning: &str, level: u8) -> VocabEntry {
  VocabEntry {
    hanzi: hanzi.into(),
    pinyin: String::new(),
    meaning: meaning.into(),
    level,
    radicals: vec![],
    sentences: vec![],
    pos: vec![],
    frequency: 0,
  }
}

pub fn with_pos(mut e: VocabEntry, pos: &[&str]) -> VocabEntry {
  e.pos = pos.iter().map(|s| s.to_string()).collect();
  e
}

pub fn with_radicals(mut e: VocabEntry, radicals: &[&str]) -> VocabEntry {
  e.radicals = radicals.iter().map(|s| s.to_string()).collect();
  e
}

pub fn with_sentences(mut e: VocabEntry, sentences: &[&str]) -> VocabEntry {
  e.sentences = sentences.iter().map(|s| s.to_string()).collect();
  e
}

pub fn with_freq(mut e: VocabEntry, frequency: u32) -> VocabEntry {
  e.frequency = frequency;
  e
}
