//! Domain models: vocabulary entries, grammar rules, questions, results and tiers.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

pub const MIN_LEVEL: u8 = 1;
pub const MAX_LEVEL: u8 = 9;

/// Proficiency grouping that decides distractor and sentence policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
  /// Levels 1-3.
  Foundation,
  /// Levels 4-6.
  Proficiency,
  /// Levels 7-9.
  Advanced,
}

impl Tier {
  pub fn from_level(level: u8) -> Self {
    match level {
      0..=3 => Tier::Foundation,
      4..=6 => Tier::Proficiency,
      _ => Tier::Advanced,
    }
  }
}

pub fn is_valid_level(level: u8) -> bool {
  (MIN_LEVEL..=MAX_LEVEL).contains(&level)
}

/// Human description of what a level certifies.
pub fn level_description(level: u8) -> &'static str {
  match level {
    1 => "Beginner - Understand and use simple Chinese words and phrases",
    2 => "Beginner - Communicate in simple and routine tasks directly",
    3 => "Beginner - Complete basic communicative tasks in life/study",
    4 => "Intermediate - Discuss a relatively wide range of topics",
    5 => "Intermediate - Read Chinese newspapers and watch movies",
    6 => "Intermediate - Easily comprehend written and spoken information",
    7..=9 => "Advanced - Near-native proficiency in all domains",
    _ => "Unknown",
  }
}

/// One vocabulary item. `hanzi` is the key within a level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VocabEntry {
  pub hanzi: String,
  pub pinyin: String,
  /// Raw meaning text; several senses are separated by `;`.
  pub meaning: String,
  pub level: u8,
  #[serde(default)] pub radicals: Vec<String>,
  #[serde(default)] pub sentences: Vec<String>,
  #[serde(default)] pub pos: Vec<String>,
  #[serde(default)] pub frequency: u32,
}

impl VocabEntry {
  /// Individual senses of `meaning`.
  pub fn meanings(&self) -> impl Iterator<Item = &str> {
    self.meaning.split(';').map(str::trim).filter(|m| !m.is_empty())
  }

  pub fn char_len(&self) -> usize {
    self.hanzi.chars().count()
  }

  pub fn has_sentences(&self) -> bool {
    !self.sentences.is_empty()
  }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GrammarRule {
  pub name: String,
  pub description: String,
  pub structure: String,
  pub example: String,
  pub level: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
  /// Options are listed; answer must match exactly (case-sensitive).
  MultipleChoice,
  /// Free response; answer compared case-insensitively.
  FillInBlank,
  /// Self-graded composition, never auto-scored.
  OpenWriting,
}

/// A generated question. Immutable once emitted by the builder.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Question {
  pub id: String,
  pub kind: QuestionKind,
  pub prompt: String,
  pub options: Vec<String>,
  pub correct_answer: String,
  #[serde(default)] pub hint: Option<String>,
  /// Name of the grammar rule under test, if any.
  #[serde(default)] pub grammar_focus: Option<String>,
  pub level: u8,
}

/// Outcome of a single submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
  Correct,
  Incorrect,
  /// Writing prompts are accepted but not scored.
  Ungraded,
}

impl Grade {
  pub fn is_correct(self) -> bool {
    self == Grade::Correct
  }
}

/// Final session summary. Computed once when the session completes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
  pub level: u8,
  /// Integer percentage 0-100.
  pub score: u32,
  pub total_questions: usize,
  pub remediation: BTreeSet<String>,
  pub passed: bool,
  pub status: String,
}
