//! Loading exam configuration (corpus location + heuristic weights) from TOML.
//!
//! Every field has a default, so an empty file (or no file) is a valid config.
//! See `ExamConfig` for the expected schema.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ExamConfig {
  /// Directory holding `level_{n}.json` and `radicals.json`.
  pub data_dir: PathBuf,
  pub passing_score: u32,
  pub distractor_count: usize,
  pub blank_marker: String,
  pub practice_questions: usize,
  pub distractor: DistractorWeights,
  pub sentence: SentencePolicy,
  pub session: SessionPolicy,
  /// Level (as a TOML key, e.g. "4") -> question count in "exam" mode.
  pub exam_structure: BTreeMap<String, usize>,
}

impl Default for ExamConfig {
  fn default() -> Self {
    Self {
      data_dir: PathBuf::from("./data"),
      passing_score: 60,
      distractor_count: 3,
      blank_marker: "____".into(),
      practice_questions: 10,
      distractor: DistractorWeights::default(),
      sentence: SentencePolicy::default(),
      session: SessionPolicy::default(),
      exam_structure: [
        (1, 40), (2, 60), (3, 80),
        (4, 100), (5, 100), (6, 101),
        (7, 98), (8, 98), (9, 98),
      ]
      .into_iter()
      .map(|(level, n)| (level.to_string(), n))
      .collect(),
    }
  }
}

impl ExamConfig {
  pub fn with_data_dir(self, data_dir: impl Into<PathBuf>) -> Self {
    Self { data_dir: data_dir.into(), ..self }
  }

  /// Question count for a full mock exam at `level`.
  pub fn exam_length(&self, level: u8) -> usize {
    self.exam_structure.get(&level.to_string()).copied().unwrap_or(40)
  }
}

/// Distractor scoring weights per tier.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct DistractorWeights {
  pub foundation_keyword: i64,
  pub foundation_radical: i64,
  pub proficiency_keyword: i64,
  pub proficiency_shared_char: i64,
  pub advanced_shared_char: i64,
  pub advanced_keyword: i64,
  pub advanced_same_level: i64,
  /// Candidates within this many points of the best remaining score are
  /// treated as tied and drawn at random.
  pub near_tie_margin: i64,
}

impl Default for DistractorWeights {
  fn default() -> Self {
    Self {
      foundation_keyword: 100,
      foundation_radical: 50,
      proficiency_keyword: 150,
      proficiency_shared_char: 80,
      advanced_shared_char: 250,
      advanced_keyword: 100,
      advanced_same_level: 50,
      near_tie_margin: 20,
    }
  }
}

/// Cloze sentence filtering and scoring.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SentencePolicy {
  pub min_len_basic: usize,
  pub min_len_advanced: usize,
  pub comma_weight: i64,
  pub colon_weight: i64,
  pub rhetoric_weight: i64,
  pub register_weight: i64,
  pub top_band: usize,
  pub rhetorical_markers: Vec<String>,
  pub register_triggers: Vec<String>,
  /// Advanced tier only: sentences mentioning these are trivia, not register.
  pub science_blacklist: Vec<String>,
}

impl Default for SentencePolicy {
  fn default() -> Self {
    Self {
      min_len_basic: 6,
      min_len_advanced: 30,
      comma_weight: 15,
      colon_weight: 25,
      rhetoric_weight: 50,
      register_weight: 30,
      top_band: 3,
      rhetorical_markers: strings(&[
        "与其", "毋宁", "甚至", "即便", "既然", "不仅", "岂", "何必", "固然", "何况",
      ]),
      register_triggers: strings(&[
        "哲学", "政治", "经济", "体系", "范畴", "逻辑", "理论", "机制", "策略", "规律",
      ]),
      science_blacklist: strings(&[
        "二氧化碳", "氧气", "光合作用", "肺", "太阳系", "原子", "分子", "科学发现",
      ]),
    }
  }
}

/// Target-entry selection for session assembly.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SessionPolicy {
  /// Advanced tier samples targets from the top `requested * factor` ranked entries.
  pub advanced_slice_factor: usize,
  /// POS tags that mark interjections, onomatopoeia and colloquial fillers.
  pub excluded_register_tags: Vec<String>,
  pub academic_markers: Vec<String>,
  pub writing_composition_words: usize,
}

impl Default for SessionPolicy {
  fn default() -> Self {
    Self {
      advanced_slice_factor: 2,
      excluded_register_tags: strings(&["e", "o", "y", "interjection", "onomatopoeia", "colloquial"]),
      academic_markers: strings(&[
        "哲学", "政治", "经济", "体系", "范畴", "逻辑", "理论", "机制", "策略", "规律",
        "theory", "policy", "mechanism", "system", "logic", "economy", "philosophy", "strategy",
      ]),
      writing_composition_words: 5,
    }
  }
}

fn strings(items: &[&str]) -> Vec<String> {
  items.iter().map(|s| s.to_string()).collect()
}

/// Load `ExamConfig` from HSK_CONFIG_PATH (falling back to defaults on any
/// IO/parse error), then apply the HSK_DATA_DIR override.
pub fn load_exam_config_from_env() -> ExamConfig {
  let mut cfg = match std::env::var("HSK_CONFIG_PATH") {
    Ok(path) => match std::fs::read_to_string(&path) {
      Ok(s) => match toml::from_str::<ExamConfig>(&s) {
        Ok(cfg) => {
          info!(target: "hsk_mock", %path, "Loaded exam config (TOML)");
          cfg
        }
        Err(e) => {
          error!(target: "hsk_mock", %path, error = %e, "Failed to parse TOML config; using defaults");
          ExamConfig::default()
        }
      },
      Err(e) => {
        error!(target: "hsk_mock", %path, error = %e, "Failed to read TOML config file; using defaults");
        ExamConfig::default()
      }
    },
    Err(_) => ExamConfig::default(),
  };

  if let Ok(dir) = std::env::var("HSK_DATA_DIR") {
    cfg = cfg.with_data_dir(dir);
  }
  info!(target: "hsk_mock", data_dir = %cfg.data_dir.display(), "Corpus directory resolved");
  cfg
}
