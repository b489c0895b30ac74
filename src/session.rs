//! Session engine: assembles a fixed batch of questions, walks the cursor,
//! scores submissions and produces the final result.
//!
//! Lifecycle: `Created -> InProgress -> Completed`. The session owns its own
//! corpus snapshot and RNG; nothing here is shared between sessions.

use std::cmp::Reverse;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, instrument, warn};

use crate::builder::QuestionBuilder;
use crate::config::{ExamConfig, SessionPolicy};
use crate::corpus::CorpusProvider;
use crate::domain::{is_valid_level, Grade, Question, QuestionKind, TestResult, Tier, VocabEntry};
use crate::error::ExamError;

pub const NO_HINT: &str = "No specific radical hint available.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
  Created,
  InProgress,
  Completed,
}

pub struct Session {
  level: u8,
  config: Arc<ExamConfig>,
  corpus: CorpusProvider,
  questions: Vec<Question>,
  cursor: usize,
  correct: usize,
  mistakes: Vec<Question>,
  phase: SessionPhase,
  rng: StdRng,
  result: Option<TestResult>,
}

impl Session {
  /// A fresh session with its own corpus provider. `seed` makes sampling reproducible.
  pub fn new(config: Arc<ExamConfig>, level: u8, seed: Option<u64>) -> Result<Self, ExamError> {
    if !is_valid_level(level) {
      return Err(ExamError::InvalidLevel(level));
    }
    let rng = match seed {
      Some(seed) => StdRng::seed_from_u64(seed),
      None => StdRng::from_entropy(),
    };
    Ok(Self {
      level,
      corpus: CorpusProvider::new(config.data_dir.clone()),
      config,
      questions: Vec::new(),
      cursor: 0,
      correct: 0,
      mistakes: Vec::new(),
      phase: SessionPhase::Created,
      rng,
      result: None,
    })
  }

  /// Load the corpus and generate up to `requested` questions.
  /// Returns the number of questions actually produced.
  #[instrument(level = "info", skip(self), fields(level = self.level))]
  pub fn start(&mut self, requested: usize) -> Result<usize, ExamError> {
    if self.phase != SessionPhase::Created {
      warn!(target: "exam", phase = ?self.phase, "Session already started; keeping existing questions");
      return Ok(self.questions.len());
    }
    self.corpus.load_for_session(self.level)?;
    self.corpus.load_radicals();

    self.questions = assemble(&self.config, &self.corpus, self.level, requested, &mut self.rng);
    if self.questions.len() < requested {
      warn!(target: "exam", level = self.level, requested, produced = self.questions.len(), "Sparse corpus: fewer questions than requested");
    }
    info!(target: "exam", level = self.level, questions = self.questions.len(), "Session started");
    self.phase = SessionPhase::InProgress;
    Ok(self.questions.len())
  }

  pub fn phase(&self) -> SessionPhase {
    self.phase
  }

  pub fn questions(&self) -> &[Question] {
    &self.questions
  }

  pub fn question(&self, id: &str) -> Option<&Question> {
    self.questions.iter().find(|q| q.id == id)
  }

  pub fn remaining(&self) -> usize {
    self.questions.len() - self.cursor
  }

  /// Question at the cursor, advancing it. `None` once exhausted.
  pub fn next_question(&mut self) -> Option<&Question> {
    if self.cursor >= self.questions.len() {
      return None;
    }
    self.cursor += 1;
    self.questions.get(self.cursor - 1)
  }

  /// Score one response. Multiple choice is exact after trimming; fill-in-blank
  /// ignores case; writing is never auto-scored.
  #[instrument(level = "debug", skip(self, question, response), fields(id = %question.id, response_len = response.len()))]
  pub fn submit_answer(&mut self, question: &Question, response: &str) -> Grade {
    let response = response.trim();
    let expected = question.correct_answer.trim();
    let grade = match question.kind {
      QuestionKind::MultipleChoice if response == expected => Grade::Correct,
      QuestionKind::FillInBlank if response.to_lowercase() == expected.to_lowercase() => Grade::Correct,
      QuestionKind::OpenWriting => Grade::Ungraded,
      _ => Grade::Incorrect,
    };
    match grade {
      Grade::Correct => self.correct += 1,
      Grade::Incorrect => self.mistakes.push(question.clone()),
      Grade::Ungraded => {}
    }
    debug!(target: "exam", id = %question.id, ?grade, correct = self.correct, "Answer scored");
    grade
  }

  /// First character in the prompt with a known radical.
  pub fn radical_hint(&self, question: &Question) -> String {
    match self.corpus.first_radical_in(&question.prompt) {
      Some((c, radical)) => format!("Character: {}, Radical: {}", c, radical),
      None => NO_HINT.to_string(),
    }
  }

  /// Percentage over every generated question. Once the cursor is exhausted
  /// the session completes and the result is frozen.
  pub fn calculate_result(&mut self) -> TestResult {
    if let Some(result) = &self.result {
      return result.clone();
    }
    let total = self.questions.len();
    let score = if total == 0 {
      0
    } else {
      (self.correct as f64 / total as f64 * 100.0).round() as u32
    };
    let passed = total > 0 && score >= self.config.passing_score;
    let remediation: BTreeSet<String> = self
      .mistakes
      .iter()
      .map(|q| match &q.grammar_focus {
        Some(rule) => format!("Review grammar rule: {}", rule),
        None => format!("Review vocabulary in: {}", q.prompt),
      })
      .collect();
    let result = TestResult {
      level: self.level,
      score,
      total_questions: total,
      remediation,
      passed,
      status: if passed { "Exam Ready" } else { "Targeted Practice Required" }.to_string(),
    };
    if self.cursor >= total {
      self.phase = SessionPhase::Completed;
      self.result = Some(result.clone());
      info!(target: "exam", level = self.level, score, passed, "Session completed");
    }
    result
  }
}

/// Build the question batch for `level`: targets, optional grammar and
/// writing fillers, shuffled and capped at `requested`.
pub fn assemble<R: Rng + ?Sized>(
  config: &ExamConfig,
  corpus: &CorpusProvider,
  level: u8,
  requested: usize,
  rng: &mut R,
) -> Vec<Question> {
  let pool = corpus.pool_for_level(level);
  let targets = select_targets(&config.session, &pool, level, requested, rng);
  let builder = QuestionBuilder::new(corpus, &pool, config);

  let mut questions: Vec<Question> = targets.iter().map(|e| builder.build_question(e, rng)).collect();

  let grammar = corpus.grammar_for_level(level);
  if questions.len() < requested {
    if let Some(rule) = grammar.choose(rng) {
      questions.push(builder.build_fill_in_blank(rule));
    }
  }
  if questions.len() < requested {
    if let Some(q) = builder.build_writing_prompt(level, rng) {
      questions.push(q);
    }
  }

  questions.shuffle(rng);
  questions.truncate(requested);
  questions
}

fn is_academic(policy: &SessionPolicy, entry: &VocabEntry) -> bool {
  let meaning = entry.meaning.to_lowercase();
  policy
    .academic_markers
    .iter()
    .any(|m| entry.hanzi.contains(m.as_str()) || meaning.contains(m.as_str()))
}

/// Advanced-tier candidates without register-excluded tags, best first:
/// example sentences, academic register, multi-character, then frequency
/// descending. Equal keys keep pool order.
pub fn rank_advanced<'p>(policy: &SessionPolicy, candidates: impl Iterator<Item = &'p VocabEntry>) -> Vec<&'p VocabEntry> {
  let mut ranked: Vec<&VocabEntry> = candidates
    .filter(|w| !w.pos.iter().any(|p| policy.excluded_register_tags.contains(p)))
    .collect();
  ranked.sort_by_key(|w| {
    Reverse((w.has_sentences(), is_academic(policy, w), w.char_len() > 1, w.frequency))
  });
  ranked
}

/// Pick up to `requested` distinct target entries whose level is exactly `level`.
pub fn select_targets<'p, R: Rng + ?Sized>(
  policy: &SessionPolicy,
  pool: &'p [VocabEntry],
  level: u8,
  requested: usize,
  rng: &mut R,
) -> Vec<&'p VocabEntry> {
  let exact = pool.iter().filter(|w| w.level == level);

  let mut picked: Vec<&VocabEntry> = if Tier::from_level(level) == Tier::Advanced {
    let mut ranked = rank_advanced(policy, exact);
    let slice = requested.saturating_mul(policy.advanced_slice_factor.max(1));
    ranked.truncate(slice);
    ranked.choose_multiple(rng, requested).copied().collect()
  } else {
    let (mut with, mut without): (Vec<&VocabEntry>, Vec<&VocabEntry>) = exact.partition(|w| w.has_sentences());
    with.shuffle(rng);
    without.shuffle(rng);
    with.extend(without);
    with.truncate(requested);
    with.shuffle(rng);
    with
  };

  let mut seen = HashSet::new();
  picked.retain(|w| seen.insert(w.hanzi.as_str()));
  picked
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testutil::{entry, vocab_json, with_freq, with_pos, with_sentences, write_level, write_radicals, CorpusDir};
  use serde_json::json;

  fn session(dir: &CorpusDir, level: u8, seed: u64) -> Session {
    Session::new(Arc::new(ExamConfig::default().with_data_dir(dir.path())), level, Some(seed)).unwrap()
  }

  fn four_plain_words(dir: &CorpusDir) {
    write_level(
      dir,
      1,
      &[
        vocab_json("爱", "ài", "to love"),
        vocab_json("八", "bā", "eight"),
        vocab_json("大", "dà", "big"),
        vocab_json("好", "hǎo", "good"),
      ],
      &[("是字句", "identity", "A 是 B", "我是学生")],
    );
  }

  fn rich_level(dir: &CorpusDir, level: u8) {
    let vocab: Vec<_> = [
      ("学习", "to study", "我们一起学习汉语吧"),
      ("工作", "to work", "他在银行工作很多年"),
      ("喜欢", "to like", "我很喜欢这本新书"),
      ("天气", "weather", "今天的天气非常好"),
      ("朋友", "friend", "他是我最好的朋友"),
      ("电影", "film", "我们晚上去看电影吧"),
    ]
    .iter()
    .map(|(h, m, s)| json!({ "hanzi": h, "pinyin": "", "meaning": m, "pos": ["v"], "sentences": [s] }))
    .collect();
    write_level(dir, level, &vocab, &[("把字句", "disposal", "S 把 O V", "我把书放在桌子上")]);
  }

  #[test]
  fn four_entries_without_sentences_end_to_end() {
    let dir = CorpusDir::new();
    four_plain_words(&dir);
    let mut s = session(&dir, 1, 42);
    assert_eq!(s.phase(), SessionPhase::Created);
    assert_eq!(s.start(4).unwrap(), 4);
    assert_eq!(s.phase(), SessionPhase::InProgress);

    for q in s.questions() {
      assert!(q.id.starts_with("MC_"), "expected meaning lookup, got {}", q.id);
      assert_eq!(q.options.len(), 4);
    }
    while let Some(q) = s.next_question().cloned() {
      assert_eq!(s.submit_answer(&q, &q.correct_answer), Grade::Correct);
    }
    let result = s.calculate_result();
    assert_eq!(result.score, 100);
    assert!(result.passed);
    assert_eq!(result.status, "Exam Ready");
    assert_eq!(result.total_questions, 4);
    assert!(result.remediation.is_empty());
    assert_eq!(s.phase(), SessionPhase::Completed);
  }

  #[test]
  fn generated_questions_are_well_formed_for_every_tier() {
    for level in [1u8, 4, 9] {
      let dir = CorpusDir::new();
      rich_level(&dir, level);
      for n in [0usize, 3, 10] {
        let mut s = session(&dir, level, 7);
        let produced = s.start(n).unwrap();
        assert!(produced <= n);
        for q in s.questions() {
          assert!(!q.prompt.is_empty());
          if q.kind == QuestionKind::MultipleChoice {
            assert_eq!(
              q.options.iter().filter(|o| **o == q.correct_answer).count(),
              1,
              "correct answer must appear exactly once in {:?}",
              q
            );
          }
        }
      }
    }
  }

  #[test]
  fn multiple_choice_is_case_sensitive_fill_in_blank_is_not() {
    let dir = CorpusDir::new();
    four_plain_words(&dir);
    let mut s = session(&dir, 1, 1);
    s.start(4).unwrap();
    let mc = s.questions()[0].clone();
    assert_eq!(s.submit_answer(&mc, &format!("  {} ", mc.correct_answer)), Grade::Correct);
    assert_eq!(s.submit_answer(&mc, &mc.correct_answer.to_uppercase()), Grade::Incorrect);

    let b = QuestionBuilder::new(&s.corpus, &[], &s.config);
    let fib = b.build_fill_in_blank(&crate::domain::GrammarRule {
      name: "topic".into(),
      description: "d".into(),
      structure: "Topic Comment".into(),
      example: "e".into(),
      level: 1,
    });
    assert_eq!(s.submit_answer(&fib, "Topic Comment"), Grade::Correct);
    assert_eq!(s.submit_answer(&fib, "TOPIC COMMENT"), Grade::Correct);
  }

  #[test]
  fn empty_session_scores_zero_and_fails() {
    let dir = CorpusDir::new();
    write_level(&dir, 2, &[], &[]);
    let mut s = session(&dir, 2, 3);
    assert_eq!(s.start(10).unwrap(), 0);
    assert!(s.next_question().is_none());
    let r = s.calculate_result();
    assert_eq!(r.score, 0);
    assert!(!r.passed);
    assert_eq!(r.total_questions, 0);
  }

  #[test]
  fn advanced_targets_come_only_from_requested_level() {
    let dir = CorpusDir::new();
    let band = |prefix: &str| -> Vec<serde_json::Value> {
      (0..6)
        .map(|i| {
          let hanzi = format!("{}{}", prefix, ["甲", "乙", "丙", "丁", "戊", "己"][i]);
          json!({ "hanzi": hanzi, "pinyin": "x", "meaning": format!("m{}{}", prefix, i) })
        })
        .collect()
    };
    write_level(&dir, 7, &band("七"), &[]);
    write_level(&dir, 8, &band("八"), &[]);
    write_level(&dir, 9, &band("九"), &[]);

    for seed in 0..5 {
      let mut s = session(&dir, 9, seed);
      s.start(4).unwrap();
      assert_eq!(s.questions().len(), 4);
      for q in s.questions() {
        assert_eq!(q.level, 9);
        assert!(q.id.starts_with("MC_九"), "unexpected target {}", q.id);
      }
    }
  }

  #[test]
  fn advanced_ranking_key_order() {
    let policy = SessionPolicy::default();
    let pool = vec![
      with_pos(entry("哎呀", "oops", 9), &["e"]),
      with_freq(entry("跑步", "to jog", 9), 10),
      entry("嗯", "um", 9),
      with_freq(entry("散步", "to stroll", 9), 50),
      entry("机制", "mechanism", 9),
      with_sentences(entry("嘛", "particle", 9), &["s"]),
      with_freq(entry("学", "to study", 9), 99),
      with_pos(with_sentences(entry("哈哈", "haha", 9), &["s"]), &["onomatopoeia"]),
    ];
    let ranked: Vec<&str> = rank_advanced(&policy, pool.iter()).iter().map(|w| w.hanzi.as_str()).collect();
    // Sentences beat register, register beats length, length beats frequency.
    assert_eq!(ranked, vec!["嘛", "机制", "散步", "跑步", "学", "嗯"]);
  }

  #[test]
  fn advanced_ranking_orders_equal_entries_by_frequency_descending() {
    let policy = SessionPolicy::default();
    let pool = vec![
      with_freq(entry("甲乙", "a", 9), 3),
      with_freq(entry("丙丁", "b", 9), 70),
      with_freq(entry("戊己", "c", 9), 12),
      with_freq(entry("庚辛", "d", 9), 0),
    ];
    let freqs: Vec<u32> = rank_advanced(&policy, pool.iter()).iter().map(|w| w.frequency).collect();
    assert_eq!(freqs, vec![70, 12, 3, 0]);
  }

  #[test]
  fn advanced_targets_sample_only_the_top_slice() {
    let policy = SessionPolicy::default();
    let pool = vec![
      with_pos(entry("哎呀", "oops", 9), &["e"]),
      entry("范畴", "category", 9),
      with_sentences(entry("阐述", "to expound", 9), &["s"]),
      entry("嗯", "um", 9),
      entry("机制", "mechanism", 9),
    ];
    // One requested, slice of two: 阐述 (sentences) and 范畴 (first academic compound).
    let mut seen = HashSet::new();
    for seed in 0..40 {
      let picked = select_targets(&policy, &pool, 9, 1, &mut StdRng::seed_from_u64(seed));
      assert_eq!(picked.len(), 1);
      seen.insert(picked[0].hanzi.clone());
    }
    let mut seen: Vec<String> = seen.into_iter().collect();
    seen.sort();
    assert_eq!(seen, vec!["范畴".to_string(), "阐述".to_string()]);

    // Asking for the whole slice returns exactly its members.
    let mut two: Vec<&str> = select_targets(&policy, &pool, 9, 2, &mut StdRng::seed_from_u64(1))
      .iter()
      .map(|w| w.hanzi.as_str())
      .collect();
    two.sort();
    assert_eq!(two, vec!["范畴", "阐述"]);
  }

  #[test]
  fn lower_tiers_prefer_entries_with_sentences() {
    let policy = SessionPolicy::default();
    let pool = vec![
      entry("八", "eight", 2),
      with_sentences(entry("爱", "to love", 2), &["我 爱 爸爸"]),
      entry("大", "big", 2),
      with_sentences(entry("好", "good", 2), &["今天天气很好啊"]),
      entry("书", "book", 1),
    ];
    let mut rng = StdRng::seed_from_u64(4);
    let mut picked: Vec<_> = select_targets(&policy, &pool, 2, 2, &mut rng).iter().map(|w| w.hanzi.clone()).collect();
    picked.sort();
    assert_eq!(picked, vec!["好", "爱"]);

    let all = select_targets(&policy, &pool, 2, 10, &mut rng);
    assert_eq!(all.len(), 4);
    assert!(all.iter().all(|w| w.level == 2));
  }

  #[test]
  fn short_batches_are_topped_up_with_grammar_and_writing() {
    let dir = CorpusDir::new();
    let vocab: Vec<_> = ["甲", "乙", "丙", "丁", "戊"]
      .iter()
      .enumerate()
      .map(|(i, h)| vocab_json(h, "x", &format!("meaning {}", i)))
      .collect();
    write_level(&dir, 5, &vocab, &[("被字句", "passive", "S 被 A V", "书被他拿走了")]);
    let mut s = session(&dir, 5, 9);
    assert_eq!(s.start(10).unwrap(), 7);
    let kinds: Vec<_> = s.questions().iter().map(|q| q.kind).collect();
    assert_eq!(kinds.iter().filter(|k| **k == QuestionKind::FillInBlank).count(), 1);
    assert_eq!(kinds.iter().filter(|k| **k == QuestionKind::OpenWriting).count(), 1);

    let writing = s.questions().iter().find(|q| q.kind == QuestionKind::OpenWriting).cloned().unwrap();
    assert_eq!(s.submit_answer(&writing, "我的作文"), Grade::Ungraded);
    assert!(s.mistakes.is_empty());
  }

  #[test]
  fn remediation_notes_are_deduplicated() {
    let dir = CorpusDir::new();
    four_plain_words(&dir);
    let mut s = session(&dir, 1, 5);
    s.start(4).unwrap();
    let q = s.questions()[0].clone();
    s.submit_answer(&q, "wrong");
    s.submit_answer(&q, "still wrong");
    let fib = QuestionBuilder::new(&s.corpus, &[], &s.config).build_fill_in_blank(&s.corpus.grammar_for_level(1)[0]);
    s.submit_answer(&fib, "nope");

    let r = s.calculate_result();
    assert_eq!(r.remediation.len(), 2);
    assert!(r.remediation.contains(&format!("Review vocabulary in: {}", q.prompt)));
    assert!(r.remediation.contains("Review grammar rule: 是字句"));
    assert_eq!(r.score, 0);
    assert!(!r.passed);
    assert_eq!(r.status, "Targeted Practice Required");
    // Cursor not exhausted: result is provisional.
    assert_eq!(s.phase(), SessionPhase::InProgress);
  }

  #[test]
  fn score_is_rounded_percentage() {
    let dir = CorpusDir::new();
    write_level(
      &dir,
      1,
      &[vocab_json("爱", "ài", "to love"), vocab_json("八", "bā", "eight"), vocab_json("大", "dà", "big")],
      &[],
    );
    let mut s = session(&dir, 1, 8);
    assert_eq!(s.start(3).unwrap(), 3);
    let qs = s.questions().to_vec();
    s.submit_answer(&qs[0], &qs[0].correct_answer);
    s.submit_answer(&qs[1], &qs[1].correct_answer);
    s.submit_answer(&qs[2], "wrong");
    while s.next_question().is_some() {}
    let r = s.calculate_result();
    assert_eq!(r.score, 67);
    assert!(r.passed);
    // Frozen once completed.
    s.submit_answer(&qs[2], &qs[2].correct_answer);
    assert_eq!(s.calculate_result(), r);
  }

  #[test]
  fn cursor_walks_questions_in_order() {
    let dir = CorpusDir::new();
    four_plain_words(&dir);
    let mut s = session(&dir, 1, 2);
    s.start(4).unwrap();
    let ids: Vec<String> = s.questions().iter().map(|q| q.id.clone()).collect();
    let mut walked = Vec::new();
    while let Some(q) = s.next_question() {
      walked.push(q.id.clone());
    }
    assert_eq!(walked, ids);
    assert_eq!(s.remaining(), 0);
    assert!(s.next_question().is_none());
  }

  #[test]
  fn hint_scans_prompt_for_known_radical() {
    let dir = CorpusDir::new();
    four_plain_words(&dir);
    write_radicals(&dir, &[("好", "女")]);
    let mut s = session(&dir, 1, 2);
    s.start(4).unwrap();
    let q = s.question("MC_好").cloned().unwrap();
    assert_eq!(s.radical_hint(&q), "Character: 好, Radical: 女");
    let other = s.question("MC_八").cloned().unwrap();
    assert_eq!(s.radical_hint(&other), NO_HINT);
  }

  #[test]
  fn missing_corpus_and_bad_level_fail_start() {
    let dir = CorpusDir::new();
    let mut s = session(&dir, 3, 0);
    assert!(s.start(5).unwrap_err().is_not_found());
    assert_eq!(s.phase(), SessionPhase::Created);

    let cfg = Arc::new(ExamConfig::default().with_data_dir(dir.path()));
    assert!(matches!(Session::new(cfg, 10, None), Err(ExamError::InvalidLevel(10))));
  }

  #[test]
  fn same_seed_same_exam() {
    let dir = CorpusDir::new();
    rich_level(&dir, 4);
    let mut a = session(&dir, 4, 99);
    let mut b = session(&dir, 4, 99);
    a.start(5).unwrap();
    b.start(5).unwrap();
    assert_eq!(a.questions(), b.questions());
  }
}
