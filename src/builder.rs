//! Question builder: cloze, meaning-lookup, grammar fill-in-blank and writing prompts.
//!
//! Cloze questions need a context sentence. Lower tiers only filter by length
//! and by a single occurrence of the target; the advanced tier also drops
//! science trivia and ranks sentences by rhetorical/register density.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::config::ExamConfig;
use crate::corpus::CorpusProvider;
use crate::distractor::{CompareBy, DistractorSelector};
use crate::domain::{GrammarRule, Question, QuestionKind, Tier, VocabEntry};

pub struct QuestionBuilder<'a> {
    corpus: &'a CorpusProvider,
    /// Distractor candidates (the whole band pool for advanced levels).
    pool: &'a [VocabEntry],
    config: &'a ExamConfig,
}

impl<'a> QuestionBuilder<'a> {
    pub fn new(corpus: &'a CorpusProvider, pool: &'a [VocabEntry], config: &'a ExamConfig) -> Self {
        Self { corpus, pool, config }
    }

    /// Cloze question when a usable sentence exists, meaning lookup otherwise.
    pub fn build_question<R: Rng + ?Sized>(&self, entry: &VocabEntry, rng: &mut R) -> Question {
        let selector = DistractorSelector::new(&self.config.distractor);
        let hint = self.corpus.radical_hint(&entry.hanzi).map(str::to_string);
        let n = self.config.distractor_count;

        match self.select_sentence(entry, rng) {
            Some(sentence) => {
                let masked = sentence.replacen(entry.hanzi.as_str(), &self.config.blank_marker, 1);
                let mut options = selector.select(entry, self.pool, n, CompareBy::SurfaceForm, rng);
                options.push(entry.hanzi.clone());
                options.shuffle(rng);
                Question {
                    id: format!("CLOZE_{}", entry.hanzi),
                    kind: QuestionKind::MultipleChoice,
                    prompt: format!("Fill in the blank: {}", masked),
                    options,
                    correct_answer: entry.hanzi.clone(),
                    hint,
                    grammar_focus: None,
                    level: entry.level,
                }
            }
            None => {
                let mut options = selector.select(entry, self.pool, n, CompareBy::Meaning, rng);
                options.push(entry.meaning.clone());
                options.shuffle(rng);
                Question {
                    id: format!("MC_{}", entry.hanzi),
                    kind: QuestionKind::MultipleChoice,
                    prompt: format!("Select the meaning for: {} ({})", entry.hanzi, entry.pinyin),
                    options,
                    correct_answer: entry.meaning.clone(),
                    hint,
                    grammar_focus: None,
                    level: entry.level,
                }
            }
        }
    }

    /// Pick the context sentence for a cloze question, or `None` if the entry has none.
    pub fn select_sentence<'e, R: Rng + ?Sized>(&self, entry: &'e VocabEntry, rng: &mut R) -> Option<&'e str> {
        if entry.sentences.is_empty() {
            return None;
        }
        let policy = &self.config.sentence;
        let advanced = Tier::from_level(entry.level) == Tier::Advanced;
        let min_len = if advanced { policy.min_len_advanced } else { policy.min_len_basic };
        let occurs_once = |s: &str| s.matches(entry.hanzi.as_str()).count() == 1;

        let survivors: Vec<&'e str> = entry
            .sentences
            .iter()
            .map(String::as_str)
            .filter(|s| s.chars().count() >= min_len)
            .filter(|s| occurs_once(s))
            .filter(|s| !advanced || !policy.science_blacklist.iter().any(|t| s.contains(t.as_str())))
            .collect();

        if !survivors.is_empty() {
            if !advanced {
                return survivors.choose(rng).copied();
            }
            let mut ranked: Vec<(i64, &'e str)> = survivors.iter().map(|s| (self.sentence_score(s), *s)).collect();
            // Stable: equal scores keep corpus order.
            ranked.sort_by(|a, b| b.0.cmp(&a.0));
            ranked.truncate(policy.top_band.max(1));
            return ranked.choose(rng).map(|(_, s)| *s);
        }

        // Relaxed: longest sentence with exactly one occurrence, first on ties.
        let relaxed = entry
            .sentences
            .iter()
            .map(String::as_str)
            .filter(|s| occurs_once(s))
            .rev()
            .max_by_key(|s| s.chars().count());
        if relaxed.is_none() {
            debug!(target: "exam", hanzi = %entry.hanzi, "No sentence passes filters; using first sentence");
        }
        relaxed.or_else(|| entry.sentences.first().map(String::as_str))
    }

    /// Complexity score used to rank advanced-tier sentences.
    pub fn sentence_score(&self, sentence: &str) -> i64 {
        let p = &self.config.sentence;
        let length = sentence.chars().count() as i64;
        let commas = sentence.chars().filter(|c| matches!(c, '，' | ',')).count() as i64;
        let colons = sentence.chars().filter(|c| matches!(c, '：' | '；' | ':' | ';')).count() as i64;
        let rhetoric = p.rhetorical_markers.iter().filter(|m| sentence.contains(m.as_str())).count() as i64;
        let register = p.register_triggers.iter().filter(|m| sentence.contains(m.as_str())).count() as i64;
        length
            + p.comma_weight * commas
            + p.colon_weight * colons
            + p.rhetoric_weight * rhetoric
            + p.register_weight * register
    }

    /// Free-response question asking for a grammar rule's structure.
    pub fn build_fill_in_blank(&self, rule: &GrammarRule) -> Question {
        Question {
            id: format!("FIB_{}", rule.name),
            kind: QuestionKind::FillInBlank,
            prompt: format!(
                "Complete the pattern for '{}': {}. Example: {}",
                rule.name, rule.description, rule.example
            ),
            options: Vec::new(),
            correct_answer: rule.structure.clone(),
            hint: Some(format!("Think about the structure: {}", rule.structure.replace(' ', " _ "))),
            grammar_focus: Some(rule.name.clone()),
            level: rule.level,
        }
    }

    /// Self-graded writing task for levels 5, 6 and 7-9.
    ///
    /// Level 5 composes around sampled words, level 6 writes a narrative and
    /// the advanced band argues a thesis around one topic word. `None` when
    /// the level has no writing section or the pool is too small.
    pub fn build_writing_prompt<R: Rng + ?Sized>(&self, level: u8, rng: &mut R) -> Option<Question> {
        let words: Vec<&VocabEntry> = self.pool.iter().filter(|w| w.level == level).collect();
        let (prompt, hint) = match level {
            5 => {
                let n = self.config.session.writing_composition_words;
                if n == 0 || words.len() < n {
                    return None;
                }
                let picked: Vec<&&VocabEntry> = words.choose_multiple(rng, n).collect();
                let hanzi: Vec<&str> = picked.iter().map(|w| w.hanzi.as_str()).collect();
                let readings: Vec<String> = picked.iter().map(|w| format!("{} ({})", w.hanzi, w.pinyin)).collect();
                (
                    format!("Write a short passage (about 80 characters) using these words: {}", hanzi.join("、")),
                    readings.join(", "),
                )
            }
            6 => {
                let topic = words.choose(rng)?;
                (
                    format!("Write a narrative essay (about 400 characters) centred on the topic: {}", topic.hanzi),
                    format!("{} ({}): {}", topic.hanzi, topic.pinyin, topic.meanings().next().unwrap_or(&topic.meaning)),
                )
            }
            7..=9 => {
                let topic = words.choose(rng)?;
                (
                    format!("Write an argumentative thesis (about 600 characters) on the topic: {}", topic.hanzi),
                    format!("{} ({}): {}", topic.hanzi, topic.pinyin, topic.meanings().next().unwrap_or(&topic.meaning)),
                )
            }
            _ => return None,
        };
        Some(Question {
            id: format!("WRITING_{}", level),
            kind: QuestionKind::OpenWriting,
            prompt,
            options: Vec::new(),
            correct_answer: String::new(),
            hint: Some(hint),
            grammar_focus: None,
            level,
        })
    }
}
