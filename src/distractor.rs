//! Distractor selection: plausible wrong options for a target entry.
//!
//! Candidates must be parallel to the target (shared part of speech when the
//! target is tagged, same surface length), then are ranked with the target's
//! tier policy. Near-ties are broken at random so repeated sessions don't
//! always show the same trio. A sparse pool is padded with placeholders.

use std::collections::HashSet;

use rand::Rng;
use tracing::warn;

use crate::config::DistractorWeights;
use crate::domain::{Tier, VocabEntry};
use crate::util::{meaning_keywords, shared_char_count, shared_keyword_count};

/// What the options display, and therefore what is compared for uniqueness.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareBy {
    /// Options are hanzi (cloze questions).
    SurfaceForm,
    /// Options are English meanings (meaning-lookup questions).
    Meaning,
}

impl CompareBy {
    fn value_of(self, entry: &VocabEntry) -> &str {
        match self {
            CompareBy::SurfaceForm => &entry.hanzi,
            CompareBy::Meaning => &entry.meaning,
        }
    }

    fn placeholder(self, i: usize) -> String {
        match self {
            CompareBy::SurfaceForm => format!("Distractor{}", i),
            CompareBy::Meaning => format!("Meaning{}", i),
        }
    }
}

pub struct DistractorSelector<'a> {
    weights: &'a DistractorWeights,
}

impl<'a> DistractorSelector<'a> {
    pub fn new(weights: &'a DistractorWeights) -> Self {
        Self { weights }
    }

    /// Heuristic plausibility of `candidate` as a wrong answer for `target`.
    pub fn score(&self, target: &VocabEntry, target_keywords: &HashSet<String>, candidate: &VocabEntry) -> i64 {
        let w = self.weights;
        let keywords = shared_keyword_count(target_keywords, &meaning_keywords(&candidate.meaning)) as i64;
        match Tier::from_level(target.level) {
            Tier::Foundation => {
                let radical = candidate.radicals.iter().any(|r| target.radicals.contains(r));
                w.foundation_keyword * keywords + if radical { w.foundation_radical } else { 0 }
            }
            Tier::Proficiency => {
                let sibling = candidate.hanzi.chars().any(|c| target.hanzi.contains(c));
                w.proficiency_keyword * keywords + if sibling { w.proficiency_shared_char } else { 0 }
            }
            Tier::Advanced => {
                let shared = shared_char_count(&candidate.hanzi, &target.hanzi) as i64;
                let same_level = candidate.level == target.level;
                w.advanced_shared_char * shared
                    + w.advanced_keyword * keywords
                    + if same_level { w.advanced_same_level } else { 0 }
            }
        }
    }

    fn is_parallel(target: &VocabEntry, candidate: &VocabEntry) -> bool {
        let pos_ok = target.pos.is_empty() || candidate.pos.iter().any(|p| target.pos.contains(p));
        pos_ok && candidate.char_len() == target.char_len()
    }

    /// Exactly `count` distinct option strings, none equal to the target's own.
    pub fn select<R: Rng + ?Sized>(
        &self,
        target: &VocabEntry,
        pool: &[VocabEntry],
        count: usize,
        mode: CompareBy,
        rng: &mut R,
    ) -> Vec<String> {
        let target_value = mode.value_of(target);
        let target_keywords = meaning_keywords(&target.meaning);

        let mut seen: HashSet<&str> = HashSet::new();
        let mut scored: Vec<(i64, &str)> = pool
            .iter()
            .filter(|c| c.hanzi != target.hanzi && mode.value_of(*c) != target_value)
            .filter(|c| Self::is_parallel(target, c))
            .filter(|c| seen.insert(mode.value_of(*c)))
            .map(|c| (self.score(target, &target_keywords, c), mode.value_of(c)))
            .collect();

        let margin = self.weights.near_tie_margin.max(0);
        let mut out: Vec<String> = Vec::with_capacity(count);
        while out.len() < count && !scored.is_empty() {
            let top = scored.iter().map(|(s, _)| *s).max().unwrap_or(0);
            let band: Vec<usize> = scored
                .iter()
                .enumerate()
                .filter(|(_, (s, _))| *s >= top - margin)
                .map(|(i, _)| i)
                .collect();
            let pick = band[rng.gen_range(0..band.len())];
            let (_, value) = scored.swap_remove(pick);
            out.push(value.to_string());
        }

        if out.len() < count {
            warn!(target: "exam", hanzi = %target.hanzi, found = out.len(), count, "Sparse corpus: padding distractors with placeholders");
            let mut i = 0;
            while out.len() < count {
                let filler = mode.placeholder(i);
                if filler != target_value && !out.contains(&filler) {
                    out.push(filler);
                }
                i += 1;
            }
        }
        out
    }
}
