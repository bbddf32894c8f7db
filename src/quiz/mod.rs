pub mod controller;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use thiserror::Error;

use crate::catalog::Letter;

pub use controller::{QuizCommand, QuizController, QuizSummary, QuizTiming, QuizUpdate};

/// Options shown per round: the target plus two distractors
pub const ROUND_SIZE: usize = 3;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuizError {
    #[error("quiz needs at least 3 distinct letters, got {0}")]
    CatalogTooSmall(usize),
}

/// One question: which of these three is the letter you heard?
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizRound {
    target: Letter,
    candidates: [Letter; ROUND_SIZE],
}

impl QuizRound {
    pub fn target(&self) -> &Letter {
        &self.target
    }

    pub fn candidates(&self) -> &[Letter; ROUND_SIZE] {
        &self.candidates
    }

    pub fn position_of(&self, glyph: &str) -> Option<usize> {
        self.candidates.iter().position(|c| c.glyph == glyph)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Correctness {
    #[default]
    Unknown,
    Correct,
    Incorrect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizPhase {
    NoRound,
    RoundActive,
    RoundResolved,
}

/// Result of the single scored answer of a round
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerOutcome {
    pub correct: bool,
    pub selected: Letter,
    pub target: Letter,
    pub score: u32,
    pub total: u32,
}

impl AnswerOutcome {
    /// What to say back to the learner
    pub fn feedback_phrase(&self) -> String {
        if self.correct {
            "Correct! Very good.".to_string()
        } else {
            format!("Oops. That was {}. Try again.", self.target.transliteration)
        }
    }
}

/// What is spoken when a round starts or the learner asks to hear it again
pub fn prompt_phrase(target: &Letter) -> String {
    format!("Identify the letter {}", target.glyph)
}

/// Read-only view handed to front-ends
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizSnapshot {
    pub phase: QuizPhase,
    pub round: Option<QuizRound>,
    pub correctness: Correctness,
    pub score: u32,
    pub total: u32,
}

/// Score keeping and round generation. All randomness comes from `rng`.
pub struct QuizSession<R> {
    pool: Vec<Letter>,
    rng: R,
    score: u32,
    total: u32,
    round: Option<QuizRound>,
    correctness: Correctness,
}

impl<R: Rng> QuizSession<R> {
    pub fn new(pool: Vec<Letter>, rng: R) -> Result<Self, QuizError> {
        let mut glyphs: Vec<&str> = pool.iter().map(|l| l.glyph).collect();
        glyphs.sort_unstable();
        glyphs.dedup();
        if glyphs.len() < ROUND_SIZE {
            return Err(QuizError::CatalogTooSmall(glyphs.len()));
        }

        Ok(Self {
            pool,
            rng,
            score: 0,
            total: 0,
            round: None,
            correctness: Correctness::Unknown,
        })
    }

    pub fn phase(&self) -> QuizPhase {
        match (&self.round, self.correctness) {
            (None, _) => QuizPhase::NoRound,
            (Some(_), Correctness::Unknown) => QuizPhase::RoundActive,
            (Some(_), _) => QuizPhase::RoundResolved,
        }
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn round(&self) -> Option<&QuizRound> {
        self.round.as_ref()
    }

    pub fn correctness(&self) -> Correctness {
        self.correctness
    }

    /// Replace the current round with a fresh one
    pub fn next_round(&mut self) -> &QuizRound {
        let target = self.pick();

        let mut distractors: Vec<Letter> = Vec::with_capacity(ROUND_SIZE - 1);
        while distractors.len() < ROUND_SIZE - 1 {
            let candidate = self.pick();
            if candidate.glyph != target.glyph && distractors.iter().all(|d| d.glyph != candidate.glyph) {
                distractors.push(candidate);
            }
        }

        let mut candidates = [target, distractors[0], distractors[1]];
        candidates.shuffle(&mut self.rng);

        self.correctness = Correctness::Unknown;
        self.round.insert(QuizRound { target, candidates })
    }

    /// Score an answer. Returns `None` when there is nothing to score: no round,
    /// the round is already resolved, or `selected` is not one of the options.
    pub fn submit_answer(&mut self, selected: &Letter) -> Option<AnswerOutcome> {
        if self.correctness != Correctness::Unknown {
            return None;
        }
        let round = self.round.as_ref()?;
        if round.position_of(selected.glyph).is_none() {
            tracing::warn!("Ignoring answer '{}': not an option this round", selected.glyph);
            return None;
        }

        let target = round.target;
        let correct = selected.glyph == target.glyph;
        self.total += 1;
        if correct {
            self.score += 1;
        }
        self.correctness = if correct { Correctness::Correct } else { Correctness::Incorrect };

        Some(AnswerOutcome {
            correct,
            selected: *selected,
            target,
            score: self.score,
            total: self.total,
        })
    }

    pub fn snapshot(&self) -> QuizSnapshot {
        QuizSnapshot {
            phase: self.phase(),
            round: self.round.clone(),
            correctness: self.correctness,
            score: self.score,
            total: self.total,
        }
    }

    fn pick(&mut self) -> Letter {
        self.pool[self.rng.random_range(0..self.pool.len())]
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::catalog::{self, find_letter};

    fn small_pool() -> Vec<Letter> {
        ["அ", "க", "ங"].iter().map(|g| find_letter(g).unwrap()).collect()
    }

    fn session(seed: u64) -> QuizSession<StdRng> {
        QuizSession::new(catalog::all_letters(), StdRng::seed_from_u64(seed)).unwrap()
    }

    fn wrong_option(round: &QuizRound) -> Letter {
        *round.candidates().iter().find(|c| c.glyph != round.target().glyph).unwrap()
    }

    #[test]
    fn rounds_have_three_distinct_options_including_target() {
        let mut quiz = session(7);
        for _ in 0..2000 {
            let round = quiz.next_round().clone();
            let glyphs: HashSet<&str> = round.candidates().iter().map(|c| c.glyph).collect();
            assert_eq!(glyphs.len(), ROUND_SIZE);
            assert!(glyphs.contains(round.target().glyph));
        }
    }

    #[test]
    fn too_small_catalog_is_rejected() {
        let mut pool = small_pool();
        pool.truncate(2);
        pool.push(pool[0]);
        let err = QuizSession::new(pool, StdRng::seed_from_u64(1)).err();
        assert_eq!(err, Some(QuizError::CatalogTooSmall(2)));
    }

    #[test]
    fn phases_follow_the_round_lifecycle() {
        let mut quiz = session(1);
        assert_eq!(quiz.phase(), QuizPhase::NoRound);
        assert!(quiz.submit_answer(&catalog::VOWELS[0]).is_none());

        let target = *quiz.next_round().target();
        assert_eq!(quiz.phase(), QuizPhase::RoundActive);
        assert_eq!(quiz.correctness(), Correctness::Unknown);

        quiz.submit_answer(&target).unwrap();
        assert_eq!(quiz.phase(), QuizPhase::RoundResolved);

        quiz.next_round();
        assert_eq!(quiz.phase(), QuizPhase::RoundActive);
        assert_eq!(quiz.correctness(), Correctness::Unknown);
    }

    #[test]
    fn correct_answer_scores_once() {
        let mut quiz = session(3);
        let target = *quiz.next_round().target();

        let outcome = quiz.submit_answer(&target).unwrap();
        assert!(outcome.correct);
        assert_eq!((quiz.score(), quiz.total()), (1, 1));
        assert_eq!(outcome.feedback_phrase(), "Correct! Very good.");

        // Second tap on a resolved round changes nothing
        assert!(quiz.submit_answer(&target).is_none());
        assert_eq!((quiz.score(), quiz.total()), (1, 1));
        assert_eq!(quiz.correctness(), Correctness::Correct);
    }

    #[test]
    fn wrong_answer_counts_but_does_not_score() {
        let mut quiz = session(11);
        let round = quiz.next_round().clone();
        let wrong = wrong_option(&round);

        let outcome = quiz.submit_answer(&wrong).unwrap();
        assert!(!outcome.correct);
        assert_eq!((quiz.score(), quiz.total()), (0, 1));
        assert_eq!(quiz.correctness(), Correctness::Incorrect);
        assert_eq!(
            outcome.feedback_phrase(),
            format!("Oops. That was {}. Try again.", round.target().transliteration)
        );

        assert!(quiz.submit_answer(round.target()).is_none());
        assert_eq!((quiz.score(), quiz.total()), (0, 1));
    }

    #[test]
    fn answers_outside_the_round_are_ignored() {
        let mut quiz = QuizSession::new(small_pool(), StdRng::seed_from_u64(5)).unwrap();
        quiz.next_round();
        let outsider = find_letter("ழ").unwrap();
        assert!(quiz.submit_answer(&outsider).is_none());
        assert_eq!(quiz.phase(), QuizPhase::RoundActive);
        assert_eq!(quiz.total(), 0);
    }

    #[test]
    fn same_seed_same_rounds() {
        let mut a = session(42);
        let mut b = session(42);
        for _ in 0..50 {
            assert_eq!(a.next_round(), b.next_round());
        }
    }

    #[test]
    fn orderings_of_a_three_letter_catalog_are_uniform() {
        let mut quiz = QuizSession::new(small_pool(), StdRng::seed_from_u64(2024)).unwrap();
        let rounds = 6000;
        let mut counts: HashMap<Vec<&str>, usize> = HashMap::new();
        for _ in 0..rounds {
            let round = quiz.next_round();
            let order: Vec<&str> = round.candidates().iter().map(|c| c.glyph).collect();
            *counts.entry(order).or_default() += 1;
        }

        assert_eq!(counts.len(), 6, "every permutation should appear");
        for (order, count) in counts {
            assert!((850..=1150).contains(&count), "{:?} appeared {} times", order, count);
        }
    }

    #[test]
    fn prompt_names_the_glyph() {
        assert_eq!(prompt_phrase(&find_letter("க").unwrap()), "Identify the letter க");
    }
}
