use std::sync::Arc;
use std::time::Duration;
use rand::Rng;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinSet;
use tokio::time::Instant;

use super::{prompt_phrase, AnswerOutcome, QuizPhase, QuizSession, QuizSnapshot};
use crate::speech::{SpeechNotice, SpeechPipeline};

/// Input from the quiz screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizCommand {
    /// Pick the option at this position (0-based)
    Answer(usize),
    /// Hear the current prompt again
    Replay,
    Quit,
}

/// Output to the quiz screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuizUpdate {
    RoundStarted { snapshot: QuizSnapshot },
    Resolved { outcome: AnswerOutcome, snapshot: QuizSnapshot },
    Notice { notice: SpeechNotice },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizTiming {
    /// Gap between showing a round and speaking its prompt
    pub prompt_delay: Duration,
    /// Gap between an answer and the next round
    pub advance_delay: Duration,
}

impl Default for QuizTiming {
    fn default() -> Self {
        Self {
            prompt_delay: Duration::from_millis(500),
            advance_delay: Duration::from_millis(2000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuizSummary {
    pub score: u32,
    pub total: u32,
}

/// Deadlines owned by the controller; dropping them cancels them
#[derive(Debug, Default)]
struct PendingTimers {
    prompt_at: Option<Instant>,
    advance_at: Option<Instant>,
}

impl PendingTimers {
    fn cancel_all(&mut self) {
        self.prompt_at = None;
        self.advance_at = None;
    }
}

/// Drives one quiz screen. The session is owned here and only touched from
/// this loop, one event at a time; speech runs on spawned tasks so a slow
/// network call never holds up scoring or round changes.
pub struct QuizController<R> {
    session: QuizSession<R>,
    speech: Arc<SpeechPipeline>,
    timing: QuizTiming,
    timers: PendingTimers,
    speech_tasks: JoinSet<bool>,
    updates: mpsc::UnboundedSender<QuizUpdate>,
}

impl<R: Rng> QuizController<R> {
    pub fn new(
        session: QuizSession<R>,
        speech: Arc<SpeechPipeline>,
        timing: QuizTiming,
        updates: mpsc::UnboundedSender<QuizUpdate>,
    ) -> Self {
        Self {
            session,
            speech,
            timing,
            timers: PendingTimers::default(),
            speech_tasks: JoinSet::new(),
            updates,
        }
    }

    /// Run until `Quit` or until the command channel closes
    pub async fn run(mut self, mut commands: mpsc::Receiver<QuizCommand>) -> QuizSummary {
        let mut notices = self.speech.subscribe();
        let mut notices_open = true;

        self.start_round();

        loop {
            tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(QuizCommand::Answer(index)) => self.answer(index),
                    Some(QuizCommand::Replay) => self.replay(),
                    Some(QuizCommand::Quit) | None => break,
                },
                _ = sleep_until(self.timers.prompt_at) => {
                    self.timers.prompt_at = None;
                    self.speak_prompt();
                }
                _ = sleep_until(self.timers.advance_at) => {
                    self.timers.advance_at = None;
                    self.start_round();
                }
                Some(joined) = self.speech_tasks.join_next(), if !self.speech_tasks.is_empty() => {
                    if let Err(e) = joined {
                        tracing::warn!("Speech task ended abnormally: {}", e);
                    }
                }
                notice = notices.recv(), if notices_open => match notice {
                    Ok(notice) => self.publish(QuizUpdate::Notice { notice }),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::debug!("Dropped {} speech notices", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => notices_open = false,
                },
            }
        }

        self.teardown();
        let summary = QuizSummary {
            score: self.session.score(),
            total: self.session.total(),
        };
        tracing::info!("Quiz finished: {}/{}", summary.score, summary.total);
        summary
    }

    fn start_round(&mut self) {
        let target = self.session.next_round().target().glyph;
        tracing::debug!("New round, target {}", target);
        self.timers.prompt_at = Some(Instant::now() + self.timing.prompt_delay);
        self.publish(QuizUpdate::RoundStarted {
            snapshot: self.session.snapshot(),
        });
    }

    fn answer(&mut self, index: usize) {
        let Some(selected) = self
            .session
            .round()
            .and_then(|r| r.candidates().get(index).copied())
        else {
            tracing::debug!("Ignoring answer {}: no such option", index);
            return;
        };

        let Some(outcome) = self.session.submit_answer(&selected) else {
            return;
        };

        // A prompt that has not started yet would now give the answer away
        self.timers.prompt_at = None;
        self.timers.advance_at = Some(Instant::now() + self.timing.advance_delay);
        self.say(outcome.feedback_phrase());
        self.publish(QuizUpdate::Resolved {
            outcome,
            snapshot: self.session.snapshot(),
        });
    }

    fn replay(&mut self) {
        if self.session.phase() == QuizPhase::RoundActive {
            // Stands in for a prompt that has not played yet
            self.timers.prompt_at = None;
            self.speak_prompt();
        }
    }

    fn speak_prompt(&mut self) {
        if let Some(round) = self.session.round() {
            let phrase = prompt_phrase(round.target());
            self.say(phrase);
        }
    }

    fn say(&mut self, text: String) {
        let speech = Arc::clone(&self.speech);
        self.speech_tasks.spawn(async move { speech.speak(&text).await });
    }

    fn publish(&self, update: QuizUpdate) {
        // The screen may already be gone
        let _ = self.updates.send(update);
    }

    fn teardown(&mut self) {
        self.timers.cancel_all();
        self.speech_tasks.abort_all();
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
