//! Client state projection: what the HUD shows.

use crate::transport::AnalysisSnapshot;

/// How a feedback line should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackTone {
    /// The service confirmed good form.
    Positive,
    Advice,
}

/// Classify a feedback message. The service marks praise with ✅.
pub fn feedback_tone(message: &str) -> FeedbackTone {
    if message.contains('✅') {
        FeedbackTone::Positive
    } else {
        FeedbackTone::Advice
    }
}

/// Latest analysis plus whether a session is running.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientState {
    pub active: bool,
    pub snapshot: AnalysisSnapshot,
}

impl ClientState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot. Last write wins; nothing is merged or accumulated.
    pub fn apply(&mut self, snapshot: AnalysisSnapshot) {
        self.snapshot = snapshot;
    }

    /// Back to 0 reps, UP, no messages, no metrics.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn repetitions(&self) -> u32 {
        self.snapshot.repetitions
    }
}
