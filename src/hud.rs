//! Plain-text HUD for the training loop.

use crate::api::SessionSummary;
use crate::projection::{feedback_tone, ClientState, FeedbackTone};
use crate::transport::PostureState;

/// Format the one-line status shown after each analysis.
///
/// Format: " reps: N | ⬇ DOWN | knee 91.5° | trunk 12.0° | depth 45.0% | valgus 1.0/0.0 "
pub fn status_line(state: &ClientState) -> String {
    let snap = &state.snapshot;
    format!(
        " reps: {} | {} | knee {}° | trunk {}° | depth {:.1}% | valgus {}/{} ",
        snap.repetitions,
        posture_label(snap.posture),
        or_dashes(snap.metric("knee_angle")),
        or_dashes(snap.metric("trunk_lean")),
        snap.metric("depth_relative").unwrap_or(0.0) * 100.0,
        or_zero(snap.metric("knee_valgus_L")),
        or_zero(snap.metric("knee_valgus_R")),
    )
}

/// Feedback and error lines, one per message, prefixed by tone.
pub fn message_lines(state: &ClientState) -> Vec<String> {
    let snap = &state.snapshot;
    let feedback = snap.feedback_messages.iter().map(|m| match feedback_tone(m) {
        FeedbackTone::Positive => format!("  + {}", m),
        FeedbackTone::Advice => format!("  > {}", m),
    });
    let errors = snap.error_messages.iter().map(|m| format!("  ! {}", m));
    feedback.chain(errors).collect()
}

/// Shown in place of the status line while no frames are being analysed.
pub const INACTIVE_LINE: &str = " not streaming ";

/// Whole HUD block: status line followed by message lines.
///
/// Reps and posture are hidden unless the session is streaming.
pub fn render(state: &ClientState) -> String {
    let mut out = if state.active {
        status_line(state)
    } else {
        INACTIVE_LINE.to_string()
    };
    for line in message_lines(state) {
        out.push('\n');
        out.push_str(&line);
    }
    out
}

pub fn summary_block(summary: &SessionSummary) -> String {
    format!(
        "Session finished\n  total reps:    {}\n  good:          {}\n  bad:           {}\n  duration:      {} min\n  average score: {}%",
        summary.total_reps,
        summary.good_reps,
        summary.bad_reps,
        summary.duration_minutes,
        summary.average_score,
    )
}

fn posture_label(posture: PostureState) -> &'static str {
    match posture {
        PostureState::Up => "⬆ UP",
        PostureState::Down => "⬇ DOWN",
    }
}

fn or_dashes(value: Option<f64>) -> String {
    value.map_or_else(|| "---".to_string(), |v| format!("{:.1}", v))
}

fn or_zero(value: Option<f64>) -> String {
    format!("{:.1}", value.unwrap_or(0.0))
}
