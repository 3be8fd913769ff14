//! Wire types for the analysis REST API.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A server-assigned identifier.
///
/// The backend may hand out numeric or string ids; whichever it sends is echoed
/// back unchanged in URLs and socket messages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RemoteId {
    Number(i64),
    Text(String),
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteId::Number(n) => write!(f, "{}", n),
            RemoteId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RemoteId {
    fn from(n: i64) -> Self {
        RemoteId::Number(n)
    }
}

impl From<&str> for RemoteId {
    fn from(s: &str) -> Self {
        RemoteId::Text(s.to_string())
    }
}

/// One continuous training visit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub RemoteId);

/// A contiguous capture run inside a session ("serie" on the wire).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeriesId(pub RemoteId);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Response from `POST /session/start`.
#[derive(Debug, Deserialize)]
pub(crate) struct SessionStarted {
    pub session_id: SessionId,
}

/// Response from `POST /serie/start`.
#[derive(Debug, Deserialize)]
pub(crate) struct SeriesStarted {
    pub serie_id: SeriesId,
}

/// Aggregate returned when a session is closed.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct SessionSummary {
    #[serde(rename = "total_repeticiones", default)]
    pub total_reps: u32,
    #[serde(rename = "correctas", default)]
    pub good_reps: u32,
    #[serde(rename = "incorrectas", default)]
    pub bad_reps: u32,
    #[serde(rename = "duracion_minutos", default)]
    pub duration_minutes: f64,
    #[serde(rename = "score_promedio", default)]
    pub average_score: f64,
}
