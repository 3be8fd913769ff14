//! Socket message formats.
//!
//! Outbound: `{"type":"frame","frame":<data URI>,"session_id":..,"serie_id":..}`
//! Inbound:  `{"type":"analysis","data":{reps,state,feedback,errors,metrics,landmarks}}`

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::api::{SeriesId, SessionId};

/// One sampled frame, ready for the socket. Produced once, sent at most once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FramePayload {
    /// `data:image/jpeg;base64,...`
    #[serde(rename = "frame")]
    pub image_data: String,
    pub session_id: SessionId,
    #[serde(rename = "serie_id")]
    pub series_id: SeriesId,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Outbound<'a> {
    Frame(&'a FramePayload),
}

/// Serialize a frame payload into its socket text form.
pub fn encode_frame(payload: &FramePayload) -> Result<String, serde_json::Error> {
    serde_json::to_string(&Outbound::Frame(payload))
}

/// Squat phase reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PostureState {
    #[default]
    Up,
    Down,
}

impl fmt::Display for PostureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostureState::Up => f.write_str("UP"),
            PostureState::Down => f.write_str("DOWN"),
        }
    }
}

/// A normalized body-joint position with its detection confidence.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub visibility: f32,
}

/// The latest feedback from the service. Always replaced whole, never merged.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct AnalysisSnapshot {
    #[serde(rename = "reps", default)]
    pub repetitions: u32,
    #[serde(rename = "state", default)]
    pub posture: PostureState,
    #[serde(rename = "feedback", default)]
    pub feedback_messages: Vec<String>,
    #[serde(rename = "errors", default)]
    pub error_messages: Vec<String>,
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
    /// Positional joint schema; `None` marks a joint the service did not detect.
    #[serde(default)]
    pub landmarks: Vec<Option<Landmark>>,
}

impl AnalysisSnapshot {
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Inbound {
    Analysis {
        #[serde(default)]
        data: Option<AnalysisSnapshot>,
    },
    #[serde(other)]
    Other,
}

/// Decode an inbound socket message.
///
/// Returns `Ok(None)` for well-formed messages that carry no analysis
/// (other kinds, or an analysis without `data`).
pub fn decode_inbound(text: &str) -> Result<Option<AnalysisSnapshot>, serde_json::Error> {
    match serde_json::from_str::<Inbound>(text)? {
        Inbound::Analysis { data } => Ok(data),
        Inbound::Other => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::RemoteId;

    #[test]
    fn test_encode_frame_shape() {
        let payload = FramePayload {
            image_data: "data:image/jpeg;base64,AAAA".to_string(),
            session_id: SessionId(RemoteId::Number(3)),
            series_id: SeriesId(RemoteId::Number(9)),
        };
        let value: serde_json::Value =
            serde_json::from_str(&encode_frame(&payload).unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "type": "frame",
                "frame": "data:image/jpeg;base64,AAAA",
                "session_id": 3,
                "serie_id": 9
            })
        );
    }

    #[test]
    fn test_decode_full_analysis() {
        let text = r#"{"type":"analysis","data":{
            "reps":4,"state":"DOWN",
            "feedback":["Baja más"],"errors":["Rodillas hacia dentro"],
            "metrics":{"knee_angle":91.5,"knee_valgus_L":3.0},
            "landmarks":[null,{"x":0.5,"y":0.25,"visibility":0.9}]
        }}"#;
        let snapshot = decode_inbound(text).unwrap().unwrap();
        assert_eq!(snapshot.repetitions, 4);
        assert_eq!(snapshot.posture, PostureState::Down);
        assert_eq!(snapshot.feedback_messages, vec!["Baja más".to_string()]);
        assert_eq!(snapshot.error_messages.len(), 1);
        assert_eq!(snapshot.metric("knee_angle"), Some(91.5));
        assert_eq!(snapshot.landmarks.len(), 2);
        assert!(snapshot.landmarks[0].is_none());
        assert_eq!(snapshot.landmarks[1].unwrap().visibility, 0.9);
    }

    #[test]
    fn test_decode_defaults_missing_fields() {
        let snapshot = decode_inbound(r#"{"type":"analysis","data":{}}"#)
            .unwrap()
            .unwrap();
        assert_eq!(snapshot, AnalysisSnapshot::default());
        assert_eq!(snapshot.posture, PostureState::Up);
    }

    #[test]
    fn test_decode_landmark_without_visibility() {
        let snapshot =
            decode_inbound(r#"{"type":"analysis","data":{"landmarks":[{"x":0.1,"y":0.2}]}}"#)
                .unwrap()
                .unwrap();
        assert_eq!(snapshot.landmarks[0].unwrap().visibility, 0.0);
    }

    #[test]
    fn test_decode_ignores_other_kinds() {
        assert!(decode_inbound(r#"{"type":"pong"}"#).unwrap().is_none());
        assert!(decode_inbound(r#"{"type":"analysis"}"#).unwrap().is_none());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_inbound("not json").is_err());
    }
}
