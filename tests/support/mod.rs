//! Shared fixtures for session integration tests: a scripted capture source,
//! a local socket server, identity files and the REST mocks.

#![allow(dead_code)]

use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use squat_coach::api::AnalysisClient;
use squat_coach::camera::{
    CameraError, CaptureSource, CaptureState, Frame, FrameFeed, Readiness, Resolution,
};
use squat_coach::identity::IdentityCache;
use squat_coach::sampler::SamplerOptions;
use squat_coach::session::{Notice, SessionEvent, SessionManager, SessionOptions};
use tempfile::NamedTempFile;
use tokio::net::TcpListener;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Capture source that becomes ready immediately, or fails as scripted.
pub struct FakeCapture {
    pub probe_error: Option<CameraError>,
    /// Returned (once) through the readiness of the next acquire.
    pub acquire_error: Option<CameraError>,
    pub resolution: Resolution,
    pub acquires: usize,
    pub releases: usize,
    state: CaptureState,
    feed: FrameFeed,
}

impl FakeCapture {
    pub fn new() -> Self {
        Self {
            probe_error: None,
            acquire_error: None,
            resolution: Resolution {
                width: 64,
                height: 48,
            },
            acquires: 0,
            releases: 0,
            state: CaptureState::Released,
            feed: FrameFeed::new(),
        }
    }

    pub fn rejecting(error: CameraError) -> Self {
        Self {
            probe_error: Some(error),
            ..Self::new()
        }
    }
}

impl CaptureSource for FakeCapture {
    fn probe(&self) -> Result<(), CameraError> {
        match &self.probe_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn acquire(&mut self) -> Result<Readiness, CameraError> {
        match self.state {
            CaptureState::Acquiring => return Err(CameraError::AcquisitionPending),
            CaptureState::Ready => return Err(CameraError::AlreadyRunning),
            CaptureState::Released => {}
        }
        self.acquires += 1;

        let (tx, rx) = oneshot::channel();
        if let Some(e) = self.acquire_error.take() {
            let _ = tx.send(Err(e));
        } else {
            self.state = CaptureState::Ready;
            self.feed.publish(Frame::solid(
                self.resolution.width,
                self.resolution.height,
                [120, 90, 60],
            ));
            let _ = tx.send(Ok(self.resolution));
        }
        Ok(rx)
    }

    fn release(&mut self) {
        self.releases += 1;
        self.state = CaptureState::Released;
        self.feed.clear();
    }

    fn feed(&self) -> FrameFeed {
        self.feed.clone()
    }

    fn state(&self) -> CaptureState {
        self.state
    }
}

/// Identity cache file for `user_json` (the value of the `user` key).
pub fn identity_file(user_json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, r#"{{"token":"test-token","user":{}}}"#, user_json).unwrap();
    file
}

/// Local socket server. Sends `script` right after the handshake, then
/// records every text message it receives.
pub struct WsServer {
    pub base_url: String,
    pub received: Arc<Mutex<Vec<serde_json::Value>>>,
    pub connections: Arc<AtomicUsize>,
}

impl WsServer {
    pub async fn start(script: Vec<String>) -> Self {
        Self::start_with(script, None).await
    }

    /// Like `start`, but the server closes the socket after receiving
    /// `close_after` frames.
    pub async fn start_with(script: Vec<String>, close_after: Option<usize>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let received = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicUsize::new(0));

        let sink = Arc::clone(&received);
        let count = Arc::clone(&connections);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                count.fetch_add(1, Ordering::SeqCst);
                let script = script.clone();
                let sink = Arc::clone(&sink);
                tokio::spawn(async move {
                    let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                        return;
                    };
                    for text in script {
                        if ws.send(Message::Text(text.into())).await.is_err() {
                            return;
                        }
                    }
                    let mut seen = 0;
                    while let Some(Ok(msg)) = ws.next().await {
                        match msg {
                            Message::Text(text) => {
                                if let Ok(value) = serde_json::from_str(text.as_str()) {
                                    sink.lock().unwrap().push(value);
                                }
                                seen += 1;
                                if close_after == Some(seen) {
                                    let _ = ws.close(None).await;
                                    return;
                                }
                            }
                            Message::Close(_) => return,
                            _ => {}
                        }
                    }
                });
            }
        });

        Self {
            base_url: format!("ws://{}/analysis/ws", addr),
            received,
            connections,
        }
    }

    pub fn frames(&self) -> Vec<serde_json::Value> {
        self.received.lock().unwrap().clone()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

/// A listener that accepts TCP connections but never answers the handshake,
/// so the client stays in Connecting.
pub async fn silent_ws_base() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });
    format!("ws://{}/analysis/ws", addr)
}

/// One analysis message as the service sends it.
pub fn analysis_message(reps: u32, landmarks: serde_json::Value) -> String {
    serde_json::json!({
        "type": "analysis",
        "data": {
            "reps": reps,
            "state": "DOWN",
            "feedback": ["Baja más"],
            "errors": [],
            "metrics": {"knee_angle": 95.0},
            "landmarks": landmarks
        }
    })
    .to_string()
}

/// Landmark list with only the left knee (index 25) visible.
pub fn knee_only_landmarks() -> serde_json::Value {
    let mut list = vec![serde_json::Value::Null; 33];
    list[25] = serde_json::json!({"x": 0.5, "y": 0.5, "visibility": 0.95});
    serde_json::Value::Array(list)
}

/// Expected call counts for the four REST endpoints.
pub struct Calls {
    pub session_start: u64,
    pub series_start: u64,
    pub series_end: u64,
    pub session_end: u64,
}

impl Calls {
    pub const FULL: Calls = Calls {
        session_start: 1,
        series_start: 1,
        series_end: 1,
        session_end: 1,
    };

    pub const NONE: Calls = Calls {
        session_start: 0,
        series_start: 0,
        series_end: 0,
        session_end: 0,
    };
}

/// Mount the session/series endpoints (session 41, series 7) with exact
/// call expectations, verified when the server drops.
pub async fn mount_api(server: &MockServer, calls: Calls) {
    Mock::given(method("POST"))
        .and(path("/session/start"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"session_id": 41})),
        )
        .expect(calls.session_start)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/serie/start"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"serie_id": 7})),
        )
        .expect(calls.series_start)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/serie/7/end"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .expect(calls.series_end)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/session/41/end"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "total_repeticiones": 2,
            "correctas": 1,
            "incorrectas": 1,
            "duracion_minutos": 0.5,
            "score_promedio": 75.0
        })))
        .expect(calls.session_end)
        .mount(server)
        .await;
}

pub fn fast_sampler() -> SamplerOptions {
    SamplerOptions {
        interval: Duration::from_millis(50),
        settle: Duration::from_millis(20),
        target: Resolution {
            width: 32,
            height: 24,
        },
        jpeg_quality: 50,
    }
}

pub fn manager(
    api_uri: &str,
    ws_base_url: &str,
    identity: &Path,
    capture: FakeCapture,
) -> (SessionManager<FakeCapture>, UnboundedReceiver<SessionEvent>) {
    let api = AnalysisClient::new(api_uri, "test-token").unwrap();
    let options = SessionOptions {
        ws_base_url: ws_base_url.to_string(),
        sampler: fast_sampler(),
    };
    SessionManager::new(api, IdentityCache::new(identity), capture, options)
}

/// Feed events to the manager until `done` holds, collecting notices.
/// Panics after five seconds.
pub async fn pump_until<F>(
    manager: &mut SessionManager<FakeCapture>,
    events: &mut UnboundedReceiver<SessionEvent>,
    mut done: F,
) -> Vec<Notice>
where
    F: FnMut(&SessionManager<FakeCapture>, &[Notice]) -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    let mut notices = Vec::new();
    while !done(manager, &notices) {
        let event = tokio::time::timeout_at(deadline, events.recv())
            .await
            .expect("timed out waiting for session events")
            .expect("event channel closed");
        if let Some(notice) = manager.handle_event(event) {
            notices.push(notice);
        }
    }
    notices
}

/// Wait (without feeding events) until `cond` holds. Panics after five seconds.
pub async fn wait_for<F: FnMut() -> bool>(mut cond: F) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for condition"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
