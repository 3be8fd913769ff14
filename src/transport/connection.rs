//! The persistent analysis socket.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use super::protocol::{decode_inbound, encode_frame, AnalysisSnapshot, FramePayload};
use super::state::{ConnectionState, SharedState};

/// Frames waiting for the socket writer. Anything beyond this is dropped
/// rather than queued, so the service never sees stale frames.
const OUTBOUND_CAPACITY: usize = 2;

/// Default socket base; the user id is appended as the last path segment.
pub const DEFAULT_WS_BASE_URL: &str = "ws://localhost:8000/analysis/ws";

/// Lifecycle and message notifications from a transport.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Connecting -> Open. Fires at most once per transport.
    Opened,
    /// A decoded analysis message.
    Analysis(AnalysisSnapshot),
    /// Connect failure or socket error. A `Closed` always follows.
    Error(String),
    /// The transport reached Closed. Fires exactly once per transport.
    Closed,
}

/// Receiver for [`TransportEvent`]s, called from the connection task.
pub type EventHandler = Arc<dyn Fn(TransportEvent) + Send + Sync>;

/// Something that can say whether frames may be sent right now.
pub trait LinkState {
    fn is_open(&self) -> bool;
}

/// Build the socket endpoint for a user.
pub fn endpoint_for(ws_base_url: &str, user_id: &str) -> String {
    format!("{}/{}", ws_base_url.trim_end_matches('/'), user_id)
}

/// Cloneable sending side of a transport, handed to the frame sampler.
#[derive(Debug, Clone)]
pub struct TransportHandle {
    state: SharedState,
    outbound: mpsc::Sender<String>,
}

impl TransportHandle {
    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Queue a frame for the socket.
    ///
    /// Only valid while Open. Outside Open, or when the writer is still busy
    /// with earlier frames, the frame is dropped and `false` is returned. This
    /// never fails loudly: the open/close race between the sampler's gate check
    /// and this call is expected.
    pub fn send(&self, payload: &FramePayload) -> bool {
        let state = self.state.get();
        if state != ConnectionState::Open {
            log::debug!("Dropping frame: transport is {}", state);
            return false;
        }

        let text = match encode_frame(payload) {
            Ok(text) => text,
            Err(e) => {
                log::warn!("Dropping frame: encode failed: {}", e);
                return false;
            }
        };

        match self.outbound.try_send(text) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                log::debug!("Dropping frame: socket writer busy");
                false
            }
            Err(TrySendError::Closed(_)) => {
                log::debug!("Dropping frame: socket writer gone");
                false
            }
        }
    }
}

impl LinkState for TransportHandle {
    fn is_open(&self) -> bool {
        self.state.get() == ConnectionState::Open
    }
}

/// One socket connection. Never reconnects; a new run builds a new instance.
pub struct StreamingTransport {
    endpoint: String,
    handle: TransportHandle,
    cancel: CancellationToken,
    closed: Notifier,
}

impl std::fmt::Debug for StreamingTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingTransport")
            .field("endpoint", &self.endpoint)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl StreamingTransport {
    /// Start connecting to `endpoint`. Must be called inside a tokio runtime.
    ///
    /// Returns immediately in the Connecting state; progress is reported
    /// through `handler`.
    pub fn open(endpoint: impl Into<String>, handler: EventHandler) -> Self {
        let endpoint = endpoint.into();
        let state = SharedState::new();
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let cancel = CancellationToken::new();
        let closed = Notifier::new(handler.clone());

        log::info!("Connecting to {}", endpoint);
        tokio::spawn(run_connection(
            endpoint.clone(),
            state.clone(),
            handler,
            closed.clone(),
            outbound_rx,
            cancel.clone(),
        ));

        Self {
            endpoint,
            handle: TransportHandle {
                state,
                outbound: outbound_tx,
            },
            cancel,
            closed,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn state(&self) -> ConnectionState {
        self.handle.state()
    }

    pub fn handle(&self) -> TransportHandle {
        self.handle.clone()
    }

    /// Send a frame; see [`TransportHandle::send`].
    pub fn send(&self, payload: &FramePayload) -> bool {
        self.handle.send(payload)
    }

    /// Move to Closed from any state. Idempotent; `Closed` is emitted once.
    pub fn close(&self) {
        if self.handle.state.transition(ConnectionState::Closed) {
            log::info!("Closing connection to {}", self.endpoint);
        }
        self.cancel.cancel();
        self.closed.notify();
    }
}

impl LinkState for StreamingTransport {
    fn is_open(&self) -> bool {
        self.handle.is_open()
    }
}

impl Drop for StreamingTransport {
    fn drop(&mut self) {
        self.close();
    }
}

/// Emits `Closed` exactly once, whichever side gets there first.
#[derive(Clone)]
struct Notifier {
    fired: Arc<AtomicBool>,
    handler: EventHandler,
}

impl Notifier {
    fn new(handler: EventHandler) -> Self {
        Self {
            fired: Arc::new(AtomicBool::new(false)),
            handler,
        }
    }

    fn notify(&self) {
        if !self.fired.swap(true, Ordering::SeqCst) {
            (self.handler)(TransportEvent::Closed);
        }
    }
}

async fn run_connection(
    endpoint: String,
    state: SharedState,
    handler: EventHandler,
    closed: Notifier,
    mut outbound: mpsc::Receiver<String>,
    cancel: CancellationToken,
) {
    let connected = tokio::select! {
        result = tokio_tungstenite::connect_async(endpoint.as_str()) => result,
        _ = cancel.cancelled() => {
            log::debug!("Connect to {} abandoned", endpoint);
            return;
        }
    };

    let ws = match connected {
        Ok((ws, _response)) => ws,
        Err(e) => {
            log::warn!("Socket connect failed: {}", e);
            if state.transition(ConnectionState::Closed) {
                handler(TransportEvent::Error(e.to_string()));
            }
            closed.notify();
            return;
        }
    };

    let (mut sink, mut stream) = ws.split();

    if !state.transition(ConnectionState::Open) {
        // close() won the race while the handshake was in flight
        let _ = sink.send(Message::Close(None)).await;
        return;
    }
    log::info!("Socket open: {}", endpoint);
    handler(TransportEvent::Opened);

    let mut sent: u64 = 0;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
            next = outbound.recv() => {
                let Some(text) = next else { break };
                if let Err(e) = sink.send(Message::Text(text.into())).await {
                    log::warn!("Socket send failed: {}", e);
                    if state.transition(ConnectionState::Closed) {
                        handler(TransportEvent::Error(e.to_string()));
                    }
                    break;
                }
                sent += 1;
                if sent % 30 == 0 {
                    log::debug!("Frame #{} sent", sent);
                }
            }
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Text(text))) => match decode_inbound(text.as_str()) {
                    Ok(Some(snapshot)) => handler(TransportEvent::Analysis(snapshot)),
                    Ok(None) => log::trace!("Ignoring non-analysis message"),
                    Err(e) => log::warn!("Unreadable socket message: {}", e),
                },
                Some(Ok(Message::Close(_))) | None => {
                    log::info!("Socket closed by server");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    log::warn!("Socket error: {}", e);
                    if state.transition(ConnectionState::Closed) {
                        handler(TransportEvent::Error(e.to_string()));
                    }
                    break;
                }
            }
        }
    }

    state.transition(ConnectionState::Closed);
    closed.notify();
}
