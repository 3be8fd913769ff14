//! SessionManager - orchestrates one training session end to end.
//!
//! Owns the remote session/series ids, the transport, the capture source and
//! the sampler, and decides when each may exist. Asynchronous completions come
//! back as [`SessionEvent`]s through the channel returned by [`SessionManager::new`]
//! and are fed to [`SessionManager::handle_event`] by the caller's loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::active::ActiveFlag;
use crate::api::AnalysisClient;
use crate::camera::{CameraError, CaptureSource, Resolution};
use crate::identity::IdentityCache;
use crate::overlay::OverlayRenderer;
use crate::projection::ClientState;
use crate::sampler::{FrameSampler, SamplerOptions, StreamIds};
use crate::transport::{
    endpoint_for, ConnectionState, EventHandler, StreamingTransport, TransportEvent,
    DEFAULT_WS_BASE_URL,
};

use super::error::SetupError;
use super::state::{LifecycleError, SessionState};
use super::unwind::{RemoteResource, StopReport, UnwindList};

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Socket base; the user id is appended.
    pub ws_base_url: String,
    pub sampler: SamplerOptions,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            ws_base_url: DEFAULT_WS_BASE_URL.to_string(),
            sampler: SamplerOptions::default(),
        }
    }
}

/// An asynchronous completion, tagged with the run that produced it.
#[derive(Debug)]
pub struct SessionEvent {
    pub run: u64,
    pub kind: EventKind,
}

#[derive(Debug)]
pub enum EventKind {
    Transport(TransportEvent),
    /// Camera negotiation finished. `attempt` tells retries apart.
    CaptureReady {
        attempt: u64,
        result: Result<Resolution, CameraError>,
    },
}

/// Something the user should hear about after an event was handled.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// Frames are flowing at the given camera resolution.
    Streaming(Resolution),
    /// The camera could not be acquired. The session stays up; retry is possible.
    CaptureFailed(CameraError),
    /// The projection and overlay were updated.
    Snapshot,
    /// The socket failed or closed. Sending has halted.
    ConnectionLost(Option<String>),
}

/// Cloneable way to ask an in-flight `start_training` to give up.
///
/// Checked after every suspension point of the start chain. A request made
/// while idle is discarded when the next start begins.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    requested: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.requested.store(false, Ordering::SeqCst);
    }
}

pub struct SessionManager<C: CaptureSource> {
    api: AnalysisClient,
    identity: IdentityCache,
    capture: C,
    options: SessionOptions,

    state: SessionState,
    flag: ActiveFlag,
    sampler: FrameSampler,
    transport: Option<StreamingTransport>,
    remote: UnwindList,
    ids: Option<StreamIds>,

    run: u64,
    capture_attempt: u64,
    link_lost: bool,
    events: UnboundedSender<SessionEvent>,
    stop: StopHandle,

    projection: ClientState,
    overlay: OverlayRenderer,
    video: Resolution,
}

impl<C: CaptureSource> SessionManager<C> {
    pub fn new(
        api: AnalysisClient,
        identity: IdentityCache,
        capture: C,
        options: SessionOptions,
    ) -> (Self, UnboundedReceiver<SessionEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let sampler = FrameSampler::new(options.sampler);
        let manager = Self {
            api,
            identity,
            capture,
            options,
            state: SessionState::Idle,
            flag: ActiveFlag::new(),
            sampler,
            transport: None,
            remote: UnwindList::new(),
            ids: None,
            run: 0,
            capture_attempt: 0,
            link_lost: false,
            events,
            stop: StopHandle::default(),
            projection: ClientState::new(),
            overlay: OverlayRenderer::new(),
            video: Resolution { width: 0, height: 0 },
        };
        (manager, rx)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn projection(&self) -> &ClientState {
        &self.projection
    }

    pub fn overlay(&self) -> &OverlayRenderer {
        &self.overlay
    }

    pub fn capture(&self) -> &C {
        &self.capture
    }

    pub fn is_active(&self) -> bool {
        self.flag.is_active()
    }

    pub fn is_sampling(&self) -> bool {
        self.sampler.is_running()
    }

    pub fn transport_state(&self) -> Option<ConnectionState> {
        self.transport.as_ref().map(StreamingTransport::state)
    }

    /// Id of the current (or last) run. Events from other runs are ignored.
    pub fn run(&self) -> u64 {
        self.run
    }

    /// Create the remote session and series and open the socket.
    ///
    /// On success the manager is Starting; it becomes Active once the socket
    /// opens (an `Opened` event). On any failure everything acquired so far is
    /// released, most recent first, and the manager is back to Idle.
    ///
    /// # Errors
    ///
    /// * `SetupError::NotIdle` - a session is already in progress
    /// * `SetupError::Device` - the camera is missing; no remote call was made
    /// * `SetupError::Api` / `SetupError::Identity` - a startup step failed
    /// * `SetupError::Cancelled` - a stop was requested through the [`StopHandle`]
    pub async fn start_training(&mut self) -> Result<(), SetupError> {
        if self.state != SessionState::Idle {
            return Err(SetupError::NotIdle(self.state));
        }
        self.stop.reset();
        self.transition(SessionState::Starting)?;
        self.run += 1;
        self.link_lost = false;
        log::info!("Starting training run #{}", self.run);

        match self.setup().await {
            Ok(()) => Ok(()),
            Err(e) => {
                log::warn!("Start failed: {}", e);
                self.teardown_local();
                let report = self.remote.release_all(&self.api).await;
                if !report.is_clean() {
                    log::warn!("{} remote cleanup call(s) failed", report.failures.len());
                }
                self.finish();
                Err(e)
            }
        }
    }

    async fn setup(&mut self) -> Result<(), SetupError> {
        self.capture.probe()?;
        self.check_stop()?;

        let session_id = self.api.start_session().await?;
        self.remote.push(RemoteResource::Session(session_id.clone()));
        self.check_stop()?;

        let series_id = self.api.start_series().await?;
        self.remote.push(RemoteResource::Series(series_id.clone()));
        self.check_stop()?;

        let user_id = self.identity.user_id()?;
        self.ids = Some(StreamIds {
            session_id,
            series_id,
        });

        let endpoint = endpoint_for(&self.options.ws_base_url, &user_id);
        self.transport = Some(StreamingTransport::open(endpoint, self.transport_handler()));
        self.check_stop()
    }

    fn check_stop(&self) -> Result<(), SetupError> {
        if self.stop.is_requested() {
            Err(SetupError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn transport_handler(&self) -> EventHandler {
        let events = self.events.clone();
        let run = self.run;
        Arc::new(move |event| {
            let _ = events.send(SessionEvent {
                run,
                kind: EventKind::Transport(event),
            });
        })
    }

    /// Apply one asynchronous completion.
    ///
    /// Events from an earlier run, or that make no sense in the current state,
    /// are dropped.
    pub fn handle_event(&mut self, event: SessionEvent) -> Option<Notice> {
        if event.run != self.run {
            log::debug!("Ignoring event from run #{}: {:?}", event.run, event.kind);
            return None;
        }

        match event.kind {
            EventKind::Transport(TransportEvent::Opened) => self.on_opened(),
            EventKind::Transport(TransportEvent::Analysis(snapshot)) => {
                if !self.state.is_live() {
                    return None;
                }
                self.overlay.render(&snapshot.landmarks, self.video);
                self.projection.apply(snapshot);
                Some(Notice::Snapshot)
            }
            EventKind::Transport(TransportEvent::Error(msg)) => self.on_link_lost(Some(msg)),
            EventKind::Transport(TransportEvent::Closed) => self.on_link_lost(None),
            EventKind::CaptureReady { attempt, result } => {
                if attempt != self.capture_attempt || self.state != SessionState::Active {
                    log::debug!("Ignoring stale capture result");
                    return None;
                }
                match result {
                    Ok(resolution) => self.on_capture_ready(resolution),
                    Err(e) => {
                        log::warn!("Camera acquisition failed: {}", e);
                        self.capture.release();
                        Some(Notice::CaptureFailed(e))
                    }
                }
            }
        }
    }

    fn on_opened(&mut self) -> Option<Notice> {
        if self.state != SessionState::Starting {
            return None;
        }
        if let Err(e) = self.transition(SessionState::Active) {
            log::warn!("{}", e);
            return None;
        }
        self.flag.set();
        self.projection.active = true;
        self.begin_capture().err().map(Notice::CaptureFailed)
    }

    fn on_capture_ready(&mut self, resolution: Resolution) -> Option<Notice> {
        if !self.flag.is_active() {
            log::debug!("Camera ready after the link went down; not sampling");
            return None;
        }
        let (Some(ids), Some(transport)) = (self.ids.clone(), self.transport.as_ref()) else {
            return None;
        };

        self.video = resolution;
        let link = transport.handle();
        let sender = transport.handle();
        self.sampler.start(
            self.flag.clone(),
            link,
            self.capture.feed(),
            ids,
            move |payload| {
                sender.send(&payload);
            },
        );
        log::info!("Streaming at {}", resolution);
        Some(Notice::Streaming(resolution))
    }

    fn on_link_lost(&mut self, reason: Option<String>) -> Option<Notice> {
        if !self.state.is_live() || self.link_lost {
            return None;
        }
        self.link_lost = true;
        self.flag.clear();
        self.projection.active = false;
        self.sampler.stop();
        match &reason {
            Some(msg) => log::warn!("Connection lost: {}", msg),
            None => log::info!("Connection closed"),
        }
        Some(Notice::ConnectionLost(reason))
    }

    /// Kick off camera negotiation; readiness comes back as a `CaptureReady` event.
    fn begin_capture(&mut self) -> Result<(), CameraError> {
        let readiness = self.capture.acquire()?;
        self.capture_attempt += 1;

        let events = self.events.clone();
        let run = self.run;
        let attempt = self.capture_attempt;
        tokio::spawn(async move {
            let result = readiness.await.unwrap_or_else(|_| {
                Err(CameraError::StreamFailed(
                    "capture thread exited before the first frame".to_string(),
                ))
            });
            let _ = events.send(SessionEvent {
                run,
                kind: EventKind::CaptureReady { attempt, result },
            });
        });
        Ok(())
    }

    /// Try the camera again after a failed acquisition.
    ///
    /// # Errors
    ///
    /// * `SetupError::NotActive` - no session is active
    /// * `SetupError::LinkDown` - the socket is gone; restart instead
    /// * `SetupError::Device` - the camera is busy or refused again
    pub fn retry_capture(&mut self) -> Result<(), SetupError> {
        if self.state != SessionState::Active {
            return Err(SetupError::NotActive(self.state));
        }
        if !self.flag.is_active() {
            return Err(SetupError::LinkDown);
        }
        log::info!("Retrying camera");
        Ok(self.begin_capture()?)
    }

    /// Tear the session down.
    ///
    /// Returns `None` when there is nothing to stop. Local resources are
    /// released first and unconditionally; the remote series and session are
    /// then ended best-effort, with any failure recorded in the report.
    pub async fn stop_training(&mut self) -> Option<StopReport> {
        if !self.state.is_live() {
            log::debug!("Stop ignored in {}", self.state);
            return None;
        }
        if let Err(e) = self.transition(SessionState::Stopping) {
            log::warn!("{}", e);
            return None;
        }

        self.teardown_local();
        let report = self.remote.release_all(&self.api).await;
        self.finish();
        Some(report)
    }

    /// Flag, sampler, transport, capture, overlay. In that order.
    fn teardown_local(&mut self) {
        self.flag.clear();
        self.sampler.stop();
        if let Some(transport) = self.transport.take() {
            transport.close();
        }
        self.capture.release();
        self.overlay.clear();
    }

    fn finish(&mut self) {
        self.ids = None;
        self.projection.reset();
        if let Err(e) = self.transition(SessionState::Idle) {
            log::warn!("{}; forcing IDLE", e);
            self.state = SessionState::Idle;
        }
    }

    fn transition(&mut self, next: SessionState) -> Result<(), LifecycleError> {
        if !self.state.can_transition_to(next) {
            return Err(LifecycleError::IllegalTransition {
                from: self.state,
                to: next,
            });
        }
        log::info!("Session {} -> {}", self.state, next);
        self.state = next;
        Ok(())
    }
}

impl<C: CaptureSource> Drop for SessionManager<C> {
    fn drop(&mut self) {
        if self.state != SessionState::Idle {
            log::warn!(
                "Session dropped while {}; remote session left open",
                self.state
            );
        }
        self.teardown_local();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_handle_request_and_reset() {
        let handle = StopHandle::default();
        let clone = handle.clone();
        clone.request();
        assert!(handle.is_requested());
        handle.reset();
        assert!(!clone.is_requested());
    }

    #[test]
    fn test_default_options() {
        let options = SessionOptions::default();
        assert_eq!(options.ws_base_url, DEFAULT_WS_BASE_URL);
        assert_eq!(options.sampler, SamplerOptions::default());
    }
}
