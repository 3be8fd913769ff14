//! Frame sampler: a recurring tick that turns the latest camera frame into
//! a socket payload while a session is active.
//!
//! The schedule is owned by a spawned tokio task. It ends itself as soon as a
//! tick observes the Active Flag down or the link closed, and [`FrameSampler::stop`]
//! aborts it from the outside.

mod encoder;
mod task;

pub use encoder::{EncodeError, FrameEncoder, DEFAULT_JPEG_QUALITY};
pub use task::{SamplerTask, Tick};

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::active::ActiveFlag;
use crate::api::{SeriesId, SessionId};
use crate::camera::{FrameFeed, Resolution};
use crate::transport::{FramePayload, LinkState};

/// Default time between ticks (10 Hz).
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);

/// Default delay before the first tick, so the camera can settle.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(500);

/// Remote ids stamped on every payload of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamIds {
    pub session_id: SessionId,
    pub series_id: SeriesId,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerOptions {
    pub interval: Duration,
    pub settle: Duration,
    /// Size of the raster frames are scaled into before encoding.
    pub target: Resolution,
    pub jpeg_quality: u8,
}

impl Default for SamplerOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            settle: DEFAULT_SETTLE,
            target: Resolution::VGA,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// Owner of the tick schedule.
#[derive(Debug)]
pub struct FrameSampler {
    options: SamplerOptions,
    task: Option<JoinHandle<u64>>,
}

impl FrameSampler {
    pub fn new(options: SamplerOptions) -> Self {
        Self {
            options,
            task: None,
        }
    }

    pub fn options(&self) -> &SamplerOptions {
        &self.options
    }

    /// Spawn the schedule. Any previous schedule is stopped first.
    ///
    /// Must be called inside a tokio runtime.
    pub fn start<L, F>(
        &mut self,
        flag: ActiveFlag,
        link: L,
        feed: FrameFeed,
        ids: StreamIds,
        on_frame: F,
    ) where
        L: LinkState + Send + 'static,
        F: FnMut(FramePayload) + Send + 'static,
    {
        self.stop();

        let encoder = FrameEncoder::new(self.options.target, self.options.jpeg_quality);
        let mut task = SamplerTask::new(flag, link, feed, encoder, ids, on_frame);
        let SamplerOptions {
            interval, settle, ..
        } = self.options;

        log::info!(
            "Sampler starting: every {:?} after {:?}",
            interval,
            settle
        );
        self.task = Some(tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + settle, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if task.tick() == Tick::Halt {
                    break;
                }
            }
            log::info!("Sampler halted after {} frames", task.produced());
            task.produced()
        }));
    }

    /// Abort the schedule. Idempotent.
    pub fn stop(&mut self) {
        if let Some(handle) = self.task.take() {
            handle.abort();
            log::debug!("Sampler stopped");
        }
    }

    /// True while a schedule exists and has not ended itself.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Default for FrameSampler {
    fn default() -> Self {
        Self::new(SamplerOptions::default())
    }
}

impl Drop for FrameSampler {
    fn drop(&mut self) {
        self.stop();
    }
}
