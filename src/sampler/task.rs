//! One sampler tick: gate, grab, encode, hand off.

use crate::active::ActiveFlag;
use crate::camera::FrameFeed;
use crate::transport::{FramePayload, LinkState};

use super::encoder::FrameEncoder;
use super::StreamIds;

/// Outcome of a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The flag is down or the link is not open. The schedule must end.
    Halt,
    /// Nothing to send this time.
    Idle,
    /// A payload was produced and handed to the sink.
    Sent,
}

/// Per-run sampler state. Reads the flag and link afresh on every tick.
pub struct SamplerTask<L, F> {
    flag: ActiveFlag,
    link: L,
    feed: FrameFeed,
    encoder: FrameEncoder,
    ids: StreamIds,
    on_frame: F,
    produced: u64,
}

impl<L, F> SamplerTask<L, F>
where
    L: LinkState,
    F: FnMut(FramePayload),
{
    pub fn new(
        flag: ActiveFlag,
        link: L,
        feed: FrameFeed,
        encoder: FrameEncoder,
        ids: StreamIds,
        on_frame: F,
    ) -> Self {
        Self {
            flag,
            link,
            feed,
            encoder,
            ids,
            on_frame,
            produced: 0,
        }
    }

    /// Number of payloads produced so far.
    pub fn produced(&self) -> u64 {
        self.produced
    }

    pub fn tick(&mut self) -> Tick {
        if !self.flag.is_active() || !self.link.is_open() {
            return Tick::Halt;
        }

        let Some(frame) = self.feed.latest() else {
            return Tick::Idle;
        };

        let image_data = match self.encoder.encode(&frame) {
            Ok(uri) => uri,
            Err(e) => {
                log::warn!("Skipping frame: {}", e);
                return Tick::Idle;
            }
        };

        (self.on_frame)(FramePayload {
            image_data,
            session_id: self.ids.session_id.clone(),
            series_id: self.ids.series_id.clone(),
        });
        self.produced += 1;
        Tick::Sent
    }
}
