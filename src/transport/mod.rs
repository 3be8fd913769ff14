//! Streaming Transport: the bidirectional socket to the analysis service.
//!
//! [`StreamingTransport`] owns the socket. The sampler only ever sees a
//! [`TransportHandle`], which can check the connection state and queue frames.

mod connection;
mod protocol;
mod state;

pub use connection::{
    endpoint_for, EventHandler, LinkState, StreamingTransport, TransportEvent, TransportHandle,
    DEFAULT_WS_BASE_URL,
};
pub use protocol::{
    decode_inbound, encode_frame, AnalysisSnapshot, FramePayload, Landmark, PostureState,
};
pub use state::ConnectionState;
