//! Analysis service REST client.
//!
//! Creates and closes sessions and series. Every call is a single attempt:
//! failures are returned to the caller, never retried.

mod client;
mod types;

pub use client::{AnalysisClient, ApiError, DEFAULT_API_BASE_URL, TOKEN_ENV};
pub use types::{RemoteId, SeriesId, SessionId, SessionSummary};
