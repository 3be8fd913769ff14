//! squat-coach library crate.
//!
//! Streams webcam frames to a pose-analysis service and projects its feedback.
//! This module exposes the internal components for the binary and for
//! integration testing.

pub mod active;
pub mod api;
pub mod app;
pub mod camera;
pub mod cli;
pub mod config;
pub mod hud;
pub mod identity;
pub mod overlay;
pub mod projection;
pub mod sampler;
pub mod session;
pub mod transport;
