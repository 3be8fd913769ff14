//! Session lifecycle: creation and teardown of a remote training session and
//! everything that streams for it.

mod error;
mod manager;
mod state;
mod unwind;

pub use error::{SetupError, TeardownError, TeardownStep};
pub use manager::{EventKind, Notice, SessionEvent, SessionManager, SessionOptions, StopHandle};
pub use state::{LifecycleError, SessionState};
pub use unwind::{RemoteResource, StopReport, UnwindList};
