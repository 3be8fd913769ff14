//! Remote resources acquired during startup, released in reverse order.

use crate::api::{AnalysisClient, SeriesId, SessionId, SessionSummary};

use super::error::{TeardownError, TeardownStep};

#[derive(Debug, Clone, PartialEq)]
pub enum RemoteResource {
    Session(SessionId),
    Series(SeriesId),
}

/// What a teardown produced: the session aggregate if the end call
/// succeeded, plus every remote failure.
#[derive(Debug, Default)]
pub struct StopReport {
    pub summary: Option<SessionSummary>,
    pub failures: Vec<TeardownError>,
}

impl StopReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Stack of remote resources, pushed as startup acquires them.
#[derive(Debug, Default)]
pub struct UnwindList {
    stack: Vec<RemoteResource>,
}

impl UnwindList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, resource: RemoteResource) {
        self.stack.push(resource);
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    /// Pop everything, most recent first.
    pub fn drain(&mut self) -> impl Iterator<Item = RemoteResource> {
        std::mem::take(&mut self.stack).into_iter().rev()
    }

    /// End every held resource. Each call runs whether or not the previous
    /// one succeeded; the list is empty afterwards.
    pub async fn release_all(&mut self, api: &AnalysisClient) -> StopReport {
        let mut report = StopReport::default();
        for resource in self.drain() {
            match resource {
                RemoteResource::Series(id) => {
                    if let Err(e) = api.end_series(&id).await {
                        log::warn!("Could not end series {}: {}", id, e);
                        report.failures.push(TeardownError {
                            step: TeardownStep::EndSeries,
                            source: e,
                        });
                    }
                }
                RemoteResource::Session(id) => match api.end_session(&id).await {
                    Ok(summary) => report.summary = Some(summary),
                    Err(e) => {
                        log::warn!("Could not end session {}: {}", id, e);
                        report.failures.push(TeardownError {
                            step: TeardownStep::EndSession,
                            source: e,
                        });
                    }
                },
            }
        }
        report
    }
}
