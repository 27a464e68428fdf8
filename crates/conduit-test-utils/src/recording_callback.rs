//! Callback that records everything it is told.

use std::sync::{Arc, RwLock};

use conduit_ops::{ResponseCallback, RoundResult};
use conduit_types::{RequestContextId, RequestContextState};

#[derive(Default)]
struct RecordingInner {
    rounds: Vec<RoundResult>,
    state_changes: Vec<(RequestContextId, RequestContextState)>,
}

/// Records round results and state changes for later assertions.
#[derive(Clone, Default)]
pub struct RecordingCallback {
    inner: Arc<RwLock<RecordingInner>>,
}

impl RecordingCallback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rounds(&self) -> Vec<RoundResult> {
        self.inner.read().unwrap().rounds.clone()
    }

    pub fn round_count(&self) -> usize {
        self.inner.read().unwrap().rounds.len()
    }

    pub fn state_changes(&self) -> Vec<(RequestContextId, RequestContextState)> {
        self.inner.read().unwrap().state_changes.clone()
    }

    /// The most recent state reported for `context_id`.
    pub fn last_state(&self, context_id: &RequestContextId) -> Option<RequestContextState> {
        self.inner
            .read()
            .unwrap()
            .state_changes
            .iter()
            .rev()
            .find(|(id, _)| id == context_id)
            .map(|(_, state)| *state)
    }
}

impl ResponseCallback for RecordingCallback {
    fn on_round_complete(&self, round: &RoundResult) {
        self.inner.write().unwrap().rounds.push(round.clone());
    }

    fn on_state_change(&self, context_id: &RequestContextId, state: RequestContextState) {
        self.inner
            .write()
            .unwrap()
            .state_changes
            .push((*context_id, state));
    }
}
