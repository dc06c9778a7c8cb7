//! Per-user session context.
//!
//! A [`Session`] holds the bounded text of the current document and the
//! most recent result, so a later "summarize again" or "more detail" action
//! can reuse the text without fetching or parsing anything. State lives in
//! memory only.
//!
//! The state sits behind a `tokio::sync::Mutex`. A summarize action holds
//! the lock from start to finish, so actions on one session run one at a
//! time and at most one backend call per session is ever in flight.

use crate::pipeline::bound::ExtractedText;
use crate::summarize::SummaryResult;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, OwnedMutexGuard};

/// What a session remembers between actions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Bounded text of the last successfully ingested document.
    pub extracted: Option<ExtractedText>,
    /// Outcome of the last summarize action, successful or not.
    pub last_result: Option<SummaryResult>,
}

/// Cloneable handle to one session's state. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct Session {
    state: Arc<Mutex<SessionState>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current state. Waits for a running action to finish.
    pub async fn snapshot(&self) -> SessionState {
        self.state.lock().await.clone()
    }

    pub async fn extracted(&self) -> Option<ExtractedText> {
        self.state.lock().await.extracted.clone()
    }

    pub async fn last_result(&self) -> Option<SummaryResult> {
        self.state.lock().await.last_result.clone()
    }

    /// Forget the document and the last result.
    pub async fn clear(&self) {
        *self.state.lock().await = SessionState::default();
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().await
    }

    pub(crate) async fn lock_owned(&self) -> OwnedMutexGuard<SessionState> {
        Arc::clone(&self.state).lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> ExtractedText {
        ExtractedText {
            content: s.to_string(),
            truncated: false,
            original_length: s.chars().count(),
        }
    }

    #[tokio::test]
    async fn new_session_is_empty() {
        let s = Session::new();
        assert_eq!(s.snapshot().await, SessionState::default());
        assert!(s.extracted().await.is_none());
        assert!(s.last_result().await.is_none());
    }

    #[tokio::test]
    async fn clones_share_state() {
        let a = Session::new();
        let b = a.clone();
        a.lock().await.extracted = Some(text("paper"));
        assert_eq!(b.extracted().await, Some(text("paper")));

        b.clear().await;
        assert!(a.extracted().await.is_none());
    }

    #[test]
    fn owned_lock_blocks_other_actions() {
        tokio_test::block_on(async {
            let s = Session::new();
            let guard = s.lock_owned().await;
            assert!(s.state.try_lock().is_err());
            drop(guard);
            assert!(s.state.try_lock().is_ok());
        });
    }
}
