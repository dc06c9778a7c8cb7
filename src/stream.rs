//! Streaming summaries: show text as the backend writes it.
//!
//! ## Why stream?
//!
//! A detailed summary of a long paper takes tens of seconds. Streaming lets
//! a shell render partial output right away instead of showing a spinner the
//! whole time.
//!
//! A [`SummaryStream`] yields raw chunks exactly as they arrive. It is lazy,
//! finite and cannot be restarted. Sanitization never runs on partial
//! chunks: [`SummaryStream::finish`] assembles the whole text, sanitizes it
//! once and stores the result in the session.
//!
//! The stream holds the session lock. Dropping it without calling `finish`
//! releases the session and records nothing beyond the bounded text that
//! was already stored.

use crate::backend::ChunkStream;
use crate::error::{PipelineError, Stage, SummaryError};
use crate::progress::SharedObserver;
use crate::prompts::DetailLevel;
use crate::session::SessionState;
use crate::summarize::{record_failure, record_success, SummaryResult};
use futures::StreamExt;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;
use tokio::sync::OwnedMutexGuard;
use tokio_stream::Stream;

/// Chunked backend output for one summarize action.
pub struct SummaryStream {
    inner: ChunkStream,
    state: OwnedMutexGuard<SessionState>,
    observer: SharedObserver,
    detail_level: DetailLevel,
    started: Instant,
    buffer: String,
    error: Option<SummaryError>,
    done: bool,
}

impl std::fmt::Debug for SummaryStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SummaryStream")
            .field("detail_level", &self.detail_level)
            .field("received_chars", &self.buffer.chars().count())
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl SummaryStream {
    pub(crate) fn new(
        inner: ChunkStream,
        state: OwnedMutexGuard<SessionState>,
        observer: SharedObserver,
        detail_level: DetailLevel,
        started: Instant,
    ) -> Self {
        Self {
            inner,
            state,
            observer,
            detail_level,
            started,
            buffer: String::new(),
            error: None,
            done: false,
        }
    }

    pub fn detail_level(&self) -> DetailLevel {
        self.detail_level
    }

    /// Text received so far, unsanitized.
    pub fn received(&self) -> &str {
        &self.buffer
    }

    /// Drain whatever is left, then sanitize and store the result.
    ///
    /// A stream that failed, or that produced only whitespace, ends in
    /// `Failed{Requesting}`.
    pub async fn finish(mut self) -> Result<SummaryResult, PipelineError> {
        while self.next().await.is_some() {}

        let observer = self.observer.as_ref();
        let failure = match self.error.take() {
            Some(e) => Some(e),
            None if self.buffer.trim().is_empty() => Some(SummaryError::Backend {
                status: None,
                message: "backend returned an empty completion".into(),
            }),
            None => None,
        };

        if let Some(source) = failure {
            return Err(record_failure(
                &mut self.state,
                observer,
                self.detail_level,
                Stage::Requesting,
                source,
                self.started,
            ));
        }

        let raw = std::mem::take(&mut self.buffer);
        Ok(record_success(
            &mut self.state,
            observer,
            self.detail_level,
            raw,
            (0, 0),
            self.started,
        ))
    }
}

impl Stream for SummaryStream {
    type Item = Result<String, SummaryError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }

        match this.inner.poll_next_unpin(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                this.buffer.push_str(&chunk);
                this.observer.on_chunk(&chunk);
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(e))) => {
                this.error = Some(e.clone());
                this.done = true;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                this.done = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoopObserver;
    use crate::session::Session;
    use futures::stream;
    use std::sync::Arc;

    fn chunks(items: Vec<Result<&'static str, SummaryError>>) -> ChunkStream {
        Box::pin(stream::iter(
            items.into_iter().map(|r| r.map(str::to_string)),
        ))
    }

    async fn open(session: &Session, items: Vec<Result<&'static str, SummaryError>>) -> SummaryStream {
        SummaryStream::new(
            chunks(items),
            session.lock_owned().await,
            Arc::new(NoopObserver),
            DetailLevel::Concise,
            Instant::now(),
        )
    }

    #[tokio::test]
    async fn chunks_are_raw_and_finish_sanitizes() {
        let session = Session::new();
        let mut s = open(&session, vec![Ok("<summary>## Ti"), Ok("tle</summary>")]).await;

        assert_eq!(s.next().await.unwrap().unwrap(), "<summary>## Ti");
        assert_eq!(s.received(), "<summary>## Ti");

        let result = s.finish().await.unwrap();
        assert_eq!(result.raw_response, "<summary>## Title</summary>");
        assert_eq!(result.cleaned_text, "## Title");
        assert_eq!(session.last_result().await, Some(result));
    }

    #[tokio::test]
    async fn stream_is_not_restartable() {
        let session = Session::new();
        let mut s = open(&session, vec![Ok("a")]).await;
        assert!(s.next().await.is_some());
        assert!(s.next().await.is_none());
        assert!(s.next().await.is_none());
    }

    #[tokio::test]
    async fn error_chunk_fails_at_requesting() {
        let session = Session::new();
        let s = open(
            &session,
            vec![
                Ok("partial"),
                Err(SummaryError::BackendOverload {
                    provider: "anthropic".into(),
                }),
                Ok("never seen"),
            ],
        )
        .await;

        let err = s.finish().await.unwrap_err();
        assert_eq!(err.stage, Stage::Requesting);
        assert!(err.source.is_overload());
        assert!(!session.last_result().await.unwrap().is_success());
    }

    #[tokio::test]
    async fn whitespace_only_stream_is_an_error() {
        let session = Session::new();
        let s = open(&session, vec![Ok("  "), Ok("\n")]).await;
        let err = s.finish().await.unwrap_err();
        assert!(matches!(err.source, SummaryError::Backend { status: None, .. }));
    }

    #[tokio::test]
    async fn dropping_releases_the_session() {
        let session = Session::new();
        let s = open(&session, vec![Ok("x")]).await;
        drop(s);
        assert!(session.last_result().await.is_none());
    }
}
