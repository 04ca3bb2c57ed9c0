//! Turns raw listen messages into query snapshots.
//!
//! The server streams incremental changes for a target. [`WatchState`] keeps the current
//! document set and emits a [`QuerySnapshot`] each time the server declares the target
//! consistent: after `CURRENT`, every global `NO_CHANGE` carrying a read time is a
//! consistency point. Nothing is cached beyond the lifetime of the stream.
//!
//! An existence filter mismatch means the stream missed deletions. [`SnapshotStream`]
//! then drops its state and reopens the listen, as the server cannot resend them.

use super::listen::{listen_request, ListenStream};
use super::models::{Document, ListenRequest, ListenResponse, TargetChange, TargetChangeType};
use super::reference::document_id;
use super::snapshot::{DocumentSnapshot, QuerySnapshot};
use super::FirestoreError;
use futures::stream::Stream;
use futures::Future;
use reqwest_middleware::ClientWithMiddleware;
use std::collections::BTreeMap;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Document state of a single listen target.
#[derive(Debug, Clone)]
pub struct WatchState {
    target_id: i32,
    // Keyed by resource name, which is also the default query order.
    documents: BTreeMap<String, Document>,
    current: bool,
    changed: bool,
    emitted: bool,
    resume_token: Option<String>,
}

impl WatchState {
    pub fn new(target_id: i32) -> Self {
        Self {
            target_id,
            documents: BTreeMap::new(),
            current: false,
            changed: false,
            emitted: false,
            resume_token: None,
        }
    }

    pub fn target_id(&self) -> i32 {
        self.target_id
    }

    /// The last resume token the server sent.
    pub fn resume_token(&self) -> Option<&str> {
        self.resume_token.as_deref()
    }

    /// Applies one listen message, returning a snapshot when the target became consistent.
    pub fn apply(
        &mut self,
        response: ListenResponse,
    ) -> Result<Option<QuerySnapshot>, FirestoreError> {
        if let Some(change) = response.target_change {
            return self.apply_target_change(change);
        }

        if let Some(change) = response.document_change {
            if change.target_ids.contains(&self.target_id) {
                self.documents
                    .insert(change.document.name.clone(), change.document);
                self.changed = true;
            } else if change.removed_target_ids.contains(&self.target_id) {
                self.remove(&change.document.name);
            }
        }

        if let Some(delete) = response.document_delete {
            self.remove(&delete.document);
        }

        if let Some(remove) = response.document_remove {
            if remove.removed_target_ids.is_empty()
                || remove.removed_target_ids.contains(&self.target_id)
            {
                self.remove(&remove.document);
            }
        }

        // Counts are only comparable once the initial result set is complete.
        if let Some(filter) = response.filter {
            let expected = usize::try_from(filter.count).unwrap_or_default();
            if self.current
                && filter.target_id == self.target_id
                && expected != self.documents.len()
            {
                return Err(FirestoreError::ExistenceFilterMismatch {
                    expected,
                    actual: self.documents.len(),
                });
            }
        }

        Ok(None)
    }

    fn apply_target_change(
        &mut self,
        change: TargetChange,
    ) -> Result<Option<QuerySnapshot>, FirestoreError> {
        let applies = change.target_ids.is_empty() || change.target_ids.contains(&self.target_id);

        match change.target_change_type {
            TargetChangeType::NoChange => {
                if let Some(token) = change.resume_token {
                    self.resume_token = Some(token);
                }
                let consistent = change.target_ids.is_empty() && change.read_time.is_some();
                if consistent && self.current && (self.changed || !self.emitted) {
                    return Ok(Some(self.snapshot(change.read_time)));
                }
            }
            TargetChangeType::Add => {}
            TargetChangeType::Current => {
                if applies {
                    self.current = true;
                    if let Some(token) = change.resume_token {
                        self.resume_token = Some(token);
                    }
                }
            }
            TargetChangeType::Reset => {
                if applies {
                    tracing::debug!(target_id = self.target_id, "listen target reset");
                    self.documents.clear();
                    self.current = false;
                    self.changed = true;
                }
            }
            TargetChangeType::Remove => {
                if applies {
                    let message = change
                        .cause
                        .and_then(|cause| cause.message)
                        .unwrap_or_else(|| "target removed by server".to_string());
                    return Err(FirestoreError::ApiError(format!("Listen failed: {}", message)));
                }
            }
        }

        Ok(None)
    }

    fn remove(&mut self, name: &str) {
        if self.documents.remove(name).is_some() {
            self.changed = true;
        }
    }

    fn snapshot(&mut self, read_time: Option<String>) -> QuerySnapshot {
        self.changed = false;
        self.emitted = true;

        let documents = self
            .documents
            .values()
            .map(|doc| DocumentSnapshot {
                id: document_id(&doc.name).to_string(),
                name: doc.name.clone(),
                document: Some(doc.clone()),
                read_time: read_time.clone(),
            })
            .collect();

        QuerySnapshot {
            documents,
            read_time,
        }
    }
}

// Consecutive reopens without a snapshot in between before the stream gives up.
const MAX_REOPENS: usize = 3;

type ReopenFuture = Pin<Box<dyn Future<Output = Result<ListenStream, FirestoreError>> + Send>>;

/// Everything needed to send a listen request again.
#[derive(Clone)]
pub struct Reopen {
    pub(crate) client: ClientWithMiddleware,
    pub(crate) documents_url: String,
    pub(crate) request: ListenRequest,
}

enum Source {
    Open(ListenStream),
    Reopening(ReopenFuture),
}

/// A stream of `QuerySnapshot`s built from a listen stream.
///
/// The stream ends after the first error it cannot recover from.
pub struct SnapshotStream {
    source: Source,
    state: WatchState,
    reopen: Option<Reopen>,
    reopens: usize,
    done: bool,
}

impl SnapshotStream {
    pub fn new(inner: ListenStream, state: WatchState) -> Self {
        Self {
            source: Source::Open(inner),
            state,
            reopen: None,
            reopens: 0,
            done: false,
        }
    }

    /// Lets the stream resend `reopen` after an existence filter mismatch.
    pub fn with_reopen(mut self, reopen: Reopen) -> Self {
        self.reopen = Some(reopen);
        self
    }

    /// The last resume token the server sent on the current listen.
    pub fn resume_token(&self) -> Option<&str> {
        self.state.resume_token()
    }

    // Starts a fresh listen, or returns the error when reopening is not possible.
    fn try_reopen(&mut self, error: FirestoreError) -> Result<(), FirestoreError> {
        let reopen = match &self.reopen {
            Some(reopen) if self.reopens < MAX_REOPENS => reopen.clone(),
            _ => return Err(error),
        };

        self.reopens += 1;
        tracing::warn!(error = %error, attempt = self.reopens, "reopening listen stream");
        self.state = WatchState::new(self.state.target_id());
        self.source = Source::Reopening(Box::pin(async move {
            listen_request(&reopen.client, &reopen.documents_url, &reopen.request).await
        }));
        Ok(())
    }
}

impl Stream for SnapshotStream {
    type Item = Result<QuerySnapshot, FirestoreError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }

        loop {
            let item = match &mut this.source {
                Source::Reopening(future) => match future.as_mut().poll(cx) {
                    Poll::Ready(Ok(stream)) => {
                        this.source = Source::Open(stream);
                        continue;
                    }
                    Poll::Ready(Err(e)) => Some(Err(e)),
                    Poll::Pending => return Poll::Pending,
                },
                Source::Open(stream) => match Pin::new(stream).poll_next(cx) {
                    Poll::Ready(item) => item,
                    Poll::Pending => return Poll::Pending,
                },
            };

            let result = match item {
                Some(Ok(response)) => this.state.apply(response),
                Some(Err(e)) => Err(e),
                None => {
                    this.done = true;
                    return Poll::Ready(None);
                }
            };

            match result {
                Ok(Some(snapshot)) => {
                    this.reopens = 0;
                    return Poll::Ready(Some(Ok(snapshot)));
                }
                Ok(None) => continue,
                Err(e @ FirestoreError::ExistenceFilterMismatch { .. }) => {
                    if let Err(e) = this.try_reopen(e) {
                        this.done = true;
                        return Poll::Ready(Some(Err(e)));
                    }
                }
                Err(e) => {
                    this.done = true;
                    return Poll::Ready(Some(Err(e)));
                }
            }
        }
    }
}
