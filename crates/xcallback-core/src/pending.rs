use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;

use crate::failure::Failure;
use crate::types::{Parameters, ResponseType};

pub type SuccessCallback = Box<dyn FnOnce(Option<Parameters>) + Send>;
pub type FailureCallback = Box<dyn FnOnce(Failure) + Send>;
pub type CancelCallback = Box<dyn FnOnce() + Send>;

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// How a remote action finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success(Option<Parameters>),
    Failure(Failure),
    Cancel,
}

impl Outcome {
    pub fn response_type(&self) -> ResponseType {
        match self {
            Outcome::Success(_) => ResponseType::Success,
            Outcome::Failure(_) => ResponseType::Error,
            Outcome::Cancel => ResponseType::Cancel,
        }
    }
}

// ---------------------------------------------------------------------------
// Callbacks
// ---------------------------------------------------------------------------

/// The completion callbacks a caller attaches to a request.
///
/// Only the supplied slots get a callback URL in the outgoing request.
#[derive(Default)]
pub struct Callbacks {
    on_success: Option<SuccessCallback>,
    on_failure: Option<FailureCallback>,
    on_cancel: Option<CancelCallback>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_success(mut self, f: impl FnOnce(Option<Parameters>) + Send + 'static) -> Self {
        self.on_success = Some(Box::new(f));
        self
    }

    pub fn on_failure(mut self, f: impl FnOnce(Failure) + Send + 'static) -> Self {
        self.on_failure = Some(Box::new(f));
        self
    }

    pub fn on_cancel(mut self, f: impl FnOnce() + Send + 'static) -> Self {
        self.on_cancel = Some(Box::new(f));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.on_success.is_none() && self.on_failure.is_none() && self.on_cancel.is_none()
    }

    pub fn response_types(&self) -> Vec<ResponseType> {
        let mut types = Vec::new();
        if self.on_success.is_some() {
            types.push(ResponseType::Success);
        }
        if self.on_failure.is_some() {
            types.push(ResponseType::Error);
        }
        if self.on_cancel.is_some() {
            types.push(ResponseType::Cancel);
        }
        types
    }

    /// Invoke the callback matching `outcome`. Missing slots are no-ops.
    pub fn complete(self, outcome: Outcome) {
        match outcome {
            Outcome::Success(params) => {
                if let Some(f) = self.on_success {
                    f(params);
                }
            }
            Outcome::Failure(failure) => {
                if let Some(f) = self.on_failure {
                    f(failure);
                }
            }
            Outcome::Cancel => {
                if let Some(f) = self.on_cancel {
                    f();
                }
            }
        }
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("response_types", &self.response_types())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// PendingRequest
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub(crate) enum Completion {
    Callbacks(Callbacks),
    Channel(oneshot::Sender<Outcome>),
}

impl Completion {
    pub(crate) fn response_types(&self) -> Vec<ResponseType> {
        match self {
            Completion::Callbacks(callbacks) => callbacks.response_types(),
            Completion::Channel(_) => ResponseType::all().to_vec(),
        }
    }
}

/// A request awaiting its response.
#[derive(Debug)]
pub struct PendingRequest {
    pub id: String,
    pub action: String,
    pub created_at: DateTime<Utc>,
    completion: Completion,
}

impl PendingRequest {
    pub(crate) fn new(id: String, action: String, completion: Completion) -> Self {
        Self {
            id,
            action,
            created_at: Utc::now(),
            completion,
        }
    }

    pub fn response_types(&self) -> Vec<ResponseType> {
        self.completion.response_types()
    }

    /// Deliver `outcome`, consuming the request.
    pub fn complete(self, outcome: Outcome) {
        match self.completion {
            Completion::Callbacks(callbacks) => callbacks.complete(outcome),
            Completion::Channel(tx) => {
                if tx.send(outcome).is_err() {
                    tracing::debug!(request_id = %self.id, "response receiver already dropped");
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// PendingTable
// ---------------------------------------------------------------------------

/// Request identifier → pending request.
///
/// Removal is a single locked `remove`, so each entry is handed out at most
/// once no matter how many threads dispatch the same response.
#[derive(Debug, Default)]
pub struct PendingTable {
    entries: Mutex<HashMap<String, PendingRequest>>,
    ttl: Option<Duration>,
}

impl PendingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries older than `ttl` are removed by [`PendingTable::purge_expired`].
    /// `None` keeps entries until they are answered.
    pub fn with_ttl(ttl: Option<Duration>) -> Self {
        Self {
            entries: Mutex::default(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, PendingRequest>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert `request`, returning any entry it replaced.
    pub fn insert(&self, request: PendingRequest) -> Option<PendingRequest> {
        self.entries().insert(request.id.clone(), request)
    }

    /// Remove and return the entry for `id`.
    pub fn take(&self, id: &str) -> Option<PendingRequest> {
        self.entries().remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries().contains_key(id)
    }

    /// Identifiers of all pending requests, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Remove entries created more than `ttl` before `now`; returns their ids.
    ///
    /// The removed callbacks are dropped without being invoked.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> Vec<String> {
        let Some(ttl) = self.ttl else {
            return Vec::new();
        };
        let expired: Vec<PendingRequest> = {
            let mut entries = self.entries();
            let ids: Vec<String> = entries
                .values()
                .filter(|r| now - r.created_at > ttl)
                .map(|r| r.id.clone())
                .collect();
            ids.iter().filter_map(|id| entries.remove(id)).collect()
        };
        // Dropped outside the lock: a dropped channel sender wakes its receiver.
        let mut ids: Vec<String> = expired.into_iter().map(|r| r.id).collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn request(id: &str, callbacks: Callbacks) -> PendingRequest {
        PendingRequest::new(
            id.to_string(),
            "auth".to_string(),
            Completion::Callbacks(callbacks),
        )
    }

    #[test]
    fn callbacks_report_supplied_slots() {
        let cbs = Callbacks::new().on_success(|_| {}).on_cancel(|| {});
        assert!(!cbs.is_empty());
        assert_eq!(
            cbs.response_types(),
            vec![ResponseType::Success, ResponseType::Cancel]
        );
        assert!(Callbacks::new().is_empty());
    }

    #[test]
    fn complete_invokes_only_matching_callback() {
        let hits = Arc::new(AtomicUsize::new(0));
        let (s, f, c) = (hits.clone(), hits.clone(), hits.clone());
        let cbs = Callbacks::new()
            .on_success(move |_| {
                s.fetch_add(1, Ordering::SeqCst);
            })
            .on_failure(move |_| {
                f.fetch_add(10, Ordering::SeqCst);
            })
            .on_cancel(move || {
                c.fetch_add(100, Ordering::SeqCst);
            });
        cbs.complete(Outcome::Failure(Failure::new(5, "nope")));
        assert_eq!(hits.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn missing_slot_is_noop() {
        let cbs = Callbacks::new().on_success(|_| panic!("must not run"));
        cbs.complete(Outcome::Cancel);
    }

    #[test]
    fn take_removes_exactly_once() {
        let table = PendingTable::new();
        table.insert(request("abc", Callbacks::new().on_cancel(|| {})));
        assert!(table.contains("abc"));
        assert!(table.take("abc").is_some());
        assert!(table.take("abc").is_none());
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn channel_completion_delivers_outcome() {
        let (tx, rx) = oneshot::channel();
        let pending = PendingRequest::new("id".into(), "auth".into(), Completion::Channel(tx));
        assert_eq!(pending.response_types().len(), 3);
        pending.complete(Outcome::Cancel);
        assert_eq!(rx.await.unwrap(), Outcome::Cancel);
    }

    #[test]
    fn purge_without_ttl_keeps_everything() {
        let table = PendingTable::new();
        table.insert(request("old", Callbacks::new().on_cancel(|| {})));
        let far_future = Utc::now() + Duration::days(365);
        assert!(table.purge_expired(far_future).is_empty());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn purge_removes_only_expired() {
        let table = PendingTable::with_ttl(Some(Duration::seconds(60)));
        let mut old = request("old", Callbacks::new().on_cancel(|| panic!("must not run")));
        old.created_at = Utc::now() - Duration::seconds(120);
        table.insert(old);
        table.insert(request("fresh", Callbacks::new().on_cancel(|| {})));

        let purged = table.purge_expired(Utc::now());
        assert_eq!(purged, vec!["old".to_string()]);
        assert_eq!(table.ids(), vec!["fresh".to_string()]);
    }
}
