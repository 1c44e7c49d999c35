use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use grader_core::model::GradingSession;
use thiserror::Error;

/// Errors surfaced by session store adapters.
///
/// Every variant is a transport-level failure from the caller's point of view.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("session store request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Contract for the single remote session resource.
///
/// Saves are full overwrites; there is no partial update.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch the persisted session, if one exists.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be reached or answers badly.
    async fn fetch_session(&self) -> Result<Option<GradingSession>, StorageError>;

    /// Overwrite the persisted session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on transport failure or a non-success response.
    async fn save_session(&self, session: &GradingSession) -> Result<(), StorageError>;

    /// Remove the persisted session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on failure; callers treat this as best-effort.
    async fn delete_session(&self) -> Result<(), StorageError>;
}

#[derive(Default)]
struct InMemoryState {
    session: Option<GradingSession>,
    posts: Vec<GradingSession>,
    fetches: usize,
    deletes: usize,
    fail_next_posts: usize,
    fail_fetches: bool,
    fail_deletes: bool,
    latency: Option<Duration>,
}

/// In-memory session store for tests and prototyping.
///
/// Records every call and can be scripted to fail or to hold requests open.
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_session(session: GradingSession) -> Self {
        let store = Self::new();
        store.lock().session = Some(session);
        store
    }

    fn lock(&self) -> MutexGuard<'_, InMemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the next `count` saves answer with a failure.
    pub fn fail_next_posts(&self, count: usize) {
        self.lock().fail_next_posts = count;
    }

    pub fn fail_fetches(&self, fail: bool) {
        self.lock().fail_fetches = fail;
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.lock().fail_deletes = fail;
    }

    /// Delay every request by `latency` before it completes.
    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = Some(latency);
    }

    #[must_use]
    pub fn current(&self) -> Option<GradingSession> {
        self.lock().session.clone()
    }

    /// Every payload a save was attempted with, in call order.
    #[must_use]
    pub fn posts(&self) -> Vec<GradingSession> {
        self.lock().posts.clone()
    }

    #[must_use]
    pub fn post_count(&self) -> usize {
        self.lock().posts.len()
    }

    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.lock().fetches
    }

    #[must_use]
    pub fn delete_count(&self) -> usize {
        self.lock().deletes
    }

    async fn simulate_latency(&self) {
        let latency = self.lock().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn fetch_session(&self) -> Result<Option<GradingSession>, StorageError> {
        self.lock().fetches += 1;
        self.simulate_latency().await;
        let guard = self.lock();
        if guard.fail_fetches {
            return Err(StorageError::Connection("fetch refused".into()));
        }
        Ok(guard.session.clone())
    }

    async fn save_session(&self, session: &GradingSession) -> Result<(), StorageError> {
        self.lock().posts.push(session.clone());
        self.simulate_latency().await;
        let mut guard = self.lock();
        if guard.fail_next_posts > 0 {
            guard.fail_next_posts -= 1;
            return Err(StorageError::Connection("save refused".into()));
        }
        guard.session = Some(session.clone());
        Ok(())
    }

    async fn delete_session(&self) -> Result<(), StorageError> {
        self.lock().deletes += 1;
        self.simulate_latency().await;
        let mut guard = self.lock();
        if guard.fail_deletes {
            return Err(StorageError::Connection("delete refused".into()));
        }
        guard.session = None;
        Ok(())
    }
}
