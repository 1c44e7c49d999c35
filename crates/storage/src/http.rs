use std::env;

use async_trait::async_trait;
use grader_core::model::{GradingSession, SessionData, TabId};
use reqwest::Client;
use serde::Deserialize;

use crate::repository::{SessionStore, StorageError};

/// Path of the session resource on the grading server.
pub const SESSION_RESOURCE_PATH: &str = "/api/grading-session";

#[derive(Clone, Debug)]
pub struct HttpStoreConfig {
    pub base_url: String,
}

impl HttpStoreConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    #[must_use]
    pub fn from_env() -> Self {
        let base_url = env::var("GRADER_SESSION_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| "http://127.0.0.1:8080".into());
        Self { base_url }
    }

    #[must_use]
    pub fn resource_url(&self) -> String {
        format!(
            "{}{SESSION_RESOURCE_PATH}",
            self.base_url.trim_end_matches('/')
        )
    }
}

/// Session store backed by the grading server's HTTP resource.
///
/// No request timeout is configured; failures are detected from the
/// response or the transport error only.
#[derive(Clone)]
pub struct HttpSessionStore {
    client: Client,
    url: String,
}

impl HttpSessionStore {
    #[must_use]
    pub fn new(config: &HttpStoreConfig) -> Self {
        Self {
            client: Client::new(),
            url: config.resource_url(),
        }
    }

    #[must_use]
    pub fn from_env() -> Self {
        Self::new(&HttpStoreConfig::from_env())
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl SessionStore for HttpSessionStore {
    async fn fetch_session(&self) -> Result<Option<GradingSession>, StorageError> {
        let response = self.client.get(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(StorageError::HttpStatus(response.status()));
        }
        let envelope: SessionEnvelope = response.json().await?;
        envelope.into_session()
    }

    async fn save_session(&self, session: &GradingSession) -> Result<(), StorageError> {
        let response = self.client.post(&self.url).json(session).send().await?;
        if !response.status().is_success() {
            return Err(StorageError::HttpStatus(response.status()));
        }
        tracing::debug!(url = %self.url, "session snapshot stored");
        Ok(())
    }

    async fn delete_session(&self) -> Result<(), StorageError> {
        let response = self.client.delete(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(StorageError::HttpStatus(response.status()));
        }
        Ok(())
    }
}

/// Body of a `GET` on the session resource.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionEnvelope {
    exists: bool,
    #[serde(default)]
    active_tab: Option<TabId>,
    #[serde(default)]
    session_data: Option<SessionData>,
}

impl SessionEnvelope {
    fn into_session(self) -> Result<Option<GradingSession>, StorageError> {
        if !self.exists {
            return Ok(None);
        }
        match (self.active_tab, self.session_data) {
            (Some(active_tab), Some(session_data)) => Ok(Some(GradingSession {
                active_tab,
                session_data,
            })),
            _ => Err(StorageError::Serialization(
                "session marked as existing but activeTab or sessionData is missing".into(),
            )),
        }
    }
}
