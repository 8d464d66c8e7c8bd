//! Conversational memory: retrieval configuration, stores, and the
//! per-request session manager.
//!
//! Memory is namespaced per actor and session. Before a run, the session
//! manager retrieves scored records from every configured namespace and
//! hydrates them into the system context; after a completed turn it appends
//! the user/assistant exchange as a new event.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::Result;
use crate::http::{shared_client, status_to_error};

/// Retrieval parameters for one namespace.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MemoryRetrieval {
    /// Maximum records to pull.
    pub top_k: usize,
    /// Records scoring below this are dropped.
    pub min_relevance: f64,
}

/// A namespace paired with its retrieval parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamespaceRetrieval {
    pub namespace: String,
    pub retrieval: MemoryRetrieval,
}

/// Memory wiring for one invocation.
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    pub memory_id: String,
    pub session_id: String,
    pub actor_id: String,
    pub namespaces: Vec<NamespaceRetrieval>,
}

impl MemoryConfig {
    /// Default namespace layout for an actor/session pair.
    pub fn for_actor(
        memory_id: impl Into<String>,
        session_id: impl Into<String>,
        actor_id: impl Into<String>,
    ) -> Self {
        let memory_id = memory_id.into();
        let session_id = session_id.into();
        let actor_id = actor_id.into();
        let namespaces = vec![
            NamespaceRetrieval {
                namespace: format!("facts/{actor_id}"),
                retrieval: MemoryRetrieval {
                    top_k: 10,
                    min_relevance: 0.4,
                },
            },
            NamespaceRetrieval {
                namespace: format!("preferences/{actor_id}"),
                retrieval: MemoryRetrieval {
                    top_k: 5,
                    min_relevance: 0.5,
                },
            },
            NamespaceRetrieval {
                namespace: format!("summaries/{actor_id}/{session_id}"),
                retrieval: MemoryRetrieval {
                    top_k: 5,
                    min_relevance: 0.4,
                },
            },
            NamespaceRetrieval {
                namespace: format!("episodes/{actor_id}/{session_id}"),
                retrieval: MemoryRetrieval {
                    top_k: 5,
                    min_relevance: 0.4,
                },
            },
        ];
        Self {
            memory_id,
            session_id,
            actor_id,
            namespaces,
        }
    }
}

/// A scored memory record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub namespace: String,
    pub content: String,
    pub relevance: f64,
}

/// Backing store for conversational memory.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Retrieve up to `top_k` records relevant to `query` from a namespace.
    async fn retrieve(
        &self,
        memory_id: &str,
        namespace: &str,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<MemoryRecord>>;

    /// Append a completed user/assistant exchange.
    async fn append_event(
        &self,
        config: &MemoryConfig,
        user_text: &str,
        assistant_text: &str,
    ) -> Result<()>;
}

/// Remote memory service client.
pub struct RemoteMemoryStore {
    base_url: String,
}

impl RemoteMemoryStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

#[derive(Serialize)]
struct RetrieveRequest<'a> {
    namespace: &'a str,
    query: &'a str,
    top_k: usize,
}

#[derive(Deserialize)]
struct RetrieveResponse {
    records: Vec<RemoteRecord>,
}

#[derive(Deserialize)]
struct RemoteRecord {
    content: String,
    #[serde(default)]
    relevance: f64,
}

#[derive(Serialize)]
struct AppendEventRequest<'a> {
    session_id: &'a str,
    actor_id: &'a str,
    messages: [(&'a str, &'a str); 2],
}

#[async_trait]
impl MemoryStore for RemoteMemoryStore {
    async fn retrieve(
        &self,
        memory_id: &str,
        namespace: &str,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<MemoryRecord>> {
        let url = format!(
            "{}/memories/{memory_id}/retrieve",
            self.base_url.trim_end_matches('/')
        );
        let resp = shared_client()
            .post(&url)
            .json(&RetrieveRequest {
                namespace,
                query,
                top_k,
            })
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status != 200 {
            let body = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body));
        }

        let parsed: RetrieveResponse = resp.json().await?;
        debug!(namespace, count = parsed.records.len(), "memory retrieve");
        Ok(parsed
            .records
            .into_iter()
            .map(|record| MemoryRecord {
                namespace: namespace.to_string(),
                content: record.content,
                relevance: record.relevance,
            })
            .collect())
    }

    async fn append_event(
        &self,
        config: &MemoryConfig,
        user_text: &str,
        assistant_text: &str,
    ) -> Result<()> {
        let url = format!(
            "{}/memories/{}/events",
            self.base_url.trim_end_matches('/'),
            config.memory_id
        );
        let resp = shared_client()
            .post(&url)
            .json(&AppendEventRequest {
                session_id: &config.session_id,
                actor_id: &config.actor_id,
                messages: [("user", user_text), ("assistant", assistant_text)],
            })
            .send()
            .await?;

        let status = resp.status().as_u16();
        if !(200..300).contains(&status) {
            let body = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body));
        }
        Ok(())
    }
}

/// In-process store, used in tests and local development.
#[derive(Default)]
pub struct InMemoryMemoryStore {
    records: RwLock<HashMap<String, Vec<MemoryRecord>>>,
    events: RwLock<Vec<(String, String, String)>>,
}

impl InMemoryMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record into a namespace.
    pub async fn insert(&self, namespace: &str, content: &str, relevance: f64) {
        self.records
            .write()
            .await
            .entry(namespace.to_string())
            .or_default()
            .push(MemoryRecord {
                namespace: namespace.to_string(),
                content: content.to_string(),
                relevance,
            });
    }

    /// Recorded events as (session, user, assistant) triples.
    pub async fn events(&self) -> Vec<(String, String, String)> {
        self.events.read().await.clone()
    }
}

#[async_trait]
impl MemoryStore for InMemoryMemoryStore {
    async fn retrieve(
        &self,
        _memory_id: &str,
        namespace: &str,
        _query: &str,
        top_k: usize,
    ) -> Result<Vec<MemoryRecord>> {
        let records = self.records.read().await;
        Ok(records
            .get(namespace)
            .map(|list| list.iter().take(top_k).cloned().collect())
            .unwrap_or_default())
    }

    async fn append_event(
        &self,
        config: &MemoryConfig,
        user_text: &str,
        assistant_text: &str,
    ) -> Result<()> {
        self.events.write().await.push((
            config.session_id.clone(),
            user_text.to_string(),
            assistant_text.to_string(),
        ));
        Ok(())
    }
}

/// Hydrates retrieved memory before a run and records the turn afterwards.
///
/// Constructed per request; owns nothing shared beyond the store handle.
#[derive(Clone)]
pub struct MemorySessionManager {
    store: Arc<dyn MemoryStore>,
    config: MemoryConfig,
}

impl MemorySessionManager {
    pub fn new(store: Arc<dyn MemoryStore>, config: MemoryConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Retrieve relevant records across all configured namespaces.
    pub async fn load_context(&self, query: &str) -> Result<Vec<MemoryRecord>> {
        let mut records = Vec::new();
        for entry in &self.config.namespaces {
            let retrieved = self
                .store
                .retrieve(
                    &self.config.memory_id,
                    &entry.namespace,
                    query,
                    entry.retrieval.top_k,
                )
                .await?;
            records.extend(
                retrieved
                    .into_iter()
                    .filter(|record| record.relevance >= entry.retrieval.min_relevance),
            );
        }
        Ok(records)
    }

    /// Record a completed user/assistant turn.
    pub async fn record_turn(&self, user_text: &str, assistant_text: &str) -> Result<()> {
        self.store
            .append_event(&self.config, user_text, assistant_text)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn for_actor_builds_default_namespaces() {
        let config = MemoryConfig::for_actor("mem-1", "sess-1", "user-1");
        let namespaces: Vec<&str> = config
            .namespaces
            .iter()
            .map(|n| n.namespace.as_str())
            .collect();
        assert_eq!(
            namespaces,
            vec![
                "facts/user-1",
                "preferences/user-1",
                "summaries/user-1/sess-1",
                "episodes/user-1/sess-1",
            ]
        );
        assert_eq!(config.namespaces[0].retrieval.top_k, 10);
        assert_eq!(config.namespaces[1].retrieval.min_relevance, 0.5);
    }

    #[tokio::test]
    async fn load_context_filters_by_relevance() {
        let store = Arc::new(InMemoryMemoryStore::new());
        store.insert("facts/user-1", "likes rust", 0.9).await;
        store.insert("facts/user-1", "noise", 0.1).await;

        let manager = MemorySessionManager::new(
            store,
            MemoryConfig::for_actor("mem-1", "sess-1", "user-1"),
        );
        let records = manager.load_context("anything").await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].content, "likes rust");
    }

    #[tokio::test]
    async fn record_turn_appends_event() {
        let store = Arc::new(InMemoryMemoryStore::new());
        let manager = MemorySessionManager::new(
            store.clone(),
            MemoryConfig::for_actor("mem-1", "sess-9", "user-1"),
        );

        manager.record_turn("question", "answer").await.unwrap();

        let events = store.events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, "sess-9");
        assert_eq!(events[0].1, "question");
        assert_eq!(events[0].2, "answer");
    }
}
