//! Per-user session state: identity, the query-engine cache, the transcript.

use crate::error::Result;
use crate::query_engine::QueryEngine;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Identifies a prepared query engine: `"{session_id}-{file_name}"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(session_id: &Uuid, file_name: &str) -> Self {
        CacheKey(format!("{session_id}-{file_name}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Assistant => f.write_str("assistant"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

pub struct Session {
    id: Uuid,
    file_cache: HashMap<CacheKey, Arc<QueryEngine>>,
    messages: Vec<Message>,
    context: Option<String>,
    active: Option<CacheKey>,
}

impl Session {
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4())
    }

    pub fn with_id(id: Uuid) -> Self {
        debug!(session_id = %id, "session created");
        Session {
            id,
            file_cache: HashMap::new(),
            messages: Vec::new(),
            context: None,
            active: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn cache_key(&self, file_name: &str) -> CacheKey {
        CacheKey::new(&self.id, file_name)
    }

    pub fn is_cached(&self, key: &CacheKey) -> bool {
        self.file_cache.contains_key(key)
    }

    pub fn cached_engines(&self) -> usize {
        self.file_cache.len()
    }

    pub fn cached_engine(&self, key: &CacheKey) -> Option<Arc<QueryEngine>> {
        self.file_cache.get(key).cloned()
    }

    /// Returns the engine cached under `key`, running `build` only on a miss.
    /// A failed build leaves the cache as it was.
    pub async fn get_or_build<F, Fut>(&mut self, key: CacheKey, build: F) -> Result<Arc<QueryEngine>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<QueryEngine>>,
    {
        if let Some(engine) = self.file_cache.get(&key) {
            debug!(%key, "query engine cache hit");
            return Ok(Arc::clone(engine));
        }

        let engine = Arc::new(build().await?);
        info!(%key, "query engine cached");
        self.file_cache.insert(key, Arc::clone(&engine));
        Ok(engine)
    }

    /// Makes the engine under `key` the one chat questions go to. Returns
    /// false if nothing is cached under `key`.
    pub fn activate(&mut self, key: &CacheKey) -> bool {
        if self.file_cache.contains_key(key) {
            self.active = Some(key.clone());
            true
        } else {
            false
        }
    }

    pub fn active_engine(&self) -> Option<Arc<QueryEngine>> {
        self.active.as_ref().and_then(|key| self.cached_engine(key))
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub(crate) fn push_message(&mut self, role: Role, content: impl Into<String>) {
        self.messages.push(Message {
            role,
            content: content.into(),
        });
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn set_context(&mut self, context: Option<String>) {
        self.context = context;
    }

    /// Clears the transcript and context and drops their allocations. The
    /// query-engine cache and the active document survive.
    pub fn reset(&mut self) {
        let cleared = self.messages.len();
        self.messages = Vec::new();
        self.context = None;
        info!(session_id = %self.id, cleared, "chat reset");
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
