//! Per-session conversation history.
//!
//! Keyed by session token; each entry is an append-only sequence of
//! turns plus the last draft/response for session resume. The table is
//! LRU-bounded with an idle TTL so memory stays bounded even if no
//! explicit cleanup ever runs.
//!
//! Turn ordering on a single token is the caller's concern: acquire
//! [`ConversationStore::turn_lock`] around load → pipeline → append so
//! rapid double-submits on one token queue up while unrelated sessions
//! proceed in parallel.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lru::LruCache;
use quill_types::{ConversationTurn, DraftDocument};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, trace};

/// Default maximum number of concurrently-tracked conversations.
pub const DEFAULT_MAX_CONVERSATIONS: usize = 10_000;

/// Default idle TTL for a conversation (2 hours).
pub const DEFAULT_CONVERSATION_TTL: Duration = Duration::from_secs(2 * 3600);

/// Configuration for the conversation store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Maximum conversations before LRU eviction.
    pub max_conversations: usize,

    /// Idle TTL; `None` disables time-based expiry.
    pub ttl: Option<Duration>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_conversations: DEFAULT_MAX_CONVERSATIONS,
            ttl: Some(DEFAULT_CONVERSATION_TTL),
        }
    }
}

impl StoreConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of tracked conversations.
    pub fn with_max_conversations(mut self, max: usize) -> Self {
        self.max_conversations = max;
        self
    }

    /// Set the idle TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Disable time-based expiry.
    pub fn without_ttl(mut self) -> Self {
        self.ttl = None;
        self
    }
}

/// Last stored draft and response, for session resume.
#[derive(Debug, Clone, Default)]
pub struct SessionResume {
    /// The draft after the most recent turn, if any.
    pub draft: Option<DraftDocument>,
    /// The most recent assistant response, if any.
    pub response: Option<String>,
}

/// One conversation's state.
#[derive(Debug, Default)]
struct Conversation {
    turns: Vec<ConversationTurn>,
    resume: SessionResume,
    last_access: Option<Instant>,
}

impl Conversation {
    fn is_expired(&self, ttl: Option<Duration>) -> bool {
        match (ttl, self.last_access) {
            (Some(ttl), Some(at)) => at.elapsed() > ttl,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    fn touch(&mut self) {
        self.last_access = Some(Instant::now());
    }
}

struct StoreInner {
    conversations: LruCache<String, Conversation>,
    /// Per-token critical sections for turn serialization.
    turn_locks: HashMap<String, Arc<Mutex<()>>>,
}

/// Shared, concurrently-accessed conversation table.
pub struct ConversationStore {
    inner: Arc<RwLock<StoreInner>>,
    config: StoreConfig,
}

impl ConversationStore {
    /// Create an empty store.
    pub fn new(config: StoreConfig) -> Self {
        let cap = NonZeroUsize::new(config.max_conversations)
            .unwrap_or_else(|| NonZeroUsize::new(1).unwrap());

        Self {
            inner: Arc::new(RwLock::new(StoreInner {
                conversations: LruCache::new(cap),
                turn_locks: HashMap::new(),
            })),
            config,
        }
    }

    /// Current number of tracked conversations.
    pub async fn len(&self) -> usize {
        self.inner.read().await.conversations.len()
    }

    /// True if no conversations are tracked.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.conversations.is_empty()
    }

    /// The per-token turn lock.
    ///
    /// Hold the lock across load-history → run-pipeline → append so
    /// turns on one token never interleave. Different tokens get
    /// independent locks.
    pub async fn turn_lock(&self, token: &str) -> Arc<Mutex<()>> {
        let mut inner = self.inner.write().await;
        inner
            .turn_locks
            .entry(token.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Return the history for a token, creating an empty conversation
    /// if none exists. This is the only creation path.
    pub async fn get_or_create(&self, token: &str) -> Vec<ConversationTurn> {
        let mut inner = self.inner.write().await;
        self.drop_if_expired(&mut inner, token);

        if let Some(conv) = inner.conversations.get_mut(token) {
            conv.touch();
            return conv.turns.clone();
        }

        trace!(conversations = inner.conversations.len() + 1, "New conversation");
        self.insert_fresh(&mut inner, token);
        Vec::new()
    }

    /// Append a turn to a token's history.
    ///
    /// Turns are never edited or removed individually once appended.
    pub async fn append(&self, token: &str, turn: ConversationTurn) {
        let mut inner = self.inner.write().await;
        self.drop_if_expired(&mut inner, token);

        if inner.conversations.get(token).is_none() {
            self.insert_fresh(&mut inner, token);
        }
        if let Some(conv) = inner.conversations.get_mut(token) {
            conv.turns.push(turn);
            conv.touch();
        }
    }

    /// The current history for a token, if the conversation exists.
    pub async fn history(&self, token: &str) -> Option<Vec<ConversationTurn>> {
        let mut inner = self.inner.write().await;
        self.drop_if_expired(&mut inner, token);
        inner.conversations.get_mut(token).map(|conv| {
            conv.touch();
            conv.turns.clone()
        })
    }

    /// Store the latest draft and response for session resume.
    pub async fn set_resume(
        &self,
        token: &str,
        draft: Option<DraftDocument>,
        response: Option<String>,
    ) {
        let mut inner = self.inner.write().await;
        if let Some(conv) = inner.conversations.get_mut(token) {
            if draft.is_some() {
                conv.resume.draft = draft;
            }
            if response.is_some() {
                conv.resume.response = response;
            }
            conv.touch();
        }
    }

    /// The last stored draft/response for a token, without touching LRU order.
    pub async fn resume(&self, token: &str) -> Option<SessionResume> {
        let inner = self.inner.read().await;
        let conv = inner.conversations.peek(token)?;
        if conv.is_expired(self.config.ttl) {
            return None;
        }
        Some(conv.resume.clone())
    }

    /// Discard a conversation and its turn lock.
    pub async fn remove(&self, token: &str) -> bool {
        let mut inner = self.inner.write().await;
        inner.turn_locks.remove(token);
        inner.conversations.pop(token).is_some()
    }

    /// Drop all expired conversations, returning the count removed.
    pub async fn cleanup_expired(&self) -> usize {
        let mut inner = self.inner.write().await;

        let expired: Vec<String> = inner
            .conversations
            .iter()
            .filter(|(_, conv)| conv.is_expired(self.config.ttl))
            .map(|(token, _)| token.clone())
            .collect();

        for token in &expired {
            inner.conversations.pop(token);
            inner.turn_locks.remove(token);
        }

        if !expired.is_empty() {
            debug!(removed = expired.len(), "Expired conversations dropped");
        }
        expired.len()
    }

    fn drop_if_expired(&self, inner: &mut StoreInner, token: &str) {
        let expired = inner
            .conversations
            .peek(token)
            .is_some_and(|c| c.is_expired(self.config.ttl));
        if expired {
            debug!("Conversation expired, dropping");
            inner.conversations.pop(token);
            inner.turn_locks.remove(token);
        }
    }

    fn insert_fresh(&self, inner: &mut StoreInner, token: &str) {
        let mut conv = Conversation::default();
        conv.touch();
        if let Some((evicted, _)) = inner.conversations.push(token.to_string(), conv) {
            if evicted != token {
                debug!("LRU-evicted conversation to make room");
                inner.turn_locks.remove(&evicted);
            }
        }
    }
}

impl Clone for ConversationStore {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            config: self.config.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_or_create_initializes_once() {
        let store = ConversationStore::new(StoreConfig::new());

        assert!(store.get_or_create("tok-1").await.is_empty());
        store.append("tok-1", ConversationTurn::user("hi")).await;
        assert_eq!(store.get_or_create("tok-1").await.len(), 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_append_preserves_order() {
        let store = ConversationStore::new(StoreConfig::new());

        for i in 0..3 {
            store
                .append("tok-1", ConversationTurn::user(format!("u{i}")))
                .await;
            store
                .append("tok-1", ConversationTurn::assistant(format!("a{i}")))
                .await;
        }

        let history = store.history("tok-1").await.unwrap();
        assert_eq!(history.len(), 6);
        assert_eq!(history[0].content, "u0");
        assert_eq!(history[5].content, "a2");
    }

    #[tokio::test]
    async fn test_history_missing_token() {
        let store = ConversationStore::new(StoreConfig::new());
        assert!(store.history("nope").await.is_none());
    }

    #[tokio::test]
    async fn test_resume_state() {
        let store = ConversationStore::new(StoreConfig::new());
        store.get_or_create("tok-1").await;

        let draft = DraftDocument::new();
        store
            .set_resume("tok-1", Some(draft.clone()), Some("answer".to_string()))
            .await;

        let resume = store.resume("tok-1").await.unwrap();
        assert_eq!(resume.response.as_deref(), Some("answer"));
        assert!(resume.draft.is_some());

        // A later turn with no draft keeps the previous one.
        store
            .set_resume("tok-1", None, Some("second".to_string()))
            .await;
        let resume = store.resume("tok-1").await.unwrap();
        assert_eq!(resume.response.as_deref(), Some("second"));
        assert!(resume.draft.is_some());
    }

    #[tokio::test]
    async fn test_remove() {
        let store = ConversationStore::new(StoreConfig::new());
        store.get_or_create("tok-1").await;

        assert!(store.remove("tok-1").await);
        assert!(!store.remove("tok-1").await);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_lru_eviction_bounds_memory() {
        let store = ConversationStore::new(StoreConfig::new().with_max_conversations(2));

        store.get_or_create("tok-1").await;
        store.get_or_create("tok-2").await;
        store.get_or_create("tok-3").await;

        assert_eq!(store.len().await, 2);
        assert!(store.history("tok-1").await.is_none());
        assert!(store.history("tok-3").await.is_some());
    }

    #[tokio::test]
    async fn test_ttl_expiry() {
        let store =
            ConversationStore::new(StoreConfig::new().with_ttl(Duration::from_millis(30)));
        store.append("tok-1", ConversationTurn::user("hi")).await;

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(store.history("tok-1").await.is_none());
    }

    #[tokio::test]
    async fn test_cleanup_expired_counts() {
        let store =
            ConversationStore::new(StoreConfig::new().with_ttl(Duration::from_millis(20)));
        store.get_or_create("tok-1").await;
        store.get_or_create("tok-2").await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.cleanup_expired().await, 2);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_turn_lock_is_shared_per_token() {
        let store = ConversationStore::new(StoreConfig::new());

        let a = store.turn_lock("tok-1").await;
        let b = store.turn_lock("tok-1").await;
        assert!(Arc::ptr_eq(&a, &b));

        let c = store.turn_lock("tok-2").await;
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[tokio::test]
    async fn test_turn_lock_serializes_same_token() {
        let store = ConversationStore::new(StoreConfig::new());
        let store2 = store.clone();

        // Two "turns" on the same token append user+assistant pairs under
        // the lock; the pairs must never interleave.
        let task = |store: ConversationStore, tag: &'static str| async move {
            let lock = store.turn_lock("tok-1").await;
            let _guard = lock.lock().await;
            store
                .append("tok-1", ConversationTurn::user(format!("{tag}-user")))
                .await;
            tokio::time::sleep(Duration::from_millis(10)).await;
            store
                .append("tok-1", ConversationTurn::assistant(format!("{tag}-assistant")))
                .await;
        };

        let (a, b) = tokio::join!(task(store.clone(), "a"), task(store2, "b"));
        let _ = (a, b);

        let history = store.history("tok-1").await.unwrap();
        assert_eq!(history.len(), 4);
        // First two entries form one complete pair.
        let first_tag = history[0].content.split('-').next().unwrap().to_string();
        assert_eq!(history[1].content, format!("{first_tag}-assistant"));
    }
}
