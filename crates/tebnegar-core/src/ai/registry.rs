//! SessionRegistry: one live AI session per conversation key.
//!
//! Locking layout:
//! - a synchronous map lock, held only to look up, insert or remove entries
//!   (never across an `.await`);
//! - per entry, a `OnceCell` so exactly one `start_session` runs per key,
//!   and an async mutex around the handle so only one provider interaction
//!   per conversation is in flight.
//!
//! Entries are created lazily, and dropped when the conversation is
//! deleted, when the optional capacity is exceeded (least recently used
//! first), or when idle past the optional TTL.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tebnegar_types::ai::{AiError, ProviderReply, SessionHandle, Turn};
use tebnegar_types::config::RegistryConfig;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::ai::clock::{Clock, SystemClock};
use crate::ai::provider::AiProvider;

/// A handle shared between the registry and whoever is using it.
pub type SharedSession = Arc<tokio::sync::Mutex<SessionHandle>>;

struct Entry {
    session: OnceCell<SharedSession>,
    last_used: Mutex<Instant>,
}

impl Entry {
    fn new(now: Instant) -> Self {
        Self {
            session: OnceCell::new(),
            last_used: Mutex::new(now),
        }
    }

    fn touch(&self, now: Instant) {
        *self.last_used.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    fn last_used(&self) -> Instant {
        *self.last_used.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Whether anything besides the registry map still holds this entry
    /// (a start in progress) or its session handle.
    fn in_use(self: &Arc<Self>) -> bool {
        Arc::strong_count(self) > 1
            || self
                .session
                .get()
                .is_some_and(|session| Arc::strong_count(session) > 1)
    }
}

/// Process-scoped map from conversation key to AI session.
pub struct SessionRegistry<P: AiProvider> {
    provider: P,
    entries: Mutex<HashMap<String, Arc<Entry>>>,
    capacity: Option<usize>,
    idle_ttl: Option<Duration>,
    call_timeout: Duration,
    clock: Arc<dyn Clock>,
}

impl<P: AiProvider> SessionRegistry<P> {
    pub fn new(provider: P, config: &RegistryConfig) -> Self {
        Self::with_clock(provider, config, Arc::new(SystemClock))
    }

    pub fn with_clock(provider: P, config: &RegistryConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            provider,
            entries: Mutex::new(HashMap::new()),
            capacity: config.capacity.filter(|c| *c > 0),
            idle_ttl: config.idle_ttl_secs.map(Duration::from_secs),
            call_timeout: Duration::from_secs(config.call_timeout_secs),
            clock,
        }
    }

    /// The provider every session is created through.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Return the session for `key`, starting an empty one if needed.
    pub async fn get_or_create(&self, key: &str) -> Result<SharedSession, AiError> {
        self.get_or_create_with(key, || async { Vec::new() }).await
    }

    /// Return the session for `key`, starting one seeded by `seed` if needed.
    ///
    /// `seed` only runs when this call performs the creation. Concurrent
    /// callers for the same key wait on that single creation; a failed
    /// creation leaves the key empty so the next caller tries again.
    pub async fn get_or_create_with<F, Fut>(
        &self,
        key: &str,
        seed: F,
    ) -> Result<SharedSession, AiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Vec<Turn>>,
    {
        let entry = self.entry(key);

        let session = entry
            .session
            .get_or_try_init(move || async move {
                let turns = seed().await;
                let seeded = turns.len();
                let handle = self
                    .with_timeout("start_session", self.provider.start_session(turns))
                    .await?;
                info!(key, session = %handle.id(), seeded, "AI session started");
                Ok::<_, AiError>(Arc::new(tokio::sync::Mutex::new(handle)))
            })
            .await
            .inspect_err(|e| warn!(key, error = %e, "failed to start AI session"))?;

        Ok(session.clone())
    }

    /// Send `text` through the session for `key` and return the reply.
    pub async fn send_message(&self, key: &str, text: &str) -> Result<ProviderReply, AiError> {
        self.send_message_with(key, text, || async { Vec::new() }).await
    }

    /// Like [`send_message`](Self::send_message), seeding a fresh session from `seed`.
    pub async fn send_message_with<F, Fut>(
        &self,
        key: &str,
        text: &str,
        seed: F,
    ) -> Result<ProviderReply, AiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Vec<Turn>>,
    {
        let session = self.get_or_create_with(key, seed).await?;
        let mut handle = session.lock().await;

        let reply = self
            .with_timeout("send_message", self.provider.send_message(&mut handle, text))
            .await?;

        self.touch(key);
        debug!(key, turns = handle.len(), "message exchanged");
        Ok(reply)
    }

    /// Send `prompt` through the session for `key` without keeping it.
    ///
    /// Runs under the per-key lock. Returns `Ok(None)` without calling the
    /// provider when the session has no history. Whatever the exchange
    /// appended is removed again, so the history length is the same
    /// afterwards whether the call succeeds or fails.
    pub async fn ask_ephemeral<F, Fut>(
        &self,
        key: &str,
        prompt: &str,
        seed: F,
    ) -> Result<Option<String>, AiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Vec<Turn>>,
    {
        let session = self.get_or_create_with(key, seed).await?;
        let mut handle = session.lock().await;

        if handle.is_empty() {
            return Ok(None);
        }

        let before = handle.len();
        let result = self
            .with_timeout("send_message", self.provider.send_message(&mut handle, prompt))
            .await;

        let appended = match &result {
            Ok(reply) => reply.turns_appended,
            Err(_) => handle.len().saturating_sub(before),
        };
        let removed = handle.truncate_last(appended);
        if handle.len() != before {
            warn!(
                key,
                before,
                after = handle.len(),
                removed,
                "history length changed by ephemeral exchange"
            );
        }

        result.map(|reply| Some(reply.text))
    }

    /// Drop the session for `key`. Returns whether one existed.
    pub fn remove(&self, key: &str) -> bool {
        let removed = self.lock_entries().remove(key);
        let existed = removed.is_some_and(|entry| entry.session.initialized());
        if existed {
            debug!(key, "AI session removed");
        }
        existed
    }

    /// Drop every session unused for longer than the idle TTL.
    ///
    /// Sessions with an interaction in flight are kept. Returns the number
    /// of sessions evicted; always zero when no TTL is configured.
    pub fn evict_idle(&self) -> usize {
        let Some(ttl) = self.idle_ttl else {
            return 0;
        };
        let now = self.clock.now();

        let mut entries = self.lock_entries();
        let before = entries.len();
        entries.retain(|_, entry| {
            entry.in_use() || now.saturating_duration_since(entry.last_used()) < ttl
        });
        let evicted = before - entries.len();

        if evicted > 0 {
            info!(evicted, remaining = entries.len(), "evicted idle AI sessions");
        }
        evicted
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.lock_entries()
            .values()
            .filter(|entry| entry.session.initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a live session exists for `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.lock_entries()
            .get(key)
            .is_some_and(|entry| entry.session.initialized())
    }

    fn lock_entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<Entry>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Find or insert the entry for `key`, evicting the least recently
    /// used idle entry first when the registry is full.
    ///
    /// Entries still in use are never evicted, so the registry can run
    /// over capacity until they are released.
    fn entry(&self, key: &str) -> Arc<Entry> {
        let now = self.clock.now();
        let mut entries = self.lock_entries();

        if let Some(entry) = entries.get(key) {
            entry.touch(now);
            return entry.clone();
        }

        if let Some(capacity) = self.capacity {
            while entries.len() >= capacity {
                let oldest = entries
                    .iter()
                    .filter(|(_, entry)| !entry.in_use())
                    .min_by_key(|(_, entry)| entry.last_used())
                    .map(|(k, _)| k.clone());
                match oldest {
                    Some(oldest) => {
                        entries.remove(&oldest);
                        debug!(key = %oldest, capacity, "evicted least recently used AI session");
                    }
                    None => {
                        debug!(
                            size = entries.len(),
                            capacity,
                            "registry over capacity; every session in use"
                        );
                        break;
                    }
                }
            }
        }

        let entry = Arc::new(Entry::new(now));
        entries.insert(key.to_string(), entry.clone());
        entry
    }

    fn touch(&self, key: &str) {
        let now = self.clock.now();
        if let Some(entry) = self.lock_entries().get(key) {
            entry.touch(now);
        }
    }

    async fn with_timeout<T>(
        &self,
        operation: &str,
        call: impl Future<Output = Result<T, AiError>>,
    ) -> Result<T, AiError> {
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(AiError::unavailable(
                self.provider.name(),
                format!(
                    "{operation} timed out after {}s",
                    self.call_timeout.as_secs_f64()
                ),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use super::*;
    use crate::ai::clock::ManualClock;

    /// Counts calls; optionally slow, failing, or appending extra turns.
    #[derive(Default)]
    struct FakeProvider {
        starts: AtomicUsize,
        sends: AtomicUsize,
        fail_start: AtomicBool,
        fail_send: AtomicBool,
        start_delay: Duration,
        send_delay: Duration,
        turns_per_send: usize,
    }

    impl FakeProvider {
        fn new() -> Self {
            Self {
                turns_per_send: 2,
                ..Default::default()
            }
        }
    }

    impl AiProvider for FakeProvider {
        fn name(&self) -> &str {
            "fake"
        }

        async fn start_session(&self, seed: Vec<Turn>) -> Result<SessionHandle, AiError> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            if !self.start_delay.is_zero() {
                tokio::time::sleep(self.start_delay).await;
            }
            if self.fail_start.load(Ordering::SeqCst) {
                return Err(AiError::unavailable("fake", "cannot start"));
            }
            Ok(SessionHandle::new(Arc::from("sys"), seed))
        }

        async fn send_message(
            &self,
            handle: &mut SessionHandle,
            text: &str,
        ) -> Result<ProviderReply, AiError> {
            self.sends.fetch_add(1, Ordering::SeqCst);
            if !self.send_delay.is_zero() {
                tokio::time::sleep(self.send_delay).await;
            }
            if self.fail_send.load(Ordering::SeqCst) {
                return Err(AiError::unavailable("fake", "connection reset"));
            }
            handle.push(Turn::user(text));
            for i in 1..self.turns_per_send {
                handle.push(Turn::model(format!("reply {i} to {text}")));
            }
            Ok(ProviderReply {
                text: format!("reply to {text}"),
                turns_appended: self.turns_per_send,
                usage: None,
            })
        }
    }

    fn registry(provider: FakeProvider) -> SessionRegistry<FakeProvider> {
        SessionRegistry::new(provider, &RegistryConfig::default())
    }

    #[tokio::test]
    async fn test_first_message_starts_once_then_reuses() {
        let registry = registry(FakeProvider::new());

        let reply = registry.send_message("c1", "hello").await.unwrap();
        assert_eq!(reply.text, "reply to hello");
        assert_eq!(registry.provider().starts.load(Ordering::SeqCst), 1);
        assert_eq!(registry.provider().sends.load(Ordering::SeqCst), 1);

        registry.send_message("c1", "still here").await.unwrap();
        assert_eq!(registry.provider().starts.load(Ordering::SeqCst), 1);
        assert_eq!(registry.provider().sends.load(Ordering::SeqCst), 2);

        let session = registry.get_or_create("c1").await.unwrap();
        assert_eq!(session.lock().await.len(), 4);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_get_or_create_starts_one_session() {
        let provider = FakeProvider {
            start_delay: Duration::from_millis(50),
            ..FakeProvider::new()
        };
        let registry = Arc::new(registry(provider));

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let registry = registry.clone();
            tasks.push(tokio::spawn(
                async move { registry.get_or_create("c1").await },
            ));
        }

        let mut sessions = Vec::new();
        for task in tasks {
            sessions.push(task.await.unwrap().unwrap());
        }

        assert_eq!(registry.provider().starts.load(Ordering::SeqCst), 1);
        assert!(sessions.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block_each_other() {
        let provider = FakeProvider {
            send_delay: Duration::from_millis(300),
            ..FakeProvider::new()
        };
        let registry = Arc::new(registry(provider));

        // Hold c1's lock for the whole test.
        let c1 = registry.get_or_create("c1").await.unwrap();
        let _guard = c1.lock().await;

        let started = Instant::now();
        let other = registry.clone();
        let reply = tokio::time::timeout(
            Duration::from_secs(2),
            async move { other.send_message("c2", "hi").await },
        )
        .await
        .expect("c2 must not wait for c1")
        .unwrap();

        assert_eq!(reply.text, "reply to hi");
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_same_key_sends_are_serialized() {
        let provider = FakeProvider {
            send_delay: Duration::from_millis(20),
            ..FakeProvider::new()
        };
        let registry = Arc::new(registry(provider));

        let mut tasks = Vec::new();
        for i in 0..8 {
            let registry = registry.clone();
            tasks.push(tokio::spawn(async move {
                registry.send_message("c1", &format!("m{i}")).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let session = registry.get_or_create("c1").await.unwrap();
        let handle = session.lock().await;
        assert_eq!(handle.len(), 16);
        // Every user turn is directly followed by its own reply.
        for pair in handle.history().chunks(2) {
            assert_eq!(pair[1].content, format!("reply 1 to {}", pair[0].content));
        }
    }

    #[tokio::test]
    async fn test_failed_start_leaves_key_uncreated() {
        let provider = FakeProvider::new();
        provider.fail_start.store(true, Ordering::SeqCst);
        let registry = registry(provider);

        let err = registry.send_message("c1", "hello").await.unwrap_err();
        assert!(matches!(err, AiError::ProviderUnavailable { .. }));
        assert!(!registry.contains("c1"));
        assert_eq!(registry.len(), 0);

        registry.provider().fail_start.store(false, Ordering::SeqCst);
        registry.send_message("c1", "hello").await.unwrap();
        assert_eq!(registry.provider().starts.load(Ordering::SeqCst), 2);
        assert!(registry.contains("c1"));
    }

    #[tokio::test]
    async fn test_failed_send_keeps_session_and_history() {
        let registry = registry(FakeProvider::new());
        registry.send_message("c1", "hello").await.unwrap();

        registry.provider().fail_send.store(true, Ordering::SeqCst);
        let err = registry.send_message("c1", "again").await.unwrap_err();
        assert!(err.to_string().contains("connection reset"));

        let session = registry.get_or_create("c1").await.unwrap();
        assert_eq!(session.lock().await.len(), 2);
        assert_eq!(registry.provider().starts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_send_timeout_maps_to_unavailable_without_mutation() {
        let provider = FakeProvider {
            send_delay: Duration::from_millis(1500),
            ..FakeProvider::new()
        };
        let config = RegistryConfig {
            call_timeout_secs: 1,
            ..RegistryConfig::default()
        };
        let registry = SessionRegistry::new(provider, &config);

        let err = registry.send_message("c1", "hello").await.unwrap_err();
        match err {
            AiError::ProviderUnavailable { provider, reason } => {
                assert_eq!(provider, "fake");
                assert!(reason.contains("timed out"));
            }
        }

        let session = registry.get_or_create("c1").await.unwrap();
        assert!(session.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_get_or_create_with_seeds_only_on_creation() {
        let registry = registry(FakeProvider::new());
        let seed_calls = AtomicUsize::new(0);
        let calls = &seed_calls;

        let seed = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            vec![Turn::user("earlier"), Turn::model("noted")]
        };
        let session = registry.get_or_create_with("c1", seed).await.unwrap();
        assert_eq!(session.lock().await.len(), 2);

        let again = registry
            .get_or_create_with("c1", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Vec::new()
            })
            .await
            .unwrap();
        assert!(Arc::ptr_eq(&session, &again));
        assert_eq!(seed_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_ask_ephemeral_on_empty_history_skips_provider() {
        let registry = registry(FakeProvider::new());

        let answer = registry
            .ask_ephemeral("c1", "title?", || async { Vec::new() })
            .await
            .unwrap();

        assert!(answer.is_none());
        assert_eq!(registry.provider().sends.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ask_ephemeral_trims_reported_delta() {
        let provider = FakeProvider {
            turns_per_send: 3,
            ..FakeProvider::new()
        };
        let registry = registry(provider);
        registry.send_message("c1", "hello").await.unwrap();

        let session = registry.get_or_create("c1").await.unwrap();
        let before = session.lock().await.history().to_vec();

        let answer = registry
            .ask_ephemeral("c1", "title?", || async { Vec::new() })
            .await
            .unwrap();

        assert_eq!(answer.as_deref(), Some("reply to title?"));
        assert_eq!(session.lock().await.history(), before.as_slice());
    }

    #[tokio::test]
    async fn test_ask_ephemeral_failure_keeps_history() {
        let registry = registry(FakeProvider::new());
        registry.send_message("c1", "hello").await.unwrap();
        registry.provider().fail_send.store(true, Ordering::SeqCst);

        let result = registry
            .ask_ephemeral("c1", "title?", || async { Vec::new() })
            .await;

        assert!(result.is_err());
        let session = registry.get_or_create("c1").await.unwrap();
        assert_eq!(session.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn test_remove_drops_session() {
        let registry = registry(FakeProvider::new());
        registry.send_message("c1", "hello").await.unwrap();

        assert!(registry.remove("c1"));
        assert!(!registry.remove("c1"));
        assert!(registry.is_empty());

        registry.send_message("c1", "hello again").await.unwrap();
        assert_eq!(registry.provider().starts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_capacity_evicts_least_recently_used() {
        let clock = Arc::new(ManualClock::new());
        let config = RegistryConfig {
            capacity: Some(2),
            ..RegistryConfig::default()
        };
        let registry = SessionRegistry::with_clock(FakeProvider::new(), &config, clock.clone());

        registry.get_or_create("a").await.unwrap();
        clock.advance(Duration::from_secs(1));
        registry.get_or_create("b").await.unwrap();
        clock.advance(Duration::from_secs(1));
        // Touch "a" so "b" becomes the oldest.
        registry.get_or_create("a").await.unwrap();
        clock.advance(Duration::from_secs(1));
        registry.get_or_create("c").await.unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.contains("a"));
        assert!(!registry.contains("b"));
        assert!(registry.contains("c"));
    }

    #[tokio::test]
    async fn test_capacity_never_evicts_session_being_started() {
        let config = RegistryConfig {
            capacity: Some(1),
            ..RegistryConfig::default()
        };
        let provider = FakeProvider {
            start_delay: Duration::from_millis(100),
            ..FakeProvider::new()
        };
        let registry = Arc::new(SessionRegistry::new(provider, &config));

        let first = tokio::spawn({
            let registry = registry.clone();
            async move { registry.get_or_create("a").await.unwrap() }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        let other = tokio::spawn({
            let registry = registry.clone();
            async move { registry.get_or_create("b").await.unwrap() }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        let again = registry.get_or_create("a").await.unwrap();

        let first = first.await.unwrap();
        other.await.unwrap();
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(registry.provider().starts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_capacity_never_evicts_locked_session() {
        let config = RegistryConfig {
            capacity: Some(1),
            ..RegistryConfig::default()
        };
        let registry = SessionRegistry::new(FakeProvider::new(), &config);

        let session = registry.get_or_create("a").await.unwrap();
        let guard = session.lock().await;
        let other = registry.get_or_create("b").await.unwrap();
        let again = registry.get_or_create("a").await.unwrap();

        assert!(Arc::ptr_eq(&session, &again));
        assert!(again.try_lock().is_err());
        assert_eq!(registry.provider().starts.load(Ordering::SeqCst), 2);
        assert_eq!(registry.len(), 2);

        // Once released, the next insert brings the registry back to capacity.
        drop(guard);
        drop((session, other, again));
        registry.get_or_create("c").await.unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("c"));
    }

    #[tokio::test]
    async fn test_evict_idle_respects_ttl() {
        let clock = Arc::new(ManualClock::new());
        let config = RegistryConfig {
            idle_ttl_secs: Some(60),
            ..RegistryConfig::default()
        };
        let registry = SessionRegistry::with_clock(FakeProvider::new(), &config, clock.clone());

        registry.send_message("old", "hi").await.unwrap();
        clock.advance(Duration::from_secs(45));
        registry.send_message("fresh", "hi").await.unwrap();
        clock.advance(Duration::from_secs(30));

        assert_eq!(registry.evict_idle(), 1);
        assert!(!registry.contains("old"));
        assert!(registry.contains("fresh"));
    }

    #[tokio::test]
    async fn test_evict_idle_keeps_busy_sessions() {
        let clock = Arc::new(ManualClock::new());
        let config = RegistryConfig {
            idle_ttl_secs: Some(10),
            ..RegistryConfig::default()
        };
        let registry = SessionRegistry::with_clock(FakeProvider::new(), &config, clock.clone());

        let session = registry.get_or_create("c1").await.unwrap();
        let _guard = session.lock().await;
        clock.advance(Duration::from_secs(60));

        assert_eq!(registry.evict_idle(), 0);
        assert!(registry.contains("c1"));
    }

    #[tokio::test]
    async fn test_evict_idle_without_ttl_is_noop() {
        let registry = registry(FakeProvider::new());
        registry.send_message("c1", "hi").await.unwrap();
        assert_eq!(registry.evict_idle(), 0);
        assert_eq!(registry.len(), 1);
    }
}
