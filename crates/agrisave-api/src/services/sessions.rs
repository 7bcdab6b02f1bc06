//! In-memory farmer login sessions.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use agrisave_models::{FarmerProfile, FarmerSession, Language};
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

/// Sessions kept before the least recently used ones are dropped.
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

struct SessionEntry {
    session: FarmerSession,
    last_seen: Instant,
}

/// Session store. Sessions live until deleted, evicted as idle, or pushed
/// out by newer sessions once the store is full.
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, SessionEntry>>,
    max_sessions: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SESSIONS)
    }
}

impl SessionStore {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions: max_sessions.max(1),
        }
    }

    pub async fn create(&self, profile: FarmerProfile, language: Language) -> FarmerSession {
        let session = FarmerSession::new(profile, language);
        info!(session_id = %session.id, location = %session.profile.location, "Farmer logged in");

        let mut sessions = self.sessions.write().await;
        if sessions.len() >= self.max_sessions {
            let mut entries: Vec<_> = sessions.iter().map(|(id, e)| (*id, e.last_seen)).collect();
            entries.sort_by_key(|(_, seen)| *seen);

            let to_remove = sessions.len() + 1 - self.max_sessions;
            for (id, _) in entries.into_iter().take(to_remove) {
                sessions.remove(&id);
            }
            warn!("Session store exceeded capacity, removed {} sessions", to_remove);
        }

        sessions.insert(
            session.id,
            SessionEntry {
                session: session.clone(),
                last_seen: Instant::now(),
            },
        );
        session
    }

    /// Look up a session and mark it as used.
    pub async fn get(&self, id: Uuid) -> Option<FarmerSession> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(&id)?;
        entry.last_seen = Instant::now();
        Some(entry.session.clone())
    }

    /// Change the session language. Returns the updated session.
    pub async fn set_language(&self, id: Uuid, language: Language) -> Option<FarmerSession> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(&id)?;
        entry.session.language = language;
        entry.last_seen = Instant::now();
        Some(entry.session.clone())
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    /// Drop sessions not used for `max_idle`. Returns how many were dropped.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        let now = Instant::now();
        sessions.retain(|_, entry| now.duration_since(entry.last_seen) < max_idle);
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(name: &str) -> FarmerProfile {
        FarmerProfile::new(name, "Pune").unwrap()
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let store = SessionStore::default();
        let session = store.create(profile("Asha"), Language::En).await;

        assert_eq!(store.get(session.id).await.unwrap().profile.name, "Asha");

        let updated = store.set_language(session.id, Language::Hi).await.unwrap();
        assert_eq!(updated.language, Language::Hi);

        assert!(store.remove(session.id).await);
        assert!(!store.remove(session.id).await);
        assert!(store.get(session.id).await.is_none());
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_idle_sessions_evicted() {
        let store = SessionStore::default();
        let stale = store.create(profile("Asha"), Language::En).await;
        let active = store.create(profile("Ravi"), Language::Hi).await;

        tokio::time::sleep(Duration::from_millis(60)).await;
        store.get(active.id).await.unwrap();

        assert_eq!(store.evict_idle(Duration::from_millis(40)).await, 1);
        assert!(store.get(stale.id).await.is_none());
        assert!(store.get(active.id).await.is_some());
    }

    #[tokio::test]
    async fn test_capacity_drops_least_recent() {
        let store = SessionStore::new(2);
        let first = store.create(profile("Asha"), Language::En).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = store.create(profile("Ravi"), Language::En).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        store.get(first.id).await.unwrap();

        let third = store.create(profile("Meena"), Language::En).await;
        assert_eq!(store.len().await, 2);
        assert!(store.get(second.id).await.is_none());
        assert!(store.get(first.id).await.is_some());
        assert!(store.get(third.id).await.is_some());
    }
}
