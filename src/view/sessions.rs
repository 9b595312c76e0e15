use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::session::{ViewDeps, ViewSession};

pub const DEFAULT_MAX_SESSIONS: usize = 1000;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Too many active view sessions (limit {0})")]
    LimitReached(usize),
}

/// All live view sessions, by id.
pub struct SessionRepo {
    sessions: Arc<RwLock<HashMap<String, Arc<ViewSession>>>>,
    deps: ViewDeps,
    debounce: Duration,
    idle: Duration,
    max_sessions: usize,
}

impl SessionRepo {
    pub fn new(deps: ViewDeps, debounce: Duration, idle: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            deps,
            debounce,
            idle,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }

    pub fn with_limit(mut self, max_sessions: usize) -> Self {
        self.max_sessions = max_sessions;
        self
    }

    pub fn deps(&self) -> &ViewDeps {
        &self.deps
    }

    /// Start a session in the background with its input set to `query`.
    pub async fn create(&self, query: &str) -> Result<Arc<ViewSession>, SessionError> {
        self.admit(|id| ViewSession::start(id, self.deps.clone(), self.debounce, query))
            .await
    }

    /// Start a session with its input set to `query` and wait for the
    /// first results and the trending list.
    pub async fn open(&self, query: &str) -> Result<Arc<ViewSession>, SessionError> {
        let session = self
            .admit(|id| ViewSession::launch(id, self.deps.clone(), self.debounce, query))
            .await?;
        session.load_initial(query).await;
        Ok(session)
    }

    async fn admit<F>(&self, launch: F) -> Result<Arc<ViewSession>, SessionError>
    where
        F: FnOnce(String) -> Arc<ViewSession>,
    {
        if self.len().await >= self.max_sessions {
            self.reap_idle().await;
        }

        let mut sessions = self.sessions.write().await;
        if sessions.len() >= self.max_sessions {
            warn!("Refusing new view session, {} already active", sessions.len());
            return Err(SessionError::LimitReached(self.max_sessions));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let session = launch(id.clone());
        sessions.insert(id.clone(), Arc::clone(&session));

        debug!("Started view session {} ({} active)", id, sessions.len());
        Ok(session)
    }

    pub async fn get(&self, id: &str) -> Option<Arc<ViewSession>> {
        let session = self.sessions.read().await.get(id).cloned()?;
        session.touch().await;
        Some(session)
    }

    pub async fn remove(&self, id: &str) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop sessions unused for longer than the idle timeout.
    pub async fn reap_idle(&self) -> usize {
        let idle = chrono::Duration::from_std(self.idle).unwrap_or_else(|_| chrono::Duration::weeks(52 * 100));
        let now = Utc::now();

        let mut expired = Vec::new();
        {
            let sessions = self.sessions.read().await;
            for (id, session) in sessions.iter() {
                if now.signed_duration_since(session.last_used().await) > idle {
                    expired.push(id.clone());
                }
            }
        }

        if expired.is_empty() {
            return 0;
        }

        let mut sessions = self.sessions.write().await;
        for id in &expired {
            sessions.remove(id);
        }
        info!("Dropped {} idle view sessions", expired.len());
        expired.len()
    }

    pub fn start_background_reaper(self: Arc<Self>, interval: Duration) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(interval);
            loop {
                interval.tick().await;
                self.reap_idle().await;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Movie;
    use crate::metrics::MemoryRepository;
    use crate::view::session::tests::{deps, FakeCatalog};

    fn repo(idle: Duration) -> SessionRepo {
        let catalog = Arc::new(FakeCatalog::default().with("", vec![Movie::new(1, None)]));
        SessionRepo::new(
            deps(catalog, Arc::new(MemoryRepository::new())),
            Duration::from_millis(500),
            idle,
        )
    }

    #[tokio::test]
    async fn test_create_get_remove() {
        let sessions = repo(Duration::from_secs(60));
        let session = sessions.create("").await.unwrap();

        let found = sessions.get(session.id()).await.unwrap();
        assert_eq!(found.id(), session.id());
        assert_eq!(sessions.len().await, 1);

        assert!(sessions.remove(session.id()).await);
        assert!(!sessions.remove(session.id()).await);
        assert!(sessions.get(session.id()).await.is_none());
    }

    #[tokio::test]
    async fn test_reap_idle() {
        let sessions = repo(Duration::ZERO);
        let stale = sessions.create("").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(sessions.reap_idle().await, 1);
        assert!(sessions.get(stale.id()).await.is_none());

        let sessions = repo(Duration::from_secs(3600));
        sessions.create("").await.unwrap();
        assert_eq!(sessions.reap_idle().await, 0);
        assert_eq!(sessions.len().await, 1);
    }

    #[tokio::test]
    async fn test_session_limit() {
        let sessions = repo(Duration::from_secs(60)).with_limit(2);
        let first = sessions.create("").await.unwrap();
        sessions.open("").await.unwrap();

        assert!(matches!(sessions.create("").await, Err(SessionError::LimitReached(2))));
        assert!(matches!(sessions.open("").await, Err(SessionError::LimitReached(2))));
        assert_eq!(sessions.len().await, 2);

        sessions.remove(first.id()).await;
        assert!(sessions.create("").await.is_ok());
    }

    #[tokio::test]
    async fn test_full_repo_reaps_idle_sessions_first() {
        let sessions = repo(Duration::ZERO).with_limit(1);
        let stale = sessions.create("").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let fresh = sessions.create("").await.unwrap();
        assert_ne!(fresh.id(), stale.id());
        assert_eq!(sessions.len().await, 1);
    }

    #[tokio::test]
    async fn test_open_waits_for_first_results() {
        let sessions = repo(Duration::from_secs(60));
        let session = sessions.open("").await.unwrap();

        let state = session.state().await;
        assert!(!state.is_search_loading);
        assert!(!state.is_trending_loading);
        assert_eq!(state.movie_list.len(), 1);
    }
}
