use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, error};

use crate::catalog::MovieCatalog;
use crate::metrics::{AnalyticsOutcome, SearchAnalytics};
use crate::search::SearchInput;
use super::state::{ViewSnapshot, ViewState};

/// The collaborators a view talks to, built once at startup.
#[derive(Clone)]
pub struct ViewDeps {
    pub catalog: Arc<dyn MovieCatalog>,
    pub analytics: Arc<SearchAnalytics>,
}

/// How a single movie fetch ended.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Applied {
        results: usize,
        analytics: Option<AnalyticsOutcome>,
    },
    Failed,
    /// A newer fetch was issued while this one was in flight.
    Stale,
}

/// One instance of the main view: its state, search input and fetches.
pub struct ViewSession {
    id: String,
    deps: ViewDeps,
    state: RwLock<ViewState>,
    input: SearchInput,
    latest_fetch: AtomicU64,
    last_used: RwLock<DateTime<Utc>>,
}

impl ViewSession {
    fn build(
        id: String,
        deps: ViewDeps,
        window: Duration,
        query: &str,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        let (input, settled) = SearchInput::with_text(query, window);
        let state = ViewState {
            search_term: query.to_string(),
            debounced_search_term: query.to_string(),
            ..ViewState::default()
        };
        let session = Arc::new(Self {
            id,
            deps,
            state: RwLock::new(state),
            input,
            latest_fetch: AtomicU64::new(0),
            last_used: RwLock::new(Utc::now()),
        });
        (session, settled)
    }

    /// Create a session whose input starts at `query` and start it in the
    /// background: the trending list is loaded once, `query` is fetched
    /// (the popular listing when empty), and every settled search term
    /// triggers a new fetch.
    pub fn start(id: String, deps: ViewDeps, window: Duration, query: &str) -> Arc<Self> {
        let session = Self::launch(id, deps, window, query);

        let s = Arc::clone(&session);
        let query = query.to_string();
        tokio::spawn(async move {
            s.load_initial(&query).await;
        });

        session
    }

    /// Like [`ViewSession::start`], but the initial loads are left to the
    /// caller through [`ViewSession::load_initial`].
    pub fn launch(id: String, deps: ViewDeps, window: Duration, query: &str) -> Arc<Self> {
        let (session, settled) = Self::build(id, deps, window, query);
        tokio::spawn(drive(Arc::downgrade(&session), settled));
        session
    }

    /// A session nothing runs on its own; the caller drives the fetches.
    pub fn detached(id: String, deps: ViewDeps) -> Arc<Self> {
        let (session, _settled) = Self::build(id, deps, Duration::ZERO, "");
        session
    }

    /// Fetch `query` and the trending list side by side.
    pub async fn load_initial(&self, query: &str) {
        tokio::join!(self.fetch_movies(query), self.load_trending());
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn last_used(&self) -> DateTime<Utc> {
        *self.last_used.read().await
    }

    pub async fn touch(&self) {
        *self.last_used.write().await = Utc::now();
    }

    /// A keystroke: update the raw text and restart the debounce window.
    pub async fn set_input(&self, text: &str) {
        self.input.set_text(text);
        self.state.write().await.search_term = self.input.text();
        self.touch().await;
    }

    pub async fn snapshot(&self) -> ViewSnapshot {
        let state = self.state.read().await;
        ViewSnapshot::new(&self.id, &state)
    }

    pub async fn state(&self) -> ViewState {
        self.state.read().await.clone()
    }

    /// Fetch movies for `query` and apply the result, unless a newer fetch
    /// was issued in the meantime.
    pub async fn fetch_movies(&self, query: &str) -> FetchOutcome {
        let seq = self.latest_fetch.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut state = self.state.write().await;
            state.is_search_loading = true;
            state.error_message.clear();
        }

        let result = self.deps.catalog.fetch_movies(query).await;

        let (first, results) = {
            let mut state = self.state.write().await;
            if self.latest_fetch.load(Ordering::SeqCst) != seq {
                debug!(session = %self.id, query = %query, "Discarding stale movie response");
                return FetchOutcome::Stale;
            }
            state.is_search_loading = false;

            match result {
                Ok(movies) => {
                    let first: Vec<_> = movies.iter().take(1).cloned().collect();
                    let results = movies.len();
                    state.movie_list = movies;
                    (first, results)
                }
                Err(e) => {
                    error!(session = %self.id, query = %query, "Failed to fetch movies: {}", e);
                    state.error_message = e.user_message().to_string();
                    return FetchOutcome::Failed;
                }
            }
        };

        let analytics = self.deps.analytics.record_results(query, &first).await;
        FetchOutcome::Applied { results, analytics }
    }

    /// Load the trending list. Failures leave it empty.
    pub async fn load_trending(&self) -> usize {
        self.state.write().await.is_trending_loading = true;

        // Already logged by the analytics client.
        let trending = self.deps.analytics.get_trending_movies().await.unwrap_or_default();

        let mut state = self.state.write().await;
        state.trending_movies = trending;
        state.is_trending_loading = false;
        state.trending_movies.len()
    }
}

/// Turn settled search terms into fetches. Fetches run concurrently; the
/// sequence check in `fetch_movies` keeps only the newest.
async fn drive(session: Weak<ViewSession>, mut settled: mpsc::UnboundedReceiver<String>) {
    while let Some(term) = settled.recv().await {
        let Some(session) = session.upgrade() else {
            return;
        };
        session.state.write().await.debounced_search_term = term.clone();
        tokio::spawn(async move {
            session.fetch_movies(&term).await;
        });
    }
}
