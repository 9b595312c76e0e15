use std::sync::Arc;

use tracing::{debug, error, info};

use crate::catalog::Movie;
use super::model::*;
use super::repo::MetricsRepo;

/// What happened to a search that was handed to [`SearchAnalytics`].
#[derive(Debug, Clone, PartialEq)]
pub enum AnalyticsOutcome {
    Created(SearchMetric),
    Incremented(SearchMetric),
    /// The store failed; the cause has been logged.
    Failed(String),
}

impl AnalyticsOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, AnalyticsOutcome::Failed(_))
    }
}

/// Search-term popularity counters on top of a [`MetricsRepo`].
pub struct SearchAnalytics {
    repo: Arc<dyn MetricsRepo>,
    image_base: String,
    trending_limit: usize,
}

impl SearchAnalytics {
    pub fn new(repo: Arc<dyn MetricsRepo>, image_base: &str, trending_limit: usize) -> Self {
        Self {
            repo,
            image_base: image_base.to_string(),
            trending_limit,
        }
    }

    /// Count one search for `search_term`, remembering `movie` as its poster
    /// when the term is new. Never retried.
    pub async fn update_search_count(&self, search_term: &str, movie: &Movie) -> AnalyticsOutcome {
        if search_term.is_empty() {
            return AnalyticsOutcome::Failed("empty search term".to_string());
        }

        let metric = NewSearchMetric::from_movie(search_term, movie, &self.image_base);
        match self.repo.record_search(&metric).await {
            Ok(RecordedSearch::Created(m)) => {
                info!(search_term = %m.search_term, movie_id = m.movie_id, "New search term");
                AnalyticsOutcome::Created(m)
            }
            Ok(RecordedSearch::Incremented(m)) => {
                debug!(search_term = %m.search_term, count = m.count, "Search count updated");
                AnalyticsOutcome::Incremented(m)
            }
            Err(e) => {
                error!(search_term = %search_term, "Failed to update search count: {}", e);
                AnalyticsOutcome::Failed(e.to_string())
            }
        }
    }

    /// Record a finished search. Only non-empty queries with at least one
    /// result are counted, using the first result.
    pub async fn record_results(&self, query: &str, results: &[Movie]) -> Option<AnalyticsOutcome> {
        match results.first() {
            Some(first) if !query.is_empty() => Some(self.update_search_count(query, first).await),
            _ => None,
        }
    }

    /// The most searched terms, highest count first.
    pub async fn get_trending_movies(&self) -> MetricsResult<Vec<SearchMetric>> {
        let mut metrics = self.repo.top_by_count(self.trending_limit).await.map_err(|e| {
            error!("Failed to fetch trending movies: {}", e);
            e
        })?;
        metrics.truncate(self.trending_limit);
        Ok(metrics)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::metrics::MemoryRepository;
    use async_trait::async_trait;

    const IMAGE_BASE: &str = "https://image.tmdb.org/t/p/w500";

    /// A store that is always down.
    pub(crate) struct BrokenRepo;

    #[async_trait]
    impl MetricsRepo for BrokenRepo {
        async fn find_by_term(&self, _: &str) -> MetricsResult<Option<SearchMetric>> {
            Err(MetricsError::Status { status: 503, message: "down".to_string() })
        }
        async fn record_search(&self, _: &NewSearchMetric) -> MetricsResult<RecordedSearch> {
            Err(MetricsError::Status { status: 503, message: "down".to_string() })
        }
        async fn top_by_count(&self, _: usize) -> MetricsResult<Vec<SearchMetric>> {
            Err(MetricsError::Status { status: 503, message: "down".to_string() })
        }
    }

    fn analytics() -> (Arc<MemoryRepository>, SearchAnalytics) {
        let repo = Arc::new(MemoryRepository::new());
        let analytics = SearchAnalytics::new(repo.clone(), IMAGE_BASE, 5);
        (repo, analytics)
    }

    #[tokio::test]
    async fn test_same_term_twice_counts_two() {
        let (repo, analytics) = analytics();
        let movie = Movie::new(438631, Some("/dune.jpg"));

        let first = analytics.update_search_count("dune", &movie).await;
        assert!(matches!(first, AnalyticsOutcome::Created(_)));
        let second = analytics.update_search_count("dune", &movie).await;
        assert!(matches!(second, AnalyticsOutcome::Incremented(ref m) if m.count == 2));

        let all = repo.top_by_count(100).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].count, 2);
    }

    #[tokio::test]
    async fn test_new_term_document() {
        let (_repo, analytics) = analytics();
        let movie = Movie::new(7, Some("/x.jpg"));

        let AnalyticsOutcome::Created(metric) = analytics.update_search_count("newterm", &movie).await else {
            panic!("expected a new document");
        };
        assert_eq!(metric.search_term, "newterm");
        assert_eq!(metric.count, 1);
        assert_eq!(metric.movie_id, 7);
        assert_eq!(metric.poster_url, Some(format!("{}/x.jpg", IMAGE_BASE)));
    }

    #[tokio::test]
    async fn test_new_term_without_poster() {
        let (_repo, analytics) = analytics();
        let outcome = analytics.update_search_count("noposter", &Movie::new(3, None)).await;
        assert!(matches!(outcome, AnalyticsOutcome::Created(ref m) if m.poster_url.is_none()));
    }

    #[tokio::test]
    async fn test_trending_order_and_limit() {
        let (_repo, analytics) = analytics();
        let movie = Movie::new(1, None);
        for (term, count) in [("w", 3), ("x", 1), ("y", 5), ("z", 2), ("v", 4), ("u", 6)] {
            for _ in 0..count {
                analytics.update_search_count(term, &movie).await;
            }
        }

        let trending = analytics.get_trending_movies().await.unwrap();
        let counts: Vec<i64> = trending.iter().map(|m| m.count).collect();
        assert_eq!(counts, vec![6, 5, 4, 3, 2]);
    }

    #[tokio::test]
    async fn test_record_results_policy() {
        let (repo, analytics) = analytics();
        let movies = vec![Movie::new(1, Some("/a.jpg")), Movie::new(2, Some("/b.jpg"))];

        assert!(analytics.record_results("", &movies).await.is_none());
        assert!(analytics.record_results("dune", &[]).await.is_none());
        assert!(repo.top_by_count(10).await.unwrap().is_empty());

        let outcome = analytics.record_results("dune", &movies).await.unwrap();
        assert!(matches!(outcome, AnalyticsOutcome::Created(ref m) if m.movie_id == 1));
    }

    #[tokio::test]
    async fn test_store_failures_are_reported() {
        let analytics = SearchAnalytics::new(Arc::new(BrokenRepo), IMAGE_BASE, 5);

        let outcome = analytics.update_search_count("dune", &Movie::new(1, None)).await;
        assert!(outcome.is_failed());
        assert!(analytics.get_trending_movies().await.is_err());
    }
}
