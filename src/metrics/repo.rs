use async_trait::async_trait;

use super::model::*;

#[async_trait]
pub trait MetricsRepo: Send + Sync {
    /// Exact, case-sensitive lookup by search term.
    async fn find_by_term(&self, search_term: &str) -> MetricsResult<Option<SearchMetric>>;

    /// Count one more search for `metric.search_term`.
    ///
    /// Creates the document with `count = 1` when the term is new, otherwise
    /// increments `count` without touching `movie_id` or `poster_url`.
    async fn record_search(&self, metric: &NewSearchMetric) -> MetricsResult<RecordedSearch>;

    /// Up to `limit` documents, highest count first.
    async fn top_by_count(&self, limit: usize) -> MetricsResult<Vec<SearchMetric>>;
}
