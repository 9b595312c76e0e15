use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::model::*;
use super::repo::*;

/// Process-local metrics, lost on restart. Useful for development.
#[derive(Default)]
pub struct MemoryRepository {
    metrics: Arc<RwLock<Vec<SearchMetric>>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetricsRepo for MemoryRepository {
    async fn find_by_term(&self, search_term: &str) -> MetricsResult<Option<SearchMetric>> {
        let metrics = self.metrics.read().await;
        Ok(metrics.iter().find(|m| m.search_term == search_term).cloned())
    }

    async fn record_search(&self, metric: &NewSearchMetric) -> MetricsResult<RecordedSearch> {
        let mut metrics = self.metrics.write().await;

        if let Some(existing) = metrics.iter_mut().find(|m| m.search_term == metric.search_term) {
            existing.count += 1;
            return Ok(RecordedSearch::Incremented(existing.clone()));
        }

        let created = metric
            .clone()
            .into_metric(uuid::Uuid::new_v4().simple().to_string());
        metrics.push(created.clone());
        Ok(RecordedSearch::Created(created))
    }

    async fn top_by_count(&self, limit: usize) -> MetricsResult<Vec<SearchMetric>> {
        let mut metrics = self.metrics.read().await.clone();
        // Stable, so equal counts keep insertion order.
        metrics.sort_by(|a, b| b.count.cmp(&a.count));
        metrics.truncate(limit);
        Ok(metrics)
    }
}
