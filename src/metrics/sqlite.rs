use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::info;

use super::model::*;
use super::repo::*;

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub async fn new(db_path: &str) -> MetricsResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let repo = Self { pool };
        repo.init_schema().await?;

        info!("Metrics database initialized at {}", db_path);

        Ok(repo)
    }

    /// A private in-memory database. Every connection to `:memory:` is a
    /// separate database, so the pool is limited to one connection.
    pub async fn in_memory() -> MetricsResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let repo = Self { pool };
        repo.init_schema().await?;
        Ok(repo)
    }

    async fn init_schema(&self) -> MetricsResult<()> {
        let schema = include_str!("schema.sql");
        sqlx::query(schema).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl MetricsRepo for SqliteRepository {
    async fn find_by_term(&self, search_term: &str) -> MetricsResult<Option<SearchMetric>> {
        let metric = sqlx::query_as::<_, SearchMetric>(
            "SELECT id, search_term, count, movie_id, poster_url FROM search_metrics
             WHERE search_term = ? LIMIT 1",
        )
        .bind(search_term)
        .fetch_optional(&self.pool)
        .await?;
        Ok(metric)
    }

    async fn record_search(&self, metric: &NewSearchMetric) -> MetricsResult<RecordedSearch> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let now = Utc::now().to_rfc3339();

        // Single statement, so concurrent searches for one term cannot lose
        // an increment. The returned id tells whether the row was inserted.
        let stored = sqlx::query_as::<_, SearchMetric>(
            "INSERT INTO search_metrics (id, search_term, count, movie_id, poster_url, created, updated)
             VALUES (?, ?, 1, ?, ?, ?, ?)
             ON CONFLICT(search_term) DO UPDATE SET count = count + 1, updated = excluded.updated
             RETURNING id, search_term, count, movie_id, poster_url",
        )
        .bind(&id)
        .bind(&metric.search_term)
        .bind(metric.movie_id)
        .bind(&metric.poster_url)
        .bind(&now)
        .bind(&now)
        .fetch_one(&self.pool)
        .await?;

        if stored.id == id {
            Ok(RecordedSearch::Created(stored))
        } else {
            Ok(RecordedSearch::Incremented(stored))
        }
    }

    async fn top_by_count(&self, limit: usize) -> MetricsResult<Vec<SearchMetric>> {
        let metrics = sqlx::query_as::<_, SearchMetric>(
            "SELECT id, search_term, count, movie_id, poster_url FROM search_metrics
             ORDER BY count DESC, rowid ASC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(metrics)
    }
}
