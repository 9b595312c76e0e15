use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::config::AppwriteConfig;
use super::model::*;
use super::repo::*;

const PROJECT_HEADER: &str = "x-appwrite-project";
const KEY_HEADER: &str = "x-appwrite-key";

/// Metrics stored as documents in an Appwrite database collection.
pub struct AppwriteRepository {
    client: reqwest::Client,
    documents_url: String,
}

#[derive(Debug, Deserialize)]
struct DocumentList {
    #[serde(default)]
    documents: Vec<MetricDocument>,
}

#[derive(Debug, Deserialize)]
struct MetricDocument {
    #[serde(rename = "$id")]
    id: String,
    search_term: String,
    count: i64,
    movie_id: i64,
    #[serde(default)]
    poster_url: Option<String>,
}

impl From<MetricDocument> for SearchMetric {
    fn from(doc: MetricDocument) -> Self {
        SearchMetric {
            id: doc.id,
            search_term: doc.search_term,
            count: doc.count,
            movie_id: doc.movie_id,
            poster_url: doc.poster_url,
        }
    }
}

#[derive(Debug, Serialize)]
struct MetricData<'a> {
    search_term: &'a str,
    count: i64,
    movie_id: i64,
    poster_url: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct AppwriteErrorBody {
    #[serde(default)]
    message: String,
}

/// Query strings in the JSON form the documents endpoint expects.
fn query_equal(attribute: &str, value: &str) -> String {
    json!({ "method": "equal", "attribute": attribute, "values": [value] }).to_string()
}

fn query_limit(limit: usize) -> String {
    json!({ "method": "limit", "values": [limit] }).to_string()
}

fn query_order_desc(attribute: &str) -> String {
    json!({ "method": "orderDesc", "attribute": attribute }).to_string()
}

impl AppwriteRepository {
    pub fn new(config: &AppwriteConfig) -> MetricsResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static(PROJECT_HEADER),
            HeaderValue::from_str(&config.project)
                .map_err(|_| MetricsError::Invalid("appwrite project id".to_string()))?,
        );
        if let Some(ref key) = config.api_key {
            let mut value = HeaderValue::from_str(key)
                .map_err(|_| MetricsError::Invalid("appwrite api key".to_string()))?;
            value.set_sensitive(true);
            headers.insert(HeaderName::from_static(KEY_HEADER), value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        let documents_url = format!(
            "{}/databases/{}/collections/{}/documents",
            config.endpoint.trim_end_matches('/'),
            urlencoding::encode(&config.database),
            urlencoding::encode(&config.table),
        );

        Ok(Self {
            client,
            documents_url,
        })
    }

    async fn list(&self, queries: &[String]) -> MetricsResult<Vec<SearchMetric>> {
        let params: Vec<(&str, &str)> = queries.iter().map(|q| ("queries[]", q.as_str())).collect();
        let response = self.client.get(&self.documents_url).query(&params).send().await?;
        let list: DocumentList = check(response).await?.json().await?;
        Ok(list.documents.into_iter().map(SearchMetric::from).collect())
    }

    async fn create(&self, metric: &NewSearchMetric) -> MetricsResult<SearchMetric> {
        let body = json!({
            "documentId": "unique()",
            "data": MetricData {
                search_term: &metric.search_term,
                count: 1,
                movie_id: metric.movie_id,
                poster_url: metric.poster_url.as_deref(),
            },
        });
        let response = self.client.post(&self.documents_url).json(&body).send().await?;
        if response.status() == StatusCode::CONFLICT {
            return Err(MetricsError::AlreadyExists(metric.search_term.clone()));
        }
        let doc: MetricDocument = check(response).await?.json().await?;
        Ok(doc.into())
    }

    /// Server-side increment of the `count` attribute.
    async fn increment(&self, id: &str) -> MetricsResult<SearchMetric> {
        let url = format!("{}/{}/count/increment", self.documents_url, urlencoding::encode(id));
        let response = self
            .client
            .patch(&url)
            .json(&json!({ "value": 1 }))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(MetricsError::NotFound(id.to_string()));
        }
        let doc: MetricDocument = check(response).await?.json().await?;
        Ok(doc.into())
    }
}

async fn check(response: reqwest::Response) -> MetricsResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = match response.json::<AppwriteErrorBody>().await {
        Ok(body) => body.message,
        Err(_) => String::new(),
    };
    Err(MetricsError::Status {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl MetricsRepo for AppwriteRepository {
    async fn find_by_term(&self, search_term: &str) -> MetricsResult<Option<SearchMetric>> {
        let docs = self
            .list(&[query_equal("search_term", search_term), query_limit(1)])
            .await?;
        Ok(docs.into_iter().next())
    }

    async fn record_search(&self, metric: &NewSearchMetric) -> MetricsResult<RecordedSearch> {
        if let Some(existing) = self.find_by_term(&metric.search_term).await? {
            return Ok(RecordedSearch::Incremented(self.increment(&existing.id).await?));
        }

        match self.create(metric).await {
            Ok(created) => Ok(RecordedSearch::Created(created)),
            Err(MetricsError::AlreadyExists(term)) => {
                // Another writer created the term between lookup and create.
                debug!(search_term = %term, "Lost create race, incrementing instead");
                let existing = self
                    .find_by_term(&term)
                    .await?
                    .ok_or_else(|| MetricsError::NotFound(term.clone()))?;
                Ok(RecordedSearch::Incremented(self.increment(&existing.id).await?))
            }
            Err(e) => {
                warn!(search_term = %metric.search_term, "Failed to create metric: {}", e);
                Err(e)
            }
        }
    }

    async fn top_by_count(&self, limit: usize) -> MetricsResult<Vec<SearchMetric>> {
        self.list(&[query_limit(limit), query_order_desc("count")]).await
    }
}
