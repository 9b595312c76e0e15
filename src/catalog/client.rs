use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use tracing::debug;

use crate::config::TmdbConfig;
use super::movie::{Movie, MovieListResponse};

/// The one message users see when a movie fetch fails, whatever the cause.
pub const FETCH_FAILED_MESSAGE: &str = "Failed to fetch movies.";

#[async_trait]
pub trait MovieCatalog: Send + Sync {
    /// Search by title, or list popular movies when `query` is empty.
    async fn fetch_movies(&self, query: &str) -> Result<Vec<Movie>, CatalogError>;
}

/// Build the list url for `query`.
pub fn movie_list_url(api_base: &str, query: &str) -> String {
    let base = api_base.trim_end_matches('/');
    if query.is_empty() {
        format!("{}/discover/movie?sort_by=popularity.desc", base)
    } else {
        format!("{}/search/movie?query={}", base, urlencoding::encode(query))
    }
}

pub struct TmdbClient {
    client: reqwest::Client,
    api_base: String,
}

impl TmdbClient {
    pub fn new(config: &TmdbConfig) -> Result<Self, CatalogError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.token))
            .map_err(|_| CatalogError::InvalidToken)?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.clone(),
        })
    }
}

#[async_trait]
impl MovieCatalog for TmdbClient {
    async fn fetch_movies(&self, query: &str) -> Result<Vec<Movie>, CatalogError> {
        let url = movie_list_url(&self.api_base, query);
        debug!(url = %url, "Fetching movies");

        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let body = response.bytes().await?;
        let list: MovieListResponse = serde_json::from_slice(&body)
            .map_err(|source| CatalogError::Parse { url, source })?;

        Ok(list.into_results())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },
    #[error("Failed to parse response from {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("API token is not a valid header value")]
    InvalidToken,
}

impl CatalogError {
    /// What to show the user; every cause collapses to the same text.
    pub fn user_message(&self) -> &'static str {
        FETCH_FAILED_MESSAGE
    }
}
