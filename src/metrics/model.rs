use serde::{Deserialize, Serialize};

use crate::catalog::Movie;

/// How often a search term was queried, plus the poster of the first
/// result at the time the term was first seen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SearchMetric {
    pub id: String,
    pub search_term: String,
    pub count: i64,
    pub movie_id: i64,
    pub poster_url: Option<String>,
}

/// Values used when a term is recorded for the first time.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSearchMetric {
    pub search_term: String,
    pub movie_id: i64,
    pub poster_url: Option<String>,
}

impl NewSearchMetric {
    pub fn from_movie(search_term: &str, movie: &Movie, image_base: &str) -> Self {
        Self {
            search_term: search_term.to_string(),
            movie_id: movie.id,
            poster_url: poster_url(image_base, movie.poster()),
        }
    }

    pub fn into_metric(self, id: String) -> SearchMetric {
        SearchMetric {
            id,
            search_term: self.search_term,
            count: 1,
            movie_id: self.movie_id,
            poster_url: self.poster_url,
        }
    }
}

/// Absolute poster url, or `None` when the movie has no poster.
pub fn poster_url(image_base: &str, poster_path: Option<&str>) -> Option<String> {
    poster_path
        .filter(|p| !p.is_empty())
        .map(|p| format!("{}{}", image_base, p))
}

/// Result of recording one search.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedSearch {
    Created(SearchMetric),
    Incremented(SearchMetric),
}

impl RecordedSearch {
    pub fn metric(&self) -> &SearchMetric {
        match self {
            RecordedSearch::Created(m) | RecordedSearch::Incremented(m) => m,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Store returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Already exists: {0}")]
    AlreadyExists(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    Invalid(String),
}

pub type MetricsResult<T> = Result<T, MetricsError>;
