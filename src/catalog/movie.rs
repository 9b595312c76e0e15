use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A movie as returned by the metadata API.
///
/// Only `id` and `poster_path` are interpreted; every other field is kept
/// as-is so it can be passed through to clients unmodified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_path: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Movie {
    pub fn new(id: i64, poster_path: Option<&str>) -> Self {
        Self {
            id,
            poster_path: poster_path.map(|p| p.to_string()),
            extra: Map::new(),
        }
    }

    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }

    pub fn title(&self) -> Option<&str> {
        self.extra.get("title").and_then(|v| v.as_str())
    }

    pub fn vote_average(&self) -> Option<f64> {
        self.extra.get("vote_average").and_then(|v| v.as_f64())
    }

    pub fn original_language(&self) -> Option<&str> {
        self.extra.get("original_language").and_then(|v| v.as_str())
    }

    /// Year part of `release_date` ("2021-10-22" -> "2021").
    pub fn release_year(&self) -> Option<&str> {
        self.extra
            .get("release_date")
            .and_then(|v| v.as_str())
            .and_then(|d| d.split('-').next())
            .filter(|y| !y.is_empty())
    }

    /// Poster path, treating an empty string like a missing one.
    pub fn poster(&self) -> Option<&str> {
        self.poster_path.as_deref().filter(|p| !p.is_empty())
    }
}

/// Response envelope of the list endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct MovieListResponse {
    #[serde(default)]
    pub results: Option<Vec<Movie>>,
}

impl MovieListResponse {
    pub fn into_results(self) -> Vec<Movie> {
        self.results.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_fields_pass_through() {
        let json = r#"{
            "id": 438631,
            "title": "Dune",
            "poster_path": "/d5NXSklXo0qyIYkgV94XAgMIckC.jpg",
            "release_date": "2021-09-15",
            "vote_average": 7.8,
            "original_language": "en",
            "genre_ids": [878, 12]
        }"#;
        let movie: Movie = serde_json::from_str(json).unwrap();
        assert_eq!(movie.id, 438631);
        assert_eq!(movie.title(), Some("Dune"));
        assert_eq!(movie.release_year(), Some("2021"));
        assert_eq!(movie.vote_average(), Some(7.8));
        assert_eq!(movie.original_language(), Some("en"));

        let back = serde_json::to_value(&movie).unwrap();
        assert_eq!(back["genre_ids"], serde_json::json!([878, 12]));
        assert_eq!(back["poster_path"], "/d5NXSklXo0qyIYkgV94XAgMIckC.jpg");
    }

    #[test]
    fn test_missing_results_is_empty() {
        let resp: MovieListResponse = serde_json::from_str(r#"{"page": 1}"#).unwrap();
        assert!(resp.into_results().is_empty());

        let resp: MovieListResponse = serde_json::from_str(r#"{"results": null}"#).unwrap();
        assert!(resp.into_results().is_empty());
    }

    #[test]
    fn test_empty_poster_path() {
        let movie: Movie = serde_json::from_str(r#"{"id": 1, "poster_path": ""}"#).unwrap();
        assert_eq!(movie.poster(), None);
        let movie: Movie = serde_json::from_str(r#"{"id": 1, "poster_path": null}"#).unwrap();
        assert_eq!(movie.poster(), None);
    }

    #[test]
    fn test_missing_poster_path_stays_missing() {
        let movie: Movie = serde_json::from_str(r#"{"id": 7, "title": "Heat"}"#).unwrap();
        assert_eq!(movie.poster_path, None);

        let back = serde_json::to_value(&movie).unwrap();
        assert_eq!(back, serde_json::json!({"id": 7, "title": "Heat"}));
    }
}
