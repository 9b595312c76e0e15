use serde::Serialize;

use crate::catalog::Movie;
use crate::metrics::SearchMetric;

pub const NO_MOVIES_MESSAGE: &str = "No movies available.";
pub const NO_POSTER_URL: &str = "/no-movie.png";

/// Everything the main view shows. Lives as long as its session.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub search_term: String,
    pub debounced_search_term: String,
    pub movie_list: Vec<Movie>,
    pub trending_movies: Vec<SearchMetric>,
    pub error_message: String,
    pub is_search_loading: bool,
    pub is_trending_loading: bool,
}

/// What the "All Movies" section displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchPanel {
    Loading,
    Error { message: String },
    Results { movies: Vec<Movie> },
    Empty { message: String },
}

/// What the trending section displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrendingPanel {
    Loading,
    List { entries: Vec<TrendingEntry> },
    Hidden,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendingEntry {
    pub id: String,
    pub rank: usize,
    pub search_term: String,
    pub poster_url: String,
}

impl ViewState {
    pub fn search_panel(&self) -> SearchPanel {
        if self.is_search_loading {
            SearchPanel::Loading
        } else if !self.error_message.is_empty() {
            SearchPanel::Error {
                message: self.error_message.clone(),
            }
        } else if !self.movie_list.is_empty() {
            SearchPanel::Results {
                movies: self.movie_list.clone(),
            }
        } else {
            SearchPanel::Empty {
                message: NO_MOVIES_MESSAGE.to_string(),
            }
        }
    }

    pub fn trending_panel(&self) -> TrendingPanel {
        if self.is_trending_loading {
            return TrendingPanel::Loading;
        }
        if self.trending_movies.is_empty() {
            return TrendingPanel::Hidden;
        }

        let entries = self
            .trending_movies
            .iter()
            .enumerate()
            .map(|(i, m)| TrendingEntry {
                id: m.id.clone(),
                rank: i + 1,
                search_term: m.search_term.clone(),
                poster_url: m
                    .poster_url
                    .clone()
                    .filter(|u| !u.is_empty())
                    .unwrap_or_else(|| NO_POSTER_URL.to_string()),
            })
            .collect();
        TrendingPanel::List { entries }
    }
}

/// Serializable view of a session at one point in time.
#[derive(Debug, Clone, Serialize)]
pub struct ViewSnapshot {
    pub id: String,
    pub search_term: String,
    pub debounced_search_term: String,
    pub search: SearchPanel,
    pub trending: TrendingPanel,
}

impl ViewSnapshot {
    pub fn new(id: &str, state: &ViewState) -> Self {
        Self {
            id: id.to_string(),
            search_term: state.search_term.clone(),
            debounced_search_term: state.debounced_search_term.clone(),
            search: state.search_panel(),
            trending: state.trending_panel(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metric(id: &str, term: &str, count: i64, poster: Option<&str>) -> SearchMetric {
        SearchMetric {
            id: id.to_string(),
            search_term: term.to_string(),
            count,
            movie_id: 1,
            poster_url: poster.map(String::from),
        }
    }

    #[test]
    fn test_search_panel_priority() {
        let mut state = ViewState::default();
        assert_eq!(
            state.search_panel(),
            SearchPanel::Empty { message: NO_MOVIES_MESSAGE.to_string() }
        );

        state.movie_list = vec![Movie::new(1, None)];
        assert!(matches!(state.search_panel(), SearchPanel::Results { ref movies } if movies.len() == 1));

        // An error hides stale results.
        state.error_message = "Failed to fetch movies.".to_string();
        assert_eq!(
            state.search_panel(),
            SearchPanel::Error { message: "Failed to fetch movies.".to_string() }
        );

        state.is_search_loading = true;
        assert_eq!(state.search_panel(), SearchPanel::Loading);
    }

    #[test]
    fn test_trending_panel() {
        let mut state = ViewState::default();
        assert_eq!(state.trending_panel(), TrendingPanel::Hidden);

        state.is_trending_loading = true;
        assert_eq!(state.trending_panel(), TrendingPanel::Loading);

        state.is_trending_loading = false;
        state.trending_movies = vec![
            metric("a", "dune", 5, Some("https://img/dune.jpg")),
            metric("b", "heat", 2, None),
        ];
        let TrendingPanel::List { entries } = state.trending_panel() else {
            panic!("expected list");
        };
        assert_eq!(entries[0].rank, 1);
        assert_eq!(entries[0].poster_url, "https://img/dune.jpg");
        assert_eq!(entries[1].rank, 2);
        assert_eq!(entries[1].search_term, "heat");
        assert_eq!(entries[1].poster_url, NO_POSTER_URL);
    }

    #[test]
    fn test_snapshot_json() {
        let state = ViewState {
            search_term: "du".to_string(),
            ..ViewState::default()
        };
        let json = serde_json::to_value(ViewSnapshot::new("s1", &state)).unwrap();
        assert_eq!(json["id"], "s1");
        assert_eq!(json["search_term"], "du");
        assert_eq!(json["search"]["kind"], "empty");
        assert_eq!(json["trending"]["kind"], "hidden");
    }
}
