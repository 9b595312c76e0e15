pub mod client;
pub mod movie;

pub use client::{movie_list_url, CatalogError, MovieCatalog, TmdbClient, FETCH_FAILED_MESSAGE};
pub use movie::{Movie, MovieListResponse};
