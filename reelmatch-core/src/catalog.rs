use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Movie, MovieId};

/// A catalog provider's numeric genre identifier
pub type GenreId = u32;

/// Known genres and their display names
pub const GENRES: [(GenreId, &str); 19] = [
    (28, "Action"),
    (12, "Adventure"),
    (16, "Animation"),
    (35, "Comedy"),
    (80, "Crime"),
    (99, "Documentary"),
    (18, "Drama"),
    (10751, "Family"),
    (14, "Fantasy"),
    (36, "History"),
    (27, "Horror"),
    (10402, "Music"),
    (9648, "Mystery"),
    (10749, "Romance"),
    (878, "Sci-Fi"),
    (10770, "TV Movie"),
    (53, "Thriller"),
    (10752, "War"),
    (37, "Western"),
];

/// Returns the display name of a genre, or "Unknown"
pub fn genre_name(id: GenreId) -> &'static str {
    GENRES
        .iter()
        .find(|(genre, _)| *genre == id)
        .map(|(_, name)| *name)
        .unwrap_or("Unknown")
}

/// Looks up a genre by its display name, ignoring case
pub fn genre_by_name(name: &str) -> Option<GenreId> {
    GENRES
        .iter()
        .find(|(_, n)| n.eq_ignore_ascii_case(name))
        .map(|(id, _)| *id)
}

/// A provider response did not have the expected shape
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unexpected {shape}: {reason}")]
pub struct DecodeError {
    /// What was being decoded, for example "discover page"
    pub shape: &'static str,
    pub reason: String,
}

impl DecodeError {
    pub fn new(shape: &'static str, reason: impl ToString) -> Self {
        Self {
            shape,
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    /// The provider could not be reached
    #[error("Failed to reach the catalog provider: {0}")]
    Fetch(String),
    /// The provider answered with a non-success status
    #[error("Catalog provider responded with status {0}")]
    Status(u16),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// A request for one page of candidate movies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoverQuery {
    /// 1-based page number
    pub page: u32,
    /// Hint to only return movies having any of these genres. May be ignored by the provider.
    pub any_of_genres: Vec<GenreId>,
}

/// One page of candidates returned by the provider
#[derive(Debug, Clone)]
pub struct CatalogPage {
    pub page: u32,
    pub total_pages: u32,
    pub movies: Vec<Movie>,
}

/// The people behind a movie, and the details discover pages leave out
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credits {
    pub director: Option<String>,
    /// Billing order
    pub cast: Vec<String>,
    /// Minutes, if the provider knows it
    pub runtime: Option<u32>,
}

/// A service offering a movie
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchProvider {
    pub name: String,
    pub logo: Option<String>,
}

/// Where a movie can be watched in one region
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchProviders {
    pub link: Option<String>,
    pub stream: Vec<WatchProvider>,
    pub rent: Vec<WatchProvider>,
    pub buy: Vec<WatchProvider>,
}

/// Represents a read-only source of candidate movies
#[async_trait]
pub trait CatalogProvider: Send + Sync + 'static {
    /// Fetches a single page of candidates
    async fn discover(&self, query: &DiscoverQuery) -> Result<CatalogPage, CatalogError>;

    /// Fetches the director and cast of a movie
    async fn credits(&self, movie_id: &MovieId) -> Result<Credits, CatalogError>;

    /// Fetches where a movie can be watched in the given region, if anywhere
    async fn watch_providers(
        &self,
        movie_id: &MovieId,
        region: &str,
    ) -> Result<Option<WatchProviders>, CatalogError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genre_lookup() {
        assert_eq!(genre_name(28), "Action");
        assert_eq!(genre_name(878), "Sci-Fi");
        assert_eq!(genre_name(1), "Unknown");

        assert_eq!(genre_by_name("adventure"), Some(12));
        assert_eq!(genre_by_name("Space Opera"), None);
    }
}
