use serde::{Deserialize, Serialize};

use crate::{genre_name, GenreId, MovieId};

/// A candidate movie. Immutable once attached to a room's catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    /// Release year, 0 if unknown
    pub year: u16,
    pub genre_ids: Vec<GenreId>,
    /// Average rating out of 10, rounded to one decimal
    pub rating: f32,
    pub description: String,
    /// Absolute URI of the poster image, empty if there is none
    pub poster: String,
    /// Empty unless credits were fetched
    pub director: String,
    pub cast: Vec<String>,
    /// Runtime in minutes, 0 if unknown. Discover pages do not carry it, it is filled in
    /// along with the credits.
    pub runtime: u32,
}

impl Movie {
    /// Human readable genre names, in the order the provider listed them
    pub fn genres(&self) -> Vec<&'static str> {
        self.genre_ids.iter().map(|id| genre_name(*id)).collect()
    }

    /// How many of the given genres this movie has
    pub fn genre_overlap(&self, genres: &[GenreId]) -> usize {
        genres.iter().filter(|g| self.genre_ids.contains(g)).count()
    }
}
