use async_trait::async_trait;
use reelmatch_core::{
    CatalogError, CatalogPage, CatalogProvider, Credits, DiscoverQuery, Movie, MovieId,
    WatchProviders,
};

use crate::fallback_catalog;

/// A provider serving a fixed list of movies, used when there are no credentials for a real one.
pub struct StaticProvider {
    movies: Vec<Movie>,
    page_size: usize,
}

impl StaticProvider {
    pub fn new(movies: Vec<Movie>, page_size: usize) -> Self {
        Self {
            movies,
            page_size: page_size.max(1),
        }
    }

    /// Serves the bundled catalog
    pub fn bundled() -> Self {
        Self::new(fallback_catalog(), 4)
    }

    fn total_pages(&self) -> u32 {
        self.movies.len().div_ceil(self.page_size).max(1) as u32
    }
}

#[async_trait]
impl CatalogProvider for StaticProvider {
    async fn discover(&self, query: &DiscoverQuery) -> Result<CatalogPage, CatalogError> {
        let start = (query.page.max(1) as usize - 1) * self.page_size;

        let movies = self
            .movies
            .iter()
            .skip(start)
            .take(self.page_size)
            .filter(|m| {
                query.any_of_genres.is_empty() || m.genre_overlap(&query.any_of_genres) > 0
            })
            .cloned()
            .collect();

        Ok(CatalogPage {
            page: query.page,
            total_pages: self.total_pages(),
            movies,
        })
    }

    async fn credits(&self, movie_id: &MovieId) -> Result<Credits, CatalogError> {
        Ok(self
            .movies
            .iter()
            .find(|m| &m.id == movie_id)
            .map(|m| Credits {
                director: Some(m.director.clone()).filter(|d| !d.is_empty()),
                cast: m.cast.clone(),
                runtime: Some(m.runtime).filter(|r| *r > 0),
            })
            .unwrap_or_default())
    }

    async fn watch_providers(
        &self,
        _movie_id: &MovieId,
        _region: &str,
    ) -> Result<Option<WatchProviders>, CatalogError> {
        Ok(None)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn test_static_pages() {
        let provider = StaticProvider::bundled();
        let first = provider
            .discover(&DiscoverQuery {
                page: 1,
                any_of_genres: vec![],
            })
            .await
            .unwrap();

        assert_eq!(first.total_pages, 3);
        assert_eq!(first.movies.len(), 4);

        let beyond = provider
            .discover(&DiscoverQuery {
                page: 9,
                any_of_genres: vec![],
            })
            .await
            .unwrap();

        assert!(beyond.movies.is_empty());
    }

    #[tokio::test]
    async fn test_genre_hint_filters() {
        let provider = StaticProvider::bundled();
        let page = provider
            .discover(&DiscoverQuery {
                page: 1,
                any_of_genres: vec![10749],
            })
            .await
            .unwrap();

        assert!(page.movies.is_empty());

        let credits = provider.credits(&MovieId::from("603")).await.unwrap();
        assert_eq!(credits.director.as_deref(), Some("Lana Wachowski"));
    }
}
