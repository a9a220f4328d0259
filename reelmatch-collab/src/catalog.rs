use std::{collections::HashSet, sync::Arc};

use log::{debug, info, warn};
use rand::{seq::SliceRandom, thread_rng};
use reelmatch_core::{
    CatalogError, CatalogProvider, Config, DiscoverQuery, GenreId, Movie, MovieId, WatchProviders,
};
use reelmatch_impls::fallback_catalog;

use crate::CollabContext;

/// How many cast members are kept when enriching a catalog with credits
const CAST_LIMIT: usize = 3;

/// How closely the movies accepted from a page matched the genre filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenreTier {
    /// No filter was given
    Unfiltered,
    /// Every selected genre
    All,
    /// At least two of the selected genres
    AtLeastTwo,
    /// At least one of the selected genres
    Any,
    /// Nothing on the page matched
    Nothing,
}

/// Turns provider pages into a room catalog
pub struct CatalogAdapter<Cp> {
    provider: Arc<Cp>,
    config: Config,
}

impl<Cp> CatalogAdapter<Cp>
where
    Cp: CatalogProvider,
{
    pub fn new<Db>(context: &CollabContext<Db, Cp>) -> Self {
        Self {
            provider: context.provider.clone(),
            config: context.config.clone(),
        }
    }

    /// Fetches a catalog of at most `catalog_size` distinct movies, favoring movies that match
    /// more of the requested genres. Falls back to the bundled catalog if no page could be fetched
    /// or nothing was accepted. Never fails.
    pub async fn fetch_catalog(&self, genre_filter: &[GenreId]) -> Vec<Movie> {
        let pages = {
            let mut pages: Vec<u32> = (1..=self.config.catalog_max_page.max(1)).collect();
            pages.shuffle(&mut thread_rng());
            pages
        };

        self.fetch_from_pages(genre_filter, pages).await
    }

    /// Looks up where a movie can be watched, in the configured region
    pub async fn watch_providers(
        &self,
        movie_id: &MovieId,
    ) -> Result<Option<WatchProviders>, CatalogError> {
        self.provider
            .watch_providers(movie_id, &self.config.watch_region)
            .await
    }

    /// Requests the pages in the given order until the catalog is full or the budget is spent
    async fn fetch_from_pages(&self, genre_filter: &[GenreId], pages: Vec<u32>) -> Vec<Movie> {
        let size = self.config.catalog_size;
        let filter = normalize_filter(genre_filter);

        let mut catalog: Vec<Movie> = Vec::with_capacity(size);
        let mut seen: HashSet<MovieId> = HashSet::new();
        let mut total_pages: Option<u32> = None;
        let mut requests = 0;
        let mut reached = false;

        for page in pages {
            if catalog.len() >= size || requests >= self.config.catalog_page_budget {
                break;
            }

            if total_pages.is_some_and(|total| page > total) {
                continue;
            }

            requests += 1;

            let query = DiscoverQuery {
                page,
                any_of_genres: filter.clone(),
            };

            let result = match self.provider.discover(&query).await {
                Ok(result) => result,
                Err(e) => {
                    warn!("Skipping catalog page {}: {}", page, e);
                    continue;
                }
            };

            reached = true;
            total_pages = Some(result.total_pages);

            let (tier, accepted) = select_from_page(&result.movies, &filter, &seen);
            debug!(
                "Page {} yielded {} movies at tier {:?}",
                page,
                accepted.len(),
                tier
            );

            for movie in accepted {
                if catalog.len() >= size {
                    break;
                }

                if seen.insert(movie.id.clone()) {
                    catalog.push(movie.clone());
                }
            }
        }

        if !reached || catalog.is_empty() {
            warn!("Catalog provider yielded nothing, using the fallback catalog");

            let mut fallback = fallback_catalog();
            fallback.truncate(size);
            return fallback;
        }

        if self.config.enrich_credits {
            self.enrich(&mut catalog).await;
        }

        info!(
            "Fetched a catalog of {} movies in {} requests",
            catalog.len(),
            requests
        );

        catalog
    }

    async fn enrich(&self, catalog: &mut [Movie]) {
        for movie in catalog.iter_mut() {
            match self.provider.credits(&movie.id).await {
                Ok(credits) => {
                    movie.director = credits.director.unwrap_or_default();
                    movie.cast = credits.cast.into_iter().take(CAST_LIMIT).collect();

                    if let Some(runtime) = credits.runtime {
                        movie.runtime = runtime;
                    }
                }
                Err(e) => debug!("No credits for {}: {}", movie.id, e),
            }
        }
    }
}

fn normalize_filter(genres: &[GenreId]) -> Vec<GenreId> {
    let mut filter = genres.to_vec();
    filter.sort_unstable();
    filter.dedup();
    filter
}

/// Picks the unseen movies of a page at the strictest tier that yields anything.
///
/// Every movie at the winning tier is accepted, not just the first one, so a small page budget
/// still fills the catalog.
pub fn select_from_page<'a>(
    movies: &'a [Movie],
    filter: &[GenreId],
    seen: &HashSet<MovieId>,
) -> (GenreTier, Vec<&'a Movie>) {
    let unseen = || movies.iter().filter(|m| !seen.contains(&m.id));

    if filter.is_empty() {
        return (GenreTier::Unfiltered, unseen().collect());
    }

    let tiers = if filter.len() >= 2 {
        vec![
            (GenreTier::All, filter.len()),
            (GenreTier::AtLeastTwo, 2),
            (GenreTier::Any, 1),
        ]
    } else {
        vec![(GenreTier::Any, 1)]
    };

    for (tier, threshold) in tiers {
        let accepted: Vec<_> = unseen()
            .filter(|m| m.genre_overlap(filter) >= threshold)
            .collect();

        if !accepted.is_empty() {
            return (tier, accepted);
        }
    }

    (GenreTier::Nothing, vec![])
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use crossbeam::channel::unbounded;
    use parking_lot::Mutex;
    use reelmatch_core::{CatalogPage, Credits};
    use reelmatch_impls::MemoryLocalStore;

    use crate::LocalPersistence;

    use super::*;

    fn movie(id: u64, genre_ids: &[GenreId]) -> Movie {
        Movie {
            id: MovieId::from(id),
            title: format!("Movie {}", id),
            year: 2001,
            genre_ids: genre_ids.to_vec(),
            rating: 7.0,
            description: String::new(),
            poster: String::new(),
            director: String::new(),
            cast: vec![],
            runtime: 100,
        }
    }

    /// Serves fixed pages, failing for pages that are not scripted
    #[derive(Default)]
    struct ScriptedProvider {
        pages: HashMap<u32, Vec<Movie>>,
        total_pages: u32,
        requested: Mutex<Vec<u32>>,
    }

    #[async_trait]
    impl CatalogProvider for ScriptedProvider {
        async fn discover(&self, query: &DiscoverQuery) -> Result<CatalogPage, CatalogError> {
            self.requested.lock().push(query.page);

            let movies = self
                .pages
                .get(&query.page)
                .cloned()
                .ok_or(CatalogError::Status(500))?;

            Ok(CatalogPage {
                page: query.page,
                total_pages: self.total_pages,
                movies,
            })
        }

        async fn credits(&self, movie_id: &MovieId) -> Result<Credits, CatalogError> {
            Ok(Credits {
                director: Some(format!("Director of {}", movie_id)),
                cast: vec!["A", "B", "C", "D"].into_iter().map(String::from).collect(),
                runtime: Some(148),
            })
        }

        async fn watch_providers(
            &self,
            _movie_id: &MovieId,
            _region: &str,
        ) -> Result<Option<WatchProviders>, CatalogError> {
            Ok(None)
        }
    }

    fn adapter(provider: ScriptedProvider, config: Config) -> CatalogAdapter<ScriptedProvider> {
        let (event_sender, _) = unbounded();
        let context: CollabContext<(), _> = CollabContext {
            config,
            store: Arc::new(()),
            provider: Arc::new(provider),
            local: Arc::new(LocalPersistence::new(Arc::new(MemoryLocalStore::new()))),
            event_sender,
        };

        CatalogAdapter::new(&context)
    }

    fn ids(movies: &[Movie]) -> Vec<MovieId> {
        movies.iter().map(|m| m.id.clone()).collect()
    }

    #[test]
    fn test_cascade_prefers_all_genres() {
        let page = vec![movie(1, &[28]), movie(2, &[28, 12]), movie(3, &[12, 35])];

        let (tier, accepted) = select_from_page(&page, &[12, 28], &HashSet::new());

        assert_eq!(tier, GenreTier::All);
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].id, MovieId::from(2));
    }

    #[test]
    fn test_cascade_falls_through_tiers() {
        let page = vec![movie(1, &[28, 35]), movie(2, &[12]), movie(3, &[99])];

        let (tier, accepted) = select_from_page(&page, &[12, 28, 35], &HashSet::new());
        assert_eq!(tier, GenreTier::AtLeastTwo);
        assert_eq!(accepted.len(), 1);

        let (tier, accepted) = select_from_page(&page, &[12, 18], &HashSet::new());
        assert_eq!(tier, GenreTier::Any);
        assert_eq!(accepted[0].id, MovieId::from(2));

        let (tier, accepted) = select_from_page(&page, &[10752], &HashSet::new());
        assert_eq!(tier, GenreTier::Nothing);
        assert!(accepted.is_empty());
    }

    #[test]
    fn test_every_movie_at_the_winning_tier_is_accepted() {
        let page = vec![movie(1, &[28]), movie(2, &[35]), movie(3, &[28, 99]), movie(4, &[18])];

        let (tier, accepted) = select_from_page(&page, &[28, 35], &HashSet::new());

        assert_eq!(tier, GenreTier::Any);
        let ids: Vec<_> = accepted.iter().map(|m| m.id.clone()).collect();
        assert_eq!(ids, vec![MovieId::from(1), MovieId::from(2), MovieId::from(3)]);
    }

    #[test]
    fn test_cascade_skips_seen_movies() {
        let page = vec![movie(1, &[28, 12]), movie(2, &[28])];
        let seen = HashSet::from([MovieId::from(1)]);

        let (tier, accepted) = select_from_page(&page, &[28, 12], &seen);

        assert_eq!(tier, GenreTier::Any);
        assert_eq!(accepted[0].id, MovieId::from(2));
    }

    #[tokio::test]
    async fn test_genre_filtered_catalog() {
        let provider = ScriptedProvider {
            pages: HashMap::from([
                (1, vec![movie(1, &[28, 12]), movie(2, &[28]), movie(3, &[35])]),
                (2, vec![movie(4, &[12]), movie(5, &[18])]),
            ]),
            total_pages: 2,
            ..Default::default()
        };
        let adapter = adapter(provider, Config::default());

        let catalog = adapter.fetch_from_pages(&[28, 12], vec![1, 2]).await;

        assert_eq!(ids(&catalog), vec![MovieId::from(1), MovieId::from(4)]);
        assert!(catalog.iter().all(|m| m.genre_overlap(&[28, 12]) >= 1));
    }

    #[tokio::test]
    async fn test_catalog_is_capped_and_distinct() {
        let repeated: Vec<_> = (1..=25).map(|id| movie(id, &[])).collect();
        let provider = ScriptedProvider {
            pages: HashMap::from([(1, repeated.clone()), (2, repeated.clone()), (3, {
                let mut more: Vec<_> = (20..=40).map(|id| movie(id, &[])).collect();
                more.push(movie(1, &[]));
                more
            })]),
            total_pages: 3,
            ..Default::default()
        };
        let adapter = adapter(provider, Config::default());

        let catalog = adapter.fetch_from_pages(&[], vec![1, 2, 3]).await;
        let distinct: HashSet<_> = ids(&catalog).into_iter().collect();

        assert_eq!(catalog.len(), 30);
        assert_eq!(distinct.len(), 30);
    }

    #[tokio::test]
    async fn test_pages_past_the_end_are_not_requested() {
        let provider = ScriptedProvider {
            pages: HashMap::from([(2, vec![movie(1, &[])])]),
            total_pages: 2,
            ..Default::default()
        };
        let adapter = adapter(provider, Config::default());

        let catalog = adapter.fetch_from_pages(&[], vec![2, 9, 14, 1]).await;

        assert_eq!(ids(&catalog), vec![MovieId::from(1)]);
        assert_eq!(*adapter.provider.requested.lock(), vec![2, 1]);
    }

    #[tokio::test]
    async fn test_failed_pages_are_skipped() {
        let provider = ScriptedProvider {
            pages: HashMap::from([(3, vec![movie(7, &[28])])]),
            total_pages: 5,
            ..Default::default()
        };
        let adapter = adapter(provider, Config::default());

        let catalog = adapter.fetch_from_pages(&[28], vec![1, 2, 3]).await;

        assert_eq!(ids(&catalog), vec![MovieId::from(7)]);
    }

    #[tokio::test]
    async fn test_page_budget_is_respected() {
        let config = Config {
            catalog_page_budget: 2,
            ..Default::default()
        };
        let adapter = adapter(ScriptedProvider::default(), config);

        adapter.fetch_from_pages(&[], (1..=20).collect()).await;

        assert_eq!(adapter.provider.requested.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_unreachable_provider_uses_fallback() {
        let config = Config {
            catalog_size: 5,
            ..Default::default()
        };
        let adapter = adapter(ScriptedProvider::default(), config);

        let catalog = adapter.fetch_catalog(&[28]).await;

        assert_eq!(catalog.len(), 5);
        assert_eq!(ids(&catalog), ids(&fallback_catalog()[..5]));
    }

    #[tokio::test]
    async fn test_empty_result_uses_fallback() {
        let provider = ScriptedProvider {
            pages: HashMap::from([(1, vec![movie(1, &[18])])]),
            total_pages: 1,
            ..Default::default()
        };
        let adapter = adapter(provider, Config::default());

        let catalog = adapter.fetch_from_pages(&[28], vec![1]).await;

        assert_eq!(ids(&catalog), ids(&fallback_catalog()));
    }

    #[tokio::test]
    async fn test_credits_enrichment() {
        let provider = ScriptedProvider {
            pages: HashMap::from([(1, vec![movie(1, &[])])]),
            total_pages: 1,
            ..Default::default()
        };
        let config = Config {
            enrich_credits: true,
            ..Default::default()
        };
        let adapter = adapter(provider, config);

        let catalog = adapter.fetch_from_pages(&[], vec![1]).await;

        assert_eq!(catalog[0].director, "Director of 1");
        assert_eq!(catalog[0].cast, vec!["A", "B", "C"]);
        assert_eq!(catalog[0].runtime, 148);
    }
}
