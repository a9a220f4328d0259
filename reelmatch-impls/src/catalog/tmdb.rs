use std::collections::HashMap;

use async_trait::async_trait;
use log::debug;
use reelmatch_core::{
    CatalogError, CatalogPage, CatalogProvider, Credits, DecodeError, DiscoverQuery, GenreId,
    Movie, MovieId, WatchProvider, WatchProviders,
};
use reqwest::{header::ACCEPT, Client};
use serde::{de::DeserializeOwned, Deserialize};
use url::Url;

pub const TMDB_API_BASE: &str = "https://api.themoviedb.org/3/";
const POSTER_BASE: &str = "https://image.tmdb.org/t/p/w500";
const LOGO_BASE: &str = "https://image.tmdb.org/t/p/w92";

/// A catalog provider backed by The Movie Database
pub struct TmdbProvider {
    client: Client,
    base: Url,
    token: String,
}

#[derive(Debug, Deserialize)]
struct DiscoverResponse {
    page: u32,
    total_pages: u32,
    results: Vec<RawMovie>,
}

#[derive(Debug, Deserialize)]
struct RawMovie {
    id: u64,
    title: String,
    release_date: Option<String>,
    #[serde(default)]
    genre_ids: Vec<GenreId>,
    vote_average: Option<f32>,
    overview: Option<String>,
    poster_path: Option<String>,
}

/// A movie's details with its credits appended, so one request covers both
#[derive(Debug, Deserialize)]
struct DetailsResponse {
    runtime: Option<u32>,
    credits: CreditsResponse,
}

#[derive(Debug, Deserialize)]
struct CreditsResponse {
    #[serde(default)]
    cast: Vec<CastMember>,
    #[serde(default)]
    crew: Vec<CrewMember>,
}

#[derive(Debug, Deserialize)]
struct CastMember {
    name: String,
    #[serde(default)]
    order: u32,
}

#[derive(Debug, Deserialize)]
struct CrewMember {
    name: String,
    job: String,
}

#[derive(Debug, Deserialize)]
struct ProvidersResponse {
    #[serde(default)]
    results: HashMap<String, RegionProviders>,
}

#[derive(Debug, Deserialize)]
struct RegionProviders {
    link: Option<String>,
    #[serde(default)]
    flatrate: Vec<RawProvider>,
    #[serde(default)]
    rent: Vec<RawProvider>,
    #[serde(default)]
    buy: Vec<RawProvider>,
}

#[derive(Debug, Deserialize)]
struct RawProvider {
    provider_name: String,
    logo_path: Option<String>,
}

impl TmdbProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base(
            Url::parse(TMDB_API_BASE).expect("default api base is a valid url"),
            token,
        )
    }

    /// Creates a provider talking to another instance of the API. The base should end with a slash.
    pub fn with_base(base: Url, token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base,
            token: token.into(),
        }
    }

    fn discover_url(&self, query: &DiscoverQuery) -> Result<Url, CatalogError> {
        let mut url = self.endpoint("discover/movie")?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("include_adult", "false")
                .append_pair("include_video", "false")
                .append_pair("language", "en-US")
                .append_pair("sort_by", "popularity.desc")
                .append_pair("page", &query.page.to_string());

            if !query.any_of_genres.is_empty() {
                let genres: Vec<_> = query.any_of_genres.iter().map(|g| g.to_string()).collect();
                // A pipe means "or" to the discover endpoint
                pairs.append_pair("with_genres", &genres.join("|"));
            }
        }

        Ok(url)
    }

    fn details_url(&self, movie_id: &MovieId) -> Result<Url, CatalogError> {
        let mut url = self.endpoint(&format!("movie/{}", movie_id))?;
        url.query_pairs_mut()
            .append_pair("append_to_response", "credits");

        Ok(url)
    }

    fn endpoint(&self, path: &str) -> Result<Url, CatalogError> {
        self.base
            .join(path)
            .map_err(|e| CatalogError::Fetch(e.to_string()))
    }

    async fn get<T>(&self, url: Url, shape: &'static str) -> Result<T, CatalogError>
    where
        T: DeserializeOwned,
    {
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| CatalogError::Fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status(status.as_u16()));
        }

        let text = response
            .text()
            .await
            .map_err(|e| CatalogError::Fetch(e.to_string()))?;

        Ok(decode(shape, &text)?)
    }
}

#[async_trait]
impl CatalogProvider for TmdbProvider {
    async fn discover(&self, query: &DiscoverQuery) -> Result<CatalogPage, CatalogError> {
        let url = self.discover_url(query)?;
        let response: DiscoverResponse = self.get(url, "discover page").await?;

        Ok(response.into_page()?)
    }

    async fn credits(&self, movie_id: &MovieId) -> Result<Credits, CatalogError> {
        let url = self.details_url(movie_id)?;
        let response: DetailsResponse = self.get(url, "movie details").await?;

        Ok(response.into_credits())
    }

    async fn watch_providers(
        &self,
        movie_id: &MovieId,
        region: &str,
    ) -> Result<Option<WatchProviders>, CatalogError> {
        let url = self.endpoint(&format!("movie/{}/watch/providers", movie_id))?;
        let mut response: ProvidersResponse = self.get(url, "watch providers").await?;

        Ok(response
            .results
            .remove(region)
            .map(RegionProviders::into_providers))
    }
}

impl DiscoverResponse {
    fn into_page(self) -> Result<CatalogPage, DecodeError> {
        let movies = self
            .results
            .into_iter()
            .map(RawMovie::into_movie)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CatalogPage {
            page: self.page,
            total_pages: self.total_pages,
            movies,
        })
    }
}

impl RawMovie {
    fn into_movie(self) -> Result<Movie, DecodeError> {
        let year = match self.release_date.as_deref() {
            None | Some("") => 0,
            Some(date) => date
                .get(..4)
                .and_then(|y| y.parse::<u16>().ok())
                .ok_or_else(|| DecodeError::new("release date", date))?,
        };

        let rating = self
            .vote_average
            .map(|v| (v * 10.).round() / 10.)
            .unwrap_or_default();

        let poster = self
            .poster_path
            .map(|path| format!("{}{}", POSTER_BASE, path))
            .unwrap_or_default();

        Ok(Movie {
            id: MovieId::from(self.id),
            title: self.title,
            year,
            genre_ids: self.genre_ids,
            rating,
            description: self.overview.unwrap_or_default(),
            poster,
            director: String::new(),
            cast: vec![],
            runtime: 0,
        })
    }
}

impl DetailsResponse {
    fn into_credits(self) -> Credits {
        let mut credits = self.credits;
        credits.cast.sort_by_key(|c| c.order);

        Credits {
            director: credits
                .crew
                .into_iter()
                .find(|c| c.job == "Director")
                .map(|c| c.name),
            cast: credits.cast.into_iter().map(|c| c.name).collect(),
            // TMDB reports 0 for movies without a known runtime
            runtime: self.runtime.filter(|r| *r > 0),
        }
    }
}

impl RegionProviders {
    fn into_providers(self) -> WatchProviders {
        let convert = |providers: Vec<RawProvider>| -> Vec<WatchProvider> {
            providers
                .into_iter()
                .map(|p| WatchProvider {
                    name: p.provider_name,
                    logo: p.logo_path.map(|path| format!("{}{}", LOGO_BASE, path)),
                })
                .collect()
        };

        WatchProviders {
            link: self.link,
            stream: convert(self.flatrate),
            rent: convert(self.rent),
            buy: convert(self.buy),
        }
    }
}

fn decode<T>(shape: &'static str, text: &str) -> Result<T, DecodeError>
where
    T: DeserializeOwned,
{
    serde_json::from_str(text).map_err(|e| DecodeError::new(shape, e))
}
