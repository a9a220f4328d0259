use std::{env, path::PathBuf, sync::Arc, thread, time::Duration};

use chrono::Utc;
use colored::Colorize;
use futures_util::future::join_all;
use log::{error, info, warn};
use rand::{thread_rng, Rng};
use reelmatch_collab::{CatalogFetch, Collab, CollabEvent, MatchAuthority, RoomError, RoomView};
use reelmatch_core::{
    compute_room_matches, covers, genre_by_name, genre_name, Backend, CatalogProvider, Config, GenreId, LocalStore, MatchWrites,
    StoreError, SwipeLog, GENRES,
};
use reelmatch_impls::{FileLocalStore, MemoryLocalStore, MemoryStore, StaticProvider, TmdbProvider};
use thiserror::Error;
use tokio::runtime::{self, Runtime};

mod logging;

/// How long to wait for every replica to see the final swipe log and its matches
const SETTLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs a room with several simulated participants against an in-process store
struct Reelmatch {
    runtime: Runtime,
    store: Arc<MemoryStore>,
    settings: Settings,
}

struct Settings {
    tmdb_token: Option<String>,
    participants: usize,
    genres: Vec<GenreId>,
    state_dir: Option<PathBuf>,
    authority: bool,
}

#[derive(Debug, Error)]
enum ReelmatchError {
    #[error("Invalid value for {name}: {reason}")]
    Setting { name: &'static str, reason: String },

    #[error("Could not build the async runtime: {0}")]
    Runtime(#[from] std::io::Error),

    #[error("Room operation failed: {0}")]
    Room(#[from] RoomError),

    #[error("Store operation failed: {0}")]
    Store(#[from] StoreError),

    #[error("Replicas did not converge within {0:?}")]
    Diverged(Duration),
}

impl Settings {
    fn from_env() -> Result<Self, ReelmatchError> {
        let participants = match env::var("REELMATCH_PARTICIPANTS") {
            Ok(value) => value
                .parse::<usize>()
                .ok()
                .filter(|n| *n >= 2)
                .ok_or_else(|| ReelmatchError::Setting {
                    name: "REELMATCH_PARTICIPANTS",
                    reason: format!("{:?} is not a number of at least 2", value),
                })?,
            Err(_) => 3,
        };

        let genres = match env::var("REELMATCH_GENRES") {
            Ok(value) => value
                .split(',')
                .map(str::trim)
                .filter(|g| !g.is_empty())
                .map(parse_genre)
                .collect::<Result<Vec<_>, _>>()?,
            Err(_) => vec![],
        };

        let authority = env::var("REELMATCH_AUTHORITY")
            .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            tmdb_token: env::var("REELMATCH_TMDB_TOKEN").ok().filter(|t| !t.is_empty()),
            participants,
            genres,
            state_dir: env::var_os("REELMATCH_STATE_DIR").map(PathBuf::from),
            authority,
        })
    }

    fn config(&self) -> Config {
        Config {
            enrich_credits: self.tmdb_token.is_some(),
            match_writes: if self.authority {
                MatchWrites::Authority
            } else {
                MatchWrites::EveryClient
            },
            ..Default::default()
        }
    }
}

fn parse_genre(input: &str) -> Result<GenreId, ReelmatchError> {
    if let Ok(id) = input.parse::<GenreId>() {
        if GENRES.iter().any(|(known, _)| *known == id) {
            return Ok(id);
        }
    }

    genre_by_name(input).ok_or_else(|| ReelmatchError::Setting {
        name: "REELMATCH_GENRES",
        reason: format!("{:?} is not a known genre", input),
    })
}

impl Reelmatch {
    fn new() -> Result<Self, ReelmatchError> {
        let settings = Settings::from_env()?;

        info!("Building async runtime...");
        let runtime = runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("reelmatch-async")
            .build()?;

        Ok(Self {
            runtime,
            store: Arc::new(MemoryStore::new()),
            settings,
        })
    }

    fn run(&self) -> Result<(), ReelmatchError> {
        match &self.settings.tmdb_token {
            Some(token) => {
                info!("Using TMDB as the catalog provider");
                self.simulate(Arc::new(TmdbProvider::new(token.clone())))
            }
            None => {
                info!("No TMDB token set, using the bundled catalog");
                self.simulate(Arc::new(StaticProvider::bundled()))
            }
        }
    }

    fn simulate<Cp: CatalogProvider>(&self, provider: Arc<Cp>) -> Result<(), ReelmatchError> {
        let config = self.settings.config();

        let clients: Vec<_> = (0..self.settings.participants)
            .map(|index| {
                Collab::new(
                    config.clone(),
                    self.store.clone(),
                    provider.clone(),
                    self.local_store(index),
                )
            })
            .collect();

        let events = clients[0].events();
        thread::spawn(move || {
            while let Ok(event) = events.recv() {
                log_event(&event);
            }
        });

        self.runtime.block_on(async {
            let host = &clients[0];
            let pin = match host.rooms.resume().await? {
                Some(room) => {
                    info!("Resumed room {}", room.pin);
                    room.pin
                }
                None => {
                    host.rooms
                        .create_room(&self.settings.genres, CatalogFetch::Eager)
                        .await?
                }
            };

            let authority = MatchAuthority::new(self.store.clone(), config.clone());
            if self.settings.authority {
                authority.attach(&pin).await?;
            }

            let joins = clients[1..]
                .iter()
                .map(|guest| guest.rooms.join_room(pin.as_str()));

            for joined in join_all(joins).await {
                joined?;
            }

            host.rooms.start_game().await?;

            // Everyone swipes at the same time, like in a real room
            for swiped in join_all(clients.iter().map(|c| swipe_through(c))).await {
                swiped?;
            }

            let expected = self.store.swipes(&pin).await?.len();
            settle(host, expected).await?;

            print_results(host).await;

            for client in &clients {
                client.rooms.leave_room().await;
            }

            authority.detach(&pin);
            Ok::<_, ReelmatchError>(())
        })
    }

    fn local_store(&self, index: usize) -> Arc<dyn LocalStore> {
        // Only the host remembers its room between runs
        match (&self.settings.state_dir, index) {
            (Some(dir), 0) => Arc::new(FileLocalStore::in_dir(dir)),
            _ => Arc::new(MemoryLocalStore::new()),
        }
    }
}

/// Swipes every movie of the catalog, liking about half of them
async fn swipe_through<Db, Cp>(client: &Collab<Db, Cp>) -> Result<(), ReelmatchError>
where
    Db: Backend,
    Cp: CatalogProvider,
{
    client.rooms.reset_swipes().await;

    while let Some(movie) = client.rooms.current_movie().await {
        let liked = thread_rng().gen_bool(0.5);
        client.rooms.swipe(&movie.id, liked).await?;
        client.rooms.next_movie().await;
    }

    Ok(())
}

/// Waits until the host replica has seen the whole swipe log, and the stored matches include
/// everything that log produces
async fn settle<Db, Cp>(host: &Collab<Db, Cp>, expected: usize) -> Result<(), ReelmatchError>
where
    Db: Backend,
    Cp: CatalogProvider,
{
    let Some(mut receiver) = host.rooms.subscribe() else {
        return Err(RoomError::NoActiveRoom.into());
    };

    let caught_up = tokio::time::timeout(SETTLE_TIMEOUT, async {
        loop {
            let done = settled(&receiver.borrow_and_update(), expected);

            if done || receiver.changed().await.is_err() {
                break;
            }
        }
    })
    .await;

    if caught_up.is_err() {
        return Err(ReelmatchError::Diverged(SETTLE_TIMEOUT));
    }

    Ok(())
}

/// Whether a view holds `expected` swipes and the matches they produce are stored
fn settled(view: &RoomView, expected: usize) -> bool {
    let Some(room) = &view.room else {
        return false;
    };

    let computed = compute_room_matches(room, &view.swipes, Utc::now());

    view.swipes.len() >= expected && !view.stale && covers(&room.matches, &computed)
}

async fn print_results<Db, Cp>(host: &Collab<Db, Cp>)
where
    Db: Backend,
    Cp: CatalogProvider,
{
    let Some(view) = host.rooms.view() else {
        return;
    };

    let Some(room) = &view.room else {
        return;
    };

    let stats = host.rooms.swipe_stats().await;
    info!(
        "Host swiped {} movies, liked {} and passed {}",
        stats.total, stats.liked, stats.passed
    );

    if room.matches.is_empty() {
        warn!("No matches in room {}", room.pin);
        return;
    }

    for found in &room.matches {
        let Some(movie) = room.movie(&found.movie_id) else {
            continue;
        };

        let genres: Vec<_> = movie.genre_ids.iter().map(|g| genre_name(*g)).collect();

        info!(
            "{} {} ({}) [{}] liked by {} of {}",
            "Match:".bold(),
            movie.title.bright_white(),
            movie.year,
            genres.join(", "),
            found.participants.len(),
            room.members.len()
        );
    }
}

fn log_event(event: &CollabEvent) {
    match event {
        CollabEvent::RoomCreated { pin } => info!("Created room {}", pin),
        CollabEvent::MemberJoined {
            pin,
            participant_id,
        } => info!("{} joined room {}", participant_id, pin),
        CollabEvent::CatalogReady { pin, size } => {
            info!("Room {} has a catalog of {} movies", pin, size)
        }
        CollabEvent::GameStarted { pin } => info!("Room {} started", pin),
        CollabEvent::MatchesFound { pin, matches } => {
            info!("{} new matches in room {}", matches.len(), pin)
        }
        CollabEvent::SubscriptionLost { pin, feed } => {
            warn!("Lost the {} feed of room {}", feed, pin)
        }
        CollabEvent::SubscriptionRestored { pin, feed } => {
            info!("Restored the {} feed of room {}", feed, pin)
        }
        CollabEvent::RoomReplaced { pin } => warn!("Room {} is gone, its PIN was reused", pin),
        CollabEvent::SessionClosed { pin } => info!("Left room {}", pin),
    }
}

impl ReelmatchError {
    fn hint(&self) -> String {
        match self {
            ReelmatchError::Setting { .. } => "Check the REELMATCH_* environment variables. Genres can be given by name or id, separated by commas.".to_string(),
            ReelmatchError::Runtime(_) => "This error is fatal, and should not happen.".to_string(),
            ReelmatchError::Room(_) | ReelmatchError::Store(_) => "The simulated room could not be completed. Run with REELMATCH_VERBOSE=1 for details.".to_string(),
            ReelmatchError::Diverged(_) => "A replica stopped receiving updates. This is a bug in the synchronizer.".to_string(),
        }
    }
}

fn main() {
    let verbose = env::var("REELMATCH_VERBOSE").is_ok_and(|v| !v.is_empty() && v != "0");

    if let Err(e) = logging::init_logger(verbose) {
        eprintln!("Could not initialize logging: {}", e);
    }

    let result = Reelmatch::new().and_then(|reelmatch| {
        info!("Initialized successfully.");
        reelmatch.run()
    });

    if let Err(error) = result {
        error!(
            "{} Read the error below to troubleshoot the issue.",
            "Reelmatch failed!".bold().red()
        );
        error!("{}", error);
        error!("{}", format!("Hint: {}", error.hint()).dimmed().italic());
    }
}

#[cfg(test)]
mod tests {
    use reelmatch_core::{Movie, MovieId, ParticipantId, Pin, RoomData, Swipe};

    use super::*;

    fn view() -> RoomView {
        let pin = Pin::parse("1234").unwrap();
        let host = ParticipantId::new("host");
        let guest = ParticipantId::new("guest");

        let movie = Movie {
            id: MovieId::from(1),
            title: "Heat".to_string(),
            year: 1995,
            genre_ids: vec![80],
            rating: 8.3,
            description: String::new(),
            poster: String::new(),
            director: String::new(),
            cast: vec![],
            runtime: 170,
        };

        let mut room = RoomData::new(pin.clone(), host.clone(), vec![movie]);
        room.add_member(guest.clone());
        room.started = true;

        RoomView {
            pin,
            room: Some(room),
            swipes: vec![
                Swipe::new(host, MovieId::from(1), true),
                Swipe::new(guest, MovieId::from(1), true),
            ],
            stale: false,
        }
    }

    #[test]
    fn test_settles_once_matches_are_stored() {
        let mut view = view();
        assert!(!settled(&view, 2), "the match is not stored yet");

        if let Some(room) = view.room.as_mut() {
            room.matches = compute_room_matches(room, &view.swipes, Utc::now());
        }
        assert!(settled(&view, 2));
        assert!(!settled(&view, 3), "a swipe is still missing");

        view.stale = true;
        assert!(!settled(&view, 2));
    }
}
