use std::time::Duration;

use chrono::{DateTime, Utc};

/// Who persists recomputed matches back to the room document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchWrites {
    /// Every subscribed client recomputes and writes, converging through idempotence.
    #[default]
    EveryClient,
    /// A single authoritative writer persists matches, clients only observe.
    Authority,
}

/// The configuration of a reelmatch client
#[derive(Debug, Clone)]
pub struct Config {
    /// How many movies a room's catalog should contain
    pub catalog_size: usize,
    /// How many catalog pages may be requested for a single fetch
    pub catalog_page_budget: usize,
    /// The highest page number that is sampled from the provider
    pub catalog_max_page: u32,
    /// Fetch director and cast for every accepted movie
    pub enrich_credits: bool,
    /// The region used when looking up where a movie can be watched
    pub watch_region: String,
    /// How many PINs to try before giving up on creating a room
    pub pin_attempts: usize,
    /// How old a room must be before its PIN can be handed out again
    pub room_ttl: chrono::Duration,
    /// The delay before the first resubscription attempt
    pub resubscribe_delay: Duration,
    /// The upper bound of the resubscription backoff
    pub resubscribe_max_delay: Duration,
    pub match_writes: MatchWrites,
}

impl Config {
    /// Rooms created before the returned instant no longer hold on to their PIN
    pub fn stale_before(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.room_ttl
    }

    /// Returns the delay before the given resubscription attempt, starting at zero
    pub fn resubscribe_backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(16));

        self.resubscribe_delay
            .saturating_mul(factor)
            .min(self.resubscribe_max_delay)
    }

    /// Whether sessions opened by clients should write recomputed matches
    pub fn clients_write_matches(&self) -> bool {
        self.match_writes == MatchWrites::EveryClient
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog_size: 30,
            catalog_page_budget: 8,
            // Popularity sorted pages get obscure fast past this point
            catalog_max_page: 20,
            enrich_credits: false,
            watch_region: "US".to_string(),
            pin_attempts: 5,
            room_ttl: chrono::Duration::hours(24),
            resubscribe_delay: Duration::from_millis(250),
            resubscribe_max_delay: Duration::from_secs(10),
            match_writes: MatchWrites::EveryClient,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resubscribe_backoff_is_capped() {
        let config = Config::default();

        assert_eq!(config.resubscribe_backoff(0), Duration::from_millis(250));
        assert_eq!(config.resubscribe_backoff(1), Duration::from_millis(500));
        assert_eq!(config.resubscribe_backoff(3), Duration::from_secs(2));
        assert_eq!(config.resubscribe_backoff(40), Duration::from_secs(10));
    }

    #[test]
    fn test_stale_before() {
        let config = Config::default();
        let now = Utc::now();

        assert_eq!(now - config.stale_before(now), chrono::Duration::hours(24));
    }
}
