use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::{DateTime, Utc};

use crate::{Match, MovieId, ParticipantId, RoomData, Swipe};

/// The minimum number of distinct participants that have to like a movie
pub const MIN_MATCH_PARTICIPANTS: usize = 2;

/// Computes the matches of a swipe log, stamped with the current time.
///
/// A movie matches once at least two distinct participants liked it. Passes never veto a match,
/// and duplicate swipes from one participant count once. Nothing matches before the room has
/// started or while it has fewer than two members.
///
/// The result is sorted by movie id and is a pure function of the input, apart from `matched_at`.
pub fn compute_matches(swipes: &[Swipe], members: &[ParticipantId], started: bool) -> Vec<Match> {
    compute_matches_at(swipes, members, started, Utc::now())
}

/// Same as [compute_matches], with an explicit computation time.
pub fn compute_matches_at(
    swipes: &[Swipe],
    members: &[ParticipantId],
    started: bool,
    now: DateTime<Utc>,
) -> Vec<Match> {
    let distinct_members: HashSet<_> = members.iter().collect();

    if !started || distinct_members.len() < MIN_MATCH_PARTICIPANTS {
        return vec![];
    }

    let mut likes: BTreeMap<&MovieId, BTreeSet<&ParticipantId>> = BTreeMap::new();

    for swipe in swipes.iter().filter(|s| s.liked) {
        likes
            .entry(&swipe.movie_id)
            .or_default()
            .insert(&swipe.participant_id);
    }

    likes
        .into_iter()
        .filter(|(_, participants)| participants.len() >= MIN_MATCH_PARTICIPANTS)
        .map(|(movie_id, participants)| Match {
            movie_id: movie_id.clone(),
            participants: participants.into_iter().cloned().collect(),
            matched_at: now,
        })
        .collect()
}

/// Computes the matches of a room. Swipes on movies outside a populated catalog are ignored.
pub fn compute_room_matches(room: &RoomData, swipes: &[Swipe], now: DateTime<Utc>) -> Vec<Match> {
    if !room.has_catalog() {
        return compute_matches_at(swipes, &room.members, room.started, now);
    }

    let catalog: HashSet<_> = room.catalog.iter().map(|m| &m.id).collect();
    let relevant: Vec<_> = swipes
        .iter()
        .filter(|s| catalog.contains(&s.movie_id))
        .cloned()
        .collect();

    compute_matches_at(&relevant, &room.members, room.started, now)
}

/// The identity of a match set, ignoring when it was computed
pub fn match_keys(matches: &[Match]) -> BTreeMap<MovieId, BTreeSet<ParticipantId>> {
    matches
        .iter()
        .map(|m| (m.movie_id.clone(), m.participants.iter().cloned().collect()))
        .collect()
}

/// Returns true if both sets contain the same matches, regardless of `matched_at`.
pub fn same_matches(a: &[Match], b: &[Match]) -> bool {
    match_keys(a) == match_keys(b)
}

/// Returns the matches of `current` whose movie was not matched in `previous`.
pub fn new_matches(previous: &[Match], current: &[Match]) -> Vec<Match> {
    let known: HashSet<_> = previous.iter().map(|m| &m.movie_id).collect();

    current
        .iter()
        .filter(|m| !known.contains(&m.movie_id))
        .cloned()
        .collect()
}

/// Returns true if `stored` already contains every match of `computed`, with at least the same
/// participants. A replica computing from an older log never produces more than what is stored.
pub fn covers(stored: &[Match], computed: &[Match]) -> bool {
    let stored = match_keys(stored);

    match_keys(computed).iter().all(|(movie, participants)| {
        stored
            .get(movie)
            .is_some_and(|known| participants.is_subset(known))
    })
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use crate::{Movie, Pin};

    use super::*;

    fn swipe(participant: &str, movie: &str, liked: bool) -> Swipe {
        Swipe::new(ParticipantId::new(participant), MovieId::from(movie), liked)
    }

    fn members(ids: &[&str]) -> Vec<ParticipantId> {
        ids.iter().map(|id| ParticipantId::new(*id)).collect()
    }

    fn movie(id: &str) -> Movie {
        Movie {
            id: MovieId::from(id),
            title: id.to_string(),
            year: 2000,
            genre_ids: vec![],
            rating: 0.,
            description: String::new(),
            poster: String::new(),
            director: String::new(),
            cast: vec![],
            runtime: 0,
        }
    }

    fn random_log(rng: &mut StdRng, length: usize) -> Vec<Swipe> {
        let participants = ["a", "b", "c", "d"];
        let movies = ["m1", "m2", "m3", "m4", "m5", "m6"];

        (0..length)
            .map(|_| {
                swipe(
                    participants[rng.gen_range(0..participants.len())],
                    movies[rng.gen_range(0..movies.len())],
                    rng.gen_bool(0.6),
                )
            })
            .collect()
    }

    #[test]
    fn test_liked_by_two_distinct_participants() {
        let log = vec![
            swipe("A", "m1", true),
            swipe("B", "m1", true),
            swipe("C", "m1", false),
        ];
        let matches = compute_matches(&log, &members(&["A", "B", "C"]), true);

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].movie_id, MovieId::from("m1"));
        assert_eq!(matches[0].participants, members(&["A", "B"]));
    }

    #[test]
    fn test_duplicate_swipes_do_not_match() {
        let log = vec![swipe("A", "m1", true), swipe("A", "m1", true)];

        assert!(compute_matches(&log, &members(&["A", "B"]), true).is_empty());
    }

    #[test]
    fn test_no_matches_before_start() {
        let log = vec![swipe("A", "m1", true), swipe("B", "m1", true)];

        assert!(compute_matches(&log, &members(&["A", "B"]), false).is_empty());
    }

    #[test]
    fn test_no_matches_with_fewer_than_two_members() {
        let log = vec![swipe("A", "m1", true), swipe("B", "m1", true)];

        assert!(compute_matches(&log, &members(&["A"]), true).is_empty());
        assert!(compute_matches(&log, &members(&["A", "A"]), true).is_empty());
        assert!(compute_matches(&log, &[], true).is_empty());
    }

    #[test]
    fn test_passes_do_not_count() {
        let log = vec![swipe("A", "m1", false), swipe("B", "m1", false)];

        assert!(compute_matches(&log, &members(&["A", "B"]), true).is_empty());
    }

    #[test]
    fn test_deterministic_and_idempotent() {
        let mut rng = StdRng::seed_from_u64(7);
        let everyone = members(&["a", "b", "c", "d"]);

        for _ in 0..50 {
            let log = random_log(&mut rng, 30);
            let first = compute_matches(&log, &everyone, true);
            let second = compute_matches(&log, &everyone, true);

            assert!(same_matches(&first, &second));
        }
    }

    #[test]
    fn test_monotonic_in_the_log() {
        let mut rng = StdRng::seed_from_u64(42);
        let everyone = members(&["a", "b", "c", "d"]);

        for _ in 0..50 {
            let log = random_log(&mut rng, 40);
            let cut = rng.gen_range(0..=log.len());

            let before = match_keys(&compute_matches(&log[..cut], &everyone, true));
            let after = match_keys(&compute_matches(&log, &everyone, true));

            for movie_id in before.keys() {
                assert!(after.contains_key(movie_id), "{} was retracted", movie_id);
            }
        }
    }

    #[test]
    fn test_output_is_sorted_by_movie() {
        let log = vec![
            swipe("A", "m3", true),
            swipe("B", "m3", true),
            swipe("B", "m1", true),
            swipe("A", "m1", true),
        ];
        let matches = compute_matches(&log, &members(&["A", "B"]), true);
        let movies: Vec<_> = matches.iter().map(|m| m.movie_id.as_str()).collect();

        assert_eq!(movies, vec!["m1", "m3"]);
    }

    #[test]
    fn test_room_matches_ignore_movies_outside_the_catalog() {
        let mut room = RoomData::new(
            Pin::parse("1234").unwrap(),
            ParticipantId::new("A"),
            vec![movie("m1"), movie("m2")],
        );
        room.add_member(ParticipantId::new("B"));
        room.started = true;

        let log = vec![
            swipe("A", "m1", true),
            swipe("B", "m1", true),
            swipe("A", "other", true),
            swipe("B", "other", true),
        ];
        let matches = compute_room_matches(&room, &log, Utc::now());

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].movie_id, MovieId::from("m1"));
    }

    #[test]
    fn test_new_matches() {
        let log = vec![swipe("A", "m1", true), swipe("B", "m1", true)];
        let everyone = members(&["A", "B"]);
        let previous = compute_matches(&log, &everyone, true);

        let mut grown = log.clone();
        grown.push(swipe("A", "m2", true));
        grown.push(swipe("B", "m2", true));
        let current = compute_matches(&grown, &everyone, true);

        let fresh = new_matches(&previous, &current);
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].movie_id, MovieId::from("m2"));
        assert!(!same_matches(&previous, &current));
    }

    #[test]
    fn test_stale_computation_is_covered() {
        let everyone = members(&["A", "B", "C"]);
        let older = vec![swipe("A", "m1", true), swipe("B", "m1", true)];
        let mut newer = older.clone();
        newer.push(swipe("C", "m1", true));
        newer.push(swipe("A", "m2", true));
        newer.push(swipe("C", "m2", true));

        let stale = compute_matches(&older, &everyone, true);
        let fresh = compute_matches(&newer, &everyone, true);

        assert!(covers(&fresh, &stale));
        assert!(!covers(&stale, &fresh));
        assert!(covers(&fresh, &[]));
    }
}
