use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{MovieId, ParticipantId};

/// One participant's like/pass decision on one movie. Entries of the swipe log are never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Swipe {
    pub participant_id: ParticipantId,
    pub movie_id: MovieId,
    pub liked: bool,
    pub swiped_at: DateTime<Utc>,
}

impl Swipe {
    /// Creates a swipe stamped with the local time
    pub fn new(participant_id: ParticipantId, movie_id: MovieId, liked: bool) -> Self {
        Self {
            participant_id,
            movie_id,
            liked,
            swiped_at: Utc::now(),
        }
    }
}

/// A movie liked by at least two distinct participants after the room has started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub movie_id: MovieId,
    /// Sorted, without duplicates
    pub participants: Vec<ParticipantId>,
    /// When the match set containing this match was computed
    pub matched_at: DateTime<Utc>,
}

/// Counts of a participant's own swipes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwipeStats {
    pub total: usize,
    pub liked: usize,
    pub passed: usize,
}

impl SwipeStats {
    pub fn from_swipes<'a>(swipes: impl IntoIterator<Item = &'a Swipe>) -> Self {
        swipes.into_iter().fold(Self::default(), |mut stats, swipe| {
            stats.total += 1;

            if swipe.liked {
                stats.liked += 1;
            } else {
                stats.passed += 1;
            }

            stats
        })
    }
}
