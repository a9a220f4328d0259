use std::fmt::Display;

use crossbeam::channel::{Receiver, Sender};
use reelmatch_core::{Match, ParticipantId, Pin};

pub type EventSender = Sender<CollabEvent>;
pub type EventReceiver = Receiver<CollabEvent>;

/// One of the two subscriptions a room session holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feed {
    Room,
    Swipes,
}

/// Events emitted to local observers of the collab system
#[derive(Debug, Clone, PartialEq)]
pub enum CollabEvent {
    /// This client created a room and is now its host
    RoomCreated { pin: Pin },
    /// A participant was added to the room's members
    MemberJoined {
        pin: Pin,
        participant_id: ParticipantId,
    },
    /// The room's catalog was populated
    CatalogReady { pin: Pin, size: usize },
    /// The host started the game, swiping can begin
    GameStarted { pin: Pin },
    /// Matches that were not part of the room's previous match set
    MatchesFound { pin: Pin, matches: Vec<Match> },
    /// A subscription ended, the local view is stale until it is restored
    SubscriptionLost { pin: Pin, feed: Feed },
    SubscriptionRestored { pin: Pin, feed: Feed },
    /// The PIN now belongs to another room, or this participant is no longer a member.
    /// The session was closed without adopting the new document.
    RoomReplaced { pin: Pin },
    /// The session was closed after leaving the room
    SessionClosed { pin: Pin },
}

impl Display for Feed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Feed::Room => write!(f, "room"),
            Feed::Swipes => write!(f, "swipes"),
        }
    }
}
