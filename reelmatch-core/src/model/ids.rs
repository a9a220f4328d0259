use std::fmt::{Debug, Display};

use lazy_static::lazy_static;
use rand::{distributions::Uniform, thread_rng, Rng};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

lazy_static! {
    static ref PIN_REGEX: Regex = Regex::new(r"^[0-9]{4}$").unwrap();
}

const PARTICIPANT_PREFIX: &str = "user_";
const PARTICIPANT_SUFFIX_LENGTH: usize = 9;
const PARTICIPANT_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PinError {
    #[error("Invalid PIN. Please enter a 4-digit PIN.")]
    Malformed(String),
}

/// The external identity of a room, a 4-digit numeric string.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pin(String);

impl Pin {
    /// Validates user input. Whitespace around the digits is ignored.
    pub fn parse(input: &str) -> Result<Self, PinError> {
        let trimmed = input.trim();

        if PIN_REGEX.is_match(trimmed) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(PinError::Malformed(input.to_string()))
        }
    }

    /// Draws a random PIN. Never starts with a zero.
    pub fn random() -> Self {
        let value = thread_rng().gen_range(1000..=9999);
        Self(value.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Pin {
    type Error = PinError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Pin> for String {
    fn from(pin: Pin) -> Self {
        pin.0
    }
}

impl Display for Pin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Debug for Pin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Pin({})", self.0)
    }
}

/// A stable, client generated identifier of one device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Generates a new id that is unique with high probability.
    pub fn generate() -> Self {
        let distribution = Uniform::from(0..PARTICIPANT_ALPHABET.len());
        let suffix: String = thread_rng()
            .sample_iter(distribution)
            .take(PARTICIPANT_SUFFIX_LENGTH)
            .map(|i| PARTICIPANT_ALPHABET[i] as char)
            .collect();

        Self(format!("{}{}", PARTICIPANT_PREFIX, suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The catalog provider's identifier of a movie.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MovieId(String);

impl MovieId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u64> for MovieId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for MovieId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl Display for MovieId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
