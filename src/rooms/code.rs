use super::RoomError;
use rand::Rng;
use std::fmt;
use std::str::FromStr;

pub const ROOM_CODE_LEN: usize = 6;

const MIN_GENERATED: u32 = 100_000;
const MAX_GENERATED: u32 = 999_999;

/// A room code: exactly six ASCII digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomCode(String);

impl RoomCode {
    /// Parses user input, ignoring surrounding whitespace.
    pub fn parse(input: &str) -> Result<Self, RoomError> {
        let code = input.trim();
        if code.len() != ROOM_CODE_LEN || !code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(RoomError::InvalidCode(code.to_string()));
        }
        Ok(Self(code.to_string()))
    }

    /// Draws a random code. Generated codes never start with `0`.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self(rng.random_range(MIN_GENERATED..=MAX_GENERATED).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RoomCode {
    type Err = RoomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for RoomCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
