//! The room gate: join an existing room by code or create a new one.
//!
//! A room is the document `rooms/{code}`. Joining only checks that the document exists;
//! creating picks random codes until one is free.

pub mod code;

pub use self::code::RoomCode;

use crate::firestore::reference::DocumentReference;
use crate::firestore::{FirebaseFirestore, FirestoreError};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(test)]
mod tests;

pub const ROOMS_COLLECTION: &str = "rooms";

// Attempts before `create` gives up on finding a free code.
const MAX_CREATE_ATTEMPTS: usize = 20;

/// Errors from joining or creating a room. `Display` is the message shown to the user.
#[derive(Error, Debug)]
pub enum RoomError {
    #[error("Please enter a 6-digit room code")]
    InvalidCode(String),
    #[error("Room not found")]
    NotFound(RoomCode),
    #[error("Already in room {0}")]
    AlreadyInRoom(RoomCode),
    #[error("Could not find a free room code after {0} attempts")]
    Exhausted(usize),
    #[error("Failed to join room: {0}")]
    JoinFailed(#[source] FirestoreError),
    #[error("Failed to create room: {0}")]
    CreateFailed(#[source] FirestoreError),
}

/// The stored room document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDocument {
    /// Creation time in milliseconds since the Unix epoch.
    pub created_at: i64,
}

#[derive(Clone)]
pub struct RoomGate {
    firestore: FirebaseFirestore,
}

impl RoomGate {
    pub fn new(firestore: FirebaseFirestore) -> Self {
        Self { firestore }
    }

    fn room(&self, code: &RoomCode) -> DocumentReference<'_> {
        self.firestore
            .collection(ROOMS_COLLECTION)
            .doc(code.as_str())
    }

    /// Joins an existing room.
    ///
    /// Fails with [`RoomError::NotFound`] if no room has this code.
    pub async fn join(&self, input: &str) -> Result<RoomCode, RoomError> {
        let code = RoomCode::parse(input)?;

        let snapshot = self
            .room(&code)
            .snapshot()
            .await
            .map_err(RoomError::JoinFailed)?;

        if !snapshot.exists() {
            tracing::info!(room = %code, "room not found");
            return Err(RoomError::NotFound(code));
        }

        tracing::info!(room = %code, "joined room");
        Ok(code)
    }

    /// Creates a room under a fresh random code.
    pub async fn create(&self) -> Result<RoomCode, RoomError> {
        self.create_with(|| RoomCode::generate(&mut rand::rng()))
            .await
    }

    /// Creates a room, drawing candidate codes from `next_code`.
    ///
    /// Codes whose room already exists are skipped. The document is written with a
    /// create-if-absent precondition, so a concurrent creator that takes the same code
    /// first makes this attempt move on instead of sharing the room.
    pub async fn create_with<F>(&self, mut next_code: F) -> Result<RoomCode, RoomError>
    where
        F: FnMut() -> RoomCode,
    {
        for attempt in 1..=MAX_CREATE_ATTEMPTS {
            let code = next_code();

            let snapshot = self
                .room(&code)
                .snapshot()
                .await
                .map_err(RoomError::CreateFailed)?;
            if snapshot.exists() {
                tracing::debug!(room = %code, attempt, "room code taken");
                continue;
            }

            let room = RoomDocument {
                created_at: Utc::now().timestamp_millis(),
            };
            match self
                .firestore
                .collection(ROOMS_COLLECTION)
                .create(code.as_str(), &room)
                .await
            {
                Ok(_) => {
                    tracing::info!(room = %code, attempt, "created room");
                    return Ok(code);
                }
                Err(FirestoreError::AlreadyExists(_)) => {
                    tracing::warn!(room = %code, attempt, "room code taken concurrently");
                }
                Err(e) => return Err(RoomError::CreateFailed(e)),
            }
        }

        Err(RoomError::Exhausted(MAX_CREATE_ATTEMPTS))
    }
}
