//! Photo records and the two flows built on them: uploading and the live gallery.
//!
//! A photo record lives at `rooms/{code}/photos/{userId}`, so each user holds at most one
//! photo per room and uploading again replaces it.

pub mod gallery;
pub mod uploader;

pub use self::gallery::{Gallery, GalleryError, GalleryStream};
pub use self::uploader::{PhotoDraft, PhotoUploader, UploadError};

use crate::firestore::reference::CollectionReference;
use crate::firestore::snapshot::QuerySnapshot;
use crate::firestore::{FirebaseFirestore, FirestoreError};
use crate::rooms::{RoomCode, ROOMS_COLLECTION};
use serde::{Deserialize, Serialize};


pub const PHOTOS_COLLECTION: &str = "photos";

/// A stored photo: where the image is hosted and who posted it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRecord {
    pub url: String,
    pub caption: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    /// Upload time in milliseconds since the Unix epoch.
    pub timestamp: i64,
}

/// A photo record together with its document ID (the uploader's user id).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Photo {
    pub id: String,
    pub record: PhotoRecord,
}

/// Reads and writes photo records.
#[derive(Clone)]
pub struct PhotoStore {
    firestore: FirebaseFirestore,
}

impl PhotoStore {
    pub fn new(firestore: FirebaseFirestore) -> Self {
        Self { firestore }
    }

    /// The photo collection of a room.
    pub fn photos(&self, room: &RoomCode) -> CollectionReference<'_> {
        self.firestore
            .collection(ROOMS_COLLECTION)
            .doc(room.as_str())
            .collection(PHOTOS_COLLECTION)
    }

    /// Writes `record` as the uploader's photo in `room`, replacing any earlier one.
    pub async fn save(&self, room: &RoomCode, record: &PhotoRecord) -> Result<(), FirestoreError> {
        self.photos(room).doc(&record.user_id).set(record).await
    }

    /// Reads every photo in `room` once.
    pub async fn list(&self, room: &RoomCode) -> Result<Vec<Photo>, FirestoreError> {
        let snapshot = self.photos(room).query().get().await?;
        Ok(decode_photos(snapshot))
    }
}

/// Decodes the photos in a snapshot, keeping snapshot order.
///
/// Documents that do not decode as a [`PhotoRecord`] are skipped.
pub(crate) fn decode_photos(snapshot: QuerySnapshot) -> Vec<Photo> {
    snapshot
        .into_iter()
        .filter_map(|doc| match doc.data::<PhotoRecord>() {
            Ok(Some(record)) => Some(Photo {
                id: doc.id().to_string(),
                record,
            }),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(doc = doc.name(), error = %e, "skipping malformed photo");
                None
            }
        })
        .collect()
}
