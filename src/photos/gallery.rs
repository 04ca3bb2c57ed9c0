use super::{decode_photos, Photo, PhotoStore};
use crate::firestore::watch::SnapshotStream;
use crate::firestore::FirestoreError;
use crate::rooms::RoomCode;
use futures::stream::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("Join or create a room first")]
    NoRoom,
    #[error("Gallery unavailable: {0}")]
    Firestore(#[from] FirestoreError),
}

/// Live view of a room's photos.
#[derive(Clone)]
pub struct Gallery {
    store: PhotoStore,
}

impl Gallery {
    pub fn new(store: PhotoStore) -> Self {
        Self { store }
    }

    /// Subscribes to the room's photos. The stream yields the full list on every change.
    pub async fn subscribe(&self, room: &RoomCode) -> Result<GalleryStream, GalleryError> {
        let inner = self.store.photos(room).snapshots().await?;
        tracing::debug!(room = %room, "subscribed to gallery");
        Ok(GalleryStream { inner })
    }

    /// Reads the room's photos once.
    pub async fn fetch(&self, room: &RoomCode) -> Result<Vec<Photo>, GalleryError> {
        Ok(self.store.list(room).await?)
    }
}

/// Stream of gallery contents, in document order.
pub struct GalleryStream {
    inner: SnapshotStream,
}

impl Stream for GalleryStream {
    type Item = Result<Vec<Photo>, GalleryError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match Pin::new(&mut self.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(snapshot))) => Poll::Ready(Some(Ok(decode_photos(snapshot)))),
            Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(GalleryError::Firestore(e)))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}
