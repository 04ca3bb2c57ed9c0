//! The root shell: signs the visitor in, holds the active room, and routes the upload
//! form and gallery to it.
//!
//! Room state only moves forward. Once a join or create succeeds the app stays in that
//! room; there is no leave operation.

use crate::auth::FirebaseAuth;
use crate::cloudinary::CloudinaryClient;
use crate::core::config::AppConfig;
use crate::firestore::FirebaseFirestore;
use crate::photos::{
    Gallery, GalleryError, GalleryStream, PhotoDraft, PhotoRecord, PhotoStore, PhotoUploader,
    UploadError,
};
use crate::rooms::{RoomCode, RoomError, RoomGate};
use crate::FirebaseApp;


#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomState {
    NoRoom,
    InRoom(RoomCode),
}

pub struct PhotoRoomApp {
    auth: FirebaseAuth,
    gate: RoomGate,
    uploader: PhotoUploader,
    gallery: Gallery,
    state: RoomState,
}

impl PhotoRoomApp {
    pub fn new(config: AppConfig) -> Self {
        let firebase = FirebaseApp::new(config.firebase);
        let auth = firebase.auth();
        let firestore = firebase.firestore();
        let cloudinary = CloudinaryClient::new(&config.cloudinary);
        Self::with_clients(auth, firestore, cloudinary)
    }

    /// Builds the app from preconfigured clients, e.g. ones pointed at emulators.
    ///
    /// `firestore` should authenticate through the same `auth` session.
    pub fn with_clients(
        auth: FirebaseAuth,
        firestore: FirebaseFirestore,
        cloudinary: CloudinaryClient,
    ) -> Self {
        let store = PhotoStore::new(firestore.clone());
        Self {
            auth,
            gate: RoomGate::new(firestore),
            uploader: PhotoUploader::new(cloudinary, store.clone()),
            gallery: Gallery::new(store),
            state: RoomState::NoRoom,
        }
    }

    /// Signs in anonymously. A failure is logged and the app keeps running signed out.
    pub async fn start(&self) {
        match self.auth.sign_in_anonymously().await {
            Ok(user) => tracing::info!(uid = %user.uid, "session started"),
            Err(e) => tracing::error!(error = %e, "anonymous sign-in failed"),
        }
    }

    pub fn auth(&self) -> &FirebaseAuth {
        &self.auth
    }

    pub fn state(&self) -> &RoomState {
        &self.state
    }

    pub fn room(&self) -> Option<&RoomCode> {
        match &self.state {
            RoomState::InRoom(code) => Some(code),
            RoomState::NoRoom => None,
        }
    }

    /// Joins the room whose code the user typed.
    pub async fn join_room(&mut self, input: &str) -> Result<RoomCode, RoomError> {
        self.ensure_no_room()?;
        let code = self.gate.join(input).await?;
        self.state = RoomState::InRoom(code.clone());
        Ok(code)
    }

    /// Creates a new room and enters it.
    pub async fn create_room(&mut self) -> Result<RoomCode, RoomError> {
        self.ensure_no_room()?;
        let code = self.gate.create().await?;
        self.state = RoomState::InRoom(code.clone());
        Ok(code)
    }

    /// Uploads the draft as the signed-in user's photo in the active room.
    pub async fn upload_photo(&self, draft: PhotoDraft) -> Result<PhotoRecord, UploadError> {
        if draft.file.is_none() {
            return Err(UploadError::NoPhotoSelected);
        }
        let room = self.room().ok_or(UploadError::NoRoom)?;
        let user = self
            .auth
            .current_user()
            .await
            .ok_or(UploadError::NotSignedIn)?;
        self.uploader.submit(room, &user.uid, draft).await
    }

    /// Subscribes to the active room's gallery.
    pub async fn gallery(&self) -> Result<GalleryStream, GalleryError> {
        let room = self.room().ok_or(GalleryError::NoRoom)?;
        self.gallery.subscribe(room).await
    }

    fn ensure_no_room(&self) -> Result<(), RoomError> {
        match &self.state {
            RoomState::InRoom(code) => Err(RoomError::AlreadyInRoom(code.clone())),
            RoomState::NoRoom => Ok(()),
        }
    }
}
