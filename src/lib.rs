//! Shared photo rooms on Firebase and Cloudinary.
//!
//! A visitor is signed in anonymously, creates or joins a room identified by a 6-digit
//! code, uploads photos to Cloudinary and follows the room's gallery live through
//! Firestore. [`app::PhotoRoomApp`] ties the pieces together; the clients underneath
//! can also be used on their own.

pub mod auth;
pub mod cloudinary;
pub mod core;
#[cfg(feature = "firestore")]
pub mod firestore;

#[cfg(feature = "firestore")]
pub mod app;
#[cfg(feature = "firestore")]
pub mod photos;
#[cfg(feature = "firestore")]
pub mod rooms;

use crate::auth::FirebaseAuth;
use crate::core::config::FirebaseOptions;

#[cfg(feature = "firestore")]
pub use app::{PhotoRoomApp, RoomState};
pub use crate::core::config::AppConfig;

/// Entry point for the Firebase side: one auth session shared by every client it hands out.
pub struct FirebaseApp {
    options: FirebaseOptions,
    auth: FirebaseAuth,
}

impl FirebaseApp {
    pub fn new(options: FirebaseOptions) -> Self {
        let auth = FirebaseAuth::new(&options);
        Self { options, auth }
    }

    pub fn options(&self) -> &FirebaseOptions {
        &self.options
    }

    pub fn auth(&self) -> FirebaseAuth {
        self.auth.clone()
    }

    #[cfg(feature = "firestore")]
    pub fn firestore(&self) -> firestore::FirebaseFirestore {
        firestore::FirebaseFirestore::new(&self.options, self.auth.clone())
    }
}
