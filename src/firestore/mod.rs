//! Cloud Firestore module.
//!
//! A client-side view of Firestore over its REST API: document reads and writes,
//! collection queries, and real-time listeners.
//!
//! # Real-time Updates
//!
//! `CollectionReference::snapshots()` opens a listen stream and yields a full
//! `QuerySnapshot` every time the collection changes. The raw `ListenResponse` events
//! are available through `ExecutableQuery::listen()`.

pub mod listen;
pub mod models;
pub mod query;
pub mod reference;
pub mod snapshot;
pub mod watch;


use self::reference::{CollectionReference, DocumentReference};
use crate::auth::FirebaseAuth;
use crate::core::config::FirebaseOptions;
use crate::core::middleware::SessionMiddleware;
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use thiserror::Error;

const FIRESTORE_V1_API: &str =
    "https://firestore.googleapis.com/v1/projects/{project_id}/databases/(default)/documents";

/// Errors that can occur during Firestore operations.
#[derive(Error, Debug)]
pub enum FirestoreError {
    /// Wrapper for `reqwest::Error`.
    #[error("HTTP Request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    /// Wrapper for `reqwest_middleware::Error`.
    #[error("Middleware error: {0}")]
    MiddlewareError(#[from] reqwest_middleware::Error),
    /// Errors returned by the Firestore API.
    #[error("API error: {0}")]
    ApiError(String),
    /// A create call targeted a document that already exists.
    #[error("Document already exists: {0}")]
    AlreadyExists(String),
    /// The server's document count for a listen target disagrees with the stream's.
    #[error("Existence filter mismatch: server has {expected} documents, stream has {actual}")]
    ExistenceFilterMismatch { expected: usize, actual: usize },
    /// Wrapper for `serde_json::Error`.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Client for interacting with Cloud Firestore.
#[derive(Clone)]
pub struct FirebaseFirestore {
    client: ClientWithMiddleware,
    base_url: String,
}

impl FirebaseFirestore {
    /// Creates a new `FirebaseFirestore` instance.
    ///
    /// Requests are authenticated with the web API key and, once `auth` has a signed-in
    /// user, that user's ID token.
    pub fn new(options: &FirebaseOptions, auth: FirebaseAuth) -> Self {
        let base_url = FIRESTORE_V1_API.replace("{project_id}", &options.project_id);
        Self::new_with_url(options, auth, base_url)
    }

    /// Creates a new `FirebaseFirestore` instance with a custom base URL (emulators or tests).
    ///
    /// The URL must end in `.../projects/{project_id}/databases/{database}/documents`.
    pub fn new_with_url(options: &FirebaseOptions, auth: FirebaseAuth, base_url: String) -> Self {
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);

        let client = ClientBuilder::new(Client::new())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .with(SessionMiddleware::new(options.api_key.clone(), auth))
            .build();

        Self { client, base_url }
    }

    #[cfg(test)]
    pub(crate) fn new_with_client(client: ClientWithMiddleware, base_url: String) -> Self {
        Self { client, base_url }
    }

    /// Gets a `CollectionReference` instance that refers to the collection at the specified path.
    ///
    /// # Arguments
    ///
    /// * `collection_path` - The slash-separated path to the collection (e.g., "rooms/123456/photos").
    pub fn collection(&self, collection_path: &str) -> CollectionReference<'_> {
        CollectionReference {
            client: &self.client,
            base_url: self.base_url.clone(),
            path: format!("{}/{}", self.base_url, collection_path),
        }
    }

    /// Gets a `DocumentReference` instance that refers to the document at the specified path.
    ///
    /// # Arguments
    ///
    /// * `document_path` - The slash-separated path to the document (e.g., "rooms/123456").
    pub fn doc(&self, document_path: &str) -> DocumentReference<'_> {
        DocumentReference {
            client: &self.client,
            base_url: self.base_url.clone(),
            path: format!("{}/{}", self.base_url, document_path),
        }
    }
}
