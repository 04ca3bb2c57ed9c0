use super::listen::{listen_request, ListenStream};
use super::models::{
    CollectionSelector, Direction, FieldReference, ListenRequest, Order, QueryTarget,
    RunQueryRequest, RunQueryResponse, StructuredQuery, Target, TargetType,
};
use super::reference::{document_id, extract_resource_name};
use super::snapshot::{DocumentSnapshot, QuerySnapshot};
use super::watch::{Reopen, SnapshotStream, WatchState};
use super::FirestoreError;
use crate::core::parse_error_response;
use reqwest::header;
use reqwest_middleware::ClientWithMiddleware;

// A listen stream carries a single target.
pub(crate) const LISTEN_TARGET_ID: i32 = 1;

/// A definition of a Firestore query over a single collection.
#[derive(Clone, Debug)]
pub struct Query {
    pub(crate) query: StructuredQuery,
}

impl Query {
    /// Creates a new `Query` targeting the specified collection.
    pub fn new(collection_id: impl Into<String>) -> Self {
        Self {
            query: StructuredQuery {
                from: vec![CollectionSelector {
                    collection_id: collection_id.into(),
                    all_descendants: None,
                }],
                order_by: None,
                limit: None,
            },
        }
    }

    /// Sorts the query results by the specified field.
    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        let order = Order {
            field: FieldReference {
                field_path: field.to_string(),
            },
            direction,
        };

        self.query.order_by.get_or_insert_with(Vec::new).push(order);
        self
    }

    /// Limits the number of documents returned.
    pub fn limit(mut self, limit: i32) -> Self {
        self.query.limit = Some(limit);
        self
    }
}

/// A `Query` attached to a Firestore client, ready for execution.
#[derive(Clone)]
pub struct ExecutableQuery<'a> {
    pub(crate) client: &'a ClientWithMiddleware,
    pub(crate) base_url: String,
    pub(crate) parent_path: String,
    pub(crate) query: Query,
}

impl<'a> ExecutableQuery<'a> {
    pub(crate) fn new(
        client: &'a ClientWithMiddleware,
        base_url: String,
        parent_path: String,
        query: Query,
    ) -> Self {
        Self {
            client,
            base_url,
            parent_path,
            query,
        }
    }

    /// Sorts the query results.
    pub fn order_by(self, field: &str, direction: Direction) -> Self {
        Self {
            query: self.query.order_by(field, direction),
            ..self
        }
    }

    /// Limits the results.
    pub fn limit(self, limit: i32) -> Self {
        Self {
            query: self.query.limit(limit),
            ..self
        }
    }

    /// Executes the query once and returns the results as a `QuerySnapshot`.
    pub async fn get(&self) -> Result<QuerySnapshot, FirestoreError> {
        let url = format!("{}:runQuery", self.parent_path);

        let request = RunQueryRequest {
            structured_query: self.query.query.clone(),
        };

        let response = self
            .client
            .post(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(serde_json::to_vec(&request)?)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FirestoreError::ApiError(
                parse_error_response(response, "Run query failed").await,
            ));
        }

        let responses: Vec<RunQueryResponse> = response.json().await?;

        let mut documents = Vec::new();
        let mut read_time = None;

        for res in responses {
            if let Some(rt) = res.read_time {
                read_time = Some(rt);
            }

            if let Some(doc) = res.document {
                documents.push(DocumentSnapshot {
                    id: document_id(&doc.name).to_string(),
                    name: doc.name.clone(),
                    document: Some(doc),
                    read_time: read_time.clone(),
                });
            }
        }

        Ok(QuerySnapshot {
            documents,
            read_time,
        })
    }

    /// Opens a raw listen stream for the query.
    pub async fn listen(&self) -> Result<ListenStream, FirestoreError> {
        listen_request(self.client, &self.base_url, &self.listen_target()).await
    }

    /// Listens to the query, yielding a full `QuerySnapshot` every time the results change.
    ///
    /// If the server reports that the stream missed changes, the listen is reopened and
    /// the next snapshot carries the full, corrected result set.
    pub async fn snapshots(&self) -> Result<SnapshotStream, FirestoreError> {
        let request = self.listen_target();
        let stream = listen_request(self.client, &self.base_url, &request).await?;
        let reopen = Reopen {
            client: self.client.clone(),
            documents_url: self.base_url.clone(),
            request,
        };
        Ok(SnapshotStream::new(stream, WatchState::new(LISTEN_TARGET_ID)).with_reopen(reopen))
    }

    fn listen_target(&self) -> ListenRequest {
        let parent = extract_resource_name(&self.parent_path);
        let database = parent
            .split("/documents")
            .next()
            .unwrap_or_default()
            .to_string();

        let target = Target {
            target_type: TargetType::Query(QueryTarget {
                parent,
                structured_query: self.query.query.clone(),
            }),
            target_id: LISTEN_TARGET_ID,
            resume_token: None,
            once: None,
        };

        ListenRequest {
            database,
            add_target: Some(target),
            remove_target: None,
            labels: None,
        }
    }
}
