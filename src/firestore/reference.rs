use super::models::{ArrayValue, Document, ListDocumentsResponse, MapValue, Value, ValueType};
use super::query::{ExecutableQuery, Query};
use super::snapshot::DocumentSnapshot;
use super::watch::SnapshotStream;
use super::FirestoreError;
use crate::core::parse_error_response;
use reqwest::{header, StatusCode};
use reqwest_middleware::ClientWithMiddleware;
use serde::de::{DeserializeOwned, Error};
use serde::ser::Error as SerError;
use serde::Serialize;
use serde_json::map::Map;
use serde_json::Value as SerdeValue;
use std::collections::HashMap;

// Helper to convert Firestore's value map to a standard serde_json::Value
pub(crate) fn convert_fields_to_serde_value(
    fields: HashMap<String, Value>,
) -> Result<SerdeValue, FirestoreError> {
    let mut map = Map::new();
    for (key, value) in fields {
        map.insert(key, convert_value_to_serde_value(value)?);
    }
    Ok(SerdeValue::Object(map))
}

pub(crate) fn convert_value_to_serde_value(value: Value) -> Result<SerdeValue, FirestoreError> {
    use serde_json::json;
    Ok(match value.value_type {
        ValueType::StringValue(s) => SerdeValue::String(s),
        ValueType::IntegerValue(s) => {
            let i: i64 = s.parse().map_err(|e| {
                <serde_json::Error as Error>::custom(format!(
                    "Failed to parse integer string '{}': {}",
                    s, e
                ))
            })?;
            SerdeValue::Number(i.into())
        }
        ValueType::DoubleValue(d) => SerdeValue::Number(
            serde_json::Number::from_f64(d).ok_or_else(|| {
                <serde_json::Error as Error>::custom(format!("Invalid f64 value: {}", d))
            })?,
        ),
        ValueType::BooleanValue(b) => SerdeValue::Bool(b),
        ValueType::MapValue(map_value) => convert_fields_to_serde_value(map_value.fields)?,
        ValueType::ArrayValue(array_value) => {
            let values = array_value
                .values
                .into_iter()
                .map(convert_value_to_serde_value)
                .collect::<Result<Vec<_>, _>>()?;
            SerdeValue::Array(values)
        }
        ValueType::NullValue(_) => SerdeValue::Null,
        ValueType::TimestampValue(s) => SerdeValue::String(s),
        ValueType::GeoPointValue(gp) => {
            json!({ "latitude": gp.latitude, "longitude": gp.longitude })
        }
        ValueType::BytesValue(s) => SerdeValue::String(s),
        ValueType::ReferenceValue(s) => SerdeValue::String(s),
    })
}

// Helper to convert a serializable Rust struct to Firestore's value map
pub(crate) fn convert_serializable_to_fields<T: Serialize>(
    value: &T,
) -> Result<HashMap<String, Value>, FirestoreError> {
    let serde_value = serde_json::to_value(value)?;
    if let SerdeValue::Object(map) = serde_value {
        let mut fields = HashMap::new();
        for (k, v) in map {
            fields.insert(k, convert_serde_value_to_firestore_value(v)?);
        }
        Ok(fields)
    } else {
        Err(FirestoreError::SerializationError(SerError::custom(
            "Can only set objects as documents",
        )))
    }
}

pub(crate) fn convert_serde_value_to_firestore_value(
    value: SerdeValue,
) -> Result<Value, FirestoreError> {
    let value_type = match value {
        SerdeValue::Null => ValueType::NullValue(()),
        SerdeValue::Bool(b) => ValueType::BooleanValue(b),
        SerdeValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                ValueType::IntegerValue(i.to_string())
            } else if let Some(f) = n.as_f64() {
                ValueType::DoubleValue(f)
            } else {
                return Err(FirestoreError::SerializationError(SerError::custom(
                    format!("Unsupported number type: {}", n),
                )));
            }
        }
        SerdeValue::String(s) => ValueType::StringValue(s),
        SerdeValue::Array(a) => {
            let values = a
                .into_iter()
                .map(convert_serde_value_to_firestore_value)
                .collect::<Result<Vec<_>, _>>()?;
            ValueType::ArrayValue(ArrayValue { values })
        }
        SerdeValue::Object(o) => {
            let mut fields = HashMap::new();
            for (k, v) in o {
                fields.insert(k, convert_serde_value_to_firestore_value(v)?);
            }
            ValueType::MapValue(MapValue { fields })
        }
    };
    Ok(Value { value_type })
}

/// Decodes a document's fields into `T`.
pub(crate) fn decode_document<T: DeserializeOwned>(doc: &Document) -> Result<T, FirestoreError> {
    let serde_value = convert_fields_to_serde_value(doc.fields.clone())?;
    Ok(serde_json::from_value(serde_value)?)
}

/// Returns the resource name for a REST URL, e.g.
/// `projects/p/databases/(default)/documents/rooms/123456`.
pub(crate) fn extract_resource_name(url: &str) -> String {
    match url.find("projects/") {
        Some(idx) => url[idx..].to_string(),
        None => url.to_string(),
    }
}

/// Returns the last path segment of a document name.
pub(crate) fn document_id(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or_default()
}

/// A reference to a single document, e.g. `rooms/123456`.
#[derive(Clone)]
pub struct DocumentReference<'a> {
    pub(crate) client: &'a ClientWithMiddleware,
    pub(crate) base_url: String,
    pub(crate) path: String,
}

impl<'a> DocumentReference<'a> {
    /// The document ID (last path segment).
    pub fn id(&self) -> &str {
        document_id(&self.path)
    }

    /// The full resource name of the document.
    pub fn name(&self) -> String {
        extract_resource_name(&self.path)
    }

    /// Gets a sub-collection of this document.
    pub fn collection(&self, collection_id: &str) -> CollectionReference<'a> {
        CollectionReference {
            client: self.client,
            base_url: self.base_url.clone(),
            path: format!("{}/{}", self.path, collection_id),
        }
    }

    /// Reads the document, returning `None` if it does not exist.
    pub async fn get<T: DeserializeOwned>(&self) -> Result<Option<T>, FirestoreError> {
        match self.fetch().await? {
            Some(doc) => Ok(Some(decode_document(&doc)?)),
            None => Ok(None),
        }
    }

    /// Reads the document into a snapshot, which also reports missing documents.
    pub async fn snapshot(&self) -> Result<DocumentSnapshot, FirestoreError> {
        let document = self.fetch().await?;
        Ok(DocumentSnapshot {
            id: self.id().to_string(),
            name: self.name(),
            document,
            read_time: None,
        })
    }

    async fn fetch(&self) -> Result<Option<Document>, FirestoreError> {
        let response = self.client.get(&self.path).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            return Err(FirestoreError::ApiError(
                parse_error_response(response, "Get document failed").await,
            ));
        }

        Ok(Some(response.json().await?))
    }

    /// Writes the document, replacing all existing fields.
    pub async fn set<T: Serialize>(&self, value: &T) -> Result<(), FirestoreError> {
        let fields = convert_serializable_to_fields(value)?;

        let body = serde_json::to_vec(&serde_json::json!({ "fields": fields }))?;

        let response = self
            .client
            .patch(&self.path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FirestoreError::ApiError(
                parse_error_response(response, "Set document failed").await,
            ));
        }

        Ok(())
    }
}

/// A reference to a collection, e.g. `rooms` or `rooms/123456/photos`.
#[derive(Clone)]
pub struct CollectionReference<'a> {
    pub(crate) client: &'a ClientWithMiddleware,
    pub(crate) base_url: String,
    pub(crate) path: String,
}

impl<'a> CollectionReference<'a> {
    /// The collection ID (last path segment).
    pub fn id(&self) -> &str {
        document_id(&self.path)
    }

    pub fn doc(&self, document_id: &str) -> DocumentReference<'a> {
        DocumentReference {
            client: self.client,
            base_url: self.base_url.clone(),
            path: format!("{}/{}", self.path, document_id),
        }
    }

    pub async fn list_documents(&self) -> Result<ListDocumentsResponse, FirestoreError> {
        let response = self.client.get(&self.path).send().await?;

        if !response.status().is_success() {
            return Err(FirestoreError::ApiError(
                parse_error_response(response, "List documents failed").await,
            ));
        }

        let list: ListDocumentsResponse = response.json().await?;
        Ok(list)
    }

    /// Adds a document with a server-generated ID.
    pub async fn add<T: Serialize>(&self, value: &T) -> Result<Document, FirestoreError> {
        self.create_document(None, value).await
    }

    /// Creates a document with the given ID.
    ///
    /// Fails with [`FirestoreError::AlreadyExists`] if the document already exists; an
    /// existing document is never overwritten.
    pub async fn create<T: Serialize>(
        &self,
        document_id: &str,
        value: &T,
    ) -> Result<Document, FirestoreError> {
        self.create_document(Some(document_id), value).await
    }

    async fn create_document<T: Serialize>(
        &self,
        document_id: Option<&str>,
        value: &T,
    ) -> Result<Document, FirestoreError> {
        let fields = convert_serializable_to_fields(value)?;
        let body = serde_json::to_vec(&serde_json::json!({ "fields": fields }))?;

        let mut request = self.client.post(&self.path);
        if let Some(id) = document_id {
            request = request.query(&[("documentId", id)]);
        }

        let response = request
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        if response.status() == StatusCode::CONFLICT {
            return Err(FirestoreError::AlreadyExists(
                parse_error_response(response, "Document already exists").await,
            ));
        }

        if !response.status().is_success() {
            return Err(FirestoreError::ApiError(
                parse_error_response(response, "Create document failed").await,
            ));
        }

        let doc: Document = response.json().await?;
        Ok(doc)
    }

    /// Returns a query over every document in this collection.
    pub fn query(&self) -> ExecutableQuery<'a> {
        let parent_path = match self.path.rfind('/') {
            Some(idx) => self.path[..idx].to_string(),
            None => self.path.clone(),
        };
        ExecutableQuery::new(
            self.client,
            self.base_url.clone(),
            parent_path,
            Query::new(self.id()),
        )
    }

    /// Listens to the collection, yielding a full snapshot whenever it changes.
    pub async fn snapshots(&self) -> Result<SnapshotStream, FirestoreError> {
        self.query().snapshots().await
    }
}
