//! Firestore REST API wire types and JSON bridging.
//!
//! Documents are stored as Firestore `Value` trees but the rest of the
//! codebase works in plain serde models. The bridge lives here: a serde
//! model round-trips through `serde_json::Value` and the conversion pair
//! [`json_to_value`] / [`value_to_json`].

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

use crate::error::{FirestoreError, FirestoreResult};

/// Firestore document value types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    NullValue(()),
    BooleanValue(bool),
    IntegerValue(String), // Firestore sends integers as strings
    DoubleValue(f64),
    TimestampValue(String),
    StringValue(String),
    ReferenceValue(String),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrayValue {
    pub values: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapValue {
    pub fields: Option<HashMap<String, Value>>,
}

/// Firestore document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Full resource name
    pub name: Option<String>,
    /// Document fields
    pub fields: Option<HashMap<String, Value>>,
    /// Create time
    pub create_time: Option<String>,
    /// Update time
    pub update_time: Option<String>,
}

impl Document {
    /// Create a new document with the given fields.
    pub fn new(fields: HashMap<String, Value>) -> Self {
        Self {
            name: None,
            fields: Some(fields),
            create_time: None,
            update_time: None,
        }
    }

    /// Document ID (last path segment of the resource name).
    pub fn doc_id(&self) -> Option<&str> {
        self.name.as_deref().and_then(|n| n.rsplit('/').next())
    }

    /// Serialize a model into Firestore fields.
    pub fn from_model<T: Serialize>(model: &T) -> FirestoreResult<Self> {
        let json = serde_json::to_value(model)?;
        match json_to_value(&json) {
            Value::MapValue(MapValue { fields }) => Ok(Self::new(fields.unwrap_or_default())),
            _ => Err(FirestoreError::serialization(
                "model did not serialize to a JSON object",
            )),
        }
    }

    /// Deserialize this document's fields into a model.
    pub fn into_model<T: DeserializeOwned>(&self) -> FirestoreResult<T> {
        let fields = self.fields.clone().unwrap_or_default();
        let json = value_to_json(&Value::MapValue(MapValue {
            fields: Some(fields),
        }));
        serde_json::from_value(json).map_err(|e| {
            FirestoreError::serialization(format!(
                "document {} does not match model: {}",
                self.name.as_deref().unwrap_or("<unnamed>"),
                e
            ))
        })
    }
}

/// Convert a JSON value into the Firestore wire representation.
///
/// Strings that parse as RFC 3339 timestamps become `timestampValue` so that
/// range filters and ordering on date fields compare chronologically. All
/// model timestamps serialize through chrono's RFC 3339 form, which keeps the
/// mapping symmetric.
pub fn json_to_value(json: &JsonValue) -> Value {
    match json {
        JsonValue::Null => Value::NullValue(()),
        JsonValue::Bool(b) => Value::BooleanValue(*b),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::IntegerValue(i.to_string())
            } else {
                Value::DoubleValue(n.as_f64().unwrap_or(0.0))
            }
        }
        JsonValue::String(s) => {
            if DateTime::parse_from_rfc3339(s).is_ok() {
                Value::TimestampValue(s.clone())
            } else {
                Value::StringValue(s.clone())
            }
        }
        JsonValue::Array(items) => Value::ArrayValue(ArrayValue {
            values: Some(items.iter().map(json_to_value).collect()),
        }),
        JsonValue::Object(map) => Value::MapValue(MapValue {
            fields: Some(
                map.iter()
                    .map(|(k, v)| (k.clone(), json_to_value(v)))
                    .collect(),
            ),
        }),
    }
}

/// Convert a Firestore wire value back into JSON.
pub fn value_to_json(value: &Value) -> JsonValue {
    match value {
        Value::NullValue(()) => JsonValue::Null,
        Value::BooleanValue(b) => JsonValue::Bool(*b),
        Value::IntegerValue(s) => s
            .parse::<i64>()
            .map(JsonValue::from)
            .unwrap_or_else(|_| JsonValue::String(s.clone())),
        Value::DoubleValue(f) => serde_json::Number::from_f64(*f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        Value::TimestampValue(s) | Value::StringValue(s) | Value::ReferenceValue(s) => {
            JsonValue::String(s.clone())
        }
        Value::ArrayValue(ArrayValue { values }) => JsonValue::Array(
            values
                .as_deref()
                .unwrap_or_default()
                .iter()
                .map(value_to_json)
                .collect(),
        ),
        Value::MapValue(MapValue { fields }) => JsonValue::Object(
            fields
                .as_ref()
                .map(|f| {
                    f.iter()
                        .map(|(k, v)| (k.clone(), value_to_json(v)))
                        .collect()
                })
                .unwrap_or_default(),
        ),
    }
}

/// Timestamp wire value for query filters.
pub fn timestamp_value(ts: DateTime<Utc>) -> Value {
    Value::TimestampValue(ts.to_rfc3339())
}

/// String wire value for query filters.
pub fn string_value(s: impl Into<String>) -> Value {
    Value::StringValue(s.into())
}

// ============================================================================
// Structured Query Types (documents:runQuery)
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunQueryRequest {
    pub structured_query: StructuredQuery,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunQueryResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<Document>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredQuery {
    pub from: Vec<CollectionSelector>,
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<Vec<Order>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSelector {
    pub collection_id: String,
}

/// A query filter: either a single field predicate or a composite AND.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Filter {
    FieldFilter(FieldFilter),
    CompositeFilter(CompositeFilter),
}

impl Filter {
    /// Combine predicates into a single filter (AND), flattening the
    /// single-predicate case.
    pub fn and(mut predicates: Vec<FieldFilter>) -> Option<Self> {
        match predicates.len() {
            0 => None,
            1 => Some(Filter::FieldFilter(predicates.remove(0))),
            _ => Some(Filter::CompositeFilter(CompositeFilter {
                op: "AND".to_string(),
                filters: predicates.into_iter().map(Filter::FieldFilter).collect(),
            })),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeFilter {
    pub op: String,
    pub filters: Vec<Filter>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldFilter {
    pub field: FieldReference,
    pub op: String,
    pub value: Value,
}

impl FieldFilter {
    pub fn new(field: impl Into<String>, op: impl Into<String>, value: Value) -> Self {
        Self {
            field: FieldReference {
                field_path: field.into(),
            },
            op: op.into(),
            value,
        }
    }

    pub fn equal(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, "EQUAL", value)
    }

    pub fn greater_than(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, "GREATER_THAN", value)
    }

    /// Matches documents whose array field contains any of the given values.
    pub fn array_contains_any(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::new(
            field,
            "ARRAY_CONTAINS_ANY",
            Value::ArrayValue(ArrayValue {
                values: Some(values),
            }),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldReference {
    pub field_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub field: FieldReference,
    pub direction: String,
}

impl Order {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: FieldReference {
                field_path: field.into(),
            },
            direction: "ASCENDING".to_string(),
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: FieldReference {
                field_path: field.into(),
            },
            direction: "DESCENDING".to_string(),
        }
    }
}

// ============================================================================
// Batch Write Types (documents:batchWrite, atomic multi-document operations)
// ============================================================================

/// A single write operation in a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Write {
    /// Update or insert a document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update: Option<Document>,

    /// Delete a document by name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<String>,

    /// Precondition for the write.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_document: Option<Precondition>,
}

impl Write {
    /// Insert that fails if the document already exists. The storage-level
    /// uniqueness primitive behind email and application guards.
    pub fn insert(name: String, fields: HashMap<String, Value>) -> Self {
        Self {
            update: Some(Document {
                name: Some(name),
                fields: Some(fields),
                create_time: None,
                update_time: None,
            }),
            delete: None,
            current_document: Some(Precondition {
                exists: Some(false),
                update_time: None,
            }),
        }
    }

}

/// Precondition for a write operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Precondition {
    /// Document must (not) exist.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exists: Option<bool>,

    /// Document must have this update time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
}

/// Batch write request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchWriteRequest {
    pub writes: Vec<Write>,
}

/// Result of a single write in a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteResult {
    pub update_time: Option<String>,
}

/// Status of a single write in a batch (gRPC status code, 0 = OK).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteStatus {
    pub code: Option<i32>,
    pub message: Option<String>,
}

/// Batch write response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchWriteResponse {
    pub write_results: Option<Vec<WriteResult>>,
    pub status: Option<Vec<WriteStatus>>,
}

impl BatchWriteResponse {
    /// Create an empty response for empty batch writes.
    pub fn empty() -> Self {
        Self {
            write_results: Some(vec![]),
            status: Some(vec![]),
        }
    }

    /// Check per-write statuses.
    ///
    /// `batchWrite` returns 200 even when individual writes fail, so
    /// precondition violations (ALREADY_EXISTS = 6, FAILED_PRECONDITION = 9)
    /// surface here rather than as HTTP errors.
    pub fn check_for_errors(&self) -> FirestoreResult<()> {
        if let Some(statuses) = &self.status {
            for (i, status) in statuses.iter().enumerate() {
                match status.code {
                    Some(0) | None => {}
                    Some(6) => {
                        return Err(FirestoreError::AlreadyExists(format!(
                            "batch write {}: {}",
                            i,
                            status.message.as_deref().unwrap_or("already exists")
                        )))
                    }
                    Some(9) => {
                        return Err(FirestoreError::PreconditionFailed(format!(
                            "batch write {}: {}",
                            i,
                            status.message.as_deref().unwrap_or("precondition failed")
                        )))
                    }
                    Some(code) => {
                        return Err(FirestoreError::request_failed(format!(
                            "batch write {} failed: {} (code {})",
                            i,
                            status.message.as_deref().unwrap_or("unknown error"),
                            code
                        )))
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        title: String,
        openings: u32,
        tags: Vec<String>,
        deadline: DateTime<Utc>,
        nested: Nested,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Nested {
        flag: bool,
        note: Option<String>,
    }

    #[test]
    fn test_model_round_trip() {
        let sample = Sample {
            title: "Backend Engineer".to_string(),
            openings: 3,
            tags: vec!["rust".to_string(), "sql".to_string()],
            deadline: "2030-06-01T12:00:00Z".parse().unwrap(),
            nested: Nested {
                flag: true,
                note: None,
            },
        };

        let doc = Document::from_model(&sample).unwrap();
        let back: Sample = doc.into_model().unwrap();
        assert_eq!(back, sample);
    }

    #[test]
    fn test_timestamps_become_timestamp_values() {
        let value = json_to_value(&json!("2030-06-01T12:00:00+00:00"));
        assert!(matches!(value, Value::TimestampValue(_)));

        let value = json_to_value(&json!("competitive salary"));
        assert!(matches!(value, Value::StringValue(_)));
    }

    #[test]
    fn test_integers_round_trip_as_strings() {
        let value = json_to_value(&json!(42));
        assert!(matches!(&value, Value::IntegerValue(s) if s == "42"));
        assert_eq!(value_to_json(&value), json!(42));
    }

    #[test]
    fn test_filter_and_flattens_single_predicate() {
        let single = Filter::and(vec![FieldFilter::equal("location", string_value("Berlin"))]);
        assert!(matches!(single, Some(Filter::FieldFilter(_))));

        let multi = Filter::and(vec![
            FieldFilter::equal("location", string_value("Berlin")),
            FieldFilter::equal("employmentType", string_value("Remote")),
        ]);
        match multi {
            Some(Filter::CompositeFilter(c)) => {
                assert_eq!(c.op, "AND");
                assert_eq!(c.filters.len(), 2);
            }
            other => panic!("expected composite filter, got {:?}", other),
        }

        assert!(Filter::and(vec![]).is_none());
    }

    #[test]
    fn test_filter_wire_shape() {
        let filter = FieldFilter::greater_than(
            "deadlineDate",
            timestamp_value("2030-01-01T00:00:00Z".parse().unwrap()),
        );
        let json = serde_json::to_value(Filter::FieldFilter(filter)).unwrap();
        assert_eq!(json["fieldFilter"]["field"]["fieldPath"], "deadlineDate");
        assert_eq!(json["fieldFilter"]["op"], "GREATER_THAN");
        assert!(json["fieldFilter"]["value"]["timestampValue"].is_string());
    }

    #[test]
    fn test_insert_write_carries_exists_precondition() {
        let write = Write::insert("projects/p/databases/(default)/documents/users/u1".into(), HashMap::new());
        assert_eq!(write.current_document.as_ref().unwrap().exists, Some(false));
        assert!(write.delete.is_none());
    }

    #[test]
    fn test_batch_response_maps_conflict_codes() {
        let response = BatchWriteResponse {
            write_results: None,
            status: Some(vec![
                WriteStatus {
                    code: Some(0),
                    message: None,
                },
                WriteStatus {
                    code: Some(6),
                    message: Some("entity already exists".to_string()),
                },
            ]),
        };
        let err = response.check_for_errors().unwrap_err();
        assert!(matches!(err, FirestoreError::AlreadyExists(_)));
    }

    #[test]
    fn test_batch_response_maps_precondition_codes() {
        let response = BatchWriteResponse {
            write_results: None,
            status: Some(vec![WriteStatus {
                code: Some(9),
                message: None,
            }]),
        };
        let err = response.check_for_errors().unwrap_err();
        assert!(matches!(err, FirestoreError::PreconditionFailed(_)));
    }
}
