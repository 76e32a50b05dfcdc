//! JSON shapes of the Firestore REST v1 API and their conversion into [`Record`]s.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::models::{FieldValue, Record};

/// Body of `documents.list`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDocumentsResponse {
    #[serde(default)]
    pub documents: Vec<WireDocument>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

impl ListDocumentsResponse {
    /// Token for the following page; an empty token means the scan is done
    pub fn next_page(&self) -> Option<&str> {
        self.next_page_token
            .as_deref()
            .filter(|token| !token.is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub struct WireDocument {
    /// Full resource name, `projects/{p}/databases/{d}/documents/{collection}/{id}`
    pub name: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl From<WireDocument> for Record {
    fn from(document: WireDocument) -> Self {
        let mut record = Record::new(document_id(&document.name));
        record.fields = document
            .fields
            .into_iter()
            .map(|(key, value)| (key, decode_value(&value)))
            .collect();
        record
    }
}

/// Error envelope returned with non-success statuses
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorStatus,
}

#[derive(Debug, Deserialize)]
pub struct ErrorStatus {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: String,
}

pub fn document_id(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

/// Decodes one Firestore typed value (`{"stringValue": "..."}` and friends)
pub fn decode_value(value: &Value) -> FieldValue {
    let Some((kind, inner)) = value.as_object().and_then(|object| object.iter().next()) else {
        return FieldValue::Other(value.to_string());
    };

    match kind.as_str() {
        "nullValue" => FieldValue::Null,
        "booleanValue" => inner
            .as_bool()
            .map(FieldValue::Boolean)
            .unwrap_or_else(|| FieldValue::Other(inner.to_string())),
        // int64 travels as a decimal string
        "integerValue" => match inner {
            Value::String(text) => text
                .parse()
                .map(FieldValue::Integer)
                .unwrap_or_else(|_| FieldValue::Other(text.clone())),
            Value::Number(number) => number
                .as_i64()
                .map(FieldValue::Integer)
                .unwrap_or_else(|| FieldValue::Other(number.to_string())),
            other => FieldValue::Other(other.to_string()),
        },
        "doubleValue" => match inner {
            Value::Number(number) => number
                .as_f64()
                .map(FieldValue::Double)
                .unwrap_or_else(|| FieldValue::Other(number.to_string())),
            // NaN and the infinities arrive as strings
            Value::String(text) => text
                .parse()
                .map(FieldValue::Double)
                .unwrap_or_else(|_| FieldValue::Other(text.clone())),
            other => FieldValue::Other(other.to_string()),
        },
        "timestampValue" => match inner.as_str() {
            Some(text) => DateTime::parse_from_rfc3339(text)
                .map(|at| FieldValue::Timestamp(at.with_timezone(&Utc)))
                .unwrap_or_else(|_| FieldValue::Other(text.to_owned())),
            None => FieldValue::Other(inner.to_string()),
        },
        "stringValue" => match inner {
            Value::String(text) => FieldValue::Text(text.clone()),
            other => FieldValue::Other(other.to_string()),
        },
        "bytesValue" | "referenceValue" => match inner {
            Value::String(text) => FieldValue::Other(text.clone()),
            other => FieldValue::Other(other.to_string()),
        },
        "geoPointValue" => {
            let latitude = inner.get("latitude").and_then(Value::as_f64).unwrap_or_default();
            let longitude = inner.get("longitude").and_then(Value::as_f64).unwrap_or_default();
            FieldValue::Other(format!("({latitude}, {longitude})"))
        }
        "arrayValue" => {
            let items: Vec<String> = inner
                .get("values")
                .and_then(Value::as_array)
                .map(|values| values.iter().map(|v| decode_value(v).to_string()).collect())
                .unwrap_or_default();
            FieldValue::Other(format!("[{}]", items.join(", ")))
        }
        "mapValue" => {
            let entries: BTreeMap<&str, String> = inner
                .get("fields")
                .and_then(Value::as_object)
                .map(|fields| {
                    fields
                        .iter()
                        .map(|(key, v)| (key.as_str(), decode_value(v).to_string()))
                        .collect()
                })
                .unwrap_or_default();
            let rendered: Vec<String> = entries
                .into_iter()
                .map(|(key, v)| format!("{key}: {v}"))
                .collect();
            FieldValue::Other(format!("{{{}}}", rendered.join(", ")))
        }
        _ => FieldValue::Other(inner.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn decodes_scalar_values() {
        assert_eq!(decode_value(&json!({"nullValue": "NULL_VALUE"})), FieldValue::Null);
        assert_eq!(
            decode_value(&json!({"booleanValue": true})),
            FieldValue::Boolean(true)
        );
        assert_eq!(
            decode_value(&json!({"integerValue": "72"})),
            FieldValue::Integer(72)
        );
        assert_eq!(
            decode_value(&json!({"doubleValue": 68.5})),
            FieldValue::Double(68.5)
        );
        assert_eq!(
            decode_value(&json!({"stringValue": "Ana"})),
            FieldValue::Text("Ana".to_owned())
        );
    }

    #[test]
    fn decodes_timestamps_to_utc() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        assert_eq!(
            decode_value(&json!({"timestampValue": "2024-03-01T10:30:00+01:00"})),
            FieldValue::Timestamp(expected)
        );
    }

    #[test]
    fn composite_values_render_as_text() {
        let array = json!({"arrayValue": {"values": [
            {"stringValue": "a"},
            {"integerValue": "2"}
        ]}});
        assert_eq!(decode_value(&array).to_string(), "[a, 2]");

        let empty_array = json!({"arrayValue": {}});
        assert_eq!(decode_value(&empty_array).to_string(), "[]");

        let map = json!({"mapValue": {"fields": {
            "b": {"booleanValue": false},
            "a": {"stringValue": "x"}
        }}});
        assert_eq!(decode_value(&map).to_string(), "{a: x, b: false}");

        let point = json!({"geoPointValue": {"latitude": 40.4, "longitude": -3.7}});
        assert_eq!(decode_value(&point).to_string(), "(40.4, -3.7)");
    }

    #[test]
    fn malformed_integer_is_kept_verbatim() {
        assert_eq!(
            decode_value(&json!({"integerValue": "abc"})),
            FieldValue::Other("abc".to_owned())
        );
    }

    #[test]
    fn document_id_is_last_path_segment() {
        assert_eq!(
            document_id("projects/p/databases/(default)/documents/users/uid-42"),
            "uid-42"
        );
        assert_eq!(document_id("uid-7"), "uid-7");
    }

    #[test]
    fn list_response_converts_into_records() {
        let body = json!({
            "documents": [
                {
                    "name": "projects/p/databases/(default)/documents/users/u1",
                    "fields": {
                        "name": {"stringValue": "Ana"},
                        "email": {"stringValue": "a@x.com"}
                    },
                    "createTime": "2024-01-01T00:00:00Z",
                    "updateTime": "2024-01-01T00:00:00Z"
                },
                {"name": "projects/p/databases/(default)/documents/users/u2"}
            ],
            "nextPageToken": "abc"
        });
        let page: ListDocumentsResponse = serde_json::from_value(body).unwrap();
        assert_eq!(page.next_page(), Some("abc"));

        let records: Vec<Record> = page.documents.into_iter().map(Record::from).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "u1");
        assert_eq!(records[0].get("name"), Some(&FieldValue::Text("Ana".to_owned())));
        assert_eq!(records[1].id, "u2");
        assert!(records[1].fields.is_empty());
    }

    #[test]
    fn empty_collection_body_has_no_documents_or_token() {
        let page: ListDocumentsResponse = serde_json::from_str("{}").unwrap();
        assert!(page.documents.is_empty());
        assert_eq!(page.next_page(), None);

        let page: ListDocumentsResponse =
            serde_json::from_value(json!({"nextPageToken": ""})).unwrap();
        assert_eq!(page.next_page(), None);
    }

    #[test]
    fn error_envelope_exposes_status() {
        let body = json!({"error": {
            "code": 403,
            "message": "Missing or insufficient permissions.",
            "status": "PERMISSION_DENIED"
        }});
        let parsed: ErrorResponse = serde_json::from_value(body).unwrap();
        assert_eq!(parsed.error.status, "PERMISSION_DENIED");
        assert_eq!(parsed.error.message, "Missing or insufficient permissions.");
    }
}
