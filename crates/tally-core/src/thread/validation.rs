//! Structural checks for stored thread records
//!
//! A record that fails validation is never an error for the caller.
//! Whatever can be read is kept, the rest is dropped, and each problem is
//! reported so it can be written into the record's diagnostics.

use super::record::{FileRecord, RecordMetadata, ThreadRecord};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Outcome of reading a stored record
#[derive(Debug)]
pub(crate) struct DecodedRecord {
    pub record: ThreadRecord,
    pub problems: Vec<String>,
}

/// Name of a JSON value's type, for messages
fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Check the shape every stored record must have
pub(crate) fn validate_record(value: &Value) -> Result<(), String> {
    let Some(object) = value.as_object() else {
        return Err(format!(
            "Thread data is not an object (got {})",
            kind(value)
        ));
    };
    match object.get("files") {
        None | Some(Value::Null) => {
            return Err("Thread data missing required fields: files".to_string());
        }
        Some(Value::Array(_)) => {}
        Some(other) => {
            return Err(format!(
                "Thread files is not an array (got {})",
                kind(other)
            ));
        }
    }
    match object.get("metadata") {
        None | Some(Value::Object(_)) => Ok(()),
        Some(other) => Err(format!(
            "Thread metadata is not an object (got {})",
            kind(other)
        )),
    }
}

/// Decode raw stored text
pub(crate) fn decode_record_str(raw: &str) -> DecodedRecord {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => decode_record(value),
        Err(e) => DecodedRecord {
            record: empty_record(),
            problems: vec![format!("Thread data is not valid JSON: {}", e)],
        },
    }
}

/// Decode a stored record, salvaging what can be read
pub(crate) fn decode_record(value: Value) -> DecodedRecord {
    let mut problems = Vec::new();
    if let Err(problem) = validate_record(&value) {
        problems.push(problem);
    }

    let mut decode_error = None;
    if problems.is_empty() {
        match serde_json::from_value::<ThreadRecord>(value.clone()) {
            Ok(record) => return DecodedRecord { record, problems },
            Err(e) => decode_error = Some(e),
        }
    }

    let record = match value {
        Value::Object(object) => salvage(object, &mut problems),
        _ => empty_record(),
    };
    if problems.is_empty() {
        if let Some(e) = decode_error {
            problems.push(format!("Thread data could not be decoded: {}", e));
        }
    }
    DecodedRecord { record, problems }
}

fn empty_record() -> ThreadRecord {
    ThreadRecord {
        files: Vec::new(),
        compatibility_metadata: None,
        previous_queries: Vec::new(),
        raw_queries: Vec::new(),
        is_follow_up: None,
        last_query_time: None,
        last_updated: Utc::now(),
        metadata: RecordMetadata::default(),
    }
}

/// Read one optional field, dropping it with a problem when it does not parse
fn field<T: DeserializeOwned>(
    object: &Map<String, Value>,
    name: &str,
    problems: &mut Vec<String>,
) -> Option<T> {
    match object.get(name) {
        None | Some(Value::Null) => None,
        Some(value) => match serde_json::from_value(value.clone()) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                problems.push(format!("Dropped unreadable field {}: {}", name, e));
                None
            }
        },
    }
}

fn timestamp(object: &Map<String, Value>, name: &str) -> Option<DateTime<Utc>> {
    object
        .get(name)
        .and_then(Value::as_i64)
        .and_then(DateTime::<Utc>::from_timestamp_millis)
}

fn salvage(object: Map<String, Value>, problems: &mut Vec<String>) -> ThreadRecord {
    let files = match object.get("files") {
        Some(Value::Array(entries)) => entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                match serde_json::from_value::<FileRecord>(entry.clone()) {
                    Ok(file) => Some(file),
                    Err(e) => {
                        problems.push(format!(
                            "Dropped unreadable file entry at index {}: {}",
                            index, e
                        ));
                        None
                    }
                }
            })
            .collect(),
        _ => Vec::new(),
    };

    let metadata = match object.get("metadata") {
        Some(value @ Value::Object(_)) => serde_json::from_value::<RecordMetadata>(value.clone())
            .unwrap_or_else(|e| {
                problems.push(format!("Dropped unreadable thread metadata: {}", e));
                RecordMetadata::default()
            }),
        _ => RecordMetadata::default(),
    };

    ThreadRecord {
        files,
        compatibility_metadata: field(&object, "compatibilityMetadata", problems),
        previous_queries: field(&object, "previousQueries", problems).unwrap_or_default(),
        raw_queries: field(&object, "rawQueries", problems).unwrap_or_default(),
        is_follow_up: field(&object, "isFollowUp", problems),
        last_query_time: timestamp(&object, "lastQueryTime"),
        last_updated: timestamp(&object, "lastUpdated").unwrap_or_else(Utc::now),
        metadata,
    }
}
