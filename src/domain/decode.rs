//! Decoders turning the Exodus API JSON documents into domain records.
//!
//! Structural problems (missing keys, wrong JSON types, unparsable documents) surface as
//! [`DecodeError`]. Malformed *field values* such as dates or version codes are recovered
//! locally: the field is left unset and the record is still produced.

use super::models::{Application, Report, Tracker};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;

const TRACKER_DATE_FORMAT: &str = "%Y-%m-%d";
const REPORT_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

#[derive(Debug)]
pub enum DecodeError {
    Syntax(serde_json::Error),
    MissingField { field: &'static str },
    InvalidType {
        field: &'static str,
        expected: &'static str,
    },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Syntax(err) => write!(f, "response is not valid JSON: {err}"),
            DecodeError::MissingField { field } => write!(f, "missing field `{field}`"),
            DecodeError::InvalidType { field, expected } => {
                write!(f, "field `{field}` is not {expected}")
            }
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DecodeError::Syntax(err) => Some(err),
            _ => None,
        }
    }
}

/// Parses a response body into a JSON tree, keeping object keys in document order.
pub fn parse_document(body: &str) -> Result<Value, DecodeError> {
    serde_json::from_str(body).map_err(DecodeError::Syntax)
}

/// Returns the `trackers` object of a `/trackers` document.
pub fn tracker_entries(document: &Value) -> Result<&Map<String, Value>, DecodeError> {
    object_field(as_object(document, "document")?, "trackers")
}

/// Returns the `applications` object of a `/reports` document.
pub fn application_entries(document: &Value) -> Result<&Map<String, Value>, DecodeError> {
    object_field(as_object(document, "document")?, "applications")
}

pub fn decode_tracker(tracker_id: &str, value: &Value) -> Result<Tracker, DecodeError> {
    let object = as_object(value, "tracker")?;

    let id = tracker_id.trim().parse::<u64>().unwrap_or_else(|err| {
        tracing::warn!(tracker_id, error = %err, "tracker key is not numeric; defaulting id to 0");
        0
    });

    let creation_date = string_field(object, "creation_date")?;
    let creation_date = match NaiveDate::parse_from_str(creation_date.trim(), TRACKER_DATE_FORMAT)
    {
        Ok(date) => Some(date),
        Err(err) => {
            tracing::debug!(id, value = %creation_date, error = %err, "ignoring malformed tracker creation date");
            None
        }
    };

    Ok(Tracker {
        id,
        website: string_field(object, "website")?,
        name: string_field(object, "name")?,
        description: string_field(object, "description")?,
        network_signature: string_field(object, "network_signature")?,
        code_signature: string_field(object, "code_signature")?,
        creation_date,
    })
}

pub fn decode_application(package_name: &str, value: &Value) -> Result<Application, DecodeError> {
    let object = as_object(value, "application")?;
    let creator = string_field(object, "creator")?;
    let name = string_field(object, "name")?;

    let reports = array_field(object, "reports")?
        .iter()
        .map(decode_report)
        .collect::<Result<HashSet<_>, _>>()?;

    Ok(Application {
        package_name: package_name.to_owned(),
        creator,
        name,
        reports,
    })
}

pub fn decode_report(value: &Value) -> Result<Report, DecodeError> {
    let object = as_object(value, "report")?;
    let id = integer(required(object, "id")?, "id")?;

    let updated_at = string_field(object, "updated_at")?;
    let created_at = string_field(object, "creation_date")?;
    // A bad value in either timestamp discards both.
    let (updated_at, created_at) = match (parse_timestamp(&updated_at), parse_timestamp(&created_at))
    {
        (Some(updated), Some(created)) => (Some(updated), Some(created)),
        _ => {
            tracing::debug!(
                id,
                updated_at = %updated_at,
                creation_date = %created_at,
                "ignoring malformed report timestamps"
            );
            (None, None)
        }
    };

    let trackers = array_field(object, "trackers")?
        .iter()
        .map(|tracker| integer(tracker, "trackers"))
        .collect::<Result<HashSet<_>, _>>()?;

    Ok(Report {
        id,
        downloads: string_field(object, "downloads")?,
        version: string_field(object, "version")?,
        version_code: version_code(id, object.get("version_code")),
        updated_at,
        created_at,
        trackers,
    })
}

/// Parses `YYYY-MM-DDThh:mm:ss.sssZ`. The millisecond part must be exactly three digits.
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    let (_, millis) = value.strip_suffix('Z')?.rsplit_once('.')?;
    if millis.len() != 3 || !millis.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    NaiveDateTime::parse_from_str(value, REPORT_TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn version_code(report_id: u64, value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::Number(number) => number.as_u64(),
        Value::String(raw) if raw.trim().is_empty() => None,
        Value::String(raw) => match raw.trim().parse::<u64>() {
            Ok(code) => Some(code),
            Err(err) => {
                tracing::warn!(report_id, value = %raw, error = %err, "ignoring non-numeric version code");
                None
            }
        },
        _ => None,
    }
}

fn as_object<'a>(
    value: &'a Value,
    field: &'static str,
) -> Result<&'a Map<String, Value>, DecodeError> {
    value.as_object().ok_or(DecodeError::InvalidType {
        field,
        expected: "an object",
    })
}

fn required<'a>(
    object: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a Value, DecodeError> {
    match object.get(field) {
        None | Some(Value::Null) => Err(DecodeError::MissingField { field }),
        Some(value) => Ok(value),
    }
}

fn object_field<'a>(
    object: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a Map<String, Value>, DecodeError> {
    as_object(required(object, field)?, field)
}

fn array_field<'a>(
    object: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a Vec<Value>, DecodeError> {
    required(object, field)?
        .as_array()
        .ok_or(DecodeError::InvalidType {
            field,
            expected: "an array",
        })
}

/// Reads a string field, coercing numbers and booleans to their textual form.
fn string_field(object: &Map<String, Value>, field: &'static str) -> Result<String, DecodeError> {
    match required(object, field)? {
        Value::String(value) => Ok(value.clone()),
        Value::Number(value) => Ok(value.to_string()),
        Value::Bool(value) => Ok(value.to_string()),
        _ => Err(DecodeError::InvalidType {
            field,
            expected: "a string",
        }),
    }
}

/// Reads an unsigned integer given either as a JSON number or a numeric string.
fn integer(value: &Value, field: &'static str) -> Result<u64, DecodeError> {
    let invalid = DecodeError::InvalidType {
        field,
        expected: "an unsigned integer",
    };
    match value {
        Value::Number(number) => number.as_u64().ok_or(invalid),
        Value::String(raw) => raw.trim().parse::<u64>().map_err(|_| invalid),
        _ => Err(invalid),
    }
}
