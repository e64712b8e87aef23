//! Serialized column formats for the listing details mapping and the
//! evaluation point sequences.
//!
//! Both are written as a JSON envelope carrying an explicit schema version.
//! Rows written before the envelope existed (a bare JSON object for details,
//! a bare JSON array for points) are still accepted on read.

use crate::models::TechnicalDetails;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Malformed stored value: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Unsupported stored schema version: {0}")]
    UnsupportedVersion(u32),
}

#[derive(Serialize)]
struct DetailsEnvelope<'a> {
    version: u32,
    entries: &'a TechnicalDetails,
}

#[derive(Serialize)]
struct PointsEnvelope<'a> {
    version: u32,
    items: &'a [String],
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredDetails {
    Versioned {
        version: u32,
        entries: serde_json::Value,
    },
    Legacy(serde_json::Map<String, serde_json::Value>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredPoints {
    Versioned { version: u32, items: Vec<String> },
    Legacy(Vec<String>),
}

pub fn encode_details(details: &TechnicalDetails) -> Result<String, CodecError> {
    Ok(serde_json::to_string(&DetailsEnvelope {
        version: SCHEMA_VERSION,
        entries: details,
    })?)
}

pub fn decode_details(raw: &str) -> Result<TechnicalDetails, CodecError> {
    match serde_json::from_str::<StoredDetails>(raw)? {
        StoredDetails::Versioned { version, entries } => {
            if version != SCHEMA_VERSION {
                return Err(CodecError::UnsupportedVersion(version));
            }
            Ok(serde_json::from_value(entries)?)
        }
        StoredDetails::Legacy(map) => Ok(map
            .into_iter()
            .map(|(key, value)| match value {
                serde_json::Value::String(s) => (key, s),
                other => (key, other.to_string()),
            })
            .collect()),
    }
}

pub fn encode_points(points: &[String]) -> Result<String, CodecError> {
    Ok(serde_json::to_string(&PointsEnvelope {
        version: SCHEMA_VERSION,
        items: points,
    })?)
}

pub fn decode_points(raw: &str) -> Result<Vec<String>, CodecError> {
    match serde_json::from_str::<StoredPoints>(raw)? {
        StoredPoints::Versioned { version, items } => {
            if version != SCHEMA_VERSION {
                return Err(CodecError::UnsupportedVersion(version));
            }
            Ok(items)
        }
        // Legacy rows kept the bullet glyph in the text.
        StoredPoints::Legacy(items) => Ok(items
            .into_iter()
            .map(|p| p.trim().trim_start_matches('•').trim().to_string())
            .collect()),
    }
}
