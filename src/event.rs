//! Trigger-event parsing and validation.
//!
//! The pipeline is driven by single-object-uploaded notifications. This module
//! decodes the notification payload, derives the icon-set request from the
//! uploaded object's key, and classifies ineligible triggers as skips rather
//! than errors: a skip terminates the invocation with no store access at all.

use std::fmt;

use percent_encoding::percent_decode_str;
use serde::Deserialize;

/// Raw trigger payload, in the object-store notification shape.
/// Only the first record is consumed; multi-record payloads are truncated.
#[derive(Debug, Clone, Deserialize)]
pub struct TriggerEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<EventRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventRecord {
    pub s3: S3Entity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Entity {
    pub bucket: S3Bucket,
    pub object: S3Object,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Bucket {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Object {
    /// URL-encoded object key, with `+` standing for space.
    pub key: String,
}

/// A validated request to regenerate one icon set's webfont bundle.
#[derive(Debug, Clone)]
pub struct IconSetRequest {
    pub bucket: String,
    /// Decoded key of the uploaded object.
    pub key: String,
    /// Folder prefix containing the icon set.
    pub folder: String,
    /// Icon-set name: the terminal folder segment, doubling as the font name.
    pub name: String,
}

/// Why a trigger was skipped. Skips are normal termination, not failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ineligible {
    NoRecords,
    NoExtension { key: String },
    NotVectorIcon { key: String, extension: String },
    NoSetName { key: String },
}

impl fmt::Display for Ineligible {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ineligible::NoRecords => write!(f, "event contains no records"),
            Ineligible::NoExtension { key } => {
                write!(f, "unable to infer file type for key {key}")
            }
            Ineligible::NotVectorIcon { key, extension } => {
                write!(f, "skipping non-svg object {key} (.{extension})")
            }
            Ineligible::NoSetName { key } => {
                write!(f, "no folder name resolvable for key {key}")
            }
        }
    }
}

/// Decode an object key: `+` is space, then percent-escapes.
pub fn decode_key(raw: &str) -> String {
    let plus_decoded = raw.replace('+', " ");
    percent_decode_str(&plus_decoded)
        .decode_utf8_lossy()
        .into_owned()
}

/// Validate a trigger event into an [`IconSetRequest`], or explain the skip.
///
/// The extension is matched on the trailing dot of the full key; anything but
/// `svg` is ineligible. The icon-set name is the last directory segment of the
/// key; keys without a non-empty parent segment are ineligible too.
pub fn validate(event: &TriggerEvent) -> Result<IconSetRequest, Ineligible> {
    let record = event.records.first().ok_or(Ineligible::NoRecords)?;
    let key = decode_key(&record.s3.object.key);

    let extension = match key.rsplit_once('.') {
        Some((_, extension)) => extension.to_string(),
        None => return Err(Ineligible::NoExtension { key }),
    };
    if extension != "svg" {
        return Err(Ineligible::NotVectorIcon { key, extension });
    }

    let folder = match key.rsplit_once('/') {
        Some((folder, _)) => folder.to_string(),
        None => String::new(),
    };
    let name = folder.rsplit('/').next().unwrap_or("").to_string();
    if name.is_empty() {
        return Err(Ineligible::NoSetName { key });
    }

    Ok(IconSetRequest {
        bucket: record.s3.bucket.name.clone(),
        key,
        folder,
        name,
    })
}
