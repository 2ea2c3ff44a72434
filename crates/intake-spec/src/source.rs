use serde_json::Value;
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse descriptors from {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("descriptor payload from {origin} is not a list of fields")]
    Malformed { origin: String },
    #[error("descriptors unavailable ({primary}); fallback also failed ({fallback})")]
    Exhausted {
        primary: Box<SourceError>,
        fallback: Box<SourceError>,
    },
}

/// Somewhere field descriptors can be fetched from.
pub trait DescriptorSource {
    /// Human readable origin used in logs and errors.
    fn label(&self) -> String;

    fn fetch(&self) -> Result<Value, SourceError>;
}

/// Descriptors stored in a JSON file on disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DescriptorSource for FileSource {
    fn label(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch(&self) -> Result<Value, SourceError> {
        let contents = fs::read_to_string(&self.path).map_err(|source| SourceError::Io {
            path: self.label(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| SourceError::Parse {
            origin: self.label(),
            source,
        })
    }
}

/// Descriptors already held in memory, e.g. a bundled demo document.
#[derive(Debug, Clone)]
pub struct StaticSource {
    label: String,
    payload: Value,
}

impl StaticSource {
    pub fn new(label: impl Into<String>, payload: Value) -> Self {
        Self {
            label: label.into(),
            payload,
        }
    }
}

impl DescriptorSource for StaticSource {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn fetch(&self) -> Result<Value, SourceError> {
        Ok(self.payload.clone())
    }
}

/// Extracts the record list from a payload: a bare array or `{ "fields": [...] }`.
pub fn records_from_value(origin: &str, value: Value) -> Result<Vec<Value>, SourceError> {
    match value {
        Value::Array(records) => Ok(records),
        Value::Object(mut map) => match map.remove("fields") {
            Some(Value::Array(records)) => Ok(records),
            _ => Err(SourceError::Malformed {
                origin: origin.to_string(),
            }),
        },
        _ => Err(SourceError::Malformed {
            origin: origin.to_string(),
        }),
    }
}

/// Fetches descriptors from `primary`; on failure tries `fallback` once.
///
/// There is no retry: each source is asked at most once.
pub fn load_descriptors(
    primary: &dyn DescriptorSource,
    fallback: Option<&dyn DescriptorSource>,
) -> Result<Vec<Value>, SourceError> {
    let primary_err = match fetch_records(primary) {
        Ok(records) => return Ok(records),
        Err(err) => err,
    };

    let Some(fallback) = fallback else {
        return Err(primary_err);
    };

    warn!(
        source = %primary.label(),
        fallback = %fallback.label(),
        error = %primary_err,
        "descriptor source failed; using fallback"
    );

    fetch_records(fallback).map_err(|fallback_err| SourceError::Exhausted {
        primary: Box::new(primary_err),
        fallback: Box::new(fallback_err),
    })
}

fn fetch_records(source: &dyn DescriptorSource) -> Result<Vec<Value>, SourceError> {
    let label = source.label();
    let records = records_from_value(&label, source.fetch()?)?;
    debug!(source = %label, records = records.len(), "loaded descriptors");
    Ok(records)
}
