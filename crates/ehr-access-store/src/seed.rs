//! JSON seed fixtures.
//!
//! Seeds use the same shape as the front-end mock data: camelCase
//! fields, lowercase status, and timestamps that may omit the UTC
//! offset (`2023-01-05T08:30:00`), which are read as UTC.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use ehr_access_core::models::actor::ActorId;
use ehr_access_core::models::permission::{PermissionRecord, PermissionStatus};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::StoreError;

/// One permission record as written in a seed file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedRecord {
    /// Generated when absent.
    #[serde(default)]
    pub id: Option<Uuid>,
    pub patient_id: ActorId,
    pub provider_id: ActorId,
    #[serde(default)]
    pub provider_name: Option<String>,
    #[serde(default)]
    pub provider_specialty: Option<String>,
    pub status: PermissionStatus,
    pub date_requested: String,
    /// Defaults to `date_requested`.
    #[serde(default)]
    pub date_modified: Option<String>,
    #[serde(default)]
    pub expiration_date: Option<String>,
}

impl SeedRecord {
    pub fn into_record(self) -> Result<PermissionRecord, StoreError> {
        let date_requested = parse_timestamp(&self.date_requested)?;
        let date_modified = match self.date_modified.as_deref() {
            Some(s) => parse_timestamp(s)?,
            None => date_requested,
        };
        let expiration_date = self
            .expiration_date
            .as_deref()
            .map(parse_timestamp)
            .transpose()?;

        Ok(PermissionRecord {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            patient_id: self.patient_id,
            provider_id: self.provider_id,
            provider_name: self.provider_name,
            provider_specialty: self.provider_specialty,
            status: self.status,
            date_requested,
            date_modified,
            expiration_date,
        })
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| StoreError::Seed(format!("invalid timestamp {raw:?}: {e}")))
}

/// Parse a JSON array of seed records.
pub fn load_seed<R: Read>(reader: R) -> Result<Vec<PermissionRecord>, StoreError> {
    let raw: Vec<SeedRecord> = serde_json::from_reader(reader)?;
    raw.into_iter().map(SeedRecord::into_record).collect()
}

pub fn load_seed_file(path: impl AsRef<Path>) -> Result<Vec<PermissionRecord>, StoreError> {
    let path = path.as_ref();
    info!(path = %path.display(), "Loading permission seed");
    let file = File::open(path)?;
    load_seed(BufReader::new(file))
}
