//! Content-addressed references to medical documents.
//!
//! Documents themselves live in an external record store; permission
//! checks only ever see their id, owner and content hash.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::actor::ActorId;

/// Lowercase hex SHA-256 of a document's content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentHash(String);

impl DocumentHash {
    pub fn of(content: &[u8]) -> Self {
        let digest = Sha256::digest(content);
        Self(format!("{digest:x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Anything that belongs to exactly one patient's record.
pub trait PatientDocument {
    fn patient_id(&self) -> &ActorId;
}

/// Minimal handle on an uploaded document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRef {
    pub id: Uuid,
    pub patient_id: ActorId,
    pub title: String,
    pub hash: DocumentHash,
}

impl DocumentRef {
    pub fn new(patient_id: impl Into<ActorId>, title: impl Into<String>, content: &[u8]) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id: patient_id.into(),
            title: title.into(),
            hash: DocumentHash::of(content),
        }
    }
}

impl PatientDocument for DocumentRef {
    fn patient_id(&self) -> &ActorId {
        &self.patient_id
    }
}
