//! Actor identity model.
//!
//! Actors arrive already authenticated; this crate never verifies them.
//! The store only looks at the role and the id.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identity of a patient or provider (e.g. `p1`, `doc1`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActorId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for ActorId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    Patient,
    Provider,
    /// Internal maintenance (expiry sweeps). Never granted patient authority.
    System,
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActorRole::Patient => "patient",
            ActorRole::Provider => "provider",
            ActorRole::System => "system",
        };
        f.write_str(s)
    }
}

/// An authenticated identity performing an operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub role: ActorRole,
}

impl Actor {
    pub const SYSTEM_ID: &'static str = "system";

    pub fn patient(id: impl Into<ActorId>) -> Self {
        Self {
            id: id.into(),
            role: ActorRole::Patient,
        }
    }

    pub fn provider(id: impl Into<ActorId>) -> Self {
        Self {
            id: id.into(),
            role: ActorRole::Provider,
        }
    }

    pub fn system() -> Self {
        Self {
            id: ActorId::from(Self::SYSTEM_ID),
            role: ActorRole::System,
        }
    }

    /// True when this actor is the patient identified by `patient_id`.
    pub fn is_patient(&self, patient_id: &ActorId) -> bool {
        self.role == ActorRole::Patient && &self.id == patient_id
    }

    /// True when this actor is the provider identified by `provider_id`.
    pub fn is_provider(&self, provider_id: &ActorId) -> bool {
        self.role == ActorRole::Provider && &self.id == provider_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_and_id_must_both_match() {
        let p = Actor::patient("p1");
        assert!(p.is_patient(&ActorId::from("p1")));
        assert!(!p.is_provider(&ActorId::from("p1")));
        assert!(!p.is_patient(&ActorId::from("p2")));
    }

    #[test]
    fn actor_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&ActorId::from("doc1")).unwrap();
        assert_eq!(json, "\"doc1\"");
    }
}
