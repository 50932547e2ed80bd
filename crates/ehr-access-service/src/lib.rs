//! EHR access service: the permission lifecycle, the single
//! authorization predicate, read-side queries and notification sinks.

pub mod config;
pub mod documents;
pub mod query;
pub mod service;
pub mod sinks;

pub use config::AccessConfig;
pub use documents::DocumentGate;
pub use query::PermissionQuery;
pub use service::AccessPermissionStore;
pub use sinks::{AuditFilter, AuditTrail, Fanout, NotificationInbox, TracingSink};
