//! Notification sink implementations.

mod audit;
mod fanout;
mod inbox;
mod log;

pub use audit::{AuditFilter, AuditTrail};
pub use fanout::Fanout;
pub use inbox::NotificationInbox;
pub use log::TracingSink;
