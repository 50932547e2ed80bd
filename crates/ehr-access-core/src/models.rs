//! Domain models for EHR access permissions.
//!
//! These are the core types shared across all crates.

pub mod actor;
pub mod audit;
pub mod document;
pub mod event;
pub mod notification;
pub mod permission;
