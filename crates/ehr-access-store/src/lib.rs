//! EHR access store: in-memory persistence for permission records.
//!
//! This crate provides:
//! - An implementation of the core [`PermissionRepository`] trait
//!   ([`InMemoryPermissionRepository`]) with patient and provider
//!   secondary indexes
//! - Seed loading from JSON fixtures ([`load_seed`], [`load_seed_file`])
//! - Error types ([`StoreError`])
//!
//! [`PermissionRepository`]: ehr_access_core::PermissionRepository

mod error;
pub mod repository;
mod seed;

pub use error::StoreError;
pub use repository::InMemoryPermissionRepository;
pub use seed::{SeedRecord, load_seed, load_seed_file};
