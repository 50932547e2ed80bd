//! Repository implementations.

mod permission;

pub use permission::InMemoryPermissionRepository;
