//! Notification sink seam.
//!
//! The store hands every committed transition to a sink exactly once.
//! Delivery is fire-and-forget: a failing sink never undoes the
//! transition that produced the event.

use std::sync::Arc;

use crate::error::NotifyError;
use crate::models::event::PermissionEvent;

pub trait NotificationSink: Send + Sync {
    fn emit(&self, event: &PermissionEvent) -> Result<(), NotifyError>;
}

/// Drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardSink;

impl NotificationSink for DiscardSink {
    fn emit(&self, _event: &PermissionEvent) -> Result<(), NotifyError> {
        Ok(())
    }
}

impl<N: NotificationSink + ?Sized> NotificationSink for Arc<N> {
    fn emit(&self, event: &PermissionEvent) -> Result<(), NotifyError> {
        (**self).emit(event)
    }
}

impl<N: NotificationSink + ?Sized> NotificationSink for Box<N> {
    fn emit(&self, event: &PermissionEvent) -> Result<(), NotifyError> {
        (**self).emit(event)
    }
}
