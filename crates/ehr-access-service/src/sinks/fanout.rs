//! Delivery to several sinks at once.

use ehr_access_core::error::NotifyError;
use ehr_access_core::models::event::PermissionEvent;
use ehr_access_core::notify::NotificationSink;

/// Hands each event to every inner sink, in order.
///
/// A failing sink does not stop delivery to the rest; the first error
/// is returned once all sinks have been tried.
#[derive(Default)]
pub struct Fanout {
    sinks: Vec<Box<dyn NotificationSink>>,
}

impl Fanout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl NotificationSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl NotificationSink for Fanout {
    fn emit(&self, event: &PermissionEvent) -> Result<(), NotifyError> {
        let mut first_err = None;
        for sink in &self.sinks {
            if let Err(err) = sink.emit(event) {
                if first_err.is_none() {
                    first_err = Some(err);
                }
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
