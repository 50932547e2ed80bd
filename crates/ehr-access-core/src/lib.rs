//! EHR access core: domain models, errors and the storage, clock and
//! notification seams shared by every other crate in the workspace.

pub mod clock;
pub mod error;
pub mod models;
pub mod notify;
pub mod repository;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{AccessError, AccessResult, NotifyError};
pub use notify::{DiscardSink, NotificationSink};
pub use repository::{CreateOutcome, PaginatedResult, Pagination, PermissionRepository};
