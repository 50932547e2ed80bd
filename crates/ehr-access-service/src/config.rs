//! Access permission configuration.

use chrono::Duration;

/// Configuration for the access permission store.
#[derive(Debug, Clone)]
pub struct AccessConfig {
    /// Lifetime given to grants that arrive without an expiration date.
    /// `None` leaves such grants open-ended.
    pub default_grant_lifetime_days: Option<u32>,
    /// Upper bound on any grant, measured from the moment it is granted.
    /// Later expirations are pulled in to this bound.
    pub max_grant_lifetime_days: Option<u32>,
    /// Whether patients may grant access without a prior provider request.
    pub allow_direct_grant: bool,
}

impl AccessConfig {
    pub fn default_grant_lifetime(&self) -> Option<Duration> {
        self.default_grant_lifetime_days
            .map(|d| Duration::days(i64::from(d)))
    }

    pub fn max_grant_lifetime(&self) -> Option<Duration> {
        self.max_grant_lifetime_days
            .map(|d| Duration::days(i64::from(d)))
    }
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            default_grant_lifetime_days: None,
            max_grant_lifetime_days: None,
            allow_direct_grant: true,
        }
    }
}
