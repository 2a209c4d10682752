//! Core domain logic for market-data notifications.
//! This crate is the single source of truth for lifecycle invariants.

pub mod config;
pub mod db;
pub mod delivery;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::NotifyConfig;
pub use delivery::{render_message, DeliveryError, DeliverySink, LogDeliverySink};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::notification::{
    MarketSnapshot, Notification, NotificationId, NotificationState, UnknownStateError,
};
pub use repo::memory_repo::InMemoryNotificationRepository;
pub use repo::notification_repo::{
    NotificationListQuery, NotificationRepository, RepoError, RepoResult,
    SqliteNotificationRepository,
};
pub use service::notification_service::{
    parse_state_filter, NotificationService, NotificationServiceError, ServiceResult,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
