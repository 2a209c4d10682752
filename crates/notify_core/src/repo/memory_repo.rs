//! In-memory notification repository for non-durable deployments and tests.

use crate::model::notification::{Notification, NotificationId};
use crate::repo::notification_repo::{
    NotificationListQuery, NotificationRepository, RepoError, RepoResult,
};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Map-backed repository with the same contract as the SQLite backend.
#[derive(Debug, Default)]
pub struct InMemoryNotificationRepository {
    records: Mutex<HashMap<NotificationId, Notification>>,
}

impl InMemoryNotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> MutexGuard<'_, HashMap<NotificationId, Notification>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl NotificationRepository for InMemoryNotificationRepository {
    fn insert(&self, notification: &Notification) -> RepoResult<NotificationId> {
        let mut records = self.records();
        if records.contains_key(&notification.id) {
            return Err(RepoError::DuplicateId(notification.id));
        }
        records.insert(notification.id, notification.clone());
        Ok(notification.id)
    }

    fn get(&self, id: NotificationId) -> RepoResult<Option<Notification>> {
        Ok(self.records().get(&id).cloned())
    }

    fn list(&self, query: &NotificationListQuery) -> RepoResult<Vec<Notification>> {
        let mut notifications: Vec<Notification> = self
            .records()
            .values()
            .filter(|notification| query.matches(notification))
            .cloned()
            .collect();
        notifications.sort_by(|left, right| {
            left.created_at
                .cmp(&right.created_at)
                .then_with(|| left.id.cmp(&right.id))
        });
        Ok(notifications)
    }

    fn update_lifecycle(&self, notification: &Notification) -> RepoResult<()> {
        let mut records = self.records();
        let stored = records
            .get_mut(&notification.id)
            .ok_or(RepoError::NotFound(notification.id))?;
        stored.state = notification.state;
        stored.active = notification.active;
        stored.updated_at = notification.updated_at;
        Ok(())
    }
}
