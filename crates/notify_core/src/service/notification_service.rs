//! Notification lifecycle service.
//!
//! # Responsibility
//! - Provide create/send/list/delete/get entry points for callers.
//! - Enforce lifecycle rules before any write reaches a repository.
//! - Delegate transmission to the injected `DeliverySink`.
//!
//! # Invariants
//! - Inactive notifications are never sent or deleted again.
//! - Send and delete on one id are serialized; other ids run in parallel.
//! - A send attempt always leaves the record `SENT` or `FAILED`, unless the
//!   state write itself fails.
//! - Log events carry ids and outcomes only, never message bodies.

use crate::delivery::{render_message, DeliveryError, DeliverySink};
use crate::model::notification::{
    now_epoch_ms, MarketSnapshot, Notification, NotificationId, NotificationState,
    UnknownStateError,
};
use crate::repo::notification_repo::{NotificationListQuery, NotificationRepository, RepoError};
use crate::service::id_lock::IdLockTable;
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type ServiceResult<T> = Result<T, NotificationServiceError>;

/// Service error for notification lifecycle operations.
#[derive(Debug)]
pub enum NotificationServiceError {
    /// No record exists for this id.
    NotFound(NotificationId),
    /// The record exists but was soft-deleted.
    AlreadyDeleted(NotificationId),
    /// List filter is neither empty nor a known state name.
    InvalidFilter(String),
    /// The sink rejected the message. The record is now `FAILED` unless
    /// `state_write_error` is set.
    DeliveryFailed {
        id: NotificationId,
        error: DeliveryError,
        state_write_error: Option<RepoError>,
    },
    /// Storage-layer failure.
    Persistence(RepoError),
}

impl Display for NotificationServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "notification not found: {id}"),
            Self::AlreadyDeleted(id) => write!(f, "notification has been deleted: {id}"),
            Self::InvalidFilter(value) => write!(
                f,
                "invalid state filter `{value}`; expected empty or CREATED|SENT|FAILED"
            ),
            Self::DeliveryFailed {
                id,
                error,
                state_write_error: None,
            } => write!(f, "notification {id}: {error}"),
            Self::DeliveryFailed {
                id,
                error,
                state_write_error: Some(write_error),
            } => write!(
                f,
                "notification {id}: {error}; recording FAILED state also failed: {write_error}"
            ),
            Self::Persistence(err) => write!(f, "{err}"),
        }
    }
}

impl Error for NotificationServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::DeliveryFailed { error, .. } => Some(error),
            Self::Persistence(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for NotificationServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            other => Self::Persistence(other),
        }
    }
}

/// Parses a caller-supplied list filter.
///
/// Empty input means "no filter". Anything else must be an exact state name.
pub fn parse_state_filter(raw: &str) -> ServiceResult<Option<NotificationState>> {
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<NotificationState>()
        .map(Some)
        .map_err(|UnknownStateError(value)| NotificationServiceError::InvalidFilter(value))
}

/// Lifecycle manager over an injected repository and delivery sink.
pub struct NotificationService<R, S> {
    repo: R,
    sink: S,
    locks: IdLockTable,
}

impl<R: NotificationRepository, S: DeliverySink> NotificationService<R, S> {
    pub fn new(repo: R, sink: S) -> Self {
        Self {
            repo,
            sink,
            locks: IdLockTable::default(),
        }
    }

    /// Creates and stores a notification for one market snapshot.
    ///
    /// # Contract
    /// - Returns the stored record with `state=CREATED` and `active=true`.
    /// - Snapshot values are stored as given, without range checks.
    pub fn create(&self, snapshot: MarketSnapshot) -> ServiceResult<Notification> {
        let notification = Notification::new(snapshot);
        match self.repo.insert(&notification) {
            Ok(_) => {
                info!(
                    "event=notification_create module=service status=ok id={}",
                    notification.id
                );
                Ok(notification)
            }
            Err(err) => {
                error!(
                    "event=notification_create module=service status=error error_code=insert_failed error={err}"
                );
                Err(NotificationServiceError::Persistence(err))
            }
        }
    }

    /// Gets one notification by id, including soft-deleted ones.
    pub fn get(&self, id: NotificationId) -> ServiceResult<Notification> {
        self.repo
            .get(id)?
            .ok_or(NotificationServiceError::NotFound(id))
    }

    /// Sends one active notification to `destination`.
    ///
    /// # Contract
    /// - Unknown id: `NotFound`. Inactive: `AlreadyDeleted`. In both cases
    ///   the sink is not called and nothing is written.
    /// - Sink success stores `SENT`; sink failure stores `FAILED` and
    ///   returns `DeliveryFailed`.
    /// - Re-sending an active `SENT` or `FAILED` notification is allowed.
    pub fn send(&self, id: NotificationId, destination: &str) -> ServiceResult<()> {
        let started_at = Instant::now();
        let result = self.locks.with_lock(id, || self.send_locked(id, destination));

        match &result {
            Ok(()) => info!(
                "event=notification_send module=service status=ok id={id} duration_ms={}",
                started_at.elapsed().as_millis()
            ),
            Err(err) => warn!(
                "event=notification_send module=service status=error id={id} duration_ms={} error_code={} error={err}",
                started_at.elapsed().as_millis(),
                error_code(err)
            ),
        }
        result
    }

    fn send_locked(&self, id: NotificationId, destination: &str) -> ServiceResult<()> {
        let mut notification = self.load_active(id)?;
        let message = render_message(&notification);
        let outcome = self.sink.deliver(&message, destination);

        notification.record_delivery(outcome.is_ok(), now_epoch_ms());
        let state_write = self.repo.update_lifecycle(&notification);

        match (outcome, state_write) {
            (Ok(()), Ok(())) => Ok(()),
            (Ok(()), Err(write_error)) => Err(NotificationServiceError::Persistence(write_error)),
            (Err(error), state_write) => Err(NotificationServiceError::DeliveryFailed {
                id,
                error,
                state_write_error: state_write.err(),
            }),
        }
    }

    /// Lists active notifications, optionally filtered by a state name.
    ///
    /// # Contract
    /// - `""` lists every active notification.
    /// - `"CREATED" | "SENT" | "FAILED"` restricts to that state.
    /// - Any other value fails with `InvalidFilter`.
    pub fn list(&self, state_filter: &str) -> ServiceResult<Vec<Notification>> {
        let state = parse_state_filter(state_filter)?;
        self.list_by_state(state)
    }

    /// Typed variant of [`Self::list`].
    pub fn list_by_state(
        &self,
        state: Option<NotificationState>,
    ) -> ServiceResult<Vec<Notification>> {
        let query = NotificationListQuery {
            state,
            include_inactive: false,
        };
        Ok(self.repo.list(&query)?)
    }

    /// Soft-deletes one notification.
    ///
    /// # Contract
    /// - Unknown id: `NotFound`. Already inactive: `AlreadyDeleted`.
    /// - The record is retained with `active=false` and a fresh `updated_at`.
    pub fn delete(&self, id: NotificationId) -> ServiceResult<()> {
        let result = self.locks.with_lock(id, || -> ServiceResult<()> {
            let mut notification = self.load_active(id)?;
            notification.deactivate(now_epoch_ms());
            self.repo.update_lifecycle(&notification)?;
            Ok(())
        });

        match &result {
            Ok(()) => info!("event=notification_delete module=service status=ok id={id}"),
            Err(err) => warn!(
                "event=notification_delete module=service status=error id={id} error_code={} error={err}",
                error_code(err)
            ),
        }
        result
    }

    fn load_active(&self, id: NotificationId) -> ServiceResult<Notification> {
        let notification = self.get(id)?;
        if !notification.active {
            return Err(NotificationServiceError::AlreadyDeleted(id));
        }
        Ok(notification)
    }
}

fn error_code(err: &NotificationServiceError) -> &'static str {
    match err {
        NotificationServiceError::NotFound(_) => "not_found",
        NotificationServiceError::AlreadyDeleted(_) => "already_deleted",
        NotificationServiceError::InvalidFilter(_) => "invalid_filter",
        NotificationServiceError::DeliveryFailed { .. } => "delivery_failed",
        NotificationServiceError::Persistence(_) => "persistence_failed",
    }
}
