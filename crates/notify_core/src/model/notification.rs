//! Notification domain model.
//!
//! # Responsibility
//! - Define the record created from a market-data snapshot.
//! - Provide lifecycle helpers for delivery outcome and soft delete.
//!
//! # Invariants
//! - `id` is stable and never reused for another notification.
//! - Snapshot fields and `created_at` never change after construction.
//! - `active` only ever moves from `true` to `false`.
//! - `updated_at` never moves backwards.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Stable identifier assigned when a notification is created.
pub type NotificationId = Uuid;

/// Delivery lifecycle state.
///
/// Serialized with the same upper-case names used for list filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NotificationState {
    /// Stored but never sent.
    Created,
    /// Last delivery attempt succeeded.
    Sent,
    /// Last delivery attempt failed.
    Failed,
}

impl NotificationState {
    pub const ALL: [NotificationState; 3] = [Self::Created, Self::Sent, Self::Failed];

    /// Returns the canonical wire/storage name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Sent => "SENT",
            Self::Failed => "FAILED",
        }
    }

    /// Exact, case-sensitive parse of the canonical name.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "CREATED" => Some(Self::Created),
            "SENT" => Some(Self::Sent),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl Display for NotificationState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name a `NotificationState`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStateError(pub String);

impl Display for UnknownStateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unknown notification state `{}`; expected CREATED|SENT|FAILED",
            self.0
        )
    }
}

impl Error for UnknownStateError {}

impl FromStr for NotificationState {
    type Err = UnknownStateError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value).ok_or_else(|| UnknownStateError(value.to_string()))
    }
}

/// Market-data line items captured by a notification.
///
/// Values are stored exactly as given; no range validation is applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub current_btc_price: f64,
    pub market_trade_volume: f64,
    pub intra_day_high_price: f64,
    pub market_cap: f64,
}

impl MarketSnapshot {
    pub fn new(
        current_btc_price: f64,
        market_trade_volume: f64,
        intra_day_high_price: f64,
        market_cap: f64,
    ) -> Self {
        Self {
            current_btc_price,
            market_trade_volume,
            intra_day_high_price,
            market_cap,
        }
    }
}

/// Canonical notification record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    #[serde(flatten)]
    pub snapshot: MarketSnapshot,
    pub state: NotificationState,
    /// Soft delete flag. `false` means the record is retained but inert.
    pub active: bool,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds, refreshed by send and delete.
    pub updated_at: i64,
}

impl Notification {
    /// Creates a new notification with a generated id and current timestamps.
    pub fn new(snapshot: MarketSnapshot) -> Self {
        Self::with_id(Uuid::new_v4(), snapshot, now_epoch_ms())
    }

    /// Creates a notification with a caller-provided id and creation time.
    ///
    /// # Invariants
    /// - `state` starts as `Created` and `active` as `true`.
    /// - `updated_at` starts equal to `created_at`.
    pub fn with_id(id: NotificationId, snapshot: MarketSnapshot, created_at: i64) -> Self {
        Self {
            id,
            snapshot,
            state: NotificationState::Created,
            active: true,
            created_at,
            updated_at: created_at,
        }
    }

    /// Applies the outcome of one delivery attempt.
    ///
    /// Callers must check `active` first; this helper only moves state.
    pub fn record_delivery(&mut self, delivered: bool, at: i64) {
        self.state = if delivered {
            NotificationState::Sent
        } else {
            NotificationState::Failed
        };
        self.touch(at);
    }

    /// Marks this notification as softly deleted.
    ///
    /// No inverse operation exists.
    pub fn deactivate(&mut self, at: i64) {
        self.active = false;
        self.touch(at);
    }

    fn touch(&mut self, at: i64) {
        self.updated_at = self.updated_at.max(at);
    }
}

/// Current wall-clock time as Unix epoch milliseconds.
///
/// Falls back to `0` if the system clock is set before the epoch.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
