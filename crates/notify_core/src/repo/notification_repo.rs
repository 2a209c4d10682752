//! Notification repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide the storage contract the lifecycle service is written against.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Repositories never interpret lifecycle rules; the service enforces
//!   `active` guards so every backend shares the same semantics.
//! - `update_lifecycle` only writes `state`, `active` and `updated_at`.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::notification::{
    MarketSnapshot, Notification, NotificationId, NotificationState,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

const NOTIFICATION_SELECT_SQL: &str = "SELECT
    id,
    current_btc_price,
    market_trade_volume,
    intra_day_high_price,
    market_cap,
    state,
    active,
    created_at,
    updated_at
FROM notifications";

const REQUIRED_COLUMNS: [&str; 9] = [
    "id",
    "current_btc_price",
    "market_trade_volume",
    "intra_day_high_price",
    "market_cap",
    "state",
    "active",
    "created_at",
    "updated_at",
];

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for notification persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound(NotificationId),
    DuplicateId(NotificationId),
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "notification not found: {id}"),
            Self::DuplicateId(id) => write!(f, "notification id already stored: {id}"),
            Self::InvalidData(message) => {
                write!(f, "invalid persisted notification data: {message}")
            }
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Query options for listing notifications.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotificationListQuery {
    /// Only return rows in this state.
    pub state: Option<NotificationState>,
    /// Include soft-deleted rows. The service never sets this.
    pub include_inactive: bool,
}

impl NotificationListQuery {
    /// Returns whether `notification` passes this query's filters.
    pub fn matches(&self, notification: &Notification) -> bool {
        (self.include_inactive || notification.active)
            && self.state.map_or(true, |state| notification.state == state)
    }
}

/// Storage contract for notification records.
///
/// List results are ordered by `created_at ASC, id ASC`.
pub trait NotificationRepository {
    /// Stores a new record. Fails with `DuplicateId` if the id exists.
    fn insert(&self, notification: &Notification) -> RepoResult<NotificationId>;
    /// Loads one record, active or not.
    fn get(&self, id: NotificationId) -> RepoResult<Option<Notification>>;
    fn list(&self, query: &NotificationListQuery) -> RepoResult<Vec<Notification>>;
    /// Persists `state`, `active` and `updated_at` of an existing record.
    fn update_lifecycle(&self, notification: &Notification) -> RepoResult<()>;
}

/// SQLite-backed notification repository.
///
/// Owns its connection behind a mutex so one repository can be shared
/// between threads.
pub struct SqliteNotificationRepository {
    conn: Mutex<Connection>,
}

impl SqliteNotificationRepository {
    /// Wraps a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when `user_version` is not the latest.
    /// - `MissingRequiredTable` / `MissingRequiredColumn` when the schema
    ///   was altered outside of migrations.
    pub fn try_new(conn: Connection) -> RepoResult<Self> {
        ensure_connection_ready(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // Poisoning carries no state for a bare connection.
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl NotificationRepository for SqliteNotificationRepository {
    fn insert(&self, notification: &Notification) -> RepoResult<NotificationId> {
        let result = self.conn().execute(
            "INSERT INTO notifications (
                id,
                current_btc_price,
                market_trade_volume,
                intra_day_high_price,
                market_cap,
                state,
                active,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                notification.id.to_string(),
                notification.snapshot.current_btc_price,
                notification.snapshot.market_trade_volume,
                notification.snapshot.intra_day_high_price,
                notification.snapshot.market_cap,
                notification.state.as_str(),
                bool_to_int(notification.active),
                notification.created_at,
                notification.updated_at,
            ],
        );

        match result {
            Ok(_) => Ok(notification.id),
            Err(err) if is_primary_key_violation(&err) => {
                Err(RepoError::DuplicateId(notification.id))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn get(&self, id: NotificationId) -> RepoResult<Option<Notification>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!("{NOTIFICATION_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_notification_row(row)?));
        }

        Ok(None)
    }

    fn list(&self, query: &NotificationListQuery) -> RepoResult<Vec<Notification>> {
        let mut sql = format!("{NOTIFICATION_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if !query.include_inactive {
            sql.push_str(" AND active = 1");
        }

        if let Some(state) = query.state {
            sql.push_str(" AND state = ?");
            bind_values.push(Value::Text(state.as_str().to_string()));
        }

        sql.push_str(" ORDER BY created_at ASC, id ASC");

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut notifications = Vec::new();

        while let Some(row) = rows.next()? {
            notifications.push(parse_notification_row(row)?);
        }

        Ok(notifications)
    }

    fn update_lifecycle(&self, notification: &Notification) -> RepoResult<()> {
        let changed = self.conn().execute(
            "UPDATE notifications
             SET
                state = ?2,
                active = ?3,
                updated_at = ?4
             WHERE id = ?1;",
            params![
                notification.id.to_string(),
                notification.state.as_str(),
                bool_to_int(notification.active),
                notification.updated_at,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(notification.id));
        }

        Ok(())
    }
}

fn parse_notification_row(row: &Row<'_>) -> RepoResult<Notification> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{id_text}` in notifications.id"))
    })?;

    let state_text: String = row.get("state")?;
    let state = NotificationState::parse(&state_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid state `{state_text}` in notifications.state"
        ))
    })?;

    let active = match row.get::<_, i64>("active")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid active value `{other}` in notifications.active"
            )));
        }
    };

    Ok(Notification {
        id,
        snapshot: MarketSnapshot {
            current_btc_price: read_snapshot_value(row, "current_btc_price")?,
            market_trade_volume: read_snapshot_value(row, "market_trade_volume")?,
            intra_day_high_price: read_snapshot_value(row, "intra_day_high_price")?,
            market_cap: read_snapshot_value(row, "market_cap")?,
        },
        state,
        active,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

/// NULL is how SQLite stores a bound NaN.
fn read_snapshot_value(row: &Row<'_>, column: &str) -> RepoResult<f64> {
    Ok(row.get::<_, Option<f64>>(column)?.unwrap_or(f64::NAN))
}

fn is_primary_key_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::ConstraintViolation
                && failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "notifications")? {
        return Err(RepoError::MissingRequiredTable("notifications"));
    }

    for column in REQUIRED_COLUMNS {
        if !table_has_column(conn, "notifications", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "notifications",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
