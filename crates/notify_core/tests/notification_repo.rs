use notify_core::db::migrations::latest_version;
use notify_core::db::{open_db, open_db_in_memory};
use notify_core::{
    InMemoryNotificationRepository, MarketSnapshot, Notification, NotificationListQuery,
    NotificationRepository, NotificationState, RepoError, SqliteNotificationRepository,
};
use rusqlite::Connection;
use uuid::Uuid;

fn sqlite_repo() -> SqliteNotificationRepository {
    SqliteNotificationRepository::try_new(open_db_in_memory().unwrap()).unwrap()
}

fn notification_at(id: &str, created_at: i64) -> Notification {
    Notification::with_id(
        Uuid::parse_str(id).unwrap(),
        MarketSnapshot::new(120.0, 7000.0, 10000.0, 500.0),
        created_at,
    )
}

fn insert_and_get_roundtrip<R: NotificationRepository>(repo: R) {
    let notification = Notification::new(MarketSnapshot::new(-3.5, 0.0, 1e12, 42.125));
    let id = repo.insert(&notification).unwrap();

    let loaded = repo.get(id).unwrap().unwrap();
    assert_eq!(loaded, notification);
    assert!(repo.get(Uuid::new_v4()).unwrap().is_none());
}

fn duplicate_insert_is_rejected<R: NotificationRepository>(repo: R) {
    let notification = Notification::new(MarketSnapshot::new(1.0, 2.0, 3.0, 4.0));
    repo.insert(&notification).unwrap();

    let err = repo.insert(&notification).unwrap_err();
    assert!(matches!(err, RepoError::DuplicateId(id) if id == notification.id));
}

fn update_lifecycle_writes_only_lifecycle_fields<R: NotificationRepository>(repo: R) {
    let stored = notification_at("00000000-0000-4000-8000-000000000001", 1_000);
    repo.insert(&stored).unwrap();

    let mut changed = stored.clone();
    changed.snapshot.current_btc_price = 999.0;
    changed.created_at = 5;
    changed.record_delivery(false, 2_000);
    changed.deactivate(3_000);
    repo.update_lifecycle(&changed).unwrap();

    let loaded = repo.get(stored.id).unwrap().unwrap();
    assert_eq!(loaded.snapshot, stored.snapshot);
    assert_eq!(loaded.created_at, 1_000);
    assert_eq!(loaded.state, NotificationState::Failed);
    assert!(!loaded.active);
    assert_eq!(loaded.updated_at, 3_000);
}

fn update_unknown_returns_not_found<R: NotificationRepository>(repo: R) {
    let missing = Notification::new(MarketSnapshot::new(1.0, 1.0, 1.0, 1.0));
    let err = repo.update_lifecycle(&missing).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if id == missing.id));
}

fn list_filters_and_orders<R: NotificationRepository>(repo: R) {
    let first = notification_at("00000000-0000-4000-8000-000000000003", 1_000);
    let second = notification_at("00000000-0000-4000-8000-000000000002", 1_000);
    let mut third = notification_at("00000000-0000-4000-8000-000000000001", 2_000);
    let mut deleted = notification_at("00000000-0000-4000-8000-000000000004", 500);
    repo.insert(&third).unwrap();
    repo.insert(&first).unwrap();
    repo.insert(&deleted).unwrap();
    repo.insert(&second).unwrap();

    third.record_delivery(true, 2_500);
    repo.update_lifecycle(&third).unwrap();
    deleted.deactivate(600);
    repo.update_lifecycle(&deleted).unwrap();

    let ids = |query: NotificationListQuery| -> Vec<Uuid> {
        repo.list(&query)
            .unwrap()
            .into_iter()
            .map(|item| item.id)
            .collect()
    };

    assert_eq!(
        ids(NotificationListQuery::default()),
        vec![second.id, first.id, third.id]
    );
    assert_eq!(
        ids(NotificationListQuery {
            state: Some(NotificationState::Sent),
            ..NotificationListQuery::default()
        }),
        vec![third.id]
    );
    assert_eq!(
        ids(NotificationListQuery {
            state: Some(NotificationState::Created),
            include_inactive: true,
        }),
        vec![deleted.id, second.id, first.id]
    );
}

fn non_finite_snapshot_values_round_trip<R: NotificationRepository>(repo: R) {
    let notification = Notification::new(MarketSnapshot::new(
        f64::NAN,
        f64::INFINITY,
        f64::NEG_INFINITY,
        -0.0,
    ));
    repo.insert(&notification).unwrap();

    let loaded = repo.get(notification.id).unwrap().unwrap();
    assert!(loaded.snapshot.current_btc_price.is_nan());
    assert_eq!(loaded.snapshot.market_trade_volume, f64::INFINITY);
    assert_eq!(loaded.snapshot.intra_day_high_price, f64::NEG_INFINITY);
    assert_eq!(loaded.snapshot.market_cap, 0.0);

    let listed = repo.list(&NotificationListQuery::default()).unwrap();
    assert_eq!(listed.len(), 1);
    assert!(listed[0].snapshot.current_btc_price.is_nan());
}

macro_rules! backend_suite {
    ($module:ident, $make:expr) => {
        mod $module {
            use super::*;

            #[test]
            fn insert_and_get() {
                insert_and_get_roundtrip($make);
            }

            #[test]
            fn duplicate_insert() {
                duplicate_insert_is_rejected($make);
            }

            #[test]
            fn update_lifecycle_fields() {
                update_lifecycle_writes_only_lifecycle_fields($make);
            }

            #[test]
            fn update_unknown() {
                update_unknown_returns_not_found($make);
            }

            #[test]
            fn list_filters() {
                list_filters_and_orders($make);
            }

            #[test]
            fn non_finite_values() {
                non_finite_snapshot_values_round_trip($make);
            }
        }
    };
}

backend_suite!(sqlite, sqlite_repo());
backend_suite!(in_memory, InMemoryNotificationRepository::new());

#[test]
fn sqlite_records_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notifications.db");
    let notification = Notification::new(MarketSnapshot::new(110.0, 7000.0, 10000.0, 500.0));

    {
        let repo = SqliteNotificationRepository::try_new(open_db(&path).unwrap()).unwrap();
        repo.insert(&notification).unwrap();
    }

    let repo = SqliteNotificationRepository::try_new(open_db(&path).unwrap()).unwrap();
    assert_eq!(repo.get(notification.id).unwrap().unwrap(), notification);
}

#[test]
fn repository_rejects_uninitialized_connection() {
    let conn = Connection::open_in_memory().unwrap();

    match SqliteNotificationRepository::try_new(conn) {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert_eq!(expected_version, latest_version()),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

#[test]
fn repository_rejects_connection_without_notifications_table() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqliteNotificationRepository::try_new(conn);
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredTable("notifications"))
    ));
}

#[test]
fn repository_rejects_connection_missing_required_column() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE notifications (
            id TEXT PRIMARY KEY NOT NULL,
            current_btc_price REAL NOT NULL
        );",
    )
    .unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqliteNotificationRepository::try_new(conn);
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredColumn {
            table: "notifications",
            column: "market_trade_volume"
        })
    ));
}

#[test]
fn invalid_persisted_state_is_reported() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch("PRAGMA ignore_check_constraints = ON;")
        .unwrap();
    let id = Uuid::new_v4();
    conn.execute(
        "INSERT INTO notifications (
            id, current_btc_price, market_trade_volume, intra_day_high_price,
            market_cap, state, active, created_at, updated_at
        ) VALUES (?1, 1.0, 1.0, 1.0, 1.0, 'PENDING', 1, 0, 0);",
        [id.to_string()],
    )
    .unwrap();

    let repo = SqliteNotificationRepository::try_new(conn).unwrap();
    let err = repo.get(id).unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(message) if message.contains("PENDING")));
}
