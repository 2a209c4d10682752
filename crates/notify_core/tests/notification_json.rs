use notify_core::{MarketSnapshot, Notification, NotificationState};
use serde_json::{json, Value};
use uuid::Uuid;

fn sent_notification() -> Notification {
    let mut notification = Notification::with_id(
        Uuid::parse_str("00000000-0000-4000-8000-0000000000aa").unwrap(),
        MarketSnapshot::new(120.0, 7000.0, 10000.0, 500.0),
        1_000,
    );
    notification.record_delivery(true, 2_000);
    notification
}

#[test]
fn notification_serializes_with_flat_snapshot_and_state_names() {
    let value = serde_json::to_value(sent_notification()).unwrap();

    assert_eq!(
        value,
        json!({
            "id": "00000000-0000-4000-8000-0000000000aa",
            "current_btc_price": 120.0,
            "market_trade_volume": 7000.0,
            "intra_day_high_price": 10000.0,
            "market_cap": 500.0,
            "state": "SENT",
            "active": true,
            "created_at": 1000,
            "updated_at": 2000
        })
    );
    assert!(value.get("snapshot").is_none());
}

#[test]
fn notification_json_round_trips() {
    let notification = sent_notification();
    let text = serde_json::to_string(&notification).unwrap();
    assert!(text.contains(r#""state":"SENT""#));

    let decoded: Notification = serde_json::from_str(&text).unwrap();
    assert_eq!(decoded, notification);
}

#[test]
fn state_names_match_list_filters() {
    for state in NotificationState::ALL {
        let value = serde_json::to_value(state).unwrap();
        assert_eq!(value, Value::String(state.as_str().to_string()));
    }

    let rejected = serde_json::from_str::<NotificationState>(r#""sent""#);
    assert!(rejected.is_err());
}
