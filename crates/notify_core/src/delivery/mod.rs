//! Delivery sink contract and message rendering.
//!
//! # Responsibility
//! - Define the collaborator that transmits a rendered message.
//! - Render the human-readable text for one notification.
//!
//! # Invariants
//! - Sinks report success or an opaque failure; they never touch storage.

use crate::model::notification::Notification;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Opaque delivery failure reported by a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryError {
    reason: String,
}

impl DeliveryError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl Display for DeliveryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "delivery failed: {}", self.reason)
    }
}

impl Error for DeliveryError {}

/// External collaborator that performs the actual transmission.
///
/// Calls are synchronous and expected to return in bounded time.
pub trait DeliverySink {
    fn deliver(&self, message: &str, destination: &str) -> Result<(), DeliveryError>;
}

impl<S: DeliverySink + ?Sized> DeliverySink for &S {
    fn deliver(&self, message: &str, destination: &str) -> Result<(), DeliveryError> {
        (**self).deliver(message, destination)
    }
}

impl<S: DeliverySink + ?Sized> DeliverySink for Arc<S> {
    fn deliver(&self, message: &str, destination: &str) -> Result<(), DeliveryError> {
        (**self).deliver(message, destination)
    }
}

impl<S: DeliverySink + ?Sized> DeliverySink for Box<S> {
    fn deliver(&self, message: &str, destination: &str) -> Result<(), DeliveryError> {
        (**self).deliver(message, destination)
    }
}

/// Stub sink that writes the message to the log and always succeeds.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDeliverySink;

impl DeliverySink for LogDeliverySink {
    fn deliver(&self, message: &str, destination: &str) -> Result<(), DeliveryError> {
        info!(
            "event=notification_deliver module=delivery status=ok destination={destination} message={:?}",
            message
        );
        Ok(())
    }
}

/// Renders the message body embedding the four snapshot values.
pub fn render_message(notification: &Notification) -> String {
    let snapshot = &notification.snapshot;
    format!(
        "Hi there,\n\
         current price of BTC is {:.2}\n\
         market trade volume is {:.2}\n\
         intra day high price is {:.2}\n\
         market cap is {:.2}",
        snapshot.current_btc_price,
        snapshot.market_trade_volume,
        snapshot.intra_day_high_price,
        snapshot.market_cap,
    )
}

#[cfg(test)]
mod tests {
    use super::{render_message, DeliverySink, LogDeliverySink};
    use crate::model::notification::{MarketSnapshot, Notification};

    #[test]
    fn render_message_embeds_all_snapshot_values() {
        let notification = Notification::new(MarketSnapshot::new(120.0, 7000.5, 10000.0, -1.0));
        let message = render_message(&notification);

        assert!(message.contains("current price of BTC is 120.00"));
        assert!(message.contains("market trade volume is 7000.50"));
        assert!(message.contains("intra day high price is 10000.00"));
        assert!(message.contains("market cap is -1.00"));
    }

    #[test]
    fn log_sink_always_succeeds() {
        assert!(LogDeliverySink.deliver("body", "hello@example.com").is_ok());
    }
}
