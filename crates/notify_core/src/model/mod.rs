//! Domain model for market-data notifications.
//!
//! # Responsibility
//! - Define the canonical notification record and its lifecycle state.
//! - Keep lifecycle mutations (delivery outcome, soft delete) in one place.
//!
//! # Invariants
//! - Every notification is identified by a stable `NotificationId`.
//! - Deletion is a one-way `active=false` flag, never a hard delete.

pub mod notification;
