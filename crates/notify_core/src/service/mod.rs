//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository and delivery calls into lifecycle operations.
//! - Keep callers decoupled from storage and transport details.

mod id_lock;
pub mod notification_service;
