//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the storage contract used by the lifecycle service.
//! - Provide interchangeable SQLite and in-memory backends.
//!
//! # Invariants
//! - Both backends order list results by `created_at ASC, id ASC`.
//! - Both backends reject duplicate ids on insert.

pub mod memory_repo;
pub mod notification_repo;
