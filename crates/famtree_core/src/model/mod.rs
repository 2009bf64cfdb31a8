//! Domain model for the family tree.
//!
//! # Responsibility
//! - Define the canonical person record used by every layer.
//! - Keep one storage-agnostic shape for both SQLite and file backends.
//!
//! # Invariants
//! - Every person is identified by a stable opaque `PersonId`.
//! - `children` is a derived projection of parent pointers, never a second
//!   source of truth.

pub mod person;
