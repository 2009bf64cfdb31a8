//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the person store contract used by the service layer.
//! - Isolate SQLite and file-document details from business orchestration.
//!
//! # Invariants
//! - Writes enforce `NewPerson::validate()` before persistence.
//! - The duplicate birth-rank check and the insert commit together.
//! - Repository APIs return semantic errors (`NotFound`,
//!   `DuplicateBirthRank`) in addition to transport errors.

pub mod json_repo;
pub mod person_repo;
