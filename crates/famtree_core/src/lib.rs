//! Core domain logic for the family-tree application.
//! This crate is the single source of truth for genealogy invariants.

pub mod cache;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod tree;

pub use cache::FamilyCache;
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::person::{
    generation_label, NewPerson, Person, PersonId, PersonValidationError,
};
pub use repo::json_repo::JsonPersonRepository;
pub use repo::person_repo::{PersonRepository, RepoError, RepoResult, SqlitePersonRepository};
pub use service::family_service::{AddPersonRequest, FamilyService, FamilyServiceError};
pub use tree::{build_forest, FamilyTreeNode};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
