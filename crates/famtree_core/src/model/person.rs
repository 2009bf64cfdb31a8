//! Person domain model.
//!
//! # Responsibility
//! - Define the canonical person record shared by storage and services.
//! - Validate field invariants before any record is persisted.
//!
//! # Invariants
//! - `id` is stable and never reused for another person.
//! - `name` is non-empty after trimming.
//! - `generation` and `birth_rank` (when set) are positive.
//! - `children` holds derived child ids ordered by birth rank; the
//!   `parent_id` back-references are the single source of truth.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Stable opaque identifier for a person.
///
/// The SQLite backend stores random UUID strings, the file backend stores
/// stringified counter values. Callers must treat both as opaque.
pub type PersonId = String;

/// Canonical record for one family member.
///
/// Serialized field names follow the external camelCase schema used by the
/// file-backed document and by presentation-layer callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    /// Stable id assigned by the storage backend.
    pub id: PersonId,
    /// Display name, trimmed and non-empty.
    pub name: String,
    /// Hierarchy tier: 1 = founders, 2 = their children, and so on.
    pub generation: u32,
    /// Parent back-reference. `None` marks a root/founder record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<PersonId>,
    /// Derived ordered child ids. Recomputed from parent pointers on read.
    #[serde(default)]
    pub children: Vec<PersonId>,
    /// Birth order among siblings of the same parent. Unique per parent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_rank: Option<u32>,
    /// Epoch milliseconds, assigned once at creation.
    pub created_at: i64,
}

/// Input shape for creating one person record.
///
/// The service layer normalizes the name before building this value; the
/// storage backend assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPerson {
    /// Trimmed display name.
    pub name: String,
    /// Hierarchy tier, must be positive.
    pub generation: u32,
    /// Optional parent reference.
    pub parent_id: Option<PersonId>,
    /// Optional birth order, must be positive when set.
    pub birth_rank: Option<u32>,
}

impl NewPerson {
    /// Checks field invariants prior to persistence.
    ///
    /// # Errors
    /// - `BlankName` when the name trims to empty.
    /// - `ZeroGeneration` when the generation tier is 0.
    /// - `ZeroBirthRank` when a birth rank of 0 is supplied.
    pub fn validate(&self) -> Result<(), PersonValidationError> {
        if self.name.trim().is_empty() {
            return Err(PersonValidationError::BlankName);
        }
        if self.generation == 0 {
            return Err(PersonValidationError::ZeroGeneration);
        }
        if self.birth_rank == Some(0) {
            return Err(PersonValidationError::ZeroBirthRank);
        }
        Ok(())
    }
}

/// Field-level validation failure for person records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonValidationError {
    /// Name is empty after trimming.
    BlankName,
    /// Generation tier must start at 1.
    ZeroGeneration,
    /// Birth rank must start at 1 when present.
    ZeroBirthRank,
}

impl Display for PersonValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "person name must not be blank"),
            Self::ZeroGeneration => write!(f, "generation must be a positive integer"),
            Self::ZeroBirthRank => write!(f, "birth rank must be a positive integer"),
        }
    }
}

impl Error for PersonValidationError {}

/// Recomputes every `children` list from the parent pointers in `persons`.
///
/// Children are ordered by ascending birth rank with a missing rank treated
/// as 0; ties keep the slice order, which storage backends guarantee to be
/// creation order.
pub fn derive_children(persons: &mut [Person]) {
    let index_by_id: HashMap<PersonId, usize> = persons
        .iter()
        .enumerate()
        .map(|(index, person)| (person.id.clone(), index))
        .collect();

    let mut links: Vec<(usize, u32, usize)> = Vec::new();
    for (child_index, person) in persons.iter().enumerate() {
        let Some(parent_id) = person.parent_id.as_ref() else {
            continue;
        };
        if let Some(&parent_index) = index_by_id.get(parent_id) {
            links.push((parent_index, person.birth_rank.unwrap_or(0), child_index));
        }
    }
    links.sort();

    for person in persons.iter_mut() {
        person.children.clear();
    }
    for (parent_index, _, child_index) in links {
        let child_id = persons[child_index].id.clone();
        persons[parent_index].children.push(child_id);
    }
}

/// Returns the display label for a generation tier.
///
/// Founders are labelled by birth rank ("Patriarche" for rank 1); deeper
/// tiers fall back to a numbered generation label.
pub fn generation_label(generation: u32, birth_rank: Option<u32>) -> String {
    match generation {
        1 => {
            if birth_rank == Some(1) {
                "Patriarche".to_string()
            } else {
                "Matriarche".to_string()
            }
        }
        2 => "Enfant".to_string(),
        3 => "Petit-enfant".to_string(),
        4 => "Arrière-petit-enfant".to_string(),
        other => format!("Génération {other}"),
    }
}
