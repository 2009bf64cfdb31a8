//! File-backed person repository.
//!
//! # Responsibility
//! - Persist the family as one JSON document: `{ persons, nextId }`.
//! - Allocate monotonically increasing string ids from `nextId`.
//!
//! # Invariants
//! - Each operation loads, mutates, and rewrites the whole document; the
//!   duplicate-rank check and the append happen on the same load.
//! - A missing file reads as an empty family.
//! - Document order is creation order; `children` is re-derived on load.

use crate::model::person::{derive_children, NewPerson, Person};
use crate::repo::person_repo::{PersonRepository, RepoError, RepoResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FamilyDocument {
    #[serde(default)]
    persons: Vec<Person>,
    #[serde(default = "first_id")]
    next_id: u64,
}

impl Default for FamilyDocument {
    fn default() -> Self {
        Self {
            persons: Vec::new(),
            next_id: first_id(),
        }
    }
}

fn first_id() -> u64 {
    1
}

/// JSON-file-backed person repository.
pub struct JsonPersonRepository {
    path: PathBuf,
}

impl JsonPersonRepository {
    /// Creates a repository over the given document path.
    ///
    /// The file is created lazily on the first write.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn load(&self) -> RepoResult<FamilyDocument> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(FamilyDocument::default());
            }
            Err(err) => return Err(err.into()),
        };
        let mut document: FamilyDocument = serde_json::from_str(&raw)?;
        derive_children(&mut document.persons);
        Ok(document)
    }

    fn save(&self, document: &FamilyDocument) -> RepoResult<()> {
        let raw = serde_json::to_string_pretty(document)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

impl PersonRepository for JsonPersonRepository {
    fn insert_person(&self, person: &NewPerson) -> RepoResult<Person> {
        person.validate()?;

        let mut document = self.load()?;
        if let (Some(parent_id), Some(birth_rank)) =
            (person.parent_id.as_deref(), person.birth_rank)
        {
            let taken = document.persons.iter().any(|existing| {
                existing.parent_id.as_deref() == Some(parent_id)
                    && existing.birth_rank == Some(birth_rank)
            });
            if taken {
                return Err(RepoError::DuplicateBirthRank {
                    parent_id: parent_id.to_string(),
                    birth_rank,
                });
            }
        }

        let created = Person {
            id: document.next_id.to_string(),
            name: person.name.clone(),
            generation: person.generation,
            parent_id: person.parent_id.clone(),
            children: Vec::new(),
            birth_rank: person.birth_rank,
            created_at: now_epoch_ms(),
        };
        document.next_id += 1;
        document.persons.push(created.clone());
        derive_children(&mut document.persons);
        self.save(&document)?;
        Ok(created)
    }

    fn rename_person(&self, id: &str, name: &str) -> RepoResult<()> {
        let mut document = self.load()?;
        let Some(person) = document.persons.iter_mut().find(|person| person.id == id) else {
            return Err(RepoError::NotFound(id.to_string()));
        };
        person.name = name.to_string();
        self.save(&document)
    }

    fn get_person(&self, id: &str) -> RepoResult<Option<Person>> {
        let document = self.load()?;
        Ok(document
            .persons
            .into_iter()
            .find(|person| person.id == id))
    }

    fn list_persons(&self) -> RepoResult<Vec<Person>> {
        Ok(self.load()?.persons)
    }
}

fn now_epoch_ms() -> i64 {
    // A clock before the epoch degrades to 0 instead of failing the write.
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}
