//! Family use-case service.
//!
//! # Responsibility
//! - Validate business invariants above the repository layer.
//! - Provide list, filter, birth-rank, insert, rename, and tree operations.
//!
//! # Invariants
//! - A supplied parent reference must resolve to an existing person.
//! - A duplicate `(parent_id, birth_rank)` pair is rejected before any
//!   record is written.
//! - Every successful write invalidates the cached person list.

use crate::cache::FamilyCache;
use crate::model::person::{NewPerson, Person, PersonId};
use crate::repo::person_repo::{PersonRepository, RepoError};
use crate::tree::{build_forest, FamilyTreeNode};
use log::{error, info};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Generation tier assigned by the fixed-tier insertion shape.
const GRANDCHILD_GENERATION: u32 = 3;

/// Input for [`FamilyService::add_person`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddPersonRequest {
    /// Display name; trimmed before storage.
    pub name: String,
    /// Optional parent reference; must resolve when present.
    pub parent_id: Option<PersonId>,
    /// Optional birth order among siblings; unique per parent.
    pub birth_rank: Option<u32>,
    /// Hierarchy tier; 1 = founders.
    pub generation: u32,
}

/// Errors from family service operations.
#[derive(Debug)]
pub enum FamilyServiceError {
    /// Name is blank after trimming.
    InvalidName,
    /// Generation tier must start at 1.
    InvalidGeneration(u32),
    /// Birth rank must start at 1.
    InvalidBirthRank(u32),
    /// Another sibling already holds this rank under the same parent.
    DuplicateBirthRank {
        parent_id: PersonId,
        birth_rank: u32,
    },
    /// Supplied parent reference does not resolve to a person.
    ParentNotFound(PersonId),
    /// Target person does not exist.
    PersonNotFound(PersonId),
    /// Storage-level failure.
    Repo(RepoError),
}

impl Display for FamilyServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName => write!(f, "person name must not be blank"),
            Self::InvalidGeneration(value) => {
                write!(f, "generation must be a positive integer, got {value}")
            }
            Self::InvalidBirthRank(value) => {
                write!(f, "birth rank must be a positive integer, got {value}")
            }
            Self::DuplicateBirthRank {
                parent_id,
                birth_rank,
            } => write!(
                f,
                "birth rank {birth_rank} is already occupied for parent {parent_id}"
            ),
            Self::ParentNotFound(id) => write!(f, "parent not found: {id}"),
            Self::PersonNotFound(id) => write!(f, "person not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for FamilyServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for FamilyServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::PersonNotFound(id),
            RepoError::DuplicateBirthRank {
                parent_id,
                birth_rank,
            } => Self::DuplicateBirthRank {
                parent_id,
                birth_rank,
            },
            other => Self::Repo(other),
        }
    }
}

/// Family service facade over a person store.
pub struct FamilyService<R: PersonRepository> {
    repo: R,
    cache: FamilyCache,
}

impl<R: PersonRepository> FamilyService<R> {
    /// Creates a service from a repository implementation.
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            cache: FamilyCache::new(),
        }
    }

    /// Returns the full person list, served from cache between writes.
    pub fn family_data(&self) -> Result<Vec<Person>, FamilyServiceError> {
        self.cache
            .get_or_reload(|| self.repo.list_persons())
            .map_err(Into::into)
    }

    /// Returns all persons in the given generation tier.
    pub fn persons_by_generation(
        &self,
        generation: u32,
    ) -> Result<Vec<Person>, FamilyServiceError> {
        let mut persons = self.family_data()?;
        persons.retain(|person| person.generation == generation);
        Ok(persons)
    }

    /// Looks up one person by id.
    pub fn person_by_id(&self, id: &str) -> Result<Option<Person>, FamilyServiceError> {
        Ok(self
            .family_data()?
            .into_iter()
            .find(|person| person.id == id))
    }

    /// Returns how many children the given person has. Unknown ids count 0.
    pub fn children_count(&self, id: &str) -> Result<usize, FamilyServiceError> {
        Ok(self
            .person_by_id(id)?
            .map(|person| person.children.len())
            .unwrap_or(0))
    }

    /// Returns the sorted set of birth ranks held under one parent.
    pub fn occupied_birth_ranks(&self, parent_id: &str) -> Result<Vec<u32>, FamilyServiceError> {
        let mut ranks: Vec<u32> = self
            .family_data()?
            .iter()
            .filter(|person| person.parent_id.as_deref() == Some(parent_id))
            .filter_map(|person| person.birth_rank)
            .collect();
        ranks.sort_unstable();
        Ok(ranks)
    }

    /// Suggests a birth rank for the next child of one parent.
    ///
    /// Starts at sibling count + 1 and advances past occupied values, so
    /// the suggestion is never a rank already held.
    pub fn next_birth_rank(&self, parent_id: &str) -> Result<u32, FamilyServiceError> {
        let siblings: Vec<Person> = self
            .family_data()?
            .into_iter()
            .filter(|person| person.parent_id.as_deref() == Some(parent_id))
            .collect();
        let occupied: HashSet<u32> = siblings
            .iter()
            .filter_map(|person| person.birth_rank)
            .collect();

        let mut candidate = siblings.len() as u32 + 1;
        while occupied.contains(&candidate) {
            candidate += 1;
        }
        Ok(candidate)
    }

    /// Creates one person after validating name, tier, rank, and parent.
    pub fn add_person(
        &self,
        request: AddPersonRequest,
    ) -> Result<Person, FamilyServiceError> {
        let name = normalize_person_name(request.name)?;
        if request.generation == 0 {
            return Err(FamilyServiceError::InvalidGeneration(0));
        }
        if request.birth_rank == Some(0) {
            return Err(FamilyServiceError::InvalidBirthRank(0));
        }
        if let Some(parent_id) = request.parent_id.as_deref() {
            if self.repo.get_person(parent_id)?.is_none() {
                return Err(FamilyServiceError::ParentNotFound(parent_id.to_string()));
            }
        }

        let created = self
            .repo
            .insert_person(&NewPerson {
                name,
                generation: request.generation,
                parent_id: request.parent_id,
                birth_rank: request.birth_rank,
            })
            .map_err(|err| {
                error!("event=person_insert module=service status=error error={err}");
                FamilyServiceError::from(err)
            })?;
        self.cache.invalidate();
        info!(
            "event=person_insert module=service status=ok person_id={} generation={} has_parent={}",
            created.id,
            created.generation,
            created.parent_id.is_some()
        );
        Ok(created)
    }

    /// Creates one grandchild under a required parent.
    ///
    /// Convenience wrapper for the fixed-tier insertion shape: the
    /// generation is always the grandchild tier.
    pub fn add_grandchild(
        &self,
        name: impl Into<String>,
        parent_id: &str,
        birth_rank: u32,
    ) -> Result<Person, FamilyServiceError> {
        self.add_person(AddPersonRequest {
            name: name.into(),
            parent_id: Some(parent_id.to_string()),
            birth_rank: Some(birth_rank),
            generation: GRANDCHILD_GENERATION,
        })
    }

    /// Renames one person and returns the stored name.
    ///
    /// Only the `name` field can change through this path.
    pub fn rename_person(
        &self,
        id: &str,
        name: impl Into<String>,
    ) -> Result<String, FamilyServiceError> {
        let name = normalize_person_name(name.into())?;
        self.repo.rename_person(id, &name).map_err(|err| {
            error!("event=person_rename module=service status=error person_id={id} error={err}");
            FamilyServiceError::from(err)
        })?;
        self.cache.invalidate();
        info!("event=person_rename module=service status=ok person_id={id}");
        Ok(name)
    }

    /// Builds the family forest from the current person list.
    pub fn build_family_tree(&self) -> Result<Vec<FamilyTreeNode>, FamilyServiceError> {
        Ok(build_forest(&self.family_data()?))
    }
}

fn normalize_person_name(value: String) -> Result<String, FamilyServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(FamilyServiceError::InvalidName);
    }
    Ok(trimmed.to_string())
}
