//! Person repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide stable CRUD APIs over canonical `persons` storage.
//! - Keep SQL details and ordering behavior inside the repository boundary.
//!
//! # Invariants
//! - `insert_person` runs the sibling-rank check and the insert in one
//!   immediate transaction; the partial unique index on
//!   `(parent_id, birth_rank)` backstops writers outside this process.
//! - Listing order is deterministic: `created_at ASC, rowid ASC`.
//! - `children` lists are derived from parent pointers on every read.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::person::{derive_children, NewPerson, Person, PersonId, PersonValidationError};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const PERSON_SELECT_SQL: &str = "SELECT
    id,
    name,
    generation,
    parent_id,
    birth_rank,
    created_at
FROM persons";

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from person store operations, across both backends.
#[derive(Debug)]
pub enum RepoError {
    /// Field invariant violated before any write happened.
    Validation(PersonValidationError),
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Underlying file i/o error (file-backed store).
    Io(std::io::Error),
    /// Family document cannot be encoded or decoded (file-backed store).
    Json(serde_json::Error),
    /// Another sibling already holds this `(parent_id, birth_rank)` pair.
    DuplicateBirthRank {
        parent_id: PersonId,
        birth_rank: u32,
    },
    /// Target person does not exist.
    NotFound(PersonId),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "family store i/o failure: {err}"),
            Self::Json(err) => write!(f, "family document is not valid JSON: {err}"),
            Self::DuplicateBirthRank {
                parent_id,
                birth_rank,
            } => write!(
                f,
                "birth rank {birth_rank} is already occupied for parent {parent_id}"
            ),
            Self::NotFound(id) => write!(f, "person not found: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "person repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted person data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PersonValidationError> for RepoError {
    fn from(value: PersonValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<std::io::Error> for RepoError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// Store interface for person records.
pub trait PersonRepository {
    /// Persists one new person and returns the stored record.
    fn insert_person(&self, person: &NewPerson) -> RepoResult<Person>;
    /// Updates exactly the `name` field of one person.
    fn rename_person(&self, id: &str, name: &str) -> RepoResult<()>;
    /// Loads one person by id, with derived children.
    fn get_person(&self, id: &str) -> RepoResult<Option<Person>>;
    /// Lists all persons in creation order, with derived children.
    fn list_persons(&self) -> RepoResult<Vec<Person>>;
}

/// SQLite-backed person repository.
#[derive(Debug)]
pub struct SqlitePersonRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePersonRepository<'conn> {
    /// Creates a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl PersonRepository for SqlitePersonRepository<'_> {
    fn insert_person(&self, person: &NewPerson) -> RepoResult<Person> {
        person.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if let (Some(parent_id), Some(birth_rank)) =
            (person.parent_id.as_deref(), person.birth_rank)
        {
            let taken: i64 = tx.query_row(
                "SELECT EXISTS(
                    SELECT 1
                    FROM persons
                    WHERE parent_id = ?1
                      AND birth_rank = ?2
                );",
                params![parent_id, birth_rank],
                |row| row.get(0),
            )?;
            if taken == 1 {
                return Err(RepoError::DuplicateBirthRank {
                    parent_id: parent_id.to_string(),
                    birth_rank,
                });
            }
        }

        let id = Uuid::new_v4().to_string();
        tx.execute(
            "INSERT INTO persons (
                id,
                name,
                generation,
                parent_id,
                birth_rank
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                id,
                person.name.as_str(),
                person.generation,
                person.parent_id.as_deref(),
                person.birth_rank,
            ],
        )
        .map_err(|err| map_insert_error(err, person))?;

        let created = load_required_person(&tx, &id)?;
        tx.commit()?;
        Ok(created)
    }

    fn rename_person(&self, id: &str, name: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE persons
             SET name = ?2
             WHERE id = ?1;",
            params![id, name],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn get_person(&self, id: &str) -> RepoResult<Option<Person>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PERSON_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };

        let mut person = parse_person_row(row)?;
        person.children = load_child_ids(self.conn, id)?;
        Ok(Some(person))
    }

    fn list_persons(&self) -> RepoResult<Vec<Person>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "{PERSON_SELECT_SQL} ORDER BY created_at ASC, rowid ASC;"
            ))?;
        let mut rows = stmt.query([])?;

        let mut persons = Vec::new();
        while let Some(row) = rows.next()? {
            persons.push(parse_person_row(row)?);
        }
        derive_children(&mut persons);
        Ok(persons)
    }
}

fn load_required_person(conn: &Connection, id: &str) -> RepoResult<Person> {
    let mut stmt = conn.prepare(&format!("{PERSON_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id])?;
    if let Some(row) = rows.next()? {
        return parse_person_row(row);
    }
    Err(RepoError::NotFound(id.to_string()))
}

fn load_child_ids(conn: &Connection, parent_id: &str) -> RepoResult<Vec<PersonId>> {
    let mut stmt = conn.prepare(
        "SELECT id
         FROM persons
         WHERE parent_id = ?1
         ORDER BY COALESCE(birth_rank, 0) ASC, created_at ASC, rowid ASC;",
    )?;
    let mut rows = stmt.query([parent_id])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        ids.push(row.get::<_, String>(0)?);
    }
    Ok(ids)
}

fn parse_person_row(row: &Row<'_>) -> RepoResult<Person> {
    let generation = parse_positive(row.get::<_, i64>("generation")?, "persons.generation")?;
    let birth_rank = row
        .get::<_, Option<i64>>("birth_rank")?
        .map(|value| parse_positive(value, "persons.birth_rank"))
        .transpose()?;

    Ok(Person {
        id: row.get("id")?,
        name: row.get("name")?,
        generation,
        parent_id: row.get("parent_id")?,
        children: Vec::new(),
        birth_rank,
        created_at: row.get("created_at")?,
    })
}

fn parse_positive(value: i64, column: &'static str) -> RepoResult<u32> {
    if value <= 0 {
        return Err(RepoError::InvalidData(format!(
            "non-positive value `{value}` in {column}"
        )));
    }
    u32::try_from(value)
        .map_err(|_| RepoError::InvalidData(format!("out-of-range value `{value}` in {column}")))
}

// The in-transaction check makes a unique-index hit unreachable from this
// process; a concurrent writer on another connection can still trip it.
fn map_insert_error(err: rusqlite::Error, person: &NewPerson) -> RepoError {
    if let (rusqlite::Error::SqliteFailure(inner, _), Some(parent_id), Some(birth_rank)) =
        (&err, person.parent_id.as_deref(), person.birth_rank)
    {
        if inner.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE {
            return RepoError::DuplicateBirthRank {
                parent_id: parent_id.to_string(),
                birth_rank,
            };
        }
    }
    err.into()
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_has_columns(
        conn,
        "persons",
        &[
            "id",
            "name",
            "generation",
            "parent_id",
            "birth_rank",
            "created_at",
        ],
    )? {
        return Err(RepoError::InvalidData(
            "persons table is missing or lacks required columns".to_string(),
        ));
    }

    Ok(())
}

fn table_has_columns(conn: &Connection, table: &str, columns: &[&str]) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    let mut found = Vec::new();
    while let Some(row) = rows.next()? {
        found.push(row.get::<_, String>(1)?);
    }
    Ok(columns
        .iter()
        .all(|column| found.iter().any(|name| name == column)))
}
