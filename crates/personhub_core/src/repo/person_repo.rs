//! Person repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Expose the fixed set of person queries as explicit methods.
//! - Keep SQL details inside the core persistence boundary.
//! - Translate store constraint failures into semantic errors.
//!
//! # Invariants
//! - Write paths call `Person::validate()` before SQL mutations.
//! - Read paths reject invalid persisted rows instead of masking them.
//! - Unordered listings use `id ASC`; ordered listings break ties by `id ASC`.
//! - Substring matching is case-insensitive (Unicode `fold`) and literal
//!   (no wildcards).

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::{DbError, FOLD_FUNCTION};
use crate::model::person::{Person, PersonId, PersonValidationError};
use rusqlite::{ffi, params, params_from_iter, Connection, ErrorCode, Params, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const PERSON_SELECT_SQL: &str = "SELECT id, name, email, age FROM persons";
const PERSON_COLUMNS: &[&str] = &["id", "name", "email", "age"];

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for person persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(PersonValidationError),
    Db(DbError),
    NotFound(PersonId),
    /// Store-level UNIQUE constraint on `persons.email` rejected a write.
    DuplicateEmail(String),
    /// Store-level CHECK/NOT NULL constraint rejected a write.
    ConstraintViolation(String),
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Connection was not opened through `db::open_db*`.
    MissingSqlFunction(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "person not found: {id}"),
            Self::DuplicateEmail(_) => write!(f, "email already in use"),
            Self::ConstraintViolation(message) => write!(f, "constraint violation: {message}"),
            Self::InvalidData(message) => write!(f, "invalid persisted person data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} is behind required {expected_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
            Self::MissingSqlFunction(name) => write!(f, "missing sql function `{name}`"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
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

/// Repository interface for person queries and writes.
pub trait PersonRepository {
    fn get_by_id(&self, id: PersonId) -> RepoResult<Option<Person>>;
    fn exists_by_id(&self, id: PersonId) -> RepoResult<bool>;
    /// All rows in `id ASC` order.
    fn get_all(&self) -> RepoResult<Vec<Person>>;
    fn count(&self) -> RepoResult<u64>;

    /// Exact, case-sensitive name match.
    fn find_by_name(&self, name: &str) -> RepoResult<Vec<Person>>;
    fn find_by_email(&self, email: &str) -> RepoResult<Option<Person>>;
    fn find_by_age(&self, age: i32) -> RepoResult<Vec<Person>>;
    fn search_name_containing(&self, keyword: &str) -> RepoResult<Vec<Person>>;
    fn search_email_containing(&self, keyword: &str) -> RepoResult<Vec<Person>>;
    fn find_by_name_and_age(&self, name: &str, age: i32) -> RepoResult<Vec<Person>>;
    fn find_by_name_or_email(&self, name: &str, email: &str) -> RepoResult<Vec<Person>>;
    fn find_by_age_ordered_by_name(&self, age: i32) -> RepoResult<Vec<Person>>;
    fn find_by_name_ordered_by_age_desc(&self, name: &str) -> RepoResult<Vec<Person>>;
    /// Strictly greater than `age`.
    fn find_age_greater_than(&self, age: i32) -> RepoResult<Vec<Person>>;
    /// Strictly less than `age`.
    fn find_age_less_than(&self, age: i32) -> RepoResult<Vec<Person>>;
    /// Inclusive bounds, `id ASC` order.
    fn find_age_between(&self, start: i32, end: i32) -> RepoResult<Vec<Person>>;
    /// Inclusive bounds, ascending age. Empty when `min > max`.
    fn find_age_range(&self, min: i32, max: i32) -> RepoResult<Vec<Person>>;

    fn email_exists(&self, email: &str) -> RepoResult<bool>;
    fn exists_by_name_and_age(&self, name: &str, age: i32) -> RepoResult<bool>;
    fn count_by_age(&self, age: i32) -> RepoResult<u64>;
    fn count_by_name_containing(&self, keyword: &str) -> RepoResult<u64>;

    /// Name OR email substring match; each row appears once.
    fn search_keyword(&self, keyword: &str) -> RepoResult<Vec<Person>>;
    /// Every row sharing the current maximum age.
    fn find_oldest(&self) -> RepoResult<Vec<Person>>;
    fn find_top_by_age_desc(&self, limit: u32) -> RepoResult<Vec<Person>>;
    fn find_first_by_name_containing_ordered_by_age(
        &self,
        keyword: &str,
        limit: u32,
    ) -> RepoResult<Vec<Person>>;

    /// Inserts when `id` is `None`, otherwise replaces the row in place.
    fn save(&self, person: &Person) -> RepoResult<Person>;
    /// Saves every row in one transaction.
    fn save_all(&self, persons: &[Person]) -> RepoResult<Vec<Person>>;

    /// Returns removed row count; absent ids are a no-op.
    fn delete_by_id(&self, id: PersonId) -> RepoResult<usize>;
    fn delete_all_by_id(&self, ids: &[PersonId]) -> RepoResult<usize>;
    fn delete_by_email(&self, email: &str) -> RepoResult<usize>;
    fn delete_by_name_and_age(&self, name: &str, age: i32) -> RepoResult<usize>;
    fn delete_all(&self) -> RepoResult<usize>;
}

/// SQLite-backed person repository.
pub struct SqlitePersonRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePersonRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations have not been applied.
    /// - `MissingRequiredTable` / `MissingRequiredColumn` when the schema
    ///   does not carry the `persons` shape.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn query_list<P: Params>(&self, clause: &str, params: P) -> RepoResult<Vec<Person>> {
        let mut stmt = self.conn.prepare(&format!("{PERSON_SELECT_SQL} {clause};"))?;
        let mut rows = stmt.query(params)?;
        let mut persons = Vec::new();
        while let Some(row) = rows.next()? {
            persons.push(parse_person_row(row)?);
        }
        Ok(persons)
    }

    fn query_one<P: Params>(&self, clause: &str, params: P) -> RepoResult<Option<Person>> {
        let mut stmt = self.conn.prepare(&format!("{PERSON_SELECT_SQL} {clause};"))?;
        let mut rows = stmt.query(params)?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_person_row(row)?)),
            None => Ok(None),
        }
    }

    fn query_exists<P: Params>(&self, clause: &str, params: P) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            &format!("SELECT EXISTS(SELECT 1 FROM persons {clause});"),
            params,
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn query_count<P: Params>(&self, clause: &str, params: P) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM persons {clause};"),
            params,
            |row| row.get(0),
        )?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative row count `{count}`")))
    }
}

impl PersonRepository for SqlitePersonRepository<'_> {
    fn get_by_id(&self, id: PersonId) -> RepoResult<Option<Person>> {
        self.query_one("WHERE id = ?1", [id])
    }

    fn exists_by_id(&self, id: PersonId) -> RepoResult<bool> {
        self.query_exists("WHERE id = ?1", [id])
    }

    fn get_all(&self) -> RepoResult<Vec<Person>> {
        self.query_list("ORDER BY id ASC", [])
    }

    fn count(&self) -> RepoResult<u64> {
        self.query_count("", [])
    }

    fn find_by_name(&self, name: &str) -> RepoResult<Vec<Person>> {
        self.query_list("WHERE name = ?1 ORDER BY id ASC", [name])
    }

    fn find_by_email(&self, email: &str) -> RepoResult<Option<Person>> {
        self.query_one("WHERE email = ?1", [email])
    }

    fn find_by_age(&self, age: i32) -> RepoResult<Vec<Person>> {
        self.query_list("WHERE age = ?1 ORDER BY id ASC", [age])
    }

    fn search_name_containing(&self, keyword: &str) -> RepoResult<Vec<Person>> {
        self.query_list(
            "WHERE instr(fold(name), fold(?1)) > 0 ORDER BY id ASC",
            [keyword],
        )
    }

    fn search_email_containing(&self, keyword: &str) -> RepoResult<Vec<Person>> {
        self.query_list(
            "WHERE instr(fold(email), fold(?1)) > 0 ORDER BY id ASC",
            [keyword],
        )
    }

    fn find_by_name_and_age(&self, name: &str, age: i32) -> RepoResult<Vec<Person>> {
        self.query_list(
            "WHERE name = ?1 AND age = ?2 ORDER BY id ASC",
            params![name, age],
        )
    }

    fn find_by_name_or_email(&self, name: &str, email: &str) -> RepoResult<Vec<Person>> {
        self.query_list("WHERE name = ?1 OR email = ?2 ORDER BY id ASC", [name, email])
    }

    fn find_by_age_ordered_by_name(&self, age: i32) -> RepoResult<Vec<Person>> {
        self.query_list("WHERE age = ?1 ORDER BY name ASC, id ASC", [age])
    }

    fn find_by_name_ordered_by_age_desc(&self, name: &str) -> RepoResult<Vec<Person>> {
        self.query_list("WHERE name = ?1 ORDER BY age DESC, id ASC", [name])
    }

    fn find_age_greater_than(&self, age: i32) -> RepoResult<Vec<Person>> {
        self.query_list("WHERE age > ?1 ORDER BY id ASC", [age])
    }

    fn find_age_less_than(&self, age: i32) -> RepoResult<Vec<Person>> {
        self.query_list("WHERE age < ?1 ORDER BY id ASC", [age])
    }

    fn find_age_between(&self, start: i32, end: i32) -> RepoResult<Vec<Person>> {
        self.query_list("WHERE age BETWEEN ?1 AND ?2 ORDER BY id ASC", [start, end])
    }

    fn find_age_range(&self, min: i32, max: i32) -> RepoResult<Vec<Person>> {
        if min > max {
            return Ok(Vec::new());
        }
        self.query_list(
            "WHERE age >= ?1 AND age <= ?2 ORDER BY age ASC, id ASC",
            [min, max],
        )
    }

    fn email_exists(&self, email: &str) -> RepoResult<bool> {
        self.query_exists("WHERE email = ?1", [email])
    }

    fn exists_by_name_and_age(&self, name: &str, age: i32) -> RepoResult<bool> {
        self.query_exists("WHERE name = ?1 AND age = ?2", params![name, age])
    }

    fn count_by_age(&self, age: i32) -> RepoResult<u64> {
        self.query_count("WHERE age = ?1", [age])
    }

    fn count_by_name_containing(&self, keyword: &str) -> RepoResult<u64> {
        self.query_count("WHERE instr(fold(name), fold(?1)) > 0", [keyword])
    }

    fn search_keyword(&self, keyword: &str) -> RepoResult<Vec<Person>> {
        self.query_list(
            "WHERE instr(fold(name), fold(?1)) > 0
                OR instr(fold(email), fold(?1)) > 0
             ORDER BY id ASC",
            [keyword],
        )
    }

    fn find_oldest(&self) -> RepoResult<Vec<Person>> {
        self.query_list(
            "WHERE age = (SELECT MAX(age) FROM persons) ORDER BY id ASC",
            [],
        )
    }

    fn find_top_by_age_desc(&self, limit: u32) -> RepoResult<Vec<Person>> {
        self.query_list("ORDER BY age DESC, id ASC LIMIT ?1", [i64::from(limit)])
    }

    fn find_first_by_name_containing_ordered_by_age(
        &self,
        keyword: &str,
        limit: u32,
    ) -> RepoResult<Vec<Person>> {
        self.query_list(
            "WHERE instr(fold(name), fold(?1)) > 0 ORDER BY age ASC, id ASC LIMIT ?2",
            params![keyword, i64::from(limit)],
        )
    }

    fn save(&self, person: &Person) -> RepoResult<Person> {
        save_with(self.conn, person)
    }

    fn save_all(&self, persons: &[Person]) -> RepoResult<Vec<Person>> {
        let tx = self.conn.unchecked_transaction()?;
        let saved = persons
            .iter()
            .map(|person| save_with(&tx, person))
            .collect::<RepoResult<Vec<_>>>()?;
        tx.commit()?;
        Ok(saved)
    }

    fn delete_by_id(&self, id: PersonId) -> RepoResult<usize> {
        Ok(self.conn.execute("DELETE FROM persons WHERE id = ?1;", [id])?)
    }

    fn delete_all_by_id(&self, ids: &[PersonId]) -> RepoResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let tx = self.conn.unchecked_transaction()?;
        let removed = tx.execute(
            &format!("DELETE FROM persons WHERE id IN ({placeholders});"),
            params_from_iter(ids.iter()),
        )?;
        tx.commit()?;
        Ok(removed)
    }

    fn delete_by_email(&self, email: &str) -> RepoResult<usize> {
        Ok(self
            .conn
            .execute("DELETE FROM persons WHERE email = ?1;", [email])?)
    }

    fn delete_by_name_and_age(&self, name: &str, age: i32) -> RepoResult<usize> {
        Ok(self.conn.execute(
            "DELETE FROM persons WHERE name = ?1 AND age = ?2;",
            params![name, age],
        )?)
    }

    fn delete_all(&self) -> RepoResult<usize> {
        Ok(self.conn.execute("DELETE FROM persons;", [])?)
    }
}

fn save_with(conn: &Connection, person: &Person) -> RepoResult<Person> {
    person.validate()?;

    match person.id {
        None => {
            conn.execute(
                "INSERT INTO persons (name, email, age) VALUES (?1, ?2, ?3);",
                params![person.name, person.email, person.age],
            )
            .map_err(|err| map_write_error(err, &person.email))?;
            Ok(Person {
                id: Some(conn.last_insert_rowid()),
                ..person.clone()
            })
        }
        Some(id) => {
            let changed = conn
                .execute(
                    "UPDATE persons SET name = ?1, email = ?2, age = ?3 WHERE id = ?4;",
                    params![person.name, person.email, person.age, id],
                )
                .map_err(|err| map_write_error(err, &person.email))?;
            if changed == 0 {
                return Err(RepoError::NotFound(id));
            }
            Ok(person.clone())
        }
    }
}

fn map_write_error(err: rusqlite::Error, email: &str) -> RepoError {
    if let rusqlite::Error::SqliteFailure(failure, message) = &err {
        if failure.code == ErrorCode::ConstraintViolation {
            if failure.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE {
                return RepoError::DuplicateEmail(email.to_string());
            }
            return RepoError::ConstraintViolation(
                message.clone().unwrap_or_else(|| failure.to_string()),
            );
        }
    }
    err.into()
}

fn parse_person_row(row: &Row<'_>) -> RepoResult<Person> {
    let person = Person {
        id: Some(row.get("id")?),
        name: row.get("name")?,
        email: row.get("email")?,
        age: row.get("age")?,
    };
    person.validate().map_err(|err| {
        RepoError::InvalidData(format!(
            "row {} failed validation: {err}",
            person.id.unwrap_or_default()
        ))
    })?;
    Ok(person)
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version < expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let table_exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'persons'
        );",
        [],
        |row| row.get(0),
    )?;
    if table_exists != 1 {
        return Err(RepoError::MissingRequiredTable("persons"));
    }

    let mut stmt = conn.prepare("PRAGMA table_info(persons);")?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>("name"))?
        .collect::<Result<Vec<_>, _>>()?;
    if let Some(missing) = PERSON_COLUMNS
        .iter()
        .find(|column| !columns.iter().any(|name| name.as_str() == **column))
    {
        return Err(RepoError::MissingRequiredColumn {
            table: "persons",
            column: *missing,
        });
    }

    conn.query_row(&format!("SELECT {FOLD_FUNCTION}('A');"), [], |_| Ok(()))
        .map_err(|_| RepoError::MissingSqlFunction(FOLD_FUNCTION))?;

    Ok(())
}
