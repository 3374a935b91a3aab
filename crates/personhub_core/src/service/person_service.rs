//! Person use-case service.
//!
//! # Responsibility
//! - Guard create/update/delete workflows with cross-row rules the
//!   single-column store constraint cannot express alone.
//! - Pass query use-cases through to the repository unchanged.
//!
//! # Invariants
//! - Guards are stateless: each call reads current store contents.
//! - Email collisions surface as `ServiceError::Conflict`, never as
//!   validation failures, whether caught by the pre-check or by the store.
//! - Batch deletion is all-or-nothing.

use crate::model::person::{Person, PersonDraft, PersonId, PersonValidationError};
use crate::repo::person_repo::{PersonRepository, RepoError, RepoResult};
use log::{info, warn};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result size for the "oldest people" shortcut.
pub const TOP_OLDEST_LIMIT: u32 = 3;
/// Result size for the "first matches by name" shortcut.
pub const FIRST_BY_NAME_LIMIT: u32 = 5;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service error for person use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// Request is structurally invalid.
    Validation(PersonValidationError),
    /// Email is already used by another row.
    Conflict { email: String },
    /// Referenced id does not exist.
    NotFound(PersonId),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Conflict { .. } => write!(f, "email already in use"),
            Self::NotFound(id) => write!(f, "person not found with id: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::DuplicateEmail(email) => Self::Conflict { email },
            RepoError::NotFound(id) => Self::NotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl From<PersonValidationError> for ServiceError {
    fn from(value: PersonValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Person service facade over repository implementations.
pub struct PersonService<R: PersonRepository> {
    repo: R,
}

impl<R: PersonRepository> PersonService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates one person after the creation guard passes.
    ///
    /// # Errors
    /// - `Validation` for field failures, a pre-assigned id or a missing email.
    /// - `Conflict` when the email is already stored.
    pub fn create_person(&self, draft: PersonDraft) -> ServiceResult<Person> {
        let person = self.check_creation(draft)?;
        let saved = self.repo.save(&person)?;
        info!(
            "event=person_create module=service status=ok id={}",
            saved.id.unwrap_or_default()
        );
        Ok(saved)
    }

    /// Creates several persons atomically; every draft must pass the
    /// creation guard and emails must be distinct within the batch.
    pub fn create_persons(&self, drafts: Vec<PersonDraft>) -> ServiceResult<Vec<Person>> {
        let mut seen = HashSet::new();
        let mut persons = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let person = self.check_creation(draft)?;
            if !seen.insert(person.email.clone()) {
                return Err(ServiceError::Conflict {
                    email: person.email,
                });
            }
            persons.push(person);
        }

        let saved = self.repo.save_all(&persons)?;
        info!(
            "event=person_create_batch module=service status=ok count={}",
            saved.len()
        );
        Ok(saved)
    }

    /// Replaces an existing person's fields, keeping its id.
    ///
    /// An absent email keeps the stored one. The draft's own `id` is ignored.
    ///
    /// # Errors
    /// - `NotFound` when `id` does not exist.
    /// - `Validation` for field failures.
    /// - `Conflict` when the new email belongs to a different row.
    pub fn update_person(&self, id: PersonId, draft: PersonDraft) -> ServiceResult<Person> {
        let existing = self.repo.get_by_id(id)?.ok_or(ServiceError::NotFound(id))?;
        let mut person = draft.into_person(Some(existing.email.as_str()))?;
        person.id = Some(id);

        if person.email != existing.email && self.repo.email_exists(&person.email)? {
            warn!("event=person_update module=service status=conflict id={id}");
            return Err(ServiceError::Conflict {
                email: person.email,
            });
        }

        let saved = self.repo.save(&person)?;
        info!("event=person_update module=service status=ok id={id}");
        Ok(saved)
    }

    /// Deletes one person, reporting `NotFound` for an unknown id.
    pub fn delete_person(&self, id: PersonId) -> ServiceResult<()> {
        if !self.repo.exists_by_id(id)? {
            return Err(ServiceError::NotFound(id));
        }
        self.repo.delete_by_id(id)?;
        info!("event=person_delete module=service status=ok id={id}");
        Ok(())
    }

    /// Deletes every listed person, or none if any id is unknown.
    pub fn delete_persons(&self, ids: &[PersonId]) -> ServiceResult<()> {
        for id in ids {
            if !self.repo.exists_by_id(*id)? {
                warn!("event=person_delete_batch module=service status=not_found id={id}");
                return Err(ServiceError::NotFound(*id));
            }
        }
        let removed = self.repo.delete_all_by_id(ids)?;
        info!("event=person_delete_batch module=service status=ok count={removed}");
        Ok(())
    }

    /// Returns whether `draft` would pass the creation guard.
    pub fn is_valid_for_creation(&self, draft: &PersonDraft) -> ServiceResult<bool> {
        match self.check_creation(draft.clone()) {
            Ok(_) => Ok(true),
            Err(ServiceError::Validation(_) | ServiceError::Conflict { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Returns whether `draft` would pass the update guard.
    pub fn is_valid_for_update(&self, draft: &PersonDraft) -> ServiceResult<bool> {
        let Some(id) = draft.id else {
            return Ok(false);
        };
        if draft.validate_fields().is_err() {
            return Ok(false);
        }
        let Some(existing) = self.repo.get_by_id(id)? else {
            return Ok(false);
        };
        match draft.email.as_deref() {
            Some(email) if email != existing.email => Ok(!self.repo.email_exists(email)?),
            _ => Ok(true),
        }
    }

    pub fn get_all_persons(&self) -> RepoResult<Vec<Person>> {
        self.repo.get_all()
    }

    pub fn get_person_by_id(&self, id: PersonId) -> RepoResult<Option<Person>> {
        self.repo.get_by_id(id)
    }

    pub fn exists_by_id(&self, id: PersonId) -> RepoResult<bool> {
        self.repo.exists_by_id(id)
    }

    pub fn total_count(&self) -> RepoResult<u64> {
        self.repo.count()
    }

    pub fn find_by_name(&self, name: &str) -> RepoResult<Vec<Person>> {
        self.repo.find_by_name(name)
    }

    pub fn find_by_email(&self, email: &str) -> RepoResult<Option<Person>> {
        self.repo.find_by_email(email)
    }

    pub fn find_by_age(&self, age: i32) -> RepoResult<Vec<Person>> {
        self.repo.find_by_age(age)
    }

    pub fn search_by_name_containing(&self, keyword: &str) -> RepoResult<Vec<Person>> {
        self.repo.search_name_containing(keyword)
    }

    pub fn search_by_email_containing(&self, keyword: &str) -> RepoResult<Vec<Person>> {
        self.repo.search_email_containing(keyword)
    }

    pub fn find_by_name_and_age(&self, name: &str, age: i32) -> RepoResult<Vec<Person>> {
        self.repo.find_by_name_and_age(name, age)
    }

    pub fn find_by_name_or_email(&self, name: &str, email: &str) -> RepoResult<Vec<Person>> {
        self.repo.find_by_name_or_email(name, email)
    }

    pub fn find_by_age_ordered_by_name(&self, age: i32) -> RepoResult<Vec<Person>> {
        self.repo.find_by_age_ordered_by_name(age)
    }

    pub fn find_by_name_ordered_by_age_desc(&self, name: &str) -> RepoResult<Vec<Person>> {
        self.repo.find_by_name_ordered_by_age_desc(name)
    }

    pub fn find_older_than(&self, age: i32) -> RepoResult<Vec<Person>> {
        self.repo.find_age_greater_than(age)
    }

    pub fn find_younger_than(&self, age: i32) -> RepoResult<Vec<Person>> {
        self.repo.find_age_less_than(age)
    }

    pub fn find_by_age_between(&self, start: i32, end: i32) -> RepoResult<Vec<Person>> {
        self.repo.find_age_between(start, end)
    }

    /// Inclusive age range, ascending by age.
    ///
    /// Rejects `start > end` instead of returning an empty list.
    pub fn find_in_age_range(&self, start: i32, end: i32) -> ServiceResult<Vec<Person>> {
        if start > end {
            return Err(PersonValidationError::InvalidAgeRange { start, end }.into());
        }
        Ok(self.repo.find_age_range(start, end)?)
    }

    pub fn email_exists(&self, email: &str) -> RepoResult<bool> {
        self.repo.email_exists(email)
    }

    pub fn exists_by_name_and_age(&self, name: &str, age: i32) -> RepoResult<bool> {
        self.repo.exists_by_name_and_age(name, age)
    }

    pub fn count_by_age(&self, age: i32) -> RepoResult<u64> {
        self.repo.count_by_age(age)
    }

    pub fn count_by_name_containing(&self, keyword: &str) -> RepoResult<u64> {
        self.repo.count_by_name_containing(keyword)
    }

    pub fn delete_by_email(&self, email: &str) -> RepoResult<usize> {
        self.repo.delete_by_email(email)
    }

    pub fn delete_by_name_and_age(&self, name: &str, age: i32) -> RepoResult<usize> {
        self.repo.delete_by_name_and_age(name, age)
    }

    pub fn search_by_keyword(&self, keyword: &str) -> RepoResult<Vec<Person>> {
        self.repo.search_keyword(keyword)
    }

    pub fn find_oldest(&self) -> RepoResult<Vec<Person>> {
        self.repo.find_oldest()
    }

    pub fn find_top3_oldest(&self) -> RepoResult<Vec<Person>> {
        self.repo.find_top_by_age_desc(TOP_OLDEST_LIMIT)
    }

    pub fn find_first5_by_name_containing(&self, keyword: &str) -> RepoResult<Vec<Person>> {
        self.repo
            .find_first_by_name_containing_ordered_by_age(keyword, FIRST_BY_NAME_LIMIT)
    }

    pub fn delete_all_persons(&self) -> RepoResult<usize> {
        let removed = self.repo.delete_all()?;
        info!("event=person_delete_all module=service status=ok count={removed}");
        Ok(removed)
    }

    // Order: field rules, then email collision, then id/email presence.
    fn check_creation(&self, draft: PersonDraft) -> ServiceResult<Person> {
        draft.validate_fields()?;
        if let Some(email) = draft.email.as_deref() {
            if self.repo.email_exists(email)? {
                warn!("event=person_create module=service status=conflict");
                return Err(ServiceError::Conflict {
                    email: email.to_string(),
                });
            }
        }
        if let Some(id) = draft.id {
            return Err(PersonValidationError::IdNotAllowed(id).into());
        }
        Ok(draft.into_person(None)?)
    }
}
