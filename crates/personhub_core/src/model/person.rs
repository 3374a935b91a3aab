//! Person domain model.
//!
//! # Responsibility
//! - Define the canonical person record and its inbound draft shape.
//! - Own field-level validation rules shared by API, service and repository.
//!
//! # Invariants
//! - `id` is assigned by the store on insert and never changes afterwards.
//! - `name` is non-blank and at most 255 characters.
//! - `email` matches [`is_valid_email`] and is unique across all rows.
//! - `age` is non-negative.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store-assigned row identifier.
pub type PersonId = i64;

/// Maximum name length, counted in characters.
pub const NAME_MAX_CHARS: usize = 255;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)*$",
    )
    .expect("valid email regex")
});

/// Field-level validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersonValidationError {
    BlankName,
    NameTooLong { chars: usize },
    MissingEmail,
    InvalidEmail(String),
    NegativeAge(i32),
    /// Creation requests must not carry a pre-assigned id.
    IdNotAllowed(PersonId),
    InvalidAgeRange { start: i32, end: i32 },
}

impl Display for PersonValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "name is required"),
            Self::NameTooLong { chars } => write!(
                f,
                "name must not exceed {NAME_MAX_CHARS} characters, got {chars}"
            ),
            Self::MissingEmail => write!(f, "email is required"),
            Self::InvalidEmail(_) => write!(f, "valid email is required"),
            Self::NegativeAge(age) => write!(f, "age must be non-negative, got {age}"),
            Self::IdNotAllowed(id) => write!(f, "id must not be set on create, got {id}"),
            Self::InvalidAgeRange { start, end } => {
                write!(f, "age range start {start} exceeds end {end}")
            }
        }
    }
}

impl Error for PersonValidationError {}

/// Canonical person row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    /// `None` until the store assigns it.
    pub id: Option<PersonId>,
    pub name: String,
    pub email: String,
    pub age: i32,
}

impl Person {
    /// Creates an unsaved person without an id.
    pub fn new(name: impl Into<String>, email: impl Into<String>, age: i32) -> Self {
        Self {
            id: None,
            name: name.into(),
            email: email.into(),
            age,
        }
    }

    /// Checks all field constraints mirrored by the `persons` table.
    pub fn validate(&self) -> Result<(), PersonValidationError> {
        validate_name(&self.name)?;
        validate_email(&self.email)?;
        validate_age(self.age)
    }
}

/// Unvalidated inbound person payload.
///
/// Every field may be missing on the wire; a missing `age` reads as `0`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonDraft {
    #[serde(default)]
    pub id: Option<PersonId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub age: i32,
}

impl PersonDraft {
    /// Applies field rules. An absent email passes; presence is a
    /// creation-time rule enforced by the service.
    pub fn validate_fields(&self) -> Result<(), PersonValidationError> {
        validate_name(self.name.as_deref().unwrap_or_default())?;
        if let Some(email) = self.email.as_deref() {
            validate_email(email)?;
        }
        validate_age(self.age)
    }

    /// Builds an unsaved person, falling back to `fallback_email` when the
    /// draft carries none.
    pub fn into_person(self, fallback_email: Option<&str>) -> Result<Person, PersonValidationError> {
        self.validate_fields()?;
        let email = match (self.email, fallback_email) {
            (Some(email), _) => email,
            (None, Some(fallback)) => fallback.to_string(),
            (None, None) => return Err(PersonValidationError::MissingEmail),
        };
        Ok(Person {
            id: self.id,
            name: self.name.unwrap_or_default(),
            email,
            age: self.age,
        })
    }
}

impl From<Person> for PersonDraft {
    fn from(value: Person) -> Self {
        Self {
            id: value.id,
            name: Some(value.name),
            email: Some(value.email),
            age: value.age,
        }
    }
}

/// Returns whether `email` has `local@domain` syntax.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

fn validate_name(name: &str) -> Result<(), PersonValidationError> {
    if name.trim().is_empty() {
        return Err(PersonValidationError::BlankName);
    }
    let chars = name.chars().count();
    if chars > NAME_MAX_CHARS {
        return Err(PersonValidationError::NameTooLong { chars });
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), PersonValidationError> {
    if email.is_empty() {
        return Err(PersonValidationError::MissingEmail);
    }
    if !is_valid_email(email) {
        return Err(PersonValidationError::InvalidEmail(email.to_string()));
    }
    Ok(())
}

fn validate_age(age: i32) -> Result<(), PersonValidationError> {
    if age < 0 {
        return Err(PersonValidationError::NegativeAge(age));
    }
    Ok(())
}
