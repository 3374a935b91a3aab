//! Core domain logic for PersonHub.
//! This crate is the single source of truth for person invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status, LoggingConfig};
pub use model::person::{
    is_valid_email, Person, PersonDraft, PersonId, PersonValidationError, NAME_MAX_CHARS,
};
pub use repo::person_repo::{PersonRepository, RepoError, RepoResult, SqlitePersonRepository};
pub use service::person_service::{
    PersonService, ServiceError, ServiceResult, FIRST_BY_NAME_LIMIT, TOP_OLDEST_LIMIT,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
