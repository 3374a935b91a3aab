//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the enumerated person query contract.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository writes enforce `Person::validate()` before persistence.
//! - Email uniqueness is enforced by the store and surfaced as
//!   `RepoError::DuplicateEmail`.

pub mod person_repo;
