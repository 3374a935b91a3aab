//! Domain model for person records.
//!
//! # Invariants
//! - Every persisted person is identified by a store-assigned `PersonId`.
//! - Deletion is a hard delete; ids are never reused.

pub mod person;
