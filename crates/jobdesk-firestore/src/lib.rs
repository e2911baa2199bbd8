//! Firestore persistence layer for the JobDesk backend.
//!
//! A REST-based Firestore client plus typed repositories for user accounts
//! and job postings. Uniqueness and concurrent-update safety are pushed down
//! to the store via write preconditions rather than application-level locks.

pub mod client;
pub mod error;
pub mod jobs_repo;
pub mod metrics;
pub mod retry;
pub mod token_cache;
pub mod types;
pub mod users_repo;

pub use client::{FirestoreClient, FirestoreConfig};
pub use error::{FirestoreError, FirestoreResult};
pub use jobs_repo::{ApplyOutcome, JobFilters, JobPatch, JobsRepo, StatusOutcome};
pub use retry::RetryConfig;
pub use users_repo::{CreateUserOutcome, UsersRepo};
