//! Shared data models for the JobDesk backend.
//!
//! This crate provides Serde-serializable types for:
//! - Users, roles, and role-shaped profiles
//! - Job postings and their enumerated attributes
//! - Applications embedded in job documents

pub mod application;
pub mod job;
pub mod profile;
pub mod user;

// Re-export common types
pub use application::{Application, ApplicationId, ApplicationStatus};
pub use job::{dedup_skills, EmploymentType, ExperienceLevel, Job, JobId, JobSummary};
pub use profile::{CompanyProfile, Profile, ProfileError, StudentProfile};
pub use user::{normalize_email, PublicUser, Role, User, UserId, UserSummary};
