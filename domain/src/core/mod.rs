//! Core domain concepts shared across all subdomains.
//!
//! - [`task::Task`]: a validated, non-empty task to solve
//! - [`error::DomainError`]: domain-level errors

pub mod error;
pub mod task;
