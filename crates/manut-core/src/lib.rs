//! Manut Core — domain models, error types and repository traits for
//! the maintenance back-office authorization core.

pub mod error;
pub mod models;
pub mod repository;
