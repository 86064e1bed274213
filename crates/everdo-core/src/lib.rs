//! Core model and boundary contracts for EverDo: task records, field
//! validation, and the traits the remote collaborators implement.
//! This crate is intentionally small to keep dependency surface minimal.

pub mod auth;
pub mod store;
pub mod task;
pub mod upload;
