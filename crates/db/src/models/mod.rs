//! Row structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - Create DTOs consumed by the matching repository

pub mod chat;
pub mod session;
pub mod student;
pub mod submission;
