//! Domain rules for the classroom image studio.
//!
//! Everything in this crate is pure: no I/O, no database, no HTTP. The `db`
//! and `api` crates call into these functions to enforce limits and validate
//! input before touching storage.

pub mod classroom;
pub mod chat;
pub mod credentials;
pub mod error;
pub mod lineage;
pub mod roles;
pub mod types;
