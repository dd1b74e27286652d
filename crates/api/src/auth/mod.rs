//! Authentication primitives.
//!
//! - [`password`] -- Argon2id password hashing and verification.
//! - [`cookies`] -- signed identity cookies (session, role, student).

pub mod cookies;
pub mod password;
