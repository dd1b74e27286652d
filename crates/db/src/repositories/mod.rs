//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod chat_repo;
pub mod session_repo;
pub mod student_repo;
pub mod submission_repo;

pub use chat_repo::{ChatRepo, ThreadInsert};
pub use session_repo::SessionRepo;
pub use student_repo::StudentRepo;
pub use submission_repo::{ChainInsert, SubmissionRepo};
