//! HTTP handlers, one module per resource.

pub mod chat;
pub mod session;
pub mod students;
pub mod submissions;
pub mod teacher;
