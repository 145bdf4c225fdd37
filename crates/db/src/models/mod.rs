//! Row structs and DTOs.
//!
//! Each submodule contains a `FromRow` + `Serialize` entity struct matching
//! the database row, plus the create/update DTOs its repository accepts.

pub mod file;
pub mod task;
pub mod voice_model;
