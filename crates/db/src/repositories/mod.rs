//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod file_repo;
pub mod model_repo;
pub mod task_repo;

pub use file_repo::FileRepo;
pub use model_repo::ModelRepo;
pub use task_repo::TaskRepo;
