/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Owning user of tasks, files and uploads (the JWT `sub` claim).
pub type UserId = DbId;
