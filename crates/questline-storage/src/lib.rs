// Postgres storage layer with sqlx.
//
// Enrollment rows are the only contended resource in the system: the
// progression engine and the notification scheduler both write to them
// concurrently. Every flag write here is a single-column conditional
// UPDATE, and mini-game completion is one transaction, so neither writer
// can clobber the other's columns.

pub mod models;
pub mod repositories;

pub use models::*;
pub use repositories::Database;
