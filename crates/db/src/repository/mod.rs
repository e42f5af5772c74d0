//! Repository functions — one function per database operation.
//!
//! Every function takes a `&DbPool` and returns a `Result<T, DbError>`.
//! No business logic, no domain types — pure SQL.

pub mod articles;
pub mod categories;
pub mod settings;
pub mod platforms;
pub mod rules;
pub mod schedule;
pub mod queue;
pub mod posts;
pub mod tracking;
