//! `tw-output` — SQLite persistence for the two collections the
//! simulation core itself doesn't own: `markers` and `simulation_results`.
//!
//! # What lives here
//!
//! | Module    | Contents                                          |
//! |-----------|-----------------------------------------------------|
//! | [`store`] | `SqliteStore` — schema setup, insert/list/clear      |
//! | [`row`]   | `StoredRecord` — the shared id/created_at/payload row |
//! | [`error`] | `OutputError`, `OutputResult<T>`                      |

pub mod error;
pub mod row;
pub mod store;

pub use error::{OutputError, OutputResult};
pub use row::StoredRecord;
pub use store::SqliteStore;
