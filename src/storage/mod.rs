pub mod schema;
pub mod sqlite;

pub use sqlite::{HistoryRecord, NewHistoryRecord, Registration, Repository, StorageError};
