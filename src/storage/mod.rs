mod local_storage;
mod schema;
mod types;

pub use schema::Database;
pub use types::{keys, DatabaseError};
