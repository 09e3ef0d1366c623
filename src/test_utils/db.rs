use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use rusqlite::Connection;

use crate::{StatementStorage, db::initialize};

/// An in-memory database with all tables created.
pub(crate) fn get_test_connection() -> Connection {
    let connection = Connection::open_in_memory().unwrap();
    initialize(&connection).unwrap();
    connection
}

pub(crate) fn shared_connection(connection: Connection) -> Arc<Mutex<Connection>> {
    Arc::new(Mutex::new(connection))
}

/// Statement storage rooted at `dir`, usually a [tempfile::TempDir].
pub(crate) fn test_storage(dir: &Path) -> StatementStorage {
    StatementStorage::new(dir.join("statements"))
}
