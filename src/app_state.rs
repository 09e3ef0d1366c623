//! Implements a struct that holds the state of the REST server.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::{
    Error, db::initialize, pagination::PaginationConfig, statement::StatementStorage,
    timezone::get_local_offset,
};

/// The state of the REST server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,

    /// The config that controls how to display pages of data.
    pub pagination_config: PaginationConfig,

    /// Where uploaded statement files are kept.
    pub statement_storage: StatementStorage,

    /// The database connection
    pub db_connection: Arc<Mutex<Connection>>,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the domain models.
    /// `local_timezone` should be a valid, canonical timezone name, e.g. "Pacific/Auckland".
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized or if
    /// `local_timezone` is not a known timezone.
    pub fn new(
        db_connection: Connection,
        local_timezone: &str,
        pagination_config: PaginationConfig,
        statement_storage: StatementStorage,
    ) -> Result<Self, Error> {
        if get_local_offset(local_timezone).is_none() {
            return Err(Error::InvalidTimezoneError(local_timezone.to_owned()));
        }

        initialize(&db_connection)?;

        Ok(Self {
            local_timezone: local_timezone.to_owned(),
            pagination_config,
            statement_storage,
            db_connection: Arc::new(Mutex::new(db_connection)),
        })
    }
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use crate::{AppState, Error, PaginationConfig, StatementStorage};

    #[test]
    fn new_fails_on_unknown_timezone() {
        let connection = Connection::open_in_memory().unwrap();

        let result = AppState::new(
            connection,
            "Middle/Earth",
            PaginationConfig::default(),
            StatementStorage::new("statements"),
        );

        assert_eq!(
            result.map(|_| ()),
            Err(Error::InvalidTimezoneError("Middle/Earth".to_owned()))
        );
    }

    #[test]
    fn new_initializes_database() {
        let connection = Connection::open_in_memory().unwrap();

        let state = AppState::new(
            connection,
            "Etc/UTC",
            PaginationConfig::default(),
            StatementStorage::new("statements"),
        )
        .expect("Could not create app state");

        let connection = state.db_connection.lock().unwrap();
        let table_count: u32 = connection
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'statement'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(table_count, 1);
    }
}
