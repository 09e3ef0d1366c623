//! Database schema set up.

use rusqlite::Connection;

use crate::{
    Error, category::create_category_table, source::create_source_table,
    statement::create_statement_table, transaction::create_transaction_table,
    user::create_user_table,
};

/// Create the application tables if they do not already exist and turn on
/// foreign key enforcement for `connection`.
///
/// The tables are created in a single SQL transaction, so either all tables
/// are created or none are.
///
/// # Errors
/// Returns an [Error::SqlError] if any of the tables could not be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    // Must be set outside of a transaction, SQLite ignores it otherwise.
    connection.execute_batch("PRAGMA foreign_keys = ON;")?;

    let transaction = connection.unchecked_transaction()?;

    create_user_table(&transaction)?;
    create_category_table(&transaction)?;
    create_source_table(&transaction)?;
    create_statement_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_cache_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

/// Whether `error` was caused by a `FOREIGN KEY` constraint, e.g. deleting a
/// row that other rows still reference or inserting a dangling reference.
///
/// SQLite reports `ON DELETE RESTRICT` refusals as trigger constraint
/// failures, so those are matched by their message.
pub fn is_foreign_key_violation(error: &rusqlite::Error) -> bool {
    match error {
        rusqlite::Error::SqliteFailure(failure, message) => match failure.extended_code {
            rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => true,
            rusqlite::ffi::SQLITE_CONSTRAINT_TRIGGER => message
                .as_deref()
                .is_some_and(|message| message.contains("FOREIGN KEY constraint failed")),
            _ => false,
        },
        _ => false,
    }
}

/// Whether `error` was caused by a `UNIQUE` constraint.
pub fn is_unique_violation(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// Generic key/value table for cached items.
fn create_cache_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS cache_items (
            item_id BLOB PRIMARY KEY,
            item_data BLOB NOT NULL,
            item_lifetime INTEGER,
            item_time INTEGER NOT NULL
        )",
        (),
    )?;

    Ok(())
}
