//! Database operations for statements.

use std::collections::HashSet;

use rusqlite::{Connection, Row, params};
use time::OffsetDateTime;

use crate::{
    Error,
    db::is_foreign_key_violation,
    pagination::Page,
    statement::{Statement, StatementFields, StatementFilter, StatementId, StatementWithSource},
};

/// Initialize the statement table.
pub fn create_statement_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS statement (
            id INTEGER PRIMARY KEY,
            filename TEXT NOT NULL UNIQUE,
            uploaded_at TEXT NOT NULL,
            processed_at TEXT,
            statement_date TEXT,
            source_id INTEGER NOT NULL,
            FOREIGN KEY(source_id) REFERENCES source(id) ON UPDATE CASCADE ON DELETE RESTRICT
        );

        CREATE INDEX IF NOT EXISTS idx_statement_source_id ON statement(source_id);",
    )?;

    Ok(())
}

fn source_error(source_id: i64) -> impl FnOnce(rusqlite::Error) -> Error {
    move |error| {
        if is_foreign_key_violation(&error) {
            Error::InvalidSource(Some(source_id))
        } else {
            error.into()
        }
    }
}

/// Insert a statement for the stored file `filename`.
///
/// # Errors
/// Returns [Error::InvalidSource] if the source does not exist.
pub fn insert_statement(
    filename: &str,
    uploaded_at: OffsetDateTime,
    fields: &StatementFields,
    connection: &Connection,
) -> Result<Statement, Error> {
    connection
        .execute(
            "INSERT INTO statement (filename, uploaded_at, statement_date, source_id)
            VALUES (?1, ?2, ?3, ?4)",
            params![
                filename,
                uploaded_at,
                fields.statement_date,
                fields.source_id
            ],
        )
        .map_err(source_error(fields.source_id))?;

    Ok(Statement {
        id: connection.last_insert_rowid(),
        filename: filename.to_owned(),
        uploaded_at,
        processed_at: None,
        statement_date: fields.statement_date,
        source_id: fields.source_id,
    })
}

/// Retrieve a single statement by ID.
pub fn get_statement(
    statement_id: StatementId,
    connection: &Connection,
) -> Result<Statement, Error> {
    connection
        .prepare(
            "SELECT id, filename, uploaded_at, processed_at, statement_date, source_id
            FROM statement WHERE id = :id",
        )?
        .query_row(&[(":id", &statement_id)], map_row)
        .map_err(|error| error.into())
}

/// Update the source and statement date of a statement.
///
/// The stored file is never changed. The upload time is only set if it is
/// somehow missing.
///
/// # Errors
/// Returns [Error::UpdateMissingStatement] if the statement does not exist
/// and [Error::InvalidSource] if the source does not exist.
pub fn update_statement(
    statement_id: StatementId,
    fields: &StatementFields,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection
        .execute(
            "UPDATE statement
            SET source_id = ?1, statement_date = ?2, uploaded_at = COALESCE(uploaded_at, ?3)
            WHERE id = ?4",
            params![
                fields.source_id,
                fields.statement_date,
                OffsetDateTime::now_utc(),
                statement_id
            ],
        )
        .map_err(source_error(fields.source_id))?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingStatement);
    }

    Ok(())
}

/// Delete a statement row. The stored file is left alone.
///
/// # Errors
/// Returns [Error::StatementInUse] if transactions still belong to the
/// statement and [Error::DeleteMissingStatement] if it does not exist.
pub fn delete_statement(statement_id: StatementId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection
        .execute("DELETE FROM statement WHERE id = ?1", [statement_id])
        .map_err(|error| {
            if is_foreign_key_violation(&error) {
                Error::StatementInUse
            } else {
                error.into()
            }
        })?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingStatement);
    }

    Ok(())
}

const FILTER_CLAUSE: &str = "(?1 IS NULL OR statement.id = ?1)
    AND (?2 IS NULL OR statement.source_id = ?2)
    AND (?3 IS NULL OR date(statement.processed_at) >= ?3)
    AND (?4 IS NULL OR date(statement.processed_at) <= ?4)
    AND (?5 IS NULL OR statement.statement_date >= ?5)
    AND (?6 IS NULL OR statement.statement_date <= ?6)";

/// Retrieve one page of statements matching `filter`, newest first.
pub fn search_statements(
    filter: &StatementFilter,
    page: Page,
    connection: &Connection,
) -> Result<Vec<StatementWithSource>, Error> {
    let query = format!(
        "SELECT statement.id, filename, uploaded_at, processed_at, statement_date, source_id,
            source.name
        FROM statement INNER JOIN source ON source.id = statement.source_id
        WHERE {FILTER_CLAUSE}
        ORDER BY statement.id DESC
        LIMIT ?7 OFFSET ?8"
    );

    connection
        .prepare(&query)?
        .query_map(
            params![
                filter.id,
                filter.source_id,
                filter.processed_from,
                filter.processed_to,
                filter.statement_date_from,
                filter.statement_date_to,
                page.limit(),
                page.offset()
            ],
            map_row_with_source,
        )?
        .map(|maybe_statement| maybe_statement.map_err(|error| error.into()))
        .collect()
}

/// Count the statements matching `filter`.
pub fn count_statements(
    filter: &StatementFilter,
    connection: &Connection,
) -> Result<u32, Error> {
    connection
        .query_row(
            &format!("SELECT COUNT(*) FROM statement WHERE {FILTER_CLAUSE}"),
            params![
                filter.id,
                filter.source_id,
                filter.processed_from,
                filter.processed_to,
                filter.statement_date_from,
                filter.statement_date_to
            ],
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Count the statements whose transactions have not been extracted yet.
pub fn count_unprocessed_statements(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row(
            "SELECT COUNT(*) FROM statement WHERE processed_at IS NULL",
            [],
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Retrieve all statements with their source names, newest first, e.g. for
/// select inputs.
pub fn get_all_statements(connection: &Connection) -> Result<Vec<StatementWithSource>, Error> {
    connection
        .prepare(
            "SELECT statement.id, filename, uploaded_at, processed_at, statement_date, source_id,
                source.name
            FROM statement INNER JOIN source ON source.id = statement.source_id
            ORDER BY statement.id DESC",
        )?
        .query_map([], map_row_with_source)?
        .map(|maybe_statement| maybe_statement.map_err(|error| error.into()))
        .collect()
}

/// The names of all files that statements refer to.
pub fn get_statement_filenames(connection: &Connection) -> Result<HashSet<String>, Error> {
    connection
        .prepare("SELECT filename FROM statement")?
        .query_map([], |row| row.get(0))?
        .map(|maybe_filename| maybe_filename.map_err(|error| error.into()))
        .collect()
}

fn map_row(row: &Row) -> Result<Statement, rusqlite::Error> {
    Ok(Statement {
        id: row.get(0)?,
        filename: row.get(1)?,
        uploaded_at: row.get(2)?,
        processed_at: row.get(3)?,
        statement_date: row.get(4)?,
        source_id: row.get(5)?,
    })
}

fn map_row_with_source(row: &Row) -> Result<StatementWithSource, rusqlite::Error> {
    Ok(StatementWithSource {
        statement: map_row(row)?,
        source_name: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use time::{
        OffsetDateTime,
        macros::{date, datetime},
    };

    use crate::{
        Error,
        pagination::Page,
        source::{SourceFields, SourceName, create_source},
        statement::{StatementFields, StatementFilter},
        test_utils::get_test_connection,
    };

    use super::{
        count_statements, count_unprocessed_statements, delete_statement, get_all_statements,
        get_statement, get_statement_filenames, insert_statement, search_statements,
        update_statement,
    };

    fn insert_source(name: &str, connection: &Connection) -> i64 {
        create_source(
            SourceFields {
                name: SourceName::new_unchecked(name),
                description: None,
                ai_instruction: None,
            },
            connection,
        )
        .unwrap()
        .id
    }

    fn fields(source_id: i64, statement_date: Option<time::Date>) -> StatementFields {
        StatementFields {
            source_id,
            statement_date,
        }
    }

    fn all_pages() -> Page {
        Page {
            number: 1,
            size: 100,
        }
    }

    #[test]
    fn insert_and_get_statement() {
        let connection = get_test_connection();
        let source_id = insert_source("ANZ", &connection);
        let uploaded_at = datetime!(2025-03-01 09:30 UTC);

        let inserted = insert_statement(
            "march-0123456789ab.csv",
            uploaded_at,
            &fields(source_id, Some(date!(2025 - 02 - 28))),
            &connection,
        )
        .unwrap();

        let got = get_statement(inserted.id, &connection).unwrap();
        assert_eq!(got, inserted);
        assert_eq!(got.processed_at, None);
    }

    #[test]
    fn insert_with_missing_source_fails() {
        let connection = get_test_connection();

        let result = insert_statement(
            "a-0123456789ab.csv",
            OffsetDateTime::now_utc(),
            &fields(42, None),
            &connection,
        );

        assert_eq!(result, Err(Error::InvalidSource(Some(42))));
    }

    #[test]
    fn update_changes_source_and_date_only() {
        let connection = get_test_connection();
        let anz = insert_source("ANZ", &connection);
        let asb = insert_source("ASB", &connection);
        let uploaded_at = datetime!(2025-03-01 09:30 UTC);
        let statement =
            insert_statement("a-0123456789ab.csv", uploaded_at, &fields(anz, None), &connection)
                .unwrap();

        update_statement(
            statement.id,
            &fields(asb, Some(date!(2025 - 03 - 31))),
            &connection,
        )
        .unwrap();

        let got = get_statement(statement.id, &connection).unwrap();
        assert_eq!(got.source_id, asb);
        assert_eq!(got.statement_date, Some(date!(2025 - 03 - 31)));
        assert_eq!(got.filename, "a-0123456789ab.csv");
        assert_eq!(got.uploaded_at, uploaded_at);
    }

    #[test]
    fn update_missing_statement_fails() {
        let connection = get_test_connection();
        let source_id = insert_source("ANZ", &connection);

        assert_eq!(
            update_statement(9, &fields(source_id, None), &connection),
            Err(Error::UpdateMissingStatement)
        );
    }

    #[test]
    fn delete_missing_statement_fails() {
        let connection = get_test_connection();

        assert_eq!(
            delete_statement(9, &connection),
            Err(Error::DeleteMissingStatement)
        );
    }

    #[test]
    fn search_filters_and_orders_newest_first() {
        let connection = get_test_connection();
        let anz = insert_source("ANZ", &connection);
        let asb = insert_source("ASB", &connection);
        let now = OffsetDateTime::now_utc();
        let first = insert_statement(
            "a-000000000001.csv",
            now,
            &fields(anz, Some(date!(2025 - 01 - 31))),
            &connection,
        )
        .unwrap();
        insert_statement(
            "b-000000000002.csv",
            now,
            &fields(asb, Some(date!(2025 - 02 - 28))),
            &connection,
        )
        .unwrap();
        let third = insert_statement(
            "c-000000000003.csv",
            now,
            &fields(anz, Some(date!(2025 - 03 - 31))),
            &connection,
        )
        .unwrap();

        let filter = StatementFilter {
            source_id: Some(anz),
            ..Default::default()
        };
        let got = search_statements(&filter, all_pages(), &connection).unwrap();

        let ids = got.iter().map(|row| row.statement.id).collect::<Vec<_>>();
        assert_eq!(ids, [third.id, first.id]);
        assert_eq!(got[0].source_name, "ANZ");
        assert_eq!(count_statements(&filter, &connection), Ok(2));

        let filter = StatementFilter {
            statement_date_from: Some(date!(2025 - 02 - 01)),
            statement_date_to: Some(date!(2025 - 02 - 28)),
            ..Default::default()
        };
        let got = search_statements(&filter, all_pages(), &connection).unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].source_name, "ASB");
    }

    #[test]
    fn processed_filter_and_unprocessed_count() {
        let connection = get_test_connection();
        let source_id = insert_source("ANZ", &connection);
        let now = OffsetDateTime::now_utc();
        let processed =
            insert_statement("a-000000000001.csv", now, &fields(source_id, None), &connection)
                .unwrap();
        insert_statement("b-000000000002.csv", now, &fields(source_id, None), &connection)
            .unwrap();
        connection
            .execute(
                "UPDATE statement SET processed_at = ?1 WHERE id = ?2",
                (datetime!(2025-04-10 12:00 UTC), processed.id),
            )
            .unwrap();

        let filter = StatementFilter {
            processed_from: Some(date!(2025 - 04 - 10)),
            processed_to: Some(date!(2025 - 04 - 10)),
            ..Default::default()
        };

        let got = search_statements(&filter, all_pages(), &connection).unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].statement.id, processed.id);
        assert_eq!(count_unprocessed_statements(&connection), Ok(1));
    }

    #[test]
    fn all_statements_and_filenames() {
        let connection = get_test_connection();
        let source_id = insert_source("ANZ", &connection);
        let now = OffsetDateTime::now_utc();
        insert_statement("a-000000000001.csv", now, &fields(source_id, None), &connection)
            .unwrap();
        insert_statement("b-000000000002.pdf", now, &fields(source_id, None), &connection)
            .unwrap();

        let all = get_all_statements(&connection).unwrap();
        let filenames = get_statement_filenames(&connection).unwrap();

        assert_eq!(all.len(), 2);
        assert_eq!(all[0].label(), "#2 b-000000000002.pdf (ANZ)");
        assert!(filenames.contains("a-000000000001.csv"));
        assert!(filenames.contains("b-000000000002.pdf"));
    }
}
