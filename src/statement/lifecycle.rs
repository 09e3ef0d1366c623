//! Keeps stored statement files in step with the statement rows.
//!
//! A file is written exactly once when its statement is created and removed
//! exactly when its statement is deleted.

use std::collections::HashSet;

use rusqlite::Connection;
use time::OffsetDateTime;

use crate::{
    Error,
    statement::{
        OrphanReport, Statement, StatementFields, StatementId, StatementStorage,
        db::{delete_statement, get_statement, get_statement_filenames, insert_statement},
        upload::{Upload, base_name, resolve_extension, unique_filename, validate_upload},
    },
};

/// Store an uploaded file and create its statement.
///
/// The file is written to the staging directory first, the row is inserted in
/// a SQL transaction, the file is moved into place and then the transaction
/// is committed. Nothing is kept if any step fails.
///
/// # Errors
/// - [Error::UnsupportedMediaType], [Error::FileTooLarge] or
///   [Error::InvalidFileExtension] if the upload is not acceptable, before
///   anything is written.
/// - [Error::InvalidSource] if the source does not exist.
/// - [Error::StorageError] if the file could not be written or moved.
pub fn store_upload(
    upload: &Upload,
    fields: &StatementFields,
    storage: &StatementStorage,
    connection: &Connection,
) -> Result<Statement, Error> {
    let mime = validate_upload(upload)?;

    storage.ensure_dir()?;

    let extension = resolve_extension(&mime, &upload.client_name, &upload.bytes)?;
    let filename = unique_filename(&base_name(&upload.client_name), &extension);

    let staged = storage.stage(&filename, &upload.bytes)?;
    let transaction = connection.unchecked_transaction()?;
    let statement = insert_statement(&filename, OffsetDateTime::now_utc(), fields, &transaction)?;
    // Dropping the SQL transaction on error rolls back the insert.
    staged.commit()?;

    if let Err(error) = transaction.commit() {
        tracing::error!("could not commit statement for {filename}, removing the file: {error}");
        if let Err(remove_error) = storage.remove(&filename) {
            tracing::error!("could not remove {filename}: {remove_error}");
        }
        return Err(error.into());
    }

    tracing::info!(
        "stored {} ({} bytes, {mime}) as {filename} for statement {}",
        upload.client_name,
        upload.bytes.len(),
        statement.id
    );

    Ok(statement)
}

/// Delete a statement and its stored file.
///
/// The row is deleted and committed before the file is removed. A file that
/// is already gone is not an error, and a file that cannot be removed is
/// logged and left for [scan_storage] to report.
///
/// # Errors
/// - [Error::DeleteMissingStatement] if the statement does not exist.
/// - [Error::StatementInUse] if transactions still belong to the statement.
pub fn delete_statement_with_file(
    statement_id: StatementId,
    storage: &StatementStorage,
    connection: &Connection,
) -> Result<Statement, Error> {
    let transaction = connection.unchecked_transaction()?;

    let statement = match get_statement(statement_id, &transaction) {
        Ok(statement) => statement,
        Err(Error::NotFound) => return Err(Error::DeleteMissingStatement),
        Err(error) => return Err(error),
    };

    delete_statement(statement_id, &transaction)?;
    transaction.commit()?;

    match storage.remove(&statement.filename) {
        Ok(true) => {}
        Ok(false) => tracing::warn!(
            "the file {} for statement {statement_id} was already gone",
            statement.filename
        ),
        Err(error) => tracing::warn!(
            "deleted statement {statement_id} but could not remove its file {}, \
            leaving it as an orphan: {error}",
            statement.filename
        ),
    }

    Ok(statement)
}

/// Tidy the storage directory on start up.
///
/// Unfinished uploads are removed and files without a statement are reported.
pub fn scan_storage(
    storage: &StatementStorage,
    connection: &Connection,
) -> Result<OrphanReport, Error> {
    let known_filenames: HashSet<String> = get_statement_filenames(connection)?;

    storage.scan(&known_filenames)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use rusqlite::Connection;
    use tempfile::tempdir;
    use time::OffsetDateTime;

    use crate::{
        Error,
        source::{SourceFields, SourceName, create_source},
        statement::{
            StatementFields, StatementFilter, count_statements, get_statement,
            lifecycle::{delete_statement_with_file, scan_storage, store_upload},
            upload::Upload,
        },
        test_utils::{get_test_connection, test_storage},
    };

    fn connection_with_source() -> (Connection, StatementFields) {
        let connection = get_test_connection();
        let source = create_source(
            SourceFields {
                name: SourceName::new_unchecked("ANZ"),
                description: None,
                ai_instruction: None,
            },
            &connection,
        )
        .unwrap();

        (
            connection,
            StatementFields {
                source_id: source.id,
                statement_date: None,
            },
        )
    }

    fn upload(name: &str, content_type: &str, bytes: &[u8]) -> Upload {
        Upload {
            client_name: name.to_owned(),
            content_type: Some(content_type.to_owned()),
            bytes: bytes.to_vec(),
        }
    }

    fn statement_count(connection: &Connection) -> u32 {
        count_statements(&StatementFilter::default(), connection).unwrap()
    }

    fn stored_files(dir: &std::path::Path) -> Vec<String> {
        let mut files = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap())
            .filter(|entry| entry.file_type().unwrap().is_file())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect::<Vec<_>>();
        files.sort();
        files
    }

    #[test]
    fn csv_upload_is_stored_with_suffix() {
        let temp_dir = tempdir().unwrap();
        let storage = test_storage(temp_dir.path());
        let (connection, fields) = connection_with_source();
        let before = OffsetDateTime::now_utc();

        let statement = store_upload(
            &upload("statement.csv", "text/csv", b"date,amount\n"),
            &fields,
            &storage,
            &connection,
        )
        .unwrap();

        let suffix = statement
            .filename
            .strip_prefix("statement-")
            .and_then(|rest| rest.strip_suffix(".csv"))
            .unwrap();
        assert_eq!(suffix.len(), 12);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(statement.uploaded_at >= before);
        assert!(statement.uploaded_at <= OffsetDateTime::now_utc());
        assert_eq!(
            fs::read(storage.path_for(&statement.filename)).unwrap(),
            b"date,amount\n"
        );
        assert_eq!(get_statement(statement.id, &connection), Ok(statement));
    }

    #[test]
    fn pdf_upload_gets_pdf_extension() {
        let temp_dir = tempdir().unwrap();
        let storage = test_storage(temp_dir.path());
        let (connection, fields) = connection_with_source();

        let statement = store_upload(
            &upload("Scan.PDF", "application/pdf", b"%PDF-1.7"),
            &fields,
            &storage,
            &connection,
        )
        .unwrap();

        assert!(statement.filename.starts_with("Scan-"));
        assert!(statement.filename.ends_with(".pdf"));
    }

    #[test]
    fn same_name_uploaded_twice_gets_two_files() {
        let temp_dir = tempdir().unwrap();
        let storage = test_storage(temp_dir.path());
        let (connection, fields) = connection_with_source();
        let file = upload("statement.csv", "text/csv", b"a,b");

        let first = store_upload(&file, &fields, &storage, &connection).unwrap();
        let second = store_upload(&file, &fields, &storage, &connection).unwrap();

        assert_ne!(first.filename, second.filename);
        assert_eq!(stored_files(storage.dir()).len(), 2);
    }

    #[test]
    fn zip_upload_is_rejected_without_side_effects() {
        let temp_dir = tempdir().unwrap();
        let storage = test_storage(temp_dir.path());
        let (connection, fields) = connection_with_source();

        let result = store_upload(
            &upload("statement.zip", "application/zip", b"PK\x03\x04"),
            &fields,
            &storage,
            &connection,
        );

        assert_eq!(
            result,
            Err(Error::UnsupportedMediaType("application/zip".to_owned()))
        );
        assert_eq!(statement_count(&connection), 0);
        assert!(!storage.dir().exists());
    }

    #[test]
    fn missing_source_leaves_no_file() {
        let temp_dir = tempdir().unwrap();
        let storage = test_storage(temp_dir.path());
        let (connection, _) = connection_with_source();
        let fields = StatementFields {
            source_id: 99,
            statement_date: None,
        };

        let result = store_upload(
            &upload("statement.csv", "text/csv", b"a,b"),
            &fields,
            &storage,
            &connection,
        );

        assert_eq!(result, Err(Error::InvalidSource(Some(99))));
        assert_eq!(statement_count(&connection), 0);
        assert!(stored_files(storage.dir()).is_empty());
        assert!(stored_files(&storage.dir().join(".staging")).is_empty());
    }

    #[test]
    fn delete_removes_row_and_file() {
        let temp_dir = tempdir().unwrap();
        let storage = test_storage(temp_dir.path());
        let (connection, fields) = connection_with_source();
        let statement = store_upload(
            &upload("x.csv", "text/csv", b"a,b"),
            &fields,
            &storage,
            &connection,
        )
        .unwrap();

        let deleted = delete_statement_with_file(statement.id, &storage, &connection).unwrap();

        assert_eq!(deleted.id, statement.id);
        assert!(!storage.path_for(&statement.filename).exists());
        assert_eq!(get_statement(statement.id, &connection), Err(Error::NotFound));
    }

    #[test]
    fn delete_with_file_already_gone_succeeds() {
        let temp_dir = tempdir().unwrap();
        let storage = test_storage(temp_dir.path());
        let (connection, fields) = connection_with_source();
        let statement = store_upload(
            &upload("x.csv", "text/csv", b"a,b"),
            &fields,
            &storage,
            &connection,
        )
        .unwrap();
        fs::remove_file(storage.path_for(&statement.filename)).unwrap();

        assert!(delete_statement_with_file(statement.id, &storage, &connection).is_ok());
        assert_eq!(statement_count(&connection), 0);
    }

    #[test]
    fn delete_keeps_going_when_file_cannot_be_removed() {
        let temp_dir = tempdir().unwrap();
        let storage = test_storage(temp_dir.path());
        let (connection, fields) = connection_with_source();
        let statement = store_upload(
            &upload("x.csv", "text/csv", b"a,b"),
            &fields,
            &storage,
            &connection,
        )
        .unwrap();
        let path = storage.path_for(&statement.filename);
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();
        fs::write(path.join("blocker"), "x").unwrap();

        let deleted = delete_statement_with_file(statement.id, &storage, &connection);

        assert_eq!(deleted.map(|deleted| deleted.id), Ok(statement.id));
        assert_eq!(get_statement(statement.id, &connection), Err(Error::NotFound));
        assert!(path.exists());
    }

    #[test]
    fn repeated_delete_reports_missing_statement() {
        let temp_dir = tempdir().unwrap();
        let storage = test_storage(temp_dir.path());
        let (connection, fields) = connection_with_source();
        let statement = store_upload(
            &upload("x.csv", "text/csv", b"a,b"),
            &fields,
            &storage,
            &connection,
        )
        .unwrap();
        delete_statement_with_file(statement.id, &storage, &connection).unwrap();

        assert_eq!(
            delete_statement_with_file(statement.id, &storage, &connection),
            Err(Error::DeleteMissingStatement)
        );
    }

    #[test]
    fn statement_with_transactions_keeps_its_file() {
        let temp_dir = tempdir().unwrap();
        let storage = test_storage(temp_dir.path());
        let (connection, fields) = connection_with_source();
        let statement = store_upload(
            &upload("x.csv", "text/csv", b"a,b"),
            &fields,
            &storage,
            &connection,
        )
        .unwrap();
        connection
            .execute(
                "INSERT INTO category (name, icon) VALUES ('Other Transactions', '📦')",
                (),
            )
            .unwrap();
        connection
            .execute(
                "INSERT INTO \"transaction\"
                (date, amount, currency, type, statement_id, category_id, source_id)
                VALUES ('2025-01-01', '1.00', 'NZD', 'debit', ?1, 1, ?2)",
                (statement.id, fields.source_id),
            )
            .unwrap();

        assert_eq!(
            delete_statement_with_file(statement.id, &storage, &connection),
            Err(Error::StatementInUse)
        );
        assert!(storage.path_for(&statement.filename).exists());
    }

    #[test]
    fn scan_reports_files_without_statements() {
        let temp_dir = tempdir().unwrap();
        let storage = test_storage(temp_dir.path());
        let (connection, fields) = connection_with_source();
        store_upload(
            &upload("kept.csv", "text/csv", b"a,b"),
            &fields,
            &storage,
            &connection,
        )
        .unwrap();
        fs::write(storage.path_for("stray-000000000000.csv"), "a,b").unwrap();

        let report = scan_storage(&storage, &connection).unwrap();

        assert_eq!(report.orphaned_files, ["stray-000000000000.csv"]);
    }
}
