//! Download of the stored statement file.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Path, State},
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    statement::{StatementId, StatementStorage, db::get_statement, upload::PDF_MIME_TYPE},
};

/// The state needed for downloading a statement file.
#[derive(Debug, Clone)]
pub struct StatementFileState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub statement_storage: StatementStorage,
}

impl FromRef<AppState> for StatementFileState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            statement_storage: state.statement_storage.clone(),
        }
    }
}

/// Send the stored file of a statement as an attachment.
///
/// Responds with the 404 page if the statement or its file does not exist.
pub async fn get_statement_file(
    Path(statement_id): Path<StatementId>,
    State(state): State<StatementFileState>,
) -> Result<Response, Error> {
    let filename = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        get_statement(statement_id, &connection)?.filename
    };

    let path = state.statement_storage.path_for(&filename);
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(
                "the file {} for statement {statement_id} is missing",
                path.display()
            );
            return Err(Error::NotFound);
        }
        Err(error) => return Err(error.into()),
    };

    let content_type = if filename.ends_with(".pdf") {
        PDF_MIME_TYPE
    } else {
        "text/csv"
    };

    Ok((
        [
            (CONTENT_TYPE, content_type.to_owned()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename.replace('"', "")),
            ),
        ],
        bytes,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use axum::{
        extract::{Path, State},
        http::StatusCode,
        response::IntoResponse,
    };
    use tempfile::tempdir;
    use time::OffsetDateTime;

    use crate::{
        source::{SourceFields, SourceName, create_source},
        statement::{StatementFields, db::insert_statement},
        test_utils::{assert_content_type, get_header, get_test_connection, shared_connection, test_storage},
    };

    use super::{StatementFileState, get_statement_file};

    fn get_state(dir: &std::path::Path, filename: &str) -> StatementFileState {
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
        insert_statement(
            filename,
            OffsetDateTime::now_utc(),
            &StatementFields {
                source_id: source.id,
                statement_date: None,
            },
            &connection,
        )
        .unwrap();

        StatementFileState {
            db_connection: shared_connection(connection),
            statement_storage: test_storage(dir),
        }
    }

    #[tokio::test]
    async fn sends_file_as_attachment() {
        let temp_dir = tempdir().unwrap();
        let state = get_state(temp_dir.path(), "march-0123456789ab.pdf");
        state.statement_storage.ensure_dir().unwrap();
        fs::write(
            state.statement_storage.path_for("march-0123456789ab.pdf"),
            b"%PDF-1.7",
        )
        .unwrap();

        let response = get_statement_file(Path(1), State(state))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert_content_type(&response, "application/pdf");
        assert_eq!(
            get_header(&response, "content-disposition"),
            "attachment; filename=\"march-0123456789ab.pdf\""
        );
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"%PDF-1.7");
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let temp_dir = tempdir().unwrap();
        let state = get_state(temp_dir.path(), "gone-0123456789ab.csv");

        let response = get_statement_file(Path(1), State(state))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn missing_statement_is_not_found() {
        let temp_dir = tempdir().unwrap();
        let state = get_state(temp_dir.path(), "a-0123456789ab.csv");

        let response = get_statement_file(Path(2), State(state))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
