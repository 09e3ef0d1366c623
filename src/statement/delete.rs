//! Statement deletion endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    alert::Alert,
    statement::{StatementId, StatementStorage, lifecycle::delete_statement_with_file},
};

/// The state needed for deleting a statement.
#[derive(Debug, Clone)]
pub struct DeleteStatementState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub statement_storage: StatementStorage,
}

impl FromRef<AppState> for DeleteStatementState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            statement_storage: state.statement_storage.clone(),
        }
    }
}

/// Handle statement deletion, removing the stored file as well.
pub async fn delete_statement_endpoint(
    Path(statement_id): Path<StatementId>,
    State(state): State<DeleteStatementState>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match delete_statement_with_file(statement_id, &state.statement_storage, &connection) {
        Ok(statement) => {
            tracing::info!(
                "deleted statement {statement_id} and its file {}",
                statement.filename
            );
            Alert::SuccessSimple {
                message: "Statement deleted successfully".to_owned(),
            }
            .into_response()
        }
        Err(error @ (Error::DeleteMissingStatement | Error::StatementInUse)) => {
            tracing::warn!("could not delete statement {statement_id}: {error}");
            error.into_alert_response()
        }
        Err(error) => {
            tracing::error!(
                "An unexpected error occurred while deleting statement {statement_id}: {error}"
            );
            error.into_alert_response()
        }
    }
}
