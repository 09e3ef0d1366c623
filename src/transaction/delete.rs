//! Transaction deletion endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    alert::Alert,
    transaction::core::{TransactionId, delete_transaction},
};

/// The state needed for deleting a transaction.
#[derive(Debug, Clone)]
pub struct DeleteTransactionState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeleteTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for deleting a transaction.
pub async fn delete_transaction_endpoint(
    Path(transaction_id): Path<TransactionId>,
    State(state): State<DeleteTransactionState>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match delete_transaction(transaction_id, &connection) {
        Ok(()) => {
            tracing::info!("deleted transaction {transaction_id}");
            Alert::SuccessSimple {
                message: "Transaction deleted successfully".to_owned(),
            }
            .into_response()
        }
        Err(Error::DeleteMissingTransaction) => {
            tracing::warn!("tried to delete missing transaction {transaction_id}");
            Error::DeleteMissingTransaction.into_alert_response()
        }
        Err(error) => {
            tracing::error!(
                "An unexpected error occurred while deleting transaction {transaction_id}: {error}"
            );
            error.into_alert_response()
        }
    }
}
