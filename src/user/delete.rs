//! User deletion endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    alert::Alert,
    user::{UserId, db::delete_user},
};

/// The state needed for deleting a user.
#[derive(Debug, Clone)]
pub struct DeleteUserState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeleteUserState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Handle user deletion.
pub async fn delete_user_endpoint(
    Path(user_id): Path<UserId>,
    State(state): State<DeleteUserState>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match delete_user(user_id, &connection) {
        Ok(()) => {
            tracing::info!("deleted user {user_id}");
            Alert::SuccessSimple {
                message: "User deleted successfully".to_owned(),
            }
            .into_response()
        }
        Err(Error::DeleteMissingUser) => {
            tracing::warn!("tried to delete missing user {user_id}");
            Error::DeleteMissingUser.into_alert_response()
        }
        Err(error) => {
            tracing::error!("An unexpected error occurred while deleting user {user_id}: {error}");
            error.into_alert_response()
        }
    }
}
