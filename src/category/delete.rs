//! Category deletion endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    alert::Alert,
    category::{CategoryId, delete_category},
};

/// The state needed for deleting a category.
#[derive(Debug, Clone)]
pub struct DeleteCategoryState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeleteCategoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Handle category deletion. Categories used by transactions are kept.
pub async fn delete_category_endpoint(
    Path(category_id): Path<CategoryId>,
    State(state): State<DeleteCategoryState>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match delete_category(category_id, &connection) {
        Ok(()) => Alert::SuccessSimple {
            message: "Category deleted successfully".to_owned(),
        }
        .into_response(),
        Err(error) => {
            tracing::warn!("could not delete category {category_id}: {error}");
            error.into_alert_response()
        }
    }
}
