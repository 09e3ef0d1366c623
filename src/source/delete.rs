//! Source deletion endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    alert::Alert,
    source::{SourceId, db::delete_source},
};

/// The state needed for deleting a source.
#[derive(Debug, Clone)]
pub struct DeleteSourceState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeleteSourceState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Handle source deletion. Sources that still have statements are kept.
pub async fn delete_source_endpoint(
    Path(source_id): Path<SourceId>,
    State(state): State<DeleteSourceState>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match delete_source(source_id, &connection) {
        Ok(()) => Alert::SuccessSimple {
            message: "Source deleted successfully".to_owned(),
        }
        .into_response(),
        Err(error @ (Error::DeleteMissingSource | Error::SourceInUse)) => {
            tracing::warn!("could not delete source {source_id}: {error}");
            error.into_alert_response()
        }
        Err(error) => {
            tracing::error!("An unexpected error occurred while deleting source {source_id}: {error}");
            error.into_alert_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        extract::{Path, State},
        http::StatusCode,
    };

    use crate::{
        source::{SourceFields, SourceName, create_source, get_source},
        test_utils::{assert_valid_html, get_test_connection, parse_html_fragment, shared_connection},
    };

    use super::{DeleteSourceState, delete_source_endpoint};

    fn get_state() -> DeleteSourceState {
        let connection = get_test_connection();
        create_source(
            SourceFields {
                name: SourceName::new_unchecked("ANZ"),
                description: None,
                ai_instruction: None,
            },
            &connection,
        )
        .unwrap();

        DeleteSourceState {
            db_connection: shared_connection(connection),
        }
    }

    #[tokio::test]
    async fn deletes_source() {
        let state = get_state();

        let response = delete_source_endpoint(Path(1), State(state.clone())).await;

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_fragment(response).await;
        assert_valid_html(&html);
        assert!(get_source(1, &state.db_connection.lock().unwrap()).is_err());
    }

    #[tokio::test]
    async fn source_in_use_is_kept() {
        let state = get_state();
        state
            .db_connection
            .lock()
            .unwrap()
            .execute(
                "INSERT INTO statement (source_id, filename, uploaded_at) VALUES (1, 'a.pdf', ?1)",
                [time::OffsetDateTime::now_utc()],
            )
            .unwrap();

        let response = delete_source_endpoint(Path(1), State(state.clone())).await;

        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert!(get_source(1, &state.db_connection.lock().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn deleting_missing_source_returns_not_found() {
        let state = get_state();

        let response = delete_source_endpoint(Path(2), State(state)).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
