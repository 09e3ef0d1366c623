//! Source editing page and endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use maud::html;
use rusqlite::Connection;

use crate::{
    AppState, Error, endpoints,
    html::{FORM_CONTAINER_STYLE, base},
    navigation::NavBar,
    source::{
        SourceFields, SourceId,
        create::{SourceFormTarget, source_form_view},
        domain::SourceFormData,
        get_source, update_source,
    },
};

/// The state needed for the edit source page and endpoint.
#[derive(Debug, Clone)]
pub struct EditSourceState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for EditSourceState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the source editing page.
pub async fn get_edit_source_page(
    Path(source_id): Path<SourceId>,
    State(state): State<EditSourceState>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let source = get_source(source_id, &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve source {source_id}: {error}"))?;

    let update_endpoint = endpoints::format_endpoint(endpoints::SOURCE, source_id);
    let content = html! {
        (NavBar::new(endpoints::SOURCES_VIEW).into_html())
        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold mb-4" { "Edit Source" }
            (source_form_view(SourceFormTarget::Update(update_endpoint), Some(&source)))
        }
    };

    Ok(base("Edit Source", &[], &content).into_response())
}

/// Handle source update form submission.
pub async fn update_source_endpoint(
    Path(source_id): Path<SourceId>,
    State(state): State<EditSourceState>,
    Form(form): Form<SourceFormData>,
) -> Response {
    let fields = match SourceFields::try_from(form) {
        Ok(fields) => fields,
        Err(error) => return error.into_alert_response(),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match update_source(source_id, fields, &connection) {
        Ok(()) => (
            HxRedirect(endpoints::SOURCES_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(Error::UpdateMissingSource) => Error::UpdateMissingSource.into_alert_response(),
        Err(error) => {
            tracing::error!("An unexpected error occurred while updating source {source_id}: {error}");
            error.into_alert_response()
        }
    }
}
