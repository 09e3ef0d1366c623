//! Source creation page and endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error, endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, FORM_TEXT_INPUT_STYLE, base, form_field,
    },
    navigation::NavBar,
    source::{Source, SourceFields, create_source, domain::SourceFormData},
};

/// The state needed for creating a source.
#[derive(Debug, Clone)]
pub struct CreateSourceState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateSourceState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the source creation page.
pub async fn get_new_source_page() -> Response {
    let content = html! {
        (NavBar::new(endpoints::SOURCES_VIEW).into_html())
        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold mb-4" { "New Source" }
            (source_form_view(SourceFormTarget::Create, None))
        }
    };

    base("New Source", &[], &content).into_response()
}

/// Handle source creation form submission.
pub async fn create_source_endpoint(
    State(state): State<CreateSourceState>,
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

    match create_source(fields, &connection) {
        Ok(source) => {
            tracing::info!("created source {} \"{}\"", source.id, source.name);
            (
                HxRedirect(endpoints::SOURCES_VIEW.to_owned()),
                StatusCode::SEE_OTHER,
            )
                .into_response()
        }
        Err(error) => {
            tracing::error!("An unexpected error occurred while creating a source: {error}");
            error.into_alert_response()
        }
    }
}

/// Where the source form is submitted to.
pub(super) enum SourceFormTarget {
    Create,
    Update(String),
}

/// The form shared by the create and edit pages, pre-filled from `source`.
pub(super) fn source_form_view(target: SourceFormTarget, source: Option<&Source>) -> Markup {
    let name = source.map(|source| source.name.as_ref()).unwrap_or_default();
    let description = source
        .and_then(|source| source.description.as_deref())
        .unwrap_or_default();
    let ai_instruction = source
        .and_then(|source| source.ai_instruction.as_deref())
        .unwrap_or_default();
    let (hx_post, hx_put, submit_label) = match &target {
        SourceFormTarget::Create => (Some(endpoints::POST_SOURCE), None, "Create Source"),
        SourceFormTarget::Update(endpoint) => (None, Some(endpoint.as_str()), "Save Source"),
    };

    html! {
        form
            hx-post=[hx_post]
            hx-put=[hx_put]
            hx-target-error="#alert-container"
            class="w-full space-y-4 md:space-y-6"
        {
            (form_field("name", "Name", html! {
                input
                    id="name"
                    type="text"
                    name="name"
                    value=(name)
                    placeholder="e.g. ANZ Visa"
                    required
                    autofocus
                    class=(FORM_TEXT_INPUT_STYLE);
            }, None))

            (form_field("description", "Description", html! {
                textarea
                    id="description"
                    name="description"
                    rows="2"
                    class=(FORM_TEXT_INPUT_STYLE)
                { (description) }
            }, None))

            (form_field("ai_instruction", "AI Instruction", html! {
                textarea
                    id="ai_instruction"
                    name="ai_instruction"
                    rows="4"
                    class=(FORM_TEXT_INPUT_STYLE)
                { (ai_instruction) }
            }, Some("Notes on how statements from this source should be read.")))

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { (submit_label) }
        }
    }
}
