//! Statement editing page and endpoint.
//!
//! Only the source and statement date can be changed. The stored file and
//! its upload time stay as they were.

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
    html::{
        BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, FORM_TEXT_INPUT_STYLE, LINK_STYLE, base,
        form_field,
    },
    navigation::NavBar,
    source::get_all_sources,
    statement::{
        StatementFields, StatementId,
        create::source_select,
        db::{get_statement, update_statement},
        domain::StatementFormData,
    },
    timezone::{format_local_date_time, get_local_offset},
};

/// The state needed for the edit statement page and endpoint.
#[derive(Debug, Clone)]
pub struct EditStatementState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub local_timezone: String,
}

impl FromRef<AppState> for EditStatementState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Render the statement editing page.
pub async fn get_edit_statement_page(
    Path(statement_id): Path<StatementId>,
    State(state): State<EditStatementState>,
) -> Result<Response, Error> {
    let local_offset = get_local_offset(&state.local_timezone)
        .ok_or_else(|| Error::InvalidTimezoneError(state.local_timezone.clone()))?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let statement = get_statement(statement_id, &connection).inspect_err(|error| {
        tracing::error!("Failed to retrieve statement {statement_id}: {error}")
    })?;
    let sources = get_all_sources(&connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve sources: {error}"))?;

    let update_endpoint = endpoints::format_endpoint(endpoints::STATEMENT, statement_id);
    let file_url = endpoints::format_endpoint(endpoints::STATEMENT_FILE, statement_id);
    let statement_date = statement
        .statement_date
        .map(|date| date.to_string())
        .unwrap_or_default();

    let content = html! {
        (NavBar::new(endpoints::STATEMENTS_VIEW).into_html())
        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold mb-4" { "Edit Statement" }

            dl class="w-full mb-4 text-sm"
            {
                dt class="font-medium" { "File" }
                dd { a href=(file_url) class=(LINK_STYLE) { (statement.filename) } }
                dt class="font-medium" { "Uploaded at" }
                dd { (format_local_date_time(statement.uploaded_at, local_offset)) }
            }

            form
                hx-put=(update_endpoint)
                hx-target-error="#alert-container"
                class="w-full space-y-4 md:space-y-6"
            {
                (form_field("source_id", "Source", source_select(&sources, Some(statement.source_id)), None))

                (form_field("statement_date", "Statement date", html! {
                    input
                        id="statement_date"
                        type="date"
                        name="statement_date"
                        value=(statement_date)
                        class=(FORM_TEXT_INPUT_STYLE);
                }, None))

                button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Save Statement" }
            }
        }
    };

    Ok(base("Edit Statement", &[], &content).into_response())
}

/// Handle the statement update form.
pub async fn update_statement_endpoint(
    Path(statement_id): Path<StatementId>,
    State(state): State<EditStatementState>,
    Form(form): Form<StatementFormData>,
) -> Response {
    let Some(source_id) = form.source_id else {
        return Error::InvalidSource(None).into_alert_response();
    };
    let fields = StatementFields {
        source_id,
        statement_date: form.statement_date,
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match update_statement(statement_id, &fields, &connection) {
        Ok(()) => (
            HxRedirect(endpoints::STATEMENTS_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error @ (Error::UpdateMissingStatement | Error::InvalidSource(_))) => {
            tracing::warn!("could not update statement {statement_id}: {error}");
            error.into_alert_response()
        }
        Err(error) => {
            tracing::error!(
                "An unexpected error occurred while updating statement {statement_id}: {error}"
            );
            error.into_alert_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        extract::{Path, State},
        http::StatusCode,
        response::IntoResponse,
    };
    use axum_extra::extract::Form;
    use time::macros::{date, datetime};

    use crate::{
        endpoints,
        source::{SourceFields, SourceName, create_source},
        statement::{
            StatementFields,
            db::{get_statement, insert_statement},
            domain::StatementFormData,
        },
        test_utils::{
            assert_form_input_value, assert_hx_endpoint, assert_hx_redirect, assert_valid_html,
            get_form_select, get_test_connection, must_get_form, parse_html_document,
            shared_connection,
        },
    };

    use super::{EditStatementState, get_edit_statement_page, update_statement_endpoint};

    fn get_state() -> EditStatementState {
        let connection = get_test_connection();
        for name in ["ANZ", "ASB"] {
            create_source(
                SourceFields {
                    name: SourceName::new_unchecked(name),
                    description: None,
                    ai_instruction: None,
                },
                &connection,
            )
            .unwrap();
        }
        insert_statement(
            "march-0123456789ab.pdf",
            datetime!(2025-04-01 08:00 UTC),
            &StatementFields {
                source_id: 1,
                statement_date: Some(date!(2025 - 03 - 31)),
            },
            &connection,
        )
        .unwrap();

        EditStatementState {
            db_connection: shared_connection(connection),
            local_timezone: "Etc/UTC".to_owned(),
        }
    }

    #[tokio::test]
    async fn edit_page_is_prefilled() {
        let state = get_state();

        let response = get_edit_statement_page(Path(1), State(state))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        let form = must_get_form(&html);
        assert_hx_endpoint(
            &form,
            &endpoints::format_endpoint(endpoints::STATEMENT, 1),
            "hx-put",
        );
        assert_form_input_value(&form, "statement_date", "2025-03-31");
        let (_, selected) = get_form_select(&form, "source_id");
        assert_eq!(selected.as_deref(), Some("1"));
        assert!(html.html().contains("march-0123456789ab.pdf"));
        assert!(html.html().contains("2025-04-01 08:00"));
    }

    #[tokio::test]
    async fn edit_page_for_missing_statement_is_not_found() {
        let state = get_state();

        let response = get_edit_statement_page(Path(7), State(state))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn update_changes_source_and_clears_date() {
        let state = get_state();
        let form = StatementFormData {
            source_id: Some(2),
            statement_date: None,
        };

        let response = update_statement_endpoint(Path(1), State(state.clone()), Form(form)).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::STATEMENTS_VIEW);
        let statement = get_statement(1, &state.db_connection.lock().unwrap()).unwrap();
        assert_eq!(statement.source_id, 2);
        assert_eq!(statement.statement_date, None);
        assert_eq!(statement.filename, "march-0123456789ab.pdf");
        assert_eq!(statement.uploaded_at, datetime!(2025-04-01 08:00 UTC));
    }

    #[tokio::test]
    async fn update_with_unknown_source_is_rejected() {
        let state = get_state();
        let form = StatementFormData {
            source_id: Some(9),
            statement_date: None,
        };

        let response = update_statement_endpoint(Path(1), State(state), Form(form)).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn update_missing_statement_returns_not_found_alert() {
        let state = get_state();
        let form = StatementFormData {
            source_id: Some(1),
            statement_date: None,
        };

        let response = update_statement_endpoint(Path(5), State(state), Form(form)).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
