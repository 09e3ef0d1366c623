//! Statement upload page and endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Multipart, State, multipart::Field},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use time::{Date, macros::format_description};

use crate::{
    AppState, Error, endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, FORM_TEXT_INPUT_STYLE, LINK_STYLE, base,
        form_field, loading_spinner,
    },
    navigation::NavBar,
    source::{Source, SourceId, get_all_sources},
    statement::{
        StatementFields, StatementStorage,
        lifecycle::store_upload,
        upload::{CSV_MIME_TYPES, PDF_MIME_TYPE, Upload},
    },
};

/// The state needed for uploading a statement.
#[derive(Debug, Clone)]
pub struct CreateStatementState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub statement_storage: StatementStorage,
}

impl FromRef<AppState> for CreateStatementState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            statement_storage: state.statement_storage.clone(),
        }
    }
}

/// Render the statement upload page.
pub async fn get_new_statement_page(
    State(state): State<CreateStatementState>,
) -> Result<Response, Error> {
    let sources = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        get_all_sources(&connection)
            .inspect_err(|error| tracing::error!("Failed to retrieve sources: {error}"))?
    };

    let content = html! {
        (NavBar::new(endpoints::STATEMENTS_VIEW).into_html())
        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold mb-4" { "Upload Statement" }

            @if sources.is_empty() {
                p
                {
                    "Statements belong to a source. "
                    a href=(endpoints::NEW_SOURCE_VIEW) class=(LINK_STYLE) { "Create a source" }
                    " before uploading a statement."
                }
            } @else {
                (upload_form_view(&sources))
            }
        }
    };

    Ok(base("Upload Statement", &[], &content).into_response())
}

fn upload_form_view(sources: &[Source]) -> Markup {
    let accept = CSV_MIME_TYPES
        .iter()
        .chain([&PDF_MIME_TYPE, &".csv", &".pdf"])
        .copied()
        .collect::<Vec<_>>()
        .join(",");

    html! {
        form
            hx-post=(endpoints::POST_STATEMENT)
            enctype="multipart/form-data"
            hx-disabled-elt="#statement_file, #submit-button"
            hx-indicator="#indicator"
            hx-target-error="#alert-container"
            class="w-full space-y-4 md:space-y-6"
        {
            (form_field("statement_file", "Statement file", html! {
                input
                    id="statement_file"
                    type="file"
                    name="statement_file"
                    accept=(accept)
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }, Some("A CSV or PDF file, at most 10 MiB.")))

            (form_field("source_id", "Source", source_select(sources, None), None))

            (form_field("statement_date", "Statement date", html! {
                input
                    id="statement_date"
                    type="date"
                    name="statement_date"
                    class=(FORM_TEXT_INPUT_STYLE);
            }, None))

            button type="submit" id="submit-button" class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" id="indicator" { (loading_spinner()) }
                " Upload Statement"
            }
        }
    }
}

/// A select input for choosing the source of a statement.
pub(super) fn source_select(sources: &[Source], selected: Option<SourceId>) -> Markup {
    html! {
        select id="source_id" name="source_id" required class=(FORM_TEXT_INPUT_STYLE)
        {
            option value="" disabled selected[selected.is_none()] { "Choose a source" }

            @for source in sources {
                option value=(source.id) selected[selected == Some(source.id)] { (source.name) }
            }
        }
    }
}

/// The fields of the upload form.
#[derive(Debug, Default)]
struct UploadForm {
    upload: Option<Upload>,
    source_id: Option<SourceId>,
    statement_date: Option<Date>,
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, Error> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| Error::MultipartError(error.body_text()))?
    {
        match field.name() {
            Some("statement_file") => form.upload = read_file_field(field).await?,
            Some("source_id") => {
                let text = read_text_field(field).await?;
                form.source_id = match text.trim() {
                    "" => None,
                    id => Some(id.parse().map_err(|_| {
                        Error::MultipartError(format!("\"{id}\" is not a valid source ID"))
                    })?),
                };
            }
            Some("statement_date") => {
                let text = read_text_field(field).await?;
                form.statement_date = parse_optional_date(&text)?;
            }
            name => tracing::debug!("ignoring unexpected upload form field {name:?}"),
        }
    }

    Ok(form)
}

/// Read a file field, treating an empty file input as no file.
async fn read_file_field(field: Field<'_>) -> Result<Option<Upload>, Error> {
    let client_name = field.file_name().unwrap_or_default().to_owned();
    let content_type = field.content_type().map(str::to_owned);
    let bytes = field.bytes().await.map_err(|error| {
        tracing::error!("Could not read data from multipart form field: {error}");
        Error::MultipartError(error.body_text())
    })?;

    if client_name.is_empty() && bytes.is_empty() {
        return Ok(None);
    }

    Ok(Some(Upload {
        client_name,
        content_type,
        bytes: bytes.to_vec(),
    }))
}

async fn read_text_field(field: Field<'_>) -> Result<String, Error> {
    field
        .text()
        .await
        .map_err(|error| Error::MultipartError(error.body_text()))
}

fn parse_optional_date(text: &str) -> Result<Option<Date>, Error> {
    let text = text.trim();

    if text.is_empty() {
        return Ok(None);
    }

    Date::parse(text, format_description!("[year]-[month]-[day]"))
        .map(Some)
        .map_err(|_| Error::MultipartError(format!("\"{text}\" is not a valid date")))
}

/// Handle the statement upload form.
pub async fn create_statement_endpoint(
    State(state): State<CreateStatementState>,
    multipart: Multipart,
) -> Response {
    let form = match read_upload_form(multipart).await {
        Ok(form) => form,
        Err(error) => {
            tracing::warn!("could not read statement upload: {error}");
            return error.into_alert_response();
        }
    };

    let Some(upload) = form.upload else {
        return Error::MissingFile.into_alert_response();
    };
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

    match store_upload(&upload, &fields, &state.statement_storage, &connection) {
        Ok(statement) => {
            tracing::info!(
                "created statement {} from {}",
                statement.id,
                upload.client_name
            );
            (
                HxRedirect(endpoints::STATEMENTS_VIEW.to_owned()),
                StatusCode::SEE_OTHER,
            )
                .into_response()
        }
        Err(
            error @ (Error::UnsupportedMediaType(_)
            | Error::InvalidFileExtension(_)
            | Error::FileTooLarge(_)
            | Error::InvalidSource(_)),
        ) => {
            tracing::warn!("rejected statement upload {}: {error}", upload.client_name);
            error.into_alert_response()
        }
        Err(error) => {
            tracing::error!("An unexpected error occurred while storing a statement: {error}");
            error.into_alert_response()
        }
    }
}
