//! Statement Keeper is an administrative web app for tracking bank and credit
//! card statements, the transactions they contain, and where they came from.
//!
//! This library provides a REST API that directly serves HTML pages.
//! Uploaded statement files (CSV or PDF) are kept in a flat storage directory
//! and their lifecycle is tied to the statement rows in the database.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use tokio::signal;

mod alert;
mod app_state;
mod category;
mod dashboard;
mod database_id;
mod db;
mod endpoints;
mod html;
mod internal_server_error;
mod logging;
mod navigation;
mod not_found;
mod pagination;
mod routing;
mod source;
mod statement;
mod timezone;
mod transaction;
mod user;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use db::initialize as initialize_db;
pub use logging::logging_middleware;
pub use pagination::PaginationConfig;
pub use routing::build_router;
pub use statement::{OrphanReport, StatementStorage, scan_storage};
pub use timezone::get_local_offset;
pub use user::{Email, PasswordHash, Role, User, UserId, ValidatedPassword, create_user};

use crate::{
    alert::Alert, category::CategoryId, internal_server_error::InternalServerError,
    not_found::get_404_not_found_response, source::SourceId, statement::StatementId,
};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The string is not a valid email address.
    #[error("{0} is not a valid email address")]
    InvalidEmail(String),

    /// A user with the email address already exists.
    #[error("a user with the email \"{0}\" already exists")]
    DuplicateEmail(String),

    /// A role must be a non-empty string of the form `ROLE_NAME`.
    #[error("\"{0}\" is not a valid role, roles must look like ROLE_ADMIN")]
    InvalidRole(String),

    /// An empty string was used for a source name.
    #[error("Source name cannot be empty")]
    EmptySourceName,

    /// An empty string was used for a category name.
    #[error("Category name cannot be empty")]
    EmptyCategoryName,

    /// An empty string was used for a category icon.
    #[error("Category icon cannot be empty")]
    EmptyCategoryIcon,

    /// The currency code was not three ASCII letters.
    #[error("\"{0}\" is not a 3-letter currency code")]
    InvalidCurrency(String),

    /// The amount could not be read as a decimal number.
    #[error("\"{0}\" is not a valid amount")]
    InvalidAmount(String),

    /// The password and its confirmation are different.
    #[error("the passwords do not match")]
    PasswordsDoNotMatch,

    /// The uploaded file has a MIME type that is not a CSV or PDF type.
    #[error("unsupported file type \"{0}\", only CSV and PDF files are allowed")]
    UnsupportedMediaType(String),

    /// The extension resolved for an uploaded file is not `csv` or `pdf`.
    #[error("invalid file extension \"{0}\", only csv and pdf are allowed")]
    InvalidFileExtension(String),

    /// The uploaded file is larger than the allowed maximum.
    #[error("the file is {0} bytes which is larger than the maximum allowed size")]
    FileTooLarge(usize),

    /// The multipart form did not contain a statement file.
    #[error("no statement file was uploaded")]
    MissingFile,

    /// The multipart form could not be parsed.
    #[error("Could not parse multipart form: {0}")]
    MultipartError(String),

    /// A filesystem operation on the statement storage directory failed.
    #[error("statement storage error: {0}")]
    StorageError(String),

    /// The source ID did not refer to a valid source.
    #[error("the source ID does not refer to a valid source")]
    InvalidSource(Option<SourceId>),

    /// The statement ID did not refer to a valid statement.
    #[error("the statement ID does not refer to a valid statement")]
    InvalidStatement(StatementId),

    /// The category ID did not refer to a valid category, or no category could
    /// be assigned to a new transaction.
    #[error("the category ID does not refer to a valid category")]
    InvalidCategory(Option<CategoryId>),

    /// Tried to delete a source that still has statements.
    #[error("the source still has statements")]
    SourceInUse,

    /// Tried to delete a category that is still assigned to transactions.
    #[error("the category is still assigned to transactions")]
    CategoryInUse,

    /// Tried to delete a statement that still has transactions.
    #[error("the statement still has transactions")]
    StatementInUse,

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// Tried to update a source that does not exist
    #[error("tried to update a source that is not in the database")]
    UpdateMissingSource,

    /// Tried to delete a source that does not exist
    #[error("tried to delete a source that is not in the database")]
    DeleteMissingSource,

    /// Tried to update a category that does not exist
    #[error("tried to update a category that is not in the database")]
    UpdateMissingCategory,

    /// Tried to delete a category that does not exist
    #[error("tried to delete a category that is not in the database")]
    DeleteMissingCategory,

    /// Tried to update a statement that does not exist
    #[error("tried to update a statement that is not in the database")]
    UpdateMissingStatement,

    /// Tried to delete a statement that does not exist
    #[error("tried to delete a statement that is not in the database")]
    DeleteMissingStatement,

    /// Tried to delete a transaction that does not exist
    #[error("tried to delete a transaction that is not in the database")]
    DeleteMissingTransaction,

    /// Tried to update a user that does not exist
    #[error("tried to update a user that is not in the database")]
    UpdateMissingUser,

    /// Tried to delete a user that does not exist
    #[error("tried to delete a user that is not in the database")]
    DeleteMissingUser,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        tracing::error!("a storage I/O error occurred: {}", value);
        Error::StorageError(value.to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => get_404_not_found_response(),
            Error::InvalidTimezoneError(timezone) => InternalServerError {
                description: "Invalid Timezone Settings",
                fix: &format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                ),
            }
            .into_response(),
            Error::DatabaseLockError => InternalServerError::default().into_response(),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                InternalServerError::default().into_response()
            }
        }
    }
}

impl Error {
    /// Render the error as an alert fragment for HTMX requests.
    fn into_alert_response(self) -> Response {
        let (status_code, alert) = match self {
            Error::UnsupportedMediaType(mime) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Please upload a valid CSV or PDF file".to_owned(),
                    details: format!("Files of type \"{mime}\" are not accepted."),
                },
            ),
            Error::InvalidFileExtension(extension) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Invalid file extension".to_owned(),
                    details: format!(
                        "The file resolved to the extension \"{extension}\", \
                        only csv and pdf are allowed."
                    ),
                },
            ),
            Error::FileTooLarge(size) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                Alert::Error {
                    message: "File too large".to_owned(),
                    details: format!(
                        "The file is {size} bytes, statements must be 10 MiB or smaller."
                    ),
                },
            ),
            Error::MissingFile => (
                StatusCode::BAD_REQUEST,
                Alert::ErrorSimple {
                    message: "Choose a statement file to upload.".to_owned(),
                },
            ),
            Error::MultipartError(details) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Could not read the upload".to_owned(),
                    details,
                },
            ),
            Error::StorageError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Alert::Error {
                    message: "Could not store the statement file".to_owned(),
                    details: "Check that the statement storage directory exists and is writable."
                        .to_owned(),
                },
            ),
            Error::InvalidSource(source_id) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Invalid source".to_owned(),
                    details: match source_id {
                        Some(id) => format!("Could not find a source with the ID {id}"),
                        None => "Select a source for the statement.".to_owned(),
                    },
                },
            ),
            Error::InvalidStatement(statement_id) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Invalid statement".to_owned(),
                    details: format!("Could not find a statement with the ID {statement_id}"),
                },
            ),
            Error::InvalidCategory(category_id) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Invalid category".to_owned(),
                    details: match category_id {
                        Some(id) => format!("Could not find a category with the ID {id}"),
                        None => "No category was selected and no categories exist yet. \
                            Create a category first."
                            .to_owned(),
                    },
                },
            ),
            Error::InvalidCurrency(currency) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Invalid currency".to_owned(),
                    details: format!(
                        "\"{currency}\" is not a 3-letter currency code, e.g. USD, CAD, EUR."
                    ),
                },
            ),
            Error::InvalidAmount(amount) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Invalid amount".to_owned(),
                    details: format!("\"{amount}\" is not a number, e.g. 12.34 or -5."),
                },
            ),
            Error::PasswordsDoNotMatch => (
                StatusCode::BAD_REQUEST,
                Alert::ErrorSimple {
                    message: "The passwords do not match.".to_owned(),
                },
            ),
            Error::SourceInUse => (
                StatusCode::CONFLICT,
                Alert::Error {
                    message: "Could not delete source".to_owned(),
                    details: "The source still has statements. Delete its statements first."
                        .to_owned(),
                },
            ),
            Error::CategoryInUse => (
                StatusCode::CONFLICT,
                Alert::Error {
                    message: "Could not delete category".to_owned(),
                    details: "The category is still assigned to transactions.".to_owned(),
                },
            ),
            Error::StatementInUse => (
                StatusCode::CONFLICT,
                Alert::Error {
                    message: "Could not delete statement".to_owned(),
                    details: "The statement still has transactions. \
                        Delete its transactions first."
                        .to_owned(),
                },
            ),
            Error::EmptySourceName | Error::EmptyCategoryName | Error::EmptyCategoryIcon => (
                StatusCode::BAD_REQUEST,
                Alert::ErrorSimple {
                    message: self.to_string(),
                },
            ),
            Error::InvalidEmail(email) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Invalid email".to_owned(),
                    details: format!("\"{email}\" is not a valid email address."),
                },
            ),
            Error::TooWeak(feedback) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Password is too weak".to_owned(),
                    details: feedback,
                },
            ),
            Error::InvalidRole(role) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Invalid role".to_owned(),
                    details: format!("\"{role}\" is not a valid role, roles look like ROLE_ADMIN."),
                },
            ),
            Error::DuplicateEmail(email) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Duplicate email".to_owned(),
                    details: format!("A user with the email {email} already exists."),
                },
            ),
            Error::InvalidTimezoneError(timezone) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Alert::Error {
                    message: "Invalid Timezone Settings".to_owned(),
                    details: format!(
                        "Could not get local timezone \"{timezone}\". Check your server settings and \
                        ensure the timezone has been set to valid, canonical timezone string"
                    ),
                },
            ),
            Error::UpdateMissingSource => missing_alert("Could not update source", "source"),
            Error::DeleteMissingSource => missing_alert("Could not delete source", "source"),
            Error::UpdateMissingCategory => {
                missing_alert("Could not update category", "category")
            }
            Error::DeleteMissingCategory => {
                missing_alert("Could not delete category", "category")
            }
            Error::UpdateMissingStatement => {
                missing_alert("Could not update statement", "statement")
            }
            Error::DeleteMissingStatement => {
                missing_alert("Could not delete statement", "statement")
            }
            Error::DeleteMissingTransaction => {
                missing_alert("Could not delete transaction", "transaction")
            }
            Error::UpdateMissingUser => missing_alert("Could not update user", "user"),
            Error::DeleteMissingUser => missing_alert("Could not delete user", "user"),
            error => {
                tracing::error!("An unexpected error occurred: {error}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Alert::Error {
                        message: "Something went wrong".to_owned(),
                        details: "An unexpected error occurred, check the server logs for more details."
                            .to_owned(),
                    },
                )
            }
        };

        (status_code, alert.into_html()).into_response()
    }
}

fn missing_alert(message: &str, entity: &str) -> (StatusCode, Alert) {
    (
        StatusCode::NOT_FOUND,
        Alert::Error {
            message: message.to_owned(),
            details: format!(
                "The {entity} could not be found. \
                Try refreshing the page to see if the {entity} has already been deleted."
            ),
        },
    )
}
