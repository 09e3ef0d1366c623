//! Category editing page and endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use rusqlite::Connection;

use crate::{
    AppState, Error,
    category::{
        CategoryFields, CategoryId,
        create::{category_form_view, category_page},
        domain::CategoryFormData,
        get_category, update_category,
    },
    endpoints,
};

/// The state needed for editing a category.
#[derive(Debug, Clone)]
pub struct EditCategoryState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for EditCategoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the category editing page.
pub async fn get_edit_category_page(
    Path(category_id): Path<CategoryId>,
    State(state): State<EditCategoryState>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let category = get_category(category_id, &connection)?;

    Ok(category_page("Edit Category", category_form_view(Some(&category))).into_response())
}

/// Handle category update form submission.
pub async fn update_category_endpoint(
    Path(category_id): Path<CategoryId>,
    State(state): State<EditCategoryState>,
    Form(form): Form<CategoryFormData>,
) -> Response {
    let fields = match CategoryFields::try_from(form) {
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

    match update_category(category_id, fields, &connection) {
        Ok(()) => (
            HxRedirect(endpoints::CATEGORIES_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error) => {
            tracing::error!("could not update category {category_id}: {error}");
            error.into_alert_response()
        }
    }
}
