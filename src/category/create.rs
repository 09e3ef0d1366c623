//! Category creation page and endpoint.

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
    AppState, Error,
    category::{Category, CategoryFields, create_category, domain::CategoryFormData},
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, FORM_TEXT_INPUT_STYLE, base, form_field,
    },
    navigation::NavBar,
};

/// The state needed for creating a category.
#[derive(Debug, Clone)]
pub struct CreateCategoryState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateCategoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the category creation page.
pub async fn get_new_category_page() -> Response {
    category_page("New Category", category_form_view(None)).into_response()
}

/// Handle category creation form submission.
pub async fn create_category_endpoint(
    State(state): State<CreateCategoryState>,
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

    match create_category(fields, &connection) {
        Ok(_) => (
            HxRedirect(endpoints::CATEGORIES_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error) => {
            tracing::error!("An unexpected error occurred while creating a category: {error}");
            error.into_alert_response()
        }
    }
}

pub(super) fn category_page(title: &str, form: Markup) -> Markup {
    let content = html! {
        (NavBar::new(endpoints::CATEGORIES_VIEW).into_html())
        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold mb-4" { (title) }
            (form)
        }
    };

    base(title, &[], &content)
}

/// The category form. Submits a new category, or updates `category` if given.
pub(super) fn category_form_view(category: Option<&Category>) -> Markup {
    let update_endpoint =
        category.map(|category| endpoints::format_endpoint(endpoints::CATEGORY, category.id));
    let hx_post = category.is_none().then_some(endpoints::POST_CATEGORY);

    html! {
        form
            hx-post=[hx_post]
            hx-put=[update_endpoint]
            hx-target-error="#alert-container"
            class="w-full space-y-4 md:space-y-6"
        {
            (form_field("icon", "Icon", html! {
                input
                    id="icon"
                    type="text"
                    name="icon"
                    value=[category.map(|category| category.icon.as_str())]
                    placeholder="🛒"
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }, Some("An emoji or short symbol.")))

            (form_field("name", "Name", html! {
                input
                    id="name"
                    type="text"
                    name="name"
                    value=[category.map(|category| category.name.as_ref())]
                    placeholder="Groceries"
                    required
                    autofocus
                    class=(FORM_TEXT_INPUT_STYLE);
            }, None))

            (form_field("description", "Description", html! {
                textarea
                    id="description"
                    name="description"
                    rows="3"
                    class=(FORM_TEXT_INPUT_STYLE)
                {
                    (category.and_then(|category| category.description.as_deref()).unwrap_or_default())
                }
            }, None))

            button type="submit" class=(BUTTON_PRIMARY_STYLE)
            {
                @if category.is_some() { "Save Category" } @else { "Create Category" }
            }
        }
    }
}
