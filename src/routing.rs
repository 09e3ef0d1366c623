//! Application router configuration.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    response::Redirect,
    routing::{delete, get, post, put},
};
use tower_http::services::ServeDir;

use crate::{
    AppState,
    category::{
        create_category_endpoint, delete_category_endpoint, get_categories_page,
        get_edit_category_page, get_new_category_page, update_category_endpoint,
    },
    dashboard::get_dashboard_page,
    endpoints,
    internal_server_error::get_internal_server_error_page,
    not_found::get_404_not_found,
    source::{
        create_source_endpoint, delete_source_endpoint, get_edit_source_page,
        get_new_source_page, get_sources_page, update_source_endpoint,
    },
    statement::{
        MAX_UPLOAD_SIZE, create_statement_endpoint, delete_statement_endpoint,
        get_edit_statement_page, get_new_statement_page, get_statement_file, get_statements_page,
        update_statement_endpoint,
    },
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint, get_new_transaction_page,
        get_transactions_page,
    },
    user::{
        change_password_endpoint, create_user_endpoint, delete_user_endpoint,
        get_change_password_page, get_new_user_page, get_users_page,
    },
};

/// Room for the other multipart fields and boundaries around the statement file.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let page_routes = Router::new()
        .route(endpoints::ROOT, get(get_index_page))
        .route(endpoints::DASHBOARD_VIEW, get(get_dashboard_page))
        .route(endpoints::STATEMENTS_VIEW, get(get_statements_page))
        .route(endpoints::NEW_STATEMENT_VIEW, get(get_new_statement_page))
        .route(endpoints::EDIT_STATEMENT_VIEW, get(get_edit_statement_page))
        .route(endpoints::TRANSACTIONS_VIEW, get(get_transactions_page))
        .route(
            endpoints::NEW_TRANSACTION_VIEW,
            get(get_new_transaction_page),
        )
        .route(endpoints::SOURCES_VIEW, get(get_sources_page))
        .route(endpoints::NEW_SOURCE_VIEW, get(get_new_source_page))
        .route(endpoints::EDIT_SOURCE_VIEW, get(get_edit_source_page))
        .route(endpoints::CATEGORIES_VIEW, get(get_categories_page))
        .route(endpoints::NEW_CATEGORY_VIEW, get(get_new_category_page))
        .route(endpoints::EDIT_CATEGORY_VIEW, get(get_edit_category_page))
        .route(endpoints::USERS_VIEW, get(get_users_page))
        .route(endpoints::NEW_USER_VIEW, get(get_new_user_page))
        .route(endpoints::EDIT_USER_VIEW, get(get_change_password_page))
        .route(
            endpoints::INTERNAL_ERROR_VIEW,
            get(get_internal_server_error_page),
        );

    let api_routes = Router::new()
        .route(
            endpoints::POST_STATEMENT,
            post(create_statement_endpoint)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE + MULTIPART_OVERHEAD)),
        )
        .route(
            endpoints::STATEMENT,
            put(update_statement_endpoint).delete(delete_statement_endpoint),
        )
        .route(endpoints::STATEMENT_FILE, get(get_statement_file))
        .route(endpoints::POST_TRANSACTION, post(create_transaction_endpoint))
        .route(
            endpoints::TRANSACTION,
            delete(delete_transaction_endpoint),
        )
        .route(endpoints::POST_SOURCE, post(create_source_endpoint))
        .route(
            endpoints::SOURCE,
            put(update_source_endpoint).delete(delete_source_endpoint),
        )
        .route(endpoints::POST_CATEGORY, post(create_category_endpoint))
        .route(
            endpoints::CATEGORY,
            put(update_category_endpoint).delete(delete_category_endpoint),
        )
        .route(endpoints::POST_USER, post(create_user_endpoint))
        .route(endpoints::USER, delete(delete_user_endpoint))
        .route(endpoints::USER_PASSWORD, put(change_password_endpoint));

    page_routes
        .merge(api_routes)
        .nest_service(endpoints::STATIC, ServeDir::new("static/"))
        .fallback(get_404_not_found)
        .with_state(state)
}

/// The root path '/' redirects to the dashboard page.
async fn get_index_page() -> Redirect {
    Redirect::to(endpoints::DASHBOARD_VIEW)
}

#[cfg(test)]
mod root_route_tests {
    use axum::{http::StatusCode, response::IntoResponse};

    use crate::{endpoints, routing::get_index_page};

    #[tokio::test]
    async fn root_redirects_to_dashboard() {
        let response = get_index_page().await.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let location = response.headers().get("location").unwrap();
        assert_eq!(location, endpoints::DASHBOARD_VIEW);
    }
}
