//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/statements/{statement_id}', use [format_endpoint].

/// The root route which redirects to the dashboard.
pub const ROOT: &str = "/";
/// The landing page with an overview of the stored data.
pub const DASHBOARD_VIEW: &str = "/dashboard";
/// The page for listing statements.
pub const STATEMENTS_VIEW: &str = "/statements";
/// The page for uploading a new statement.
pub const NEW_STATEMENT_VIEW: &str = "/statements/new";
/// The page for editing an existing statement.
pub const EDIT_STATEMENT_VIEW: &str = "/statements/{statement_id}/edit";
/// The page for listing transactions.
pub const TRANSACTIONS_VIEW: &str = "/transactions";
/// The page for creating a new transaction.
pub const NEW_TRANSACTION_VIEW: &str = "/transactions/new";
/// The page for listing sources.
pub const SOURCES_VIEW: &str = "/sources";
/// The page for creating a new source.
pub const NEW_SOURCE_VIEW: &str = "/sources/new";
/// The page for editing an existing source.
pub const EDIT_SOURCE_VIEW: &str = "/sources/{source_id}/edit";
/// The page for listing categories.
pub const CATEGORIES_VIEW: &str = "/categories";
/// The page for creating a new category.
pub const NEW_CATEGORY_VIEW: &str = "/categories/new";
/// The page for editing an existing category.
pub const EDIT_CATEGORY_VIEW: &str = "/categories/{category_id}/edit";
/// The page for listing users.
pub const USERS_VIEW: &str = "/users";
/// The page for creating a new user.
pub const NEW_USER_VIEW: &str = "/users/new";
/// The page for changing a user's password.
pub const EDIT_USER_VIEW: &str = "/users/{user_id}/edit";
/// The page to display when an internal server error occurs.
pub const INTERNAL_ERROR_VIEW: &str = "/error";
/// The route for static files.
pub const STATIC: &str = "/static";

/// The route to upload a statement.
pub const POST_STATEMENT: &str = "/api/statements";
/// The route to update or delete a statement.
pub const STATEMENT: &str = "/api/statements/{statement_id}";
/// The route to download the stored file of a statement.
pub const STATEMENT_FILE: &str = "/api/statements/{statement_id}/file";
/// The route to create a transaction.
pub const POST_TRANSACTION: &str = "/api/transactions";
/// The route to delete a transaction.
pub const TRANSACTION: &str = "/api/transactions/{transaction_id}";
/// The route to create a source.
pub const POST_SOURCE: &str = "/api/sources";
/// The route to update or delete a source.
pub const SOURCE: &str = "/api/sources/{source_id}";
/// The route to create a category.
pub const POST_CATEGORY: &str = "/api/categories";
/// The route to update or delete a category.
pub const CATEGORY: &str = "/api/categories/{category_id}";
/// The route to create a user.
pub const POST_USER: &str = "/api/users";
/// The route to delete a user.
pub const USER: &str = "/api/users/{user_id}";
/// The route to change a user's password.
pub const USER_PASSWORD: &str = "/api/users/{user_id}/password";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/users/{user_id}', '{user_id}' is the parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_owned();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|offset| param_start + offset + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
