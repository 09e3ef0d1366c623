//! The page shown when a route or resource does not exist.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::html::error_view;

/// The fallback handler for unknown routes.
pub async fn get_404_not_found() -> Response {
    get_404_not_found_response()
}

/// A 404 response with the "not found" page.
pub fn get_404_not_found_response() -> Response {
    let page = error_view(
        "Not Found",
        "404",
        "Sorry, we can't find that page.",
        "Check the address or head back to the dashboard.",
    );

    (StatusCode::NOT_FOUND, Html(page.into_string())).into_response()
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::test_utils::{assert_valid_html, parse_html_document};

    use super::get_404_not_found;

    #[tokio::test]
    async fn renders_not_found_page() {
        let response = get_404_not_found().await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let document = parse_html_document(response).await;
        assert_valid_html(&document);
        let text = document.root_element().text().collect::<String>();
        assert!(text.contains("404"));
    }
}
