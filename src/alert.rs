//! Alert fragments for displaying success and error messages to users.
//!
//! Alerts are returned by the HTMX endpoints and swapped into the
//! `#alert-container` element that [crate::html::base] renders on every page.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use maud::{Markup, html};

/// A message to show the user after an action.
#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    Success { message: String, details: String },
    SuccessSimple { message: String },
    Error { message: String, details: String },
    ErrorSimple { message: String },
}

impl Alert {
    pub fn into_html(self) -> Markup {
        let (is_error, message, details) = match self {
            Alert::Success { message, details } => (false, message, details),
            Alert::SuccessSimple { message } => (false, message, String::new()),
            Alert::Error { message, details } => (true, message, details),
            Alert::ErrorSimple { message } => (true, message, String::new()),
        };

        let style = if is_error {
            "flex items-start justify-between gap-4 p-4 mb-4 rounded border \
            text-red-800 bg-red-50 border-red-300 \
            dark:bg-gray-800 dark:text-red-400 dark:border-red-800"
        } else {
            "flex items-start justify-between gap-4 p-4 mb-4 rounded border \
            text-green-800 bg-green-50 border-green-300 \
            dark:bg-gray-800 dark:text-green-400 dark:border-green-800"
        };

        html! {
            div role="alert" class=(style)
            {
                div
                {
                    p class="font-medium" { (message) }

                    @if !details.is_empty() {
                        p class="text-sm" { (details) }
                    }
                }

                button
                    type="button"
                    aria-label="Dismiss"
                    class="text-sm underline"
                    onclick="this.closest('[role=alert]').remove()"
                {
                    "Dismiss"
                }
            }
        }
    }
}

impl IntoResponse for Alert {
    /// Alerts for successful actions use 200 OK so that HTMX performs the swap.
    fn into_response(self) -> Response {
        (StatusCode::OK, self.into_html()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::{http::StatusCode, response::IntoResponse};
    use scraper::Selector;

    use crate::{
        alert::Alert,
        test_utils::{assert_valid_html, parse_html_fragment},
    };

    #[tokio::test]
    async fn renders_message_and_details() {
        let response = Alert::Error {
            message: "Upload failed".to_owned(),
            details: "Try again".to_owned(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_fragment(response).await;
        assert_valid_html(&html);
        let paragraphs = html
            .select(&Selector::parse("p").unwrap())
            .map(|p| p.text().collect::<String>())
            .collect::<Vec<_>>();
        assert_eq!(paragraphs, vec!["Upload failed", "Try again"]);
    }

    #[tokio::test]
    async fn simple_alert_omits_details() {
        let response = Alert::SuccessSimple {
            message: "Saved".to_owned(),
        }
        .into_response();

        let html = parse_html_fragment(response).await;
        assert_valid_html(&html);
        let paragraph_count = html.select(&Selector::parse("p").unwrap()).count();
        assert_eq!(paragraph_count, 1);
    }
}
