//! Middleware for logging requests and responses.

use axum::{
    body::Body,
    extract::Request,
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Form fields whose values must never be written to the logs.
const REDACTED_FIELDS: [&str; 3] = ["password", "confirm_password", "new_password"];

/// The number of body bytes to log at the `info` level. Longer bodies are
/// truncated and the full text is logged at the `debug` level.
const LOG_BODY_LENGTH_LIMIT: usize = 64;

/// Log the request and response for each request.
///
/// Password fields in URL-encoded forms are redacted. Multipart bodies
/// (statement uploads) are passed through untouched and only their headers
/// are logged.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    if is_multipart(request.headers()) {
        let (parts, body) = request.into_parts();
        tracing::info!("Received request: {parts:#?}\nbody: <multipart>");
        let response = next.run(Request::from_parts(parts, body)).await;
        return log_and_rebuild_response(response).await;
    }

    let (parts, body) = request.into_parts();
    let body_text = match body_to_text(body).await {
        Ok(text) => text,
        Err(error) => {
            tracing::error!("could not read request body: {error}");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    if is_form(&parts.headers) {
        let redacted = REDACTED_FIELDS
            .iter()
            .fold(body_text.clone(), |text, field| redact_field(&text, field));
        log_body("Received request", &parts, &redacted);
    } else {
        log_body("Received request", &parts, &body_text);
    }

    let response = next.run(Request::from_parts(parts, body_text.into())).await;

    log_and_rebuild_response(response).await
}

async fn log_and_rebuild_response(response: Response) -> Response {
    let (parts, body) = response.into_parts();

    // File downloads are not text, so only log their headers.
    let is_text = parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_none_or(|content_type| {
            content_type.starts_with("text/") || content_type.starts_with("application/json")
        });

    if !is_text {
        tracing::info!("Sending response: {parts:#?}\nbody: <binary>");
        return Response::from_parts(parts, body);
    }

    match body_to_text(body).await {
        Ok(text) => {
            log_body("Sending response", &parts, &text);
            Response::from_parts(parts, Body::from(text))
        }
        Err(error) => {
            tracing::error!("could not read response body: {error}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn is_multipart(headers: &HeaderMap) -> bool {
    content_type_starts_with(headers, "multipart/form-data")
}

fn is_form(headers: &HeaderMap) -> bool {
    content_type_starts_with(headers, "application/x-www-form-urlencoded")
}

fn content_type_starts_with(headers: &HeaderMap, prefix: &str) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with(prefix))
}

async fn body_to_text(body: Body) -> Result<String, axum::Error> {
    let bytes = axum::body::to_bytes(body, usize::MAX).await?;

    Ok(String::from_utf8_lossy(&bytes).to_string())
}

/// Replace the value of `field_name` in URL-encoded `form_text` with asterisks.
fn redact_field(form_text: &str, field_name: &str) -> String {
    form_text
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((key, _)) if key == field_name => format!("{key}=********"),
            _ => pair.to_owned(),
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn log_body(label: &str, parts: &impl std::fmt::Debug, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        let cut = (0..=LOG_BODY_LENGTH_LIMIT)
            .rev()
            .find(|index| body.is_char_boundary(*index))
            .unwrap_or(0);
        tracing::info!("{label}: {parts:#?}\nbody: {}...", &body[..cut]);
        tracing::debug!("Full body: {body:?}");
    } else {
        tracing::info!("{label}: {parts:#?}\nbody: {body:?}");
    }
}
