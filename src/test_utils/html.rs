use axum::{body::Body, response::Response};
use scraper::{Html, Selector};

async fn body_text(response: Response<Body>) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Could not get response body");

    String::from_utf8_lossy(&body).to_string()
}

pub(crate) async fn parse_html_document(response: Response<Body>) -> Html {
    Html::parse_document(&body_text(response).await)
}

pub(crate) async fn parse_html_fragment(response: Response<Body>) -> Html {
    Html::parse_fragment(&body_text(response).await)
}

#[track_caller]
pub(crate) fn assert_valid_html(html: &Html) {
    assert!(
        html.errors.is_empty(),
        "Got HTML parsing errors: {:?}",
        html.errors
    );
}

/// The trimmed text of every element matching `selector`.
#[track_caller]
pub(crate) fn select_text(html: &Html, selector: &str) -> Vec<String> {
    let selector = Selector::parse(selector).unwrap();

    html.select(&selector)
        .map(|element| element.text().collect::<String>().trim().to_owned())
        .collect()
}

/// The text of each cell in the table body, one `Vec` per row.
#[track_caller]
pub(crate) fn table_rows(html: &Html) -> Vec<Vec<String>> {
    let row_selector = Selector::parse("table tbody tr").unwrap();
    let cell_selector = Selector::parse("td").unwrap();

    html.select(&row_selector)
        .map(|row| {
            row.select(&cell_selector)
                .map(|cell| cell.text().collect::<String>().trim().to_owned())
                .collect()
        })
        .collect()
}
