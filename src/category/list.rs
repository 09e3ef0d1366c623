//! Categories listing page.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::Query;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    category::{Category, count_categories, list_categories},
    endpoints,
    html::{
        LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_EMPTY_CELL_STYLE,
        TABLE_HEADER_STYLE, TABLE_ROW_STYLE, TABLE_STYLE, base, edit_delete_action_links,
    },
    navigation::NavBar,
    pagination::{Page, PaginationConfig, create_pagination_indicators, page_url, pagination_view},
};

/// Categories are listed in smaller pages than statements and transactions.
const CATEGORIES_PER_PAGE: u64 = 50;

/// The state needed for the categories listing page.
#[derive(Debug, Clone)]
pub struct CategoriesPageState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub pagination_config: PaginationConfig,
}

impl FromRef<AppState> for CategoriesPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            pagination_config: state.pagination_config.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CategoriesQuery {
    pub page: Option<u64>,
}

/// Render the categories listing page, sorted by ID.
pub async fn get_categories_page(
    State(state): State<CategoriesPageState>,
    Query(query): Query<CategoriesQuery>,
) -> Result<Response, Error> {
    let page = Page::resolve(
        query.page,
        None,
        &state.pagination_config,
        CATEGORIES_PER_PAGE,
    );

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let categories = list_categories(page, &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve categories: {error}"))?;
    let category_count = count_categories(&connection)?;

    let indicators = create_pagination_indicators(
        page.number,
        page.page_count(category_count),
        state.pagination_config.max_pages,
    );
    let pagination = pagination_view(&indicators, |number| {
        page_url(endpoints::CATEGORIES_VIEW, "", number)
    });

    Ok(categories_view(&categories, pagination).into_response())
}

fn categories_view(categories: &[Category], pagination: Markup) -> Markup {
    let content = html!(
        (NavBar::new(endpoints::CATEGORIES_VIEW).into_html())

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-4 w-full lg:max-w-5xl"
            {
                header class="flex justify-between flex-wrap items-end"
                {
                    h1 class="text-xl font-bold" { "Categories" }

                    a href=(endpoints::NEW_CATEGORY_VIEW) class=(LINK_STYLE)
                    {
                        "Create Category"
                    }
                }

                div class="overflow-x-auto dark:bg-gray-800"
                {
                    table class=(TABLE_STYLE)
                    {
                        thead class=(TABLE_HEADER_STYLE)
                        {
                            tr
                            {
                                th scope="col" class=(TABLE_CELL_STYLE) { "ID" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Icon" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Name" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Description" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                            }
                        }

                        tbody
                        {
                            @for category in categories {
                                tr class=(TABLE_ROW_STYLE)
                                {
                                    td class=(TABLE_CELL_STYLE) { (category.id) }
                                    td class={ (TABLE_CELL_STYLE) " text-xl" } { (category.icon) }
                                    td class=(TABLE_CELL_STYLE) { (category.name) }
                                    td class=(TABLE_CELL_STYLE)
                                    {
                                        (category.description.as_deref().unwrap_or("-"))
                                    }
                                    td class=(TABLE_CELL_STYLE)
                                    {
                                        div class="flex gap-4"
                                        {
                                            (edit_delete_action_links(
                                                &endpoints::format_endpoint(endpoints::EDIT_CATEGORY_VIEW, category.id),
                                                &endpoints::format_endpoint(endpoints::CATEGORY, category.id),
                                                &format!(
                                                    "Are you sure you want to delete '{}'? \
                                                    Categories used by transactions cannot be deleted.",
                                                    category.name
                                                ),
                                                "closest tr",
                                                "delete",
                                            ))
                                        }
                                    }
                                }
                            }

                            @if categories.is_empty() {
                                tr
                                {
                                    td colspan="5" class=(TABLE_EMPTY_CELL_STYLE)
                                    {
                                        "No categories yet. "
                                        a href=(endpoints::NEW_CATEGORY_VIEW) class=(LINK_STYLE)
                                        {
                                            "Create your first category"
                                        }
                                    }
                                }
                            }
                        }
                    }
                }

                (pagination)
            }
        }
    );

    base("Categories", &[], &content)
}

#[cfg(test)]
mod tests {
    use axum::{extract::State, http::StatusCode, response::IntoResponse};
    use axum_extra::extract::Query;

    use crate::{
        category::{CategoryFields, CategoryName, create_category},
        pagination::PaginationConfig,
        test_utils::{
            assert_valid_html, get_test_connection, parse_html_document, shared_connection,
            table_rows,
        },
    };

    use super::{CategoriesPageState, CategoriesQuery, get_categories_page};

    fn get_state(count: usize) -> CategoriesPageState {
        let connection = get_test_connection();
        for i in 0..count {
            create_category(
                CategoryFields {
                    icon: "📁".to_owned(),
                    name: CategoryName::new_unchecked(&format!("Category {i}")),
                    description: None,
                },
                &connection,
            )
            .unwrap();
        }

        CategoriesPageState {
            db_connection: shared_connection(connection),
            pagination_config: PaginationConfig::default(),
        }
    }

    #[tokio::test]
    async fn lists_categories_in_id_order() {
        let response = get_categories_page(State(get_state(2)), Query(CategoriesQuery::default()))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        let rows = table_rows(&html);
        assert_eq!(rows[0][..3], ["1", "📁", "Category 0"]);
        assert_eq!(rows[1][..3], ["2", "📁", "Category 1"]);
    }

    #[tokio::test]
    async fn shows_fifty_per_page() {
        let state = get_state(51);

        let first = get_categories_page(State(state.clone()), Query(CategoriesQuery::default()))
            .await
            .into_response();
        let second = get_categories_page(State(state), Query(CategoriesQuery { page: Some(2) }))
            .await
            .into_response();

        assert_eq!(table_rows(&parse_html_document(first).await).len(), 50);
        let second_rows = table_rows(&parse_html_document(second).await);
        assert_eq!(second_rows.len(), 1);
        assert_eq!(second_rows[0][0], "51");
    }
}
