//! Sources listing page with search.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::Query;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error, endpoints,
    html::{
        BUTTON_SECONDARY_STYLE, FORM_TEXT_INPUT_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE,
        TABLE_CELL_STYLE, TABLE_EMPTY_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE,
        TABLE_STYLE, base, edit_delete_action_links,
    },
    navigation::NavBar,
    pagination::{Page, PaginationConfig, create_pagination_indicators, page_url, pagination_view},
    source::{Source, count_sources, search_sources},
};

/// The state needed for the sources listing page.
#[derive(Debug, Clone)]
pub struct SourcesPageState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub pagination_config: PaginationConfig,
}

impl FromRef<AppState> for SourcesPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            pagination_config: state.pagination_config.clone(),
        }
    }
}

/// The query parameters for the sources page.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SourcesQuery {
    /// Text to look for in the source name or description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(skip_serializing)]
    pub page: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u64>,
}

/// Render the sources listing page.
pub async fn get_sources_page(
    State(state): State<SourcesPageState>,
    Query(query): Query<SourcesQuery>,
) -> Result<Response, Error> {
    let page = Page::resolve(
        query.page,
        query.per_page,
        &state.pagination_config,
        state.pagination_config.default_page_size,
    );

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let search = query.q.as_deref();
    let sources = search_sources(search, page, &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve sources: {error}"))?;
    let source_count = count_sources(search, &connection)
        .inspect_err(|error| tracing::error!("Failed to count sources: {error}"))?;

    let indicators = create_pagination_indicators(
        page.number,
        page.page_count(source_count),
        state.pagination_config.max_pages,
    );
    let filter_query = serde_html_form::to_string(&query).unwrap_or_default();
    let pagination = pagination_view(&indicators, |number| {
        page_url(endpoints::SOURCES_VIEW, &filter_query, number)
    });

    Ok(sources_view(&sources, search.unwrap_or_default(), pagination).into_response())
}

fn sources_view(sources: &[Source], search: &str, pagination: Markup) -> Markup {
    let table_row = |source: &Source| {
        let edit_url = endpoints::format_endpoint(endpoints::EDIT_SOURCE_VIEW, source.id);
        let delete_url = endpoints::format_endpoint(endpoints::SOURCE, source.id);
        let confirm_message = format!(
            "Are you sure you want to delete '{}'? Sources with statements cannot be deleted.",
            source.name
        );

        html!(
            tr class=(TABLE_ROW_STYLE)
            {
                td class=(TABLE_CELL_STYLE) { (source.id) }
                td class=(TABLE_CELL_STYLE) { (source.name) }
                td class=(TABLE_CELL_STYLE) { (source.description.as_deref().unwrap_or("-")) }
                td class=(TABLE_CELL_STYLE)
                {
                    div class="flex gap-4"
                    {
                        (edit_delete_action_links(
                            &edit_url,
                            &delete_url,
                            &confirm_message,
                            "closest tr",
                            "delete",
                        ))
                    }
                }
            }
        )
    };

    let content = html!(
        (NavBar::new(endpoints::SOURCES_VIEW).into_html())

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-4 w-full lg:max-w-5xl"
            {
                header class="flex justify-between flex-wrap items-end gap-4"
                {
                    h1 class="text-xl font-bold" { "Sources" }

                    form method="get" action=(endpoints::SOURCES_VIEW) class="flex gap-2"
                    {
                        input
                            type="search"
                            name="q"
                            value=(search)
                            placeholder="Search name or description"
                            aria-label="Search sources"
                            class=(FORM_TEXT_INPUT_STYLE);
                        button type="submit" class=(BUTTON_SECONDARY_STYLE) { "Search" }
                    }

                    a href=(endpoints::NEW_SOURCE_VIEW) class=(LINK_STYLE) { "Create Source" }
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
                                th scope="col" class=(TABLE_CELL_STYLE) { "Name" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Description" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                            }
                        }

                        tbody
                        {
                            @for source in sources {
                                (table_row(source))
                            }

                            @if sources.is_empty() {
                                tr
                                {
                                    td colspan="4" class=(TABLE_EMPTY_CELL_STYLE)
                                    {
                                        @if search.is_empty() {
                                            "No sources yet. "
                                            a href=(endpoints::NEW_SOURCE_VIEW) class=(LINK_STYLE)
                                            {
                                                "Create your first source"
                                            }
                                        } @else {
                                            "No sources match \"" (search) "\"."
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

    base("Sources", &[], &content)
}
