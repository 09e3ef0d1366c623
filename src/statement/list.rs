//! Statements listing page with filters.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::Query;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::{Date, UtcOffset};

use crate::{
    AppState, Error, endpoints,
    html::{
        BADGE_STYLE, BUTTON_SECONDARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, LINK_STYLE,
        PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_EMPTY_CELL_STYLE, TABLE_HEADER_STYLE,
        TABLE_ROW_STYLE, TABLE_STYLE, base, edit_delete_action_links,
    },
    navigation::NavBar,
    pagination::{Page, PaginationConfig, create_pagination_indicators, page_url, pagination_view},
    source::{Source, SourceId, get_all_sources},
    statement::{
        StatementFilter, StatementId, StatementWithSource,
        db::{count_statements, search_statements},
    },
    timezone::{format_local_date_time, get_local_offset},
};

/// The number of statements shown per page unless the request asks otherwise.
const STATEMENTS_PER_PAGE: u64 = 100;

/// The state needed for the statements listing page.
#[derive(Debug, Clone)]
pub struct StatementsPageState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub pagination_config: PaginationConfig,
    pub local_timezone: String,
}

impl FromRef<AppState> for StatementsPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            pagination_config: state.pagination_config.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The query parameters for the statements page.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StatementsQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<StatementId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<SourceId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_from: Option<Date>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_to: Option<Date>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statement_date_from: Option<Date>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statement_date_to: Option<Date>,
    #[serde(skip_serializing)]
    pub page: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u64>,
}

impl StatementsQuery {
    fn filter(&self) -> StatementFilter {
        StatementFilter {
            id: self.id,
            source_id: self.source_id,
            processed_from: self.processed_from,
            processed_to: self.processed_to,
            statement_date_from: self.statement_date_from,
            statement_date_to: self.statement_date_to,
        }
    }
}

/// Render the statements listing page.
pub async fn get_statements_page(
    State(state): State<StatementsPageState>,
    Query(query): Query<StatementsQuery>,
) -> Result<Response, Error> {
    let local_offset = get_local_offset(&state.local_timezone)
        .ok_or_else(|| Error::InvalidTimezoneError(state.local_timezone.clone()))?;
    let page = Page::resolve(
        query.page,
        query.per_page,
        &state.pagination_config,
        STATEMENTS_PER_PAGE,
    );

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let filter = query.filter();
    let statements = search_statements(&filter, page, &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve statements: {error}"))?;
    let statement_count = count_statements(&filter, &connection)
        .inspect_err(|error| tracing::error!("Failed to count statements: {error}"))?;
    let sources = get_all_sources(&connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve sources: {error}"))?;

    let indicators = create_pagination_indicators(
        page.number,
        page.page_count(statement_count),
        state.pagination_config.max_pages,
    );
    let filter_query = serde_html_form::to_string(&query).unwrap_or_default();
    let pagination = pagination_view(&indicators, |number| {
        page_url(endpoints::STATEMENTS_VIEW, &filter_query, number)
    });

    Ok(statements_view(
        &statements,
        &filter,
        &sources,
        local_offset,
        pagination,
    )
    .into_response())
}

fn date_input(name: &str, label: &str, value: Option<Date>) -> Markup {
    html! {
        div
        {
            label for=(name) class=(FORM_LABEL_STYLE) { (label) }
            input
                id=(name)
                type="date"
                name=(name)
                value=[value.map(|date| date.to_string())]
                class=(FORM_TEXT_INPUT_STYLE);
        }
    }
}

fn filter_form_view(filter: &StatementFilter, sources: &[Source]) -> Markup {
    html! {
        form
            method="get"
            action=(endpoints::STATEMENTS_VIEW)
            aria-label="Filter statements"
            class="grid grid-cols-2 lg:grid-cols-4 gap-4 items-end"
        {
            div
            {
                label for="id" class=(FORM_LABEL_STYLE) { "ID" }
                input
                    id="id"
                    type="number"
                    name="id"
                    min="1"
                    value=[filter.id]
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="source_id" class=(FORM_LABEL_STYLE) { "Source" }
                select id="source_id" name="source_id" class=(FORM_TEXT_INPUT_STYLE)
                {
                    option value="" selected[filter.source_id.is_none()] { "All sources" }

                    @for source in sources {
                        option value=(source.id) selected[filter.source_id == Some(source.id)]
                        {
                            (source.name)
                        }
                    }
                }
            }

            (date_input("processed_from", "Processed from", filter.processed_from))
            (date_input("processed_to", "Processed to", filter.processed_to))
            (date_input("statement_date_from", "Statement date from", filter.statement_date_from))
            (date_input("statement_date_to", "Statement date to", filter.statement_date_to))

            div class="flex gap-2"
            {
                button type="submit" class=(BUTTON_SECONDARY_STYLE) { "Filter" }
                a href=(endpoints::STATEMENTS_VIEW) class=(LINK_STYLE) { "Clear" }
            }
        }
    }
}

fn statements_view(
    statements: &[StatementWithSource],
    filter: &StatementFilter,
    sources: &[Source],
    local_offset: UtcOffset,
    pagination: Markup,
) -> Markup {
    let is_filtered = *filter != StatementFilter::default();

    let table_row = |row: &StatementWithSource| {
        let statement = &row.statement;
        let file_url = endpoints::format_endpoint(endpoints::STATEMENT_FILE, statement.id);
        let edit_url = endpoints::format_endpoint(endpoints::EDIT_STATEMENT_VIEW, statement.id);
        let delete_url = endpoints::format_endpoint(endpoints::STATEMENT, statement.id);
        let confirm_message = format!(
            "Are you sure you want to delete statement #{}? Its file {} will be deleted too.",
            statement.id, statement.filename
        );

        html!(
            tr class=(TABLE_ROW_STYLE)
            {
                td class=(TABLE_CELL_STYLE) { (statement.id) }
                td class=(TABLE_CELL_STYLE)
                {
                    a href=(file_url) class=(LINK_STYLE) { (statement.filename) }
                }
                td class=(TABLE_CELL_STYLE)
                {
                    @match statement.processed_at {
                        Some(processed_at) => {
                            (format_local_date_time(processed_at, local_offset))
                        }
                        None => {
                            span class=(BADGE_STYLE) { "Unprocessed" }
                        }
                    }
                }
                td class=(TABLE_CELL_STYLE) { (row.source_name) }
                td class=(TABLE_CELL_STYLE)
                {
                    (statement.statement_date.map(|date| date.to_string()).unwrap_or_else(|| "-".to_owned()))
                }
                td class=(TABLE_CELL_STYLE)
                {
                    (format_local_date_time(statement.uploaded_at, local_offset))
                }
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
        (NavBar::new(endpoints::STATEMENTS_VIEW).into_html())

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-4 w-full lg:max-w-6xl"
            {
                header class="flex justify-between flex-wrap items-end gap-4"
                {
                    h1 class="text-xl font-bold" { "Statements" }
                    a href=(endpoints::NEW_STATEMENT_VIEW) class=(LINK_STYLE) { "Upload Statement" }
                }

                (filter_form_view(filter, sources))

                div class="overflow-x-auto dark:bg-gray-800"
                {
                    table class=(TABLE_STYLE)
                    {
                        thead class=(TABLE_HEADER_STYLE)
                        {
                            tr
                            {
                                th scope="col" class=(TABLE_CELL_STYLE) { "ID" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Filename" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Processed At" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Source" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Statement Date" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Uploaded At" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                            }
                        }

                        tbody
                        {
                            @for row in statements {
                                (table_row(row))
                            }

                            @if statements.is_empty() {
                                tr
                                {
                                    td colspan="7" class=(TABLE_EMPTY_CELL_STYLE)
                                    {
                                        @if is_filtered {
                                            "No statements match the filters."
                                        } @else {
                                            "No statements yet. "
                                            a href=(endpoints::NEW_STATEMENT_VIEW) class=(LINK_STYLE)
                                            {
                                                "Upload your first statement"
                                            }
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

    base("Statements", &[], &content)
}
