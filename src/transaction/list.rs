//! Transactions listing page with filters.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::Query;
use maud::{Markup, html};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    AppState, Error, endpoints,
    category::{Category, CategoryId, get_all_categories},
    html::{
        BADGE_STYLE, BUTTON_SECONDARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, LINK_STYLE,
        PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_EMPTY_CELL_STYLE, TABLE_HEADER_STYLE,
        TABLE_ROW_STYLE, TABLE_STYLE, base, delete_action_link, format_amount_with_currency,
    },
    navigation::NavBar,
    pagination::{Page, PaginationConfig, create_pagination_indicators, page_url, pagination_view},
    source::{SourceId, get_all_sources},
    statement::StatementId,
    transaction::core::{
        Transaction, TransactionFilter, TransactionType, count_transactions, search_transactions,
    },
};

/// The number of transactions shown per page unless the request asks otherwise.
const TRANSACTIONS_PER_PAGE: u64 = 100;

/// The state needed for the transactions listing page.
#[derive(Debug, Clone)]
pub struct TransactionsViewState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub pagination_config: PaginationConfig,
}

impl FromRef<AppState> for TransactionsViewState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            pagination_config: state.pagination_config.clone(),
        }
    }
}

/// The query parameters for the transactions page.
///
/// Amount bounds are kept as text so that a half-typed number is ignored
/// rather than rejecting the whole request.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TransactionsQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statement_id: Option<StatementId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_from: Option<Date>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<Date>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_min: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_max: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_usd_min: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_usd_max: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_type: Option<TransactionType>,
    #[serde(skip_serializing)]
    pub page: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u64>,
}

fn parse_bound(text: &Option<String>) -> Option<Decimal> {
    text.as_deref()
        .and_then(|text| text.trim().parse::<Decimal>().ok())
}

impl TransactionsQuery {
    fn filter(&self) -> TransactionFilter {
        TransactionFilter {
            statement_id: self.statement_id,
            category_id: self.category_id,
            date_from: self.date_from,
            date_to: self.date_to,
            amount_min: parse_bound(&self.amount_min),
            amount_max: parse_bound(&self.amount_max),
            amount_usd_min: parse_bound(&self.amount_usd_min),
            amount_usd_max: parse_bound(&self.amount_usd_max),
            transaction_type: self.transaction_type,
        }
    }
}

/// Render an overview of the user's transactions.
pub async fn get_transactions_page(
    State(state): State<TransactionsViewState>,
    Query(query): Query<TransactionsQuery>,
) -> Result<Response, Error> {
    let page = Page::resolve(
        query.page,
        query.per_page,
        &state.pagination_config,
        TRANSACTIONS_PER_PAGE,
    );

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let filter = query.filter();
    let transactions = search_transactions(&filter, page, &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve transactions: {error}"))?;
    let transaction_count = count_transactions(&filter, &connection)
        .inspect_err(|error| tracing::error!("Failed to count transactions: {error}"))?;
    let categories = get_all_categories(&connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve categories: {error}"))?;
    let source_names: HashMap<SourceId, String> = get_all_sources(&connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve sources: {error}"))?
        .into_iter()
        .map(|source| (source.id, source.name.to_string()))
        .collect();

    let indicators = create_pagination_indicators(
        page.number,
        page.page_count(transaction_count),
        state.pagination_config.max_pages,
    );
    let filter_query = serde_html_form::to_string(&query).unwrap_or_default();
    let pagination = pagination_view(&indicators, |number| {
        page_url(endpoints::TRANSACTIONS_VIEW, &filter_query, number)
    });

    Ok(transactions_view(
        &transactions,
        &query,
        filter != TransactionFilter::default(),
        &categories,
        &source_names,
        pagination,
    )
    .into_response())
}

fn text_input(name: &str, label: &str, value: Option<&str>) -> Markup {
    html! {
        div
        {
            label for=(name) class=(FORM_LABEL_STYLE) { (label) }
            input
                id=(name)
                type="text"
                inputmode="decimal"
                name=(name)
                value=[value]
                class=(FORM_TEXT_INPUT_STYLE);
        }
    }
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

fn filter_form_view(query: &TransactionsQuery, categories: &[Category]) -> Markup {
    html! {
        form
            method="get"
            action=(endpoints::TRANSACTIONS_VIEW)
            aria-label="Filter transactions"
            class="grid grid-cols-2 lg:grid-cols-4 gap-4 items-end"
        {
            div
            {
                label for="statement_id" class=(FORM_LABEL_STYLE) { "Statement ID" }
                input
                    id="statement_id"
                    type="number"
                    name="statement_id"
                    min="1"
                    value=[query.statement_id]
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="category_id" class=(FORM_LABEL_STYLE) { "Category" }
                select id="category_id" name="category_id" class=(FORM_TEXT_INPUT_STYLE)
                {
                    option value="" selected[query.category_id.is_none()] { "All categories" }

                    @for category in categories {
                        option value=(category.id) selected[query.category_id == Some(category.id)]
                        {
                            (category.name)
                        }
                    }
                }
            }

            div
            {
                label for="transaction_type" class=(FORM_LABEL_STYLE) { "Type" }
                select id="transaction_type" name="transaction_type" class=(FORM_TEXT_INPUT_STYLE)
                {
                    option value="" selected[query.transaction_type.is_none()] { "Any" }

                    @for transaction_type in [TransactionType::Debit, TransactionType::Credit] {
                        option
                            value=(transaction_type.as_str())
                            selected[query.transaction_type == Some(transaction_type)]
                        {
                            (transaction_type)
                        }
                    }
                }
            }

            (date_input("date_from", "Date from", query.date_from))
            (date_input("date_to", "Date to", query.date_to))
            (text_input("amount_min", "Amount min", query.amount_min.as_deref()))
            (text_input("amount_max", "Amount max", query.amount_max.as_deref()))
            (text_input("amount_usd_min", "USD min", query.amount_usd_min.as_deref()))
            (text_input("amount_usd_max", "USD max", query.amount_usd_max.as_deref()))

            div class="flex gap-2"
            {
                button type="submit" class=(BUTTON_SECONDARY_STYLE) { "Filter" }
                a href=(endpoints::TRANSACTIONS_VIEW) class=(LINK_STYLE) { "Clear" }
            }
        }
    }
}

fn transactions_view(
    transactions: &[Transaction],
    query: &TransactionsQuery,
    is_filtered: bool,
    categories: &[Category],
    source_names: &HashMap<SourceId, String>,
    pagination: Markup,
) -> Markup {
    let category_names: HashMap<CategoryId, String> = categories
        .iter()
        .map(|category| (category.id, format!("{} {}", category.icon, category.name)))
        .collect();

    let table_row = |transaction: &Transaction| {
        let delete_url = endpoints::format_endpoint(endpoints::TRANSACTION, transaction.id);
        let statement_url = format!(
            "{}?id={}",
            endpoints::STATEMENTS_VIEW,
            transaction.statement_id
        );
        let confirm_message = format!(
            "Are you sure you want to delete transaction #{}?",
            transaction.id
        );

        html!(
            tr class=(TABLE_ROW_STYLE)
            {
                td class=(TABLE_CELL_STYLE) { (transaction.id) }
                td class=(TABLE_CELL_STYLE) { (transaction.date) }
                td class="px-6 py-4 text-right"
                {
                    (format_amount_with_currency(transaction.amount, transaction.currency.as_ref()))
                }
                td class="px-6 py-4 text-right"
                {
                    @match transaction.amount_usd {
                        Some(amount_usd) => {
                            (format_amount_with_currency(amount_usd, "USD"))
                        }
                        None => {
                            "-"
                        }
                    }
                }
                td class=(TABLE_CELL_STYLE)
                {
                    span class=(BADGE_STYLE) { (transaction.transaction_type) }
                }
                td class=(TABLE_CELL_STYLE)
                {
                    (category_names.get(&transaction.category_id).map(String::as_str).unwrap_or("-"))
                }
                td class=(TABLE_CELL_STYLE)
                {
                    (source_names.get(&transaction.source_id).map(String::as_str).unwrap_or("-"))
                }
                td class=(TABLE_CELL_STYLE)
                {
                    a href=(statement_url) class=(LINK_STYLE) { "#" (transaction.statement_id) }
                }
                td class=(TABLE_CELL_STYLE)
                {
                    (delete_action_link(&delete_url, &confirm_message, "closest tr", "delete"))
                }
            }
        )
    };

    let content = html!(
        (NavBar::new(endpoints::TRANSACTIONS_VIEW).into_html())

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-4 w-full lg:max-w-6xl"
            {
                header class="flex justify-between flex-wrap items-end gap-4"
                {
                    h1 class="text-xl font-bold" { "Transactions" }
                    a href=(endpoints::NEW_TRANSACTION_VIEW) class=(LINK_STYLE) { "Create Transaction" }
                }

                (filter_form_view(query, categories))

                div class="overflow-x-auto dark:bg-gray-800"
                {
                    table class=(TABLE_STYLE)
                    {
                        thead class=(TABLE_HEADER_STYLE)
                        {
                            tr
                            {
                                th scope="col" class=(TABLE_CELL_STYLE) { "ID" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                                th scope="col" class="px-6 py-3 text-right" { "Amount" }
                                th scope="col" class="px-6 py-3 text-right" { "Amount (USD)" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Type" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Source" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Statement" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                            }
                        }

                        tbody
                        {
                            @for transaction in transactions {
                                (table_row(transaction))
                            }

                            @if transactions.is_empty() {
                                tr
                                {
                                    td colspan="9" class=(TABLE_EMPTY_CELL_STYLE)
                                    {
                                        @if is_filtered {
                                            "No transactions match the filters."
                                        } @else {
                                            "No transactions yet. "
                                            a href=(endpoints::NEW_TRANSACTION_VIEW) class=(LINK_STYLE)
                                            {
                                                "Create a transaction"
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

    base("Transactions", &[], &content)
}

#[cfg(test)]
mod tests {
    use axum::{extract::State, http::StatusCode, response::IntoResponse};
    use axum_extra::extract::Query;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;
    use time::macros::date;

    use crate::{
        category::{CategoryFields, CategoryName, create_category},
        pagination::PaginationConfig,
        source::{SourceFields, SourceName, create_source},
        statement::{StatementFields, Upload, store_upload},
        test_utils::{
            assert_valid_html, get_test_connection, parse_html_document, select_text,
            shared_connection, table_rows, test_storage,
        },
        transaction::core::{Currency, Transaction, TransactionType, create_transaction},
    };

    use super::{TransactionsQuery, TransactionsViewState, get_transactions_page};

    fn get_state(temp_dir: &TempDir, amounts: &[(Decimal, TransactionType)]) -> TransactionsViewState {
        let connection = get_test_connection();
        let source = create_source(
            SourceFields {
                name: SourceName::new_unchecked("Westpac"),
                description: None,
                ai_instruction: None,
            },
            &connection,
        )
        .unwrap();
        let category = create_category(
            CategoryFields {
                icon: "🍔".to_owned(),
                name: CategoryName::new_unchecked("Eating Out"),
                description: None,
            },
            &connection,
        )
        .unwrap();
        let statement = store_upload(
            &Upload {
                client_name: "june.csv".to_owned(),
                content_type: Some("text/csv".to_owned()),
                bytes: b"x".to_vec(),
            },
            &StatementFields {
                source_id: source.id,
                statement_date: None,
            },
            &test_storage(temp_dir.path()),
            &connection,
        )
        .unwrap();

        for (amount, transaction_type) in amounts {
            create_transaction(
                Transaction::build(
                    statement.id,
                    date!(2025 - 06 - 10),
                    *amount,
                    Currency::new("NZD").unwrap(),
                    *transaction_type,
                )
                .category_id(Some(category.id))
                .source_id(Some(source.id)),
                &connection,
            )
            .unwrap();
        }

        TransactionsViewState {
            db_connection: shared_connection(connection),
            pagination_config: PaginationConfig::default(),
        }
    }

    #[tokio::test]
    async fn lists_transactions_newest_first() {
        let temp_dir = tempfile::tempdir().unwrap();
        let state = get_state(
            &temp_dir,
            &[
                (dec!(1234.5), TransactionType::Debit),
                (dec!(20), TransactionType::Credit),
            ],
        );

        let response = get_transactions_page(State(state), Query(TransactionsQuery::default()))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        let rows = table_rows(&html);
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0][..8],
            [
                "2",
                "2025-06-10",
                "NZD 20.00",
                "-",
                "Credit",
                "🍔 Eating Out",
                "Westpac",
                "#1"
            ]
        );
        assert_eq!(rows[1][2], "NZD 1,234.50");
    }

    #[tokio::test]
    async fn filters_by_amount_range() {
        let temp_dir = tempfile::tempdir().unwrap();
        let state = get_state(
            &temp_dir,
            &[
                (dec!(5), TransactionType::Debit),
                (dec!(50), TransactionType::Debit),
                (dec!(500), TransactionType::Debit),
            ],
        );
        let query = TransactionsQuery {
            amount_min: Some("10".to_owned()),
            amount_max: Some("100".to_owned()),
            ..Default::default()
        };

        let response = get_transactions_page(State(state), Query(query))
            .await
            .into_response();

        let html = parse_html_document(response).await;
        let rows = table_rows(&html);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][2], "NZD 50.00");
    }

    #[tokio::test]
    async fn ignores_unparseable_amount_bounds() {
        let temp_dir = tempfile::tempdir().unwrap();
        let state = get_state(&temp_dir, &[(dec!(5), TransactionType::Debit)]);
        let query = TransactionsQuery {
            amount_min: Some("abc".to_owned()),
            ..Default::default()
        };

        let response = get_transactions_page(State(state), Query(query))
            .await
            .into_response();

        let html = parse_html_document(response).await;
        assert_eq!(table_rows(&html).len(), 1);
    }

    #[tokio::test]
    async fn empty_state_links_to_create() {
        let temp_dir = tempfile::tempdir().unwrap();
        let state = get_state(&temp_dir, &[]);

        let response = get_transactions_page(State(state), Query(TransactionsQuery::default()))
            .await
            .into_response();

        let html = parse_html_document(response).await;
        assert_eq!(
            select_text(&html, "tbody td"),
            ["No transactions yet. Create a transaction"]
        );
    }

    #[tokio::test]
    async fn filtered_empty_state() {
        let temp_dir = tempfile::tempdir().unwrap();
        let state = get_state(&temp_dir, &[(dec!(5), TransactionType::Debit)]);
        let query = TransactionsQuery {
            transaction_type: Some(TransactionType::Credit),
            ..Default::default()
        };

        let response = get_transactions_page(State(state), Query(query))
            .await
            .into_response();

        let html = parse_html_document(response).await;
        assert_eq!(
            select_text(&html, "tbody td"),
            ["No transactions match the filters."]
        );
    }
}
