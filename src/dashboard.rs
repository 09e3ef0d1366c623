//! The dashboard route: an overview of how much is stored and what still needs processing.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    category::count_categories,
    endpoints,
    html::{LINK_STYLE, PAGE_CONTAINER_STYLE, base, format_count},
    navigation::NavBar,
    source::count_sources,
    statement::{StatementFilter, count_statements, count_unprocessed_statements},
    transaction::{TransactionFilter, count_transactions},
    user::count_users,
};

/// The state needed for displaying the dashboard page.
#[derive(Debug, Clone)]
pub struct DashboardState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The number of rows of each entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Counts {
    statements: u32,
    unprocessed_statements: u32,
    transactions: u32,
    sources: u32,
    categories: u32,
    users: u32,
}

fn get_counts(connection: &Connection) -> Result<Counts, Error> {
    Ok(Counts {
        statements: count_statements(&StatementFilter::default(), connection)?,
        unprocessed_statements: count_unprocessed_statements(connection)?,
        transactions: count_transactions(&TransactionFilter::default(), connection)?,
        sources: count_sources(None, connection)?,
        categories: count_categories(connection)?,
        users: count_users(connection)?,
    })
}

/// Display a page with an overview of the stored data.
pub async fn get_dashboard_page(State(state): State<DashboardState>) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let counts = get_counts(&connection)
        .inspect_err(|error| tracing::error!("Failed to count dashboard entities: {error}"))?;

    Ok(dashboard_view(counts).into_response())
}

fn count_card(title: &str, count: u32, link: &str) -> Markup {
    html! {
        a
            href=(link)
            class="block p-6 bg-white border border-gray-200 rounded-lg shadow-sm
                hover:bg-gray-100 dark:bg-gray-800 dark:border-gray-700 dark:hover:bg-gray-700"
        {
            p class="text-sm text-gray-500 dark:text-gray-400" { (title) }
            p class="text-3xl font-bold" data-count=(title) { (format_count(count)) }
        }
    }
}

fn dashboard_view(counts: Counts) -> Markup {
    let content = html! {
        (NavBar::new(endpoints::DASHBOARD_VIEW).into_html())

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-6 w-full lg:max-w-5xl"
            {
                h1 class="text-xl font-bold" { "Dashboard" }

                @if counts.unprocessed_statements > 0 {
                    p
                    {
                        (format_count(counts.unprocessed_statements))
                        " of "
                        (format_count(counts.statements))
                        " statements have not been processed yet. "
                        a href=(endpoints::STATEMENTS_VIEW) class=(LINK_STYLE) { "View statements" }
                    }
                } @else if counts.statements == 0 {
                    p
                    {
                        "No statements yet. "
                        a href=(endpoints::NEW_STATEMENT_VIEW) class=(LINK_STYLE)
                        {
                            "Upload your first statement"
                        }
                    }
                }

                div class="grid grid-cols-2 lg:grid-cols-3 gap-4"
                {
                    (count_card("Statements", counts.statements, endpoints::STATEMENTS_VIEW))
                    (count_card("Unprocessed", counts.unprocessed_statements, endpoints::STATEMENTS_VIEW))
                    (count_card("Transactions", counts.transactions, endpoints::TRANSACTIONS_VIEW))
                    (count_card("Sources", counts.sources, endpoints::SOURCES_VIEW))
                    (count_card("Categories", counts.categories, endpoints::CATEGORIES_VIEW))
                    (count_card("Users", counts.users, endpoints::USERS_VIEW))
                }
            }
        }
    };

    base("Dashboard", &[], &content)
}
