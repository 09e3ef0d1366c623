//! Transaction creation page and endpoint.

use std::{
    str::FromStr,
    sync::{Arc, Mutex},
};

use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
// Must use axum_extra's Form since that parses an empty string as None instead
// of crashing like axum::Form.
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    AppState, Error, endpoints,
    category::{Category, CategoryId, get_all_categories},
    html::{
        BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE,
        LINK_STYLE, base, form_field, optional_text,
    },
    navigation::NavBar,
    statement::{StatementId, StatementWithSource, get_all_statements},
    timezone::get_local_offset,
    transaction::{
        core::{Currency, Transaction, TransactionBuilder, TransactionType, create_transaction},
        defaults::assign_transaction_defaults,
    },
};

/// The state needed for creating a transaction.
#[derive(Debug, Clone)]
pub struct CreateTransactionState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub local_timezone: String,
}

impl FromRef<AppState> for CreateTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The form data for creating a transaction.
///
/// Amounts are kept as text until validated so that a bad value produces a
/// helpful alert.
#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionFormData {
    pub statement_id: StatementId,
    pub date: Date,
    pub amount: String,
    pub currency: String,
    pub transaction_type: TransactionType,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub amount_usd: Option<String>,
}

fn parse_amount(text: &str) -> Result<Decimal, Error> {
    let text = text.trim();
    Decimal::from_str(text).map_err(|_| Error::InvalidAmount(text.to_owned()))
}

/// Render the transaction creation page.
pub async fn get_new_transaction_page(
    State(state): State<CreateTransactionState>,
) -> Result<Response, Error> {
    let local_offset = get_local_offset(&state.local_timezone)
        .ok_or_else(|| Error::InvalidTimezoneError(state.local_timezone.clone()))?;
    let today = OffsetDateTime::now_utc().to_offset(local_offset).date();

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let statements = get_all_statements(&connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve statements: {error}"))?;
    let categories = get_all_categories(&connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve categories: {error}"))?;

    let content = html! {
        (NavBar::new(endpoints::TRANSACTIONS_VIEW).into_html())
        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold mb-4" { "New Transaction" }

            @if statements.is_empty() {
                p
                {
                    "Transactions belong to a statement. "
                    a href=(endpoints::NEW_STATEMENT_VIEW) class=(LINK_STYLE)
                    {
                        "Upload a statement"
                    }
                    " first."
                }
            } @else {
                (transaction_form_view(&statements, &categories, today))
            }
        }
    };

    Ok(base("New Transaction", &[], &content).into_response())
}

fn transaction_form_view(
    statements: &[StatementWithSource],
    categories: &[Category],
    today: Date,
) -> Markup {
    html! {
        form
            hx-post=(endpoints::POST_TRANSACTION)
            hx-target-error="#alert-container"
            class="w-full space-y-4 md:space-y-6"
        {
            (form_field("statement_id", "Statement", html! {
                select id="statement_id" name="statement_id" required class=(FORM_TEXT_INPUT_STYLE)
                {
                    @for statement in statements {
                        option value=(statement.statement.id) { (statement.label()) }
                    }
                }
            }, Some("The source of the transaction is taken from the statement.")))

            (form_field("date", "Date", html! {
                input
                    id="date"
                    type="date"
                    name="date"
                    value=(today)
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }, None))

            (form_field("amount", "Amount", html! {
                input
                    id="amount"
                    type="text"
                    name="amount"
                    inputmode="decimal"
                    placeholder="0.00"
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }, None))

            (form_field("currency", "Currency", html! {
                input
                    id="currency"
                    type="text"
                    name="currency"
                    maxlength="3"
                    placeholder="NZD"
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }, Some("A 3-letter code such as USD, CAD or EUR.")))

            fieldset
            {
                legend class=(FORM_LABEL_STYLE) { "Type" }
                div class="flex gap-6"
                {
                    @for transaction_type in [TransactionType::Debit, TransactionType::Credit] {
                        label class="flex items-center gap-2"
                        {
                            input
                                type="radio"
                                name="transaction_type"
                                value=(transaction_type.as_str())
                                checked[transaction_type == TransactionType::Debit]
                                required;
                            (transaction_type)
                        }
                    }
                }
            }

            (form_field("category_id", "Category", html! {
                select id="category_id" name="category_id" class=(FORM_TEXT_INPUT_STYLE)
                {
                    option value="" selected { "Default" }

                    @for category in categories {
                        option value=(category.id) { (category.icon) " " (category.name) }
                    }
                }
            }, Some("Leave as default to use \"Other Transactions\".")))

            (form_field("amount_usd", "Amount (USD)", html! {
                input
                    id="amount_usd"
                    type="text"
                    name="amount_usd"
                    inputmode="decimal"
                    placeholder="Optional"
                    class=(FORM_TEXT_INPUT_STYLE);
            }, None))

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Create Transaction" }
        }
    }
}

/// A route handler for creating a new transaction, redirects to transactions view on success.
pub async fn create_transaction_endpoint(
    State(state): State<CreateTransactionState>,
    Form(form): Form<TransactionFormData>,
) -> Response {
    let builder = match build_transaction(form) {
        Ok(builder) => builder,
        Err(error) => {
            tracing::warn!("rejected new transaction: {error}");
            return error.into_alert_response();
        }
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let result = assign_transaction_defaults(builder, &connection)
        .and_then(|builder| create_transaction(builder, &connection));

    match result {
        Ok(transaction) => {
            tracing::info!(
                "created transaction {} on statement {}",
                transaction.id,
                transaction.statement_id
            );
            (
                HxRedirect(endpoints::TRANSACTIONS_VIEW.to_owned()),
                StatusCode::SEE_OTHER,
            )
                .into_response()
        }
        Err(
            error @ (Error::InvalidStatement(_)
            | Error::InvalidCategory(_)
            | Error::InvalidSource(_)),
        ) => {
            tracing::warn!("could not create transaction: {error}");
            error.into_alert_response()
        }
        Err(error) => {
            tracing::error!("An unexpected error occurred while creating a transaction: {error}");
            error.into_alert_response()
        }
    }
}

fn build_transaction(form: TransactionFormData) -> Result<TransactionBuilder, Error> {
    let amount = parse_amount(&form.amount)?;
    let currency = Currency::new(&form.currency)?;
    let amount_usd = optional_text(form.amount_usd)
        .map(|text| parse_amount(&text))
        .transpose()?;

    Ok(Transaction::build(
        form.statement_id,
        form.date,
        amount,
        currency,
        form.transaction_type,
    )
    .amount_usd(amount_usd)
    .category_id(form.category_id))
}
