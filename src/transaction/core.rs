//! Defines the core data models and database queries for transactions.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row, params,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Type, ValueRef},
};
use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    category::CategoryId,
    database_id::DatabaseId,
    db::is_foreign_key_violation,
    pagination::Page,
    source::SourceId,
    statement::StatementId,
};

// ============================================================================
// MODELS
// ============================================================================

/// Database identifier for a transaction.
pub type TransactionId = DatabaseId;

/// Whether money went into (credit) or out of (debit) the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Credit,
    Debit,
}

impl TransactionType {
    /// The name stored in the database and used in forms.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Credit => "credit",
            TransactionType::Debit => "debit",
        }
    }
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionType::Credit => write!(f, "Credit"),
            TransactionType::Debit => write!(f, "Debit"),
        }
    }
}

impl ToSql for TransactionType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "credit" => Ok(TransactionType::Credit),
            "debit" => Ok(TransactionType::Debit),
            other => Err(FromSqlError::Other(
                format!("unknown transaction type {other:?}").into(),
            )),
        }
    }
}

/// A three letter currency code in upper case, e.g. "NZD".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Currency(String);

impl Currency {
    /// Create a currency code, converting it to upper case.
    ///
    /// # Errors
    /// Returns [Error::InvalidCurrency] unless `code` is three ASCII letters.
    pub fn new(code: &str) -> Result<Self, Error> {
        let code = code.trim();

        if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self(code.to_ascii_uppercase()))
        } else {
            Err(Error::InvalidCurrency(code.to_owned()))
        }
    }
}

impl AsRef<str> for Currency {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ToSql for Currency {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0.as_str()))
    }
}

impl FromSql for Currency {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Ok(Self(value.as_str()?.to_owned()))
    }
}

/// A single line of a statement.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub id: TransactionId,
    /// When the transaction happened.
    pub date: Date,
    /// The amount in `currency`, rounded to cents.
    pub amount: Decimal,
    /// The amount in US dollars, if known. Only stored, never converted.
    pub amount_usd: Option<Decimal>,
    pub currency: Currency,
    pub transaction_type: TransactionType,
    pub statement_id: StatementId,
    pub category_id: CategoryId,
    /// The source of the statement at the time the transaction was created.
    pub source_id: SourceId,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(
        statement_id: StatementId,
        date: Date,
        amount: Decimal,
        currency: Currency,
        transaction_type: TransactionType,
    ) -> TransactionBuilder {
        TransactionBuilder {
            statement_id,
            date,
            amount,
            amount_usd: None,
            currency,
            transaction_type,
            category_id: None,
            source_id: None,
        }
    }
}

/// A builder for creating [Transaction] instances.
///
/// The category and source may be left unset, in which case
/// [crate::transaction::assign_transaction_defaults] fills them in.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct TransactionBuilder {
    pub statement_id: StatementId,
    pub date: Date,
    pub amount: Decimal,
    pub amount_usd: Option<Decimal>,
    pub currency: Currency,
    pub transaction_type: TransactionType,
    pub category_id: Option<CategoryId>,
    pub source_id: Option<SourceId>,
}

impl TransactionBuilder {
    /// Set the amount in US dollars.
    pub fn amount_usd(mut self, amount_usd: Option<Decimal>) -> Self {
        self.amount_usd = amount_usd;
        self
    }

    /// Set the category of the transaction.
    pub fn category_id(mut self, category_id: Option<CategoryId>) -> Self {
        self.category_id = category_id;
        self
    }

    /// Set the source of the transaction.
    pub fn source_id(mut self, source_id: Option<SourceId>) -> Self {
        self.source_id = source_id;
        self
    }
}

/// Conditions for listing transactions. `None` fields match everything.
///
/// All ranges are inclusive.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TransactionFilter {
    pub statement_id: Option<StatementId>,
    pub category_id: Option<CategoryId>,
    pub date_from: Option<Date>,
    pub date_to: Option<Date>,
    pub amount_min: Option<Decimal>,
    pub amount_max: Option<Decimal>,
    pub amount_usd_min: Option<Decimal>,
    pub amount_usd_max: Option<Decimal>,
    pub transaction_type: Option<TransactionType>,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the transaction table in the database.
///
/// Amounts are stored as text so that no precision is lost.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
            id INTEGER PRIMARY KEY,
            date TEXT NOT NULL,
            amount TEXT NOT NULL,
            amount_usd TEXT,
            currency TEXT NOT NULL,
            type TEXT NOT NULL CHECK (type IN ('credit', 'debit')),
            statement_id INTEGER NOT NULL,
            category_id INTEGER NOT NULL,
            source_id INTEGER NOT NULL,
            FOREIGN KEY(statement_id) REFERENCES statement(id) ON UPDATE CASCADE ON DELETE RESTRICT,
            FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE RESTRICT,
            FOREIGN KEY(source_id) REFERENCES source(id) ON UPDATE CASCADE ON DELETE RESTRICT
        );

        CREATE INDEX IF NOT EXISTS idx_transaction_statement_id ON \"transaction\"(statement_id);
        CREATE INDEX IF NOT EXISTS idx_transaction_category_id ON \"transaction\"(category_id);
        CREATE INDEX IF NOT EXISTS idx_transaction_source_id ON \"transaction\"(source_id);
        CREATE INDEX IF NOT EXISTS idx_transaction_date ON \"transaction\"(date);",
    )?;

    Ok(())
}

/// Create a new transaction in the database from a builder.
///
/// Amounts are rounded to two decimal places.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidCategory] if the category is unset or does not exist,
/// - [Error::InvalidSource] if the source is unset or does not exist,
/// - [Error::InvalidStatement] if the statement does not exist,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let Some(category_id) = builder.category_id else {
        return Err(Error::InvalidCategory(None));
    };
    let Some(source_id) = builder.source_id else {
        return Err(Error::InvalidSource(None));
    };
    let amount = builder.amount.round_dp(2);
    let amount_usd = builder.amount_usd.map(|amount| amount.round_dp(2));

    connection
        .execute(
            "INSERT INTO \"transaction\"
            (date, amount, amount_usd, currency, type, statement_id, category_id, source_id)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                builder.date,
                amount.to_string(),
                amount_usd.map(|amount| amount.to_string()),
                builder.currency,
                builder.transaction_type,
                builder.statement_id,
                category_id,
                source_id
            ],
        )
        .map_err(|error| {
            if is_foreign_key_violation(&error) {
                missing_reference_error(builder.statement_id, category_id, source_id, connection)
            } else {
                error.into()
            }
        })?;

    Ok(Transaction {
        id: connection.last_insert_rowid(),
        date: builder.date,
        amount,
        amount_usd,
        currency: builder.currency,
        transaction_type: builder.transaction_type,
        statement_id: builder.statement_id,
        category_id,
        source_id,
    })
}

/// Work out which reference made an insert fail, since SQLite does not say.
fn missing_reference_error(
    statement_id: StatementId,
    category_id: CategoryId,
    source_id: SourceId,
    connection: &Connection,
) -> Error {
    let exists = |table: &str, id: DatabaseId| -> bool {
        connection
            .query_row(
                &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1)"),
                [id],
                |row| row.get(0),
            )
            .unwrap_or(false)
    };

    if !exists("statement", statement_id) {
        Error::InvalidStatement(statement_id)
    } else if !exists("category", category_id) {
        Error::InvalidCategory(Some(category_id))
    } else {
        Error::InvalidSource(Some(source_id))
    }
}

/// Retrieve a transaction from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(id: TransactionId, connection: &Connection) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(
            "SELECT id, date, amount, amount_usd, currency, type, statement_id, category_id,
                source_id
            FROM \"transaction\" WHERE id = :id",
        )?
        .query_row(&[(":id", &id)], map_transaction_row)?;

    Ok(transaction)
}

/// Delete a transaction.
///
/// # Errors
/// Returns [Error::DeleteMissingTransaction] if it does not exist.
pub fn delete_transaction(id: TransactionId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM \"transaction\" WHERE id = ?1", [id])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingTransaction);
    }

    Ok(())
}

const FILTER_CLAUSE: &str = "(?1 IS NULL OR statement_id = ?1)
    AND (?2 IS NULL OR category_id = ?2)
    AND (?3 IS NULL OR date >= ?3)
    AND (?4 IS NULL OR date <= ?4)
    AND (?5 IS NULL OR CAST(amount AS REAL) >= ?5)
    AND (?6 IS NULL OR CAST(amount AS REAL) <= ?6)
    AND (?7 IS NULL OR CAST(amount_usd AS REAL) >= ?7)
    AND (?8 IS NULL OR CAST(amount_usd AS REAL) <= ?8)
    AND (?9 IS NULL OR type = ?9)";

fn to_real(amount: Option<Decimal>) -> Option<f64> {
    amount.and_then(|amount| amount.to_f64())
}

/// Retrieve one page of transactions matching `filter`, newest first.
pub fn search_transactions(
    filter: &TransactionFilter,
    page: Page,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let query = format!(
        "SELECT id, date, amount, amount_usd, currency, type, statement_id, category_id,
            source_id
        FROM \"transaction\"
        WHERE {FILTER_CLAUSE}
        ORDER BY id DESC
        LIMIT ?10 OFFSET ?11"
    );

    connection
        .prepare(&query)?
        .query_map(
            params![
                filter.statement_id,
                filter.category_id,
                filter.date_from,
                filter.date_to,
                to_real(filter.amount_min),
                to_real(filter.amount_max),
                to_real(filter.amount_usd_min),
                to_real(filter.amount_usd_max),
                filter.transaction_type,
                page.limit(),
                page.offset()
            ],
            map_transaction_row,
        )?
        .map(|maybe_transaction| maybe_transaction.map_err(|error| error.into()))
        .collect()
}

/// Count the transactions matching `filter`.
pub fn count_transactions(
    filter: &TransactionFilter,
    connection: &Connection,
) -> Result<u32, Error> {
    connection
        .query_row(
            &format!("SELECT COUNT(id) FROM \"transaction\" WHERE {FILTER_CLAUSE}"),
            params![
                filter.statement_id,
                filter.category_id,
                filter.date_from,
                filter.date_to,
                to_real(filter.amount_min),
                to_real(filter.amount_max),
                to_real(filter.amount_usd_min),
                to_real(filter.amount_usd_max),
                filter.transaction_type
            ],
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

fn decimal_column(row: &Row, index: usize) -> Result<Option<Decimal>, rusqlite::Error> {
    let Some(text) = row.get::<_, Option<String>>(index)? else {
        return Ok(None);
    };

    Decimal::from_str(&text)
        .map(Some)
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(error)))
}

/// Map a database row to a Transaction.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let amount = decimal_column(row, 2)?.ok_or(rusqlite::Error::InvalidColumnType(
        2,
        "amount".to_owned(),
        Type::Null,
    ))?;

    Ok(Transaction {
        id: row.get(0)?,
        date: row.get(1)?,
        amount,
        amount_usd: decimal_column(row, 3)?,
        currency: row.get(4)?,
        transaction_type: row.get(5)?,
        statement_id: row.get(6)?,
        category_id: row.get(7)?,
        source_id: row.get(8)?,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod database_tests {
    use rusqlite::Connection;
    use rust_decimal_macros::dec;
    use time::macros::date;

    use crate::{
        Error,
        category::{CategoryFields, CategoryName, create_category, delete_category},
        pagination::Page,
        source::{SourceFields, SourceName, create_source},
        statement::{StatementFields, Upload, store_upload},
        test_utils::{get_test_connection, test_storage},
    };

    use super::{
        Currency, Transaction, TransactionBuilder, TransactionFilter, TransactionType,
        count_transactions, create_transaction, delete_transaction, get_transaction,
        search_transactions,
    };

    struct Fixture {
        connection: Connection,
        statement_id: i64,
        category_id: i64,
        source_id: i64,
        _temp_dir: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let temp_dir = tempfile::tempdir().unwrap();
        let connection = get_test_connection();
        let source = create_source(
            SourceFields {
                name: SourceName::new_unchecked("ANZ"),
                description: None,
                ai_instruction: None,
            },
            &connection,
        )
        .unwrap();
        let category = create_category(
            CategoryFields {
                icon: "🛒".to_owned(),
                name: CategoryName::new_unchecked("Groceries"),
                description: None,
            },
            &connection,
        )
        .unwrap();
        let statement = store_upload(
            &Upload {
                client_name: "jan.csv".to_owned(),
                content_type: Some("text/csv".to_owned()),
                bytes: b"a,b".to_vec(),
            },
            &StatementFields {
                source_id: source.id,
                statement_date: None,
            },
            &test_storage(temp_dir.path()),
            &connection,
        )
        .unwrap();

        Fixture {
            connection,
            statement_id: statement.id,
            category_id: category.id,
            source_id: source.id,
            _temp_dir: temp_dir,
        }
    }

    fn builder(fixture: &Fixture, amount: rust_decimal::Decimal) -> TransactionBuilder {
        Transaction::build(
            fixture.statement_id,
            date!(2025 - 01 - 15),
            amount,
            Currency::new("nzd").unwrap(),
            TransactionType::Debit,
        )
        .category_id(Some(fixture.category_id))
        .source_id(Some(fixture.source_id))
    }

    fn all_pages() -> Page {
        Page {
            number: 1,
            size: 100,
        }
    }

    #[test]
    fn currency_must_be_three_letters() {
        assert_eq!(Currency::new(" usd ").unwrap().as_ref(), "USD");
        assert_eq!(
            Currency::new("US"),
            Err(Error::InvalidCurrency("US".to_owned()))
        );
        assert_eq!(
            Currency::new("U5D"),
            Err(Error::InvalidCurrency("U5D".to_owned()))
        );
    }

    #[test]
    fn create_succeeds_and_rounds_amounts() {
        let fixture = fixture();

        let transaction = create_transaction(
            builder(&fixture, dec!(12.345)).amount_usd(Some(dec!(7.1))),
            &fixture.connection,
        )
        .unwrap();

        assert_eq!(transaction.amount, dec!(12.34));
        assert_eq!(transaction.amount_usd, Some(dec!(7.10)));
        assert_eq!(
            get_transaction(transaction.id, &fixture.connection),
            Ok(transaction)
        );
    }

    #[test]
    fn create_without_category_fails() {
        let fixture = fixture();

        let result = create_transaction(
            builder(&fixture, dec!(1)).category_id(None),
            &fixture.connection,
        );

        assert_eq!(result, Err(Error::InvalidCategory(None)));
    }

    #[test]
    fn create_reports_the_missing_reference() {
        let fixture = fixture();

        assert_eq!(
            create_transaction(builder(&fixture, dec!(1)).category_id(Some(99)), &fixture.connection),
            Err(Error::InvalidCategory(Some(99)))
        );
        assert_eq!(
            create_transaction(builder(&fixture, dec!(1)).source_id(Some(98)), &fixture.connection),
            Err(Error::InvalidSource(Some(98)))
        );

        let mut dangling = builder(&fixture, dec!(1));
        dangling.statement_id = 97;
        assert_eq!(
            create_transaction(dangling, &fixture.connection),
            Err(Error::InvalidStatement(97))
        );
    }

    #[test]
    fn category_in_use_cannot_be_deleted() {
        let fixture = fixture();
        create_transaction(builder(&fixture, dec!(5)), &fixture.connection).unwrap();

        assert_eq!(
            delete_category(fixture.category_id, &fixture.connection),
            Err(Error::CategoryInUse)
        );
    }

    #[test]
    fn delete_transaction_then_missing() {
        let fixture = fixture();
        let transaction = create_transaction(builder(&fixture, dec!(5)), &fixture.connection).unwrap();

        assert_eq!(delete_transaction(transaction.id, &fixture.connection), Ok(()));
        assert_eq!(
            delete_transaction(transaction.id, &fixture.connection),
            Err(Error::DeleteMissingTransaction)
        );
    }

    #[test]
    fn search_filters_by_amount_and_type() {
        let fixture = fixture();
        for amount in [dec!(5), dec!(50), dec!(500)] {
            create_transaction(builder(&fixture, amount), &fixture.connection).unwrap();
        }
        let mut credit = builder(&fixture, dec!(75));
        credit.transaction_type = TransactionType::Credit;
        create_transaction(credit, &fixture.connection).unwrap();

        let filter = TransactionFilter {
            amount_min: Some(dec!(10)),
            amount_max: Some(dec!(100)),
            transaction_type: Some(TransactionType::Debit),
            ..Default::default()
        };
        let got = search_transactions(&filter, all_pages(), &fixture.connection).unwrap();

        assert_eq!(got.len(), 1);
        assert_eq!(got[0].amount, dec!(50));
        assert_eq!(count_transactions(&filter, &fixture.connection), Ok(1));
        assert_eq!(
            count_transactions(&TransactionFilter::default(), &fixture.connection),
            Ok(4)
        );
    }

    #[test]
    fn search_is_newest_first_and_filters_dates() {
        let fixture = fixture();
        let mut old = builder(&fixture, dec!(1));
        old.date = date!(2024 - 12 - 31);
        let old = create_transaction(old, &fixture.connection).unwrap();
        let new = create_transaction(builder(&fixture, dec!(2)), &fixture.connection).unwrap();

        let all = search_transactions(&TransactionFilter::default(), all_pages(), &fixture.connection)
            .unwrap();
        assert_eq!(all.iter().map(|t| t.id).collect::<Vec<_>>(), [new.id, old.id]);

        let filter = TransactionFilter {
            date_to: Some(date!(2024 - 12 - 31)),
            ..Default::default()
        };
        let got = search_transactions(&filter, all_pages(), &fixture.connection).unwrap();
        assert_eq!(got, [old]);
    }
}
