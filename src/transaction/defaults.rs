//! Fills in the category and source of a new transaction when they are not chosen.

use rusqlite::Connection;

use crate::{
    Error,
    category::{DEFAULT_CATEGORY_NAME, get_category_by_name, get_first_category},
    statement::get_statement,
};

use super::core::TransactionBuilder;

/// Complete `builder` before it is saved.
///
/// A missing source is copied from the transaction's statement. A missing
/// category falls back to the category named [DEFAULT_CATEGORY_NAME], and
/// then to the category with the lowest ID.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidStatement] if the statement does not exist,
/// - [Error::InvalidCategory] if no category is chosen and none exist,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn assign_transaction_defaults(
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<TransactionBuilder, Error> {
    let statement = get_statement(builder.statement_id, connection).map_err(|error| match error {
        Error::NotFound => Error::InvalidStatement(builder.statement_id),
        error => error,
    })?;

    let builder = match builder.source_id {
        Some(_) => builder,
        None => builder.source_id(Some(statement.source_id)),
    };

    if builder.category_id.is_some() {
        return Ok(builder);
    }

    if let Some(category) = get_category_by_name(DEFAULT_CATEGORY_NAME, connection)? {
        tracing::info!(
            "assigning default category \"{}\" to new transaction on statement {}",
            category.name,
            statement.id
        );
        return Ok(builder.category_id(Some(category.id)));
    }

    match get_first_category(connection)? {
        Some(category) => {
            tracing::warn!(
                "no category named \"{DEFAULT_CATEGORY_NAME}\", assigning \"{}\" to new \
                transaction on statement {}",
                category.name,
                statement.id
            );
            Ok(builder.category_id(Some(category.id)))
        }
        None => {
            tracing::warn!(
                "cannot assign a category to new transaction on statement {}: no categories exist",
                statement.id
            );
            Err(Error::InvalidCategory(None))
        }
    }
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;
    use time::macros::date;

    use crate::{
        Error,
        category::{CategoryFields, CategoryName, create_category},
        source::{SourceFields, SourceName, create_source},
        statement::{StatementFields, Upload, store_upload},
        test_utils::{get_test_connection, test_storage},
        transaction::core::{Currency, Transaction, TransactionBuilder, TransactionType},
    };

    use super::assign_transaction_defaults;

    fn add_category(name: &str, connection: &Connection) -> i64 {
        create_category(
            CategoryFields {
                icon: "📁".to_owned(),
                name: CategoryName::new_unchecked(name),
                description: None,
            },
            connection,
        )
        .unwrap()
        .id
    }

    /// Returns the builder, the statement's source ID and the storage dir guard.
    fn new_builder(connection: &Connection) -> (TransactionBuilder, i64, TempDir) {
        let temp_dir = tempfile::tempdir().unwrap();
        let source = create_source(
            SourceFields {
                name: SourceName::new_unchecked("Visa"),
                description: None,
                ai_instruction: None,
            },
            connection,
        )
        .unwrap();
        let statement = store_upload(
            &Upload {
                client_name: "statement.pdf".to_owned(),
                content_type: Some("application/pdf".to_owned()),
                bytes: b"%PDF-1.7".to_vec(),
            },
            &StatementFields {
                source_id: source.id,
                statement_date: None,
            },
            &test_storage(temp_dir.path()),
            connection,
        )
        .unwrap();

        let builder = Transaction::build(
            statement.id,
            date!(2025 - 03 - 01),
            dec!(9.99),
            Currency::new("USD").unwrap(),
            TransactionType::Debit,
        );

        (builder, source.id, temp_dir)
    }

    #[test]
    fn copies_source_from_statement() {
        let connection = get_test_connection();
        let category_id = add_category("Food", &connection);
        let (builder, source_id, _temp_dir) = new_builder(&connection);

        let got =
            assign_transaction_defaults(builder.category_id(Some(category_id)), &connection)
                .unwrap();

        assert_eq!(got.source_id, Some(source_id));
        assert_eq!(got.category_id, Some(category_id));
    }

    #[test]
    fn keeps_chosen_source() {
        let connection = get_test_connection();
        add_category("Food", &connection);
        let (builder, statement_source_id, _temp_dir) = new_builder(&connection);
        let other_source = create_source(
            SourceFields {
                name: SourceName::new_unchecked("Mastercard"),
                description: None,
                ai_instruction: None,
            },
            &connection,
        )
        .unwrap();

        let got =
            assign_transaction_defaults(builder.source_id(Some(other_source.id)), &connection)
                .unwrap();

        assert_ne!(other_source.id, statement_source_id);
        assert_eq!(got.source_id, Some(other_source.id));
    }

    #[test]
    fn prefers_named_default_category() {
        let connection = get_test_connection();
        add_category("Food", &connection);
        let default_id = add_category("Other Transactions", &connection);
        let (builder, _, _temp_dir) = new_builder(&connection);

        let got = assign_transaction_defaults(builder, &connection).unwrap();

        assert_eq!(got.category_id, Some(default_id));
    }

    #[test]
    fn falls_back_to_first_category() {
        let connection = get_test_connection();
        let first_id = add_category("Food", &connection);
        add_category("Rent", &connection);
        let (builder, _, _temp_dir) = new_builder(&connection);

        let got = assign_transaction_defaults(builder, &connection).unwrap();

        assert_eq!(got.category_id, Some(first_id));
    }

    #[test]
    fn fails_without_any_category() {
        let connection = get_test_connection();
        let (builder, _, _temp_dir) = new_builder(&connection);

        let got = assign_transaction_defaults(builder, &connection);

        assert_eq!(got, Err(Error::InvalidCategory(None)));
    }

    #[test]
    fn fails_for_missing_statement() {
        let connection = get_test_connection();
        add_category("Food", &connection);
        let (mut builder, _, _temp_dir) = new_builder(&connection);
        builder.statement_id = 404;

        let got = assign_transaction_defaults(builder, &connection);

        assert_eq!(got, Err(Error::InvalidStatement(404)));
    }
}
