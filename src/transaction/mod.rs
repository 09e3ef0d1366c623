//! Transactions are the individual lines of a statement.
//!
//! Every transaction belongs to a statement, a category and a source. The
//! source always matches the statement's source at creation time and the
//! category falls back to "Other Transactions" when none is chosen, see
//! [assign_transaction_defaults].

mod core;
mod create;
mod defaults;
mod delete;
mod list;

pub use core::{
    Currency, Transaction, TransactionBuilder, TransactionFilter, TransactionId, TransactionType,
    count_transactions, create_transaction, create_transaction_table, delete_transaction,
    get_transaction, map_transaction_row, search_transactions,
};
pub use create::{create_transaction_endpoint, get_new_transaction_page};
pub use defaults::assign_transaction_defaults;
pub use delete::delete_transaction_endpoint;
pub use list::get_transactions_page;
