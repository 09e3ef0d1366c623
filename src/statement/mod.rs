//! Statements are the uploaded CSV or PDF files from a source.
//!
//! Each statement row owns exactly one file in the [StatementStorage]
//! directory. [store_upload] and [delete_statement_with_file] keep the two
//! together.

mod create;
mod db;
mod delete;
mod domain;
mod download;
mod edit;
mod lifecycle;
mod list;
mod storage;
mod upload;

pub use create::{create_statement_endpoint, get_new_statement_page};
pub use db::{
    count_statements, count_unprocessed_statements, create_statement_table, get_all_statements,
    get_statement, search_statements,
};
pub use delete::delete_statement_endpoint;
pub use domain::{Statement, StatementFields, StatementFilter, StatementId, StatementWithSource};
pub use download::get_statement_file;
pub use edit::{get_edit_statement_page, update_statement_endpoint};
pub use lifecycle::{delete_statement_with_file, scan_storage, store_upload};
pub use list::get_statements_page;
pub use storage::{OrphanReport, StatementStorage};
pub use upload::{MAX_UPLOAD_SIZE, Upload};
