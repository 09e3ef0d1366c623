//! Categories group transactions, e.g. "Groceries" or "Other Transactions".

mod create;
mod db;
mod delete;
mod domain;
mod edit;
mod list;

pub use create::{create_category_endpoint, get_new_category_page};
pub use db::{
    count_categories, create_category, create_category_table, delete_category,
    get_all_categories, get_category, get_category_by_name, get_first_category, list_categories,
    update_category,
};
pub use delete::delete_category_endpoint;
pub use domain::{Category, CategoryFields, CategoryId, CategoryName, DEFAULT_CATEGORY_NAME};
pub use edit::{get_edit_category_page, update_category_endpoint};
pub use list::get_categories_page;
