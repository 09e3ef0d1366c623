//! Sources are the banks and card accounts that statements come from.

mod create;
mod db;
mod delete;
mod domain;
mod edit;
mod list;

pub use create::{create_source_endpoint, get_new_source_page};
pub use db::{
    count_sources, create_source, create_source_table, delete_source, get_all_sources, get_source,
    search_sources, update_source,
};
pub use delete::delete_source_endpoint;
pub use domain::{Source, SourceFields, SourceId, SourceName};
pub use edit::{get_edit_source_page, update_source_endpoint};
pub use list::get_sources_page;
