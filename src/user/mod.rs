//! Users who can sign in to manage statements, with their roles and password hashes.

mod create;
mod db;
mod delete;
mod domain;
mod edit;
mod list;
mod password;

pub use create::{create_user_endpoint, get_new_user_page};
pub use db::{
    count_users, create_user, create_user_table, delete_user, get_all_users, get_user,
    update_password,
};
pub use delete::delete_user_endpoint;
pub use domain::{Email, Role, User, UserId};
pub use edit::{change_password_endpoint, get_change_password_page};
pub use list::get_users_page;
pub use password::{PasswordHash, ValidatedPassword};
