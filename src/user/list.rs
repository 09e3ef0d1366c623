//! Users listing page.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error, endpoints,
    html::{
        BADGE_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_EMPTY_CELL_STYLE,
        TABLE_HEADER_STYLE, TABLE_ROW_STYLE, TABLE_STYLE, base, delete_action_link,
    },
    navigation::NavBar,
    user::{User, db::get_all_users},
};

/// The state needed for the users listing page.
#[derive(Debug, Clone)]
pub struct UsersPageState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for UsersPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the users listing page.
pub async fn get_users_page(State(state): State<UsersPageState>) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let users = get_all_users(&connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve users: {error}"))?;

    Ok(users_view(&users).into_response())
}

fn users_view(users: &[User]) -> Markup {
    let content = html!(
        (NavBar::new(endpoints::USERS_VIEW).into_html())

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-4 w-full lg:max-w-5xl"
            {
                header class="flex justify-between flex-wrap items-end"
                {
                    h1 class="text-xl font-bold" { "Users" }
                    a href=(endpoints::NEW_USER_VIEW) class=(LINK_STYLE) { "Create User" }
                }

                div class="overflow-x-auto dark:bg-gray-800"
                {
                    table class=(TABLE_STYLE)
                    {
                        thead class=(TABLE_HEADER_STYLE)
                        {
                            tr
                            {
                                th scope="col" class=(TABLE_CELL_STYLE) { "ID" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Email" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Roles" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                            }
                        }

                        tbody
                        {
                            @for user in users {
                                tr class=(TABLE_ROW_STYLE)
                                {
                                    td class=(TABLE_CELL_STYLE) { (user.id) }
                                    td class=(TABLE_CELL_STYLE) { (user.email) }
                                    td class=(TABLE_CELL_STYLE)
                                    {
                                        div class="flex flex-wrap gap-1"
                                        {
                                            @for role in &user.roles {
                                                span class=(BADGE_STYLE) { (role) }
                                            }
                                        }
                                    }
                                    td class=(TABLE_CELL_STYLE)
                                    {
                                        div class="flex gap-4"
                                        {
                                            a
                                                href=(endpoints::format_endpoint(endpoints::EDIT_USER_VIEW, user.id))
                                                class=(LINK_STYLE)
                                            {
                                                "Change Password"
                                            }

                                            (delete_action_link(
                                                &endpoints::format_endpoint(endpoints::USER, user.id),
                                                &format!("Are you sure you want to delete {}?", user.email),
                                                "closest tr",
                                                "delete",
                                            ))
                                        }
                                    }
                                }
                            }

                            @if users.is_empty() {
                                tr
                                {
                                    td colspan="4" class=(TABLE_EMPTY_CELL_STYLE)
                                    {
                                        "No users yet."
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    );

    base("Users", &[], &content)
}
