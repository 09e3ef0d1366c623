//! Change password page and endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use maud::html;
use rusqlite::Connection;

use crate::{
    AppState, Error, endpoints,
    html::{BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, base},
    navigation::NavBar,
    user::{
        PasswordHash, UserId,
        create::{hash_new_password, password_fields},
        db::{get_user, update_password},
        domain::ChangePasswordFormData,
    },
};

/// The state needed for changing a user's password.
#[derive(Debug, Clone)]
pub struct ChangePasswordState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The bcrypt cost for new password hashes.
    pub password_cost: u32,
}

impl FromRef<AppState> for ChangePasswordState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            password_cost: PasswordHash::DEFAULT_COST,
        }
    }
}

/// Render the change password page for a user.
pub async fn get_change_password_page(
    Path(user_id): Path<UserId>,
    State(state): State<ChangePasswordState>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let user = get_user(user_id, &connection)?;
    let endpoint = endpoints::format_endpoint(endpoints::USER_PASSWORD, user.id);

    let content = html! {
        (NavBar::new(endpoints::USERS_VIEW).into_html())
        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold mb-4" { "Change Password" }
            p class="mb-4" { (user.email) }

            form
                hx-put=(endpoint)
                hx-target-error="#alert-container"
                class="w-full space-y-4 md:space-y-6"
            {
                (password_fields("new_password"))

                button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Change Password" }
            }
        }
    };

    Ok(base("Change Password", &[], &content).into_response())
}

/// Handle the change password form submission.
pub async fn change_password_endpoint(
    Path(user_id): Path<UserId>,
    State(state): State<ChangePasswordState>,
    Form(form): Form<ChangePasswordFormData>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let user = match get_user(user_id, &connection) {
        Ok(user) => user,
        Err(Error::NotFound) => {
            tracing::warn!("tried to change the password of missing user {user_id}");
            return Error::UpdateMissingUser.into_alert_response();
        }
        Err(error) => return error.into_alert_response(),
    };

    let result = hash_new_password(
        &form.new_password,
        &form.confirm_password,
        user.email.as_ref(),
        state.password_cost,
    )
    .and_then(|password_hash| update_password(user.id, &password_hash, &connection));

    match result {
        Ok(()) => {
            tracing::info!("changed password for user {user_id}");
            (
                HxRedirect(endpoints::USERS_VIEW.to_owned()),
                StatusCode::SEE_OTHER,
            )
                .into_response()
        }
        Err(error @ (Error::PasswordsDoNotMatch | Error::TooWeak(_))) => {
            tracing::warn!("rejected new password for user {user_id}: {error}");
            error.into_alert_response()
        }
        Err(error) => {
            tracing::error!("could not change password for user {user_id}: {error}");
            error.into_alert_response()
        }
    }
}
