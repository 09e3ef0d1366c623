//! User creation page and endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error, endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, FORM_TEXT_INPUT_STYLE, base, form_field,
    },
    navigation::NavBar,
    user::{
        Email, PasswordHash, Role, ValidatedPassword, create_user, domain::NewUserFormData,
    },
};

/// The state needed for creating a user.
#[derive(Debug, Clone)]
pub struct CreateUserState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The bcrypt cost for new password hashes.
    pub password_cost: u32,
}

impl FromRef<AppState> for CreateUserState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            password_cost: PasswordHash::DEFAULT_COST,
        }
    }
}

/// Check that both password fields match and hash the password.
pub(super) fn hash_new_password(
    password: &str,
    confirm_password: &str,
    email: &str,
    cost: u32,
) -> Result<PasswordHash, Error> {
    if password != confirm_password {
        return Err(Error::PasswordsDoNotMatch);
    }

    let password = ValidatedPassword::new(password, &[email])?;
    PasswordHash::new(password, cost)
}

/// The new and confirm password inputs shared by the create and change password forms.
pub(super) fn password_fields(password_name: &str) -> Markup {
    html! {
        (form_field(password_name, "Password", html! {
            input
                id=(password_name)
                type="password"
                name=(password_name)
                autocomplete="new-password"
                required
                class=(FORM_TEXT_INPUT_STYLE);
        }, Some("Use a long passphrase that is hard to guess.")))

        (form_field("confirm_password", "Confirm Password", html! {
            input
                id="confirm_password"
                type="password"
                name="confirm_password"
                autocomplete="new-password"
                required
                class=(FORM_TEXT_INPUT_STYLE);
        }, None))
    }
}

/// Render the user creation page.
pub async fn get_new_user_page() -> Response {
    let content = html! {
        (NavBar::new(endpoints::USERS_VIEW).into_html())
        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold mb-4" { "New User" }

            form
                hx-post=(endpoints::POST_USER)
                hx-target-error="#alert-container"
                class="w-full space-y-4 md:space-y-6"
            {
                (form_field("email", "Email", html! {
                    input
                        id="email"
                        type="email"
                        name="email"
                        autocomplete="off"
                        required
                        autofocus
                        class=(FORM_TEXT_INPUT_STYLE);
                }, Some("New users are given the ROLE_ADMIN role.")))

                (password_fields("password"))

                button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Create User" }
            }
        }
    };

    base("New User", &[], &content).into_response()
}

/// Handle user creation form submission.
pub async fn create_user_endpoint(
    State(state): State<CreateUserState>,
    Form(form): Form<NewUserFormData>,
) -> Response {
    let prepared = Email::new(&form.email).and_then(|email| {
        hash_new_password(
            &form.password,
            &form.confirm_password,
            email.as_ref(),
            state.password_cost,
        )
        .map(|password_hash| (email, password_hash))
    });
    let (email, password_hash) = match prepared {
        Ok(prepared) => prepared,
        Err(error) => {
            tracing::warn!("rejected new user: {error}");
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

    match create_user(email, vec![Role::admin()], password_hash, &connection) {
        Ok(user) => {
            tracing::info!("created user {} <{}>", user.id, user.email);
            (
                HxRedirect(endpoints::USERS_VIEW.to_owned()),
                StatusCode::SEE_OTHER,
            )
                .into_response()
        }
        Err(error @ Error::DuplicateEmail(_)) => {
            tracing::warn!("could not create user: {error}");
            error.into_alert_response()
        }
        Err(error) => {
            tracing::error!("An unexpected error occurred while creating a user: {error}");
            error.into_alert_response()
        }
    }
}
