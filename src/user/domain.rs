//! Core user domain types.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, database_id::DatabaseId, user::PasswordHash};

/// Database identifier for a user.
pub type UserId = DatabaseId;

/// A trimmed, lower case email address.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Email(String);

impl Email {
    /// Create an email address.
    ///
    /// Only the basic shape `local@domain.tld` is checked.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidEmail] if `email` does not look like an email address.
    pub fn new(email: &str) -> Result<Self, Error> {
        let email = email.trim().to_lowercase();

        let is_valid = match email.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && !domain.contains('@')
                    && domain
                        .split_once('.')
                        .is_some_and(|(name, tld)| !name.is_empty() && !tld.is_empty())
                    && !email.chars().any(char::is_whitespace)
            }
            None => false,
        };

        if is_valid {
            Ok(Self(email))
        } else {
            Err(Error::InvalidEmail(email))
        }
    }

    /// Create an email address without validation.
    pub fn new_unchecked(email: &str) -> Self {
        Self(email.to_owned())
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A permission granted to a user, e.g. `ROLE_ADMIN`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(String);

impl Role {
    /// Full access to the admin pages.
    pub const ADMIN: &'static str = "ROLE_ADMIN";

    /// Create a role, converting it to upper case.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidRole] unless `role` is `ROLE_` followed by
    /// letters, digits or underscores.
    pub fn new(role: &str) -> Result<Self, Error> {
        let role = role.trim().to_uppercase();

        match role.strip_prefix("ROLE_") {
            Some(name)
                if !name.is_empty()
                    && name
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '_') =>
            {
                Ok(Self(role))
            }
            _ => Err(Error::InvalidRole(role)),
        }
    }

    /// The administrator role.
    pub fn admin() -> Self {
        Self(Self::ADMIN.to_owned())
    }
}

impl AsRef<str> for Role {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A person who can manage the statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub roles: Vec<Role>,
    pub password_hash: PasswordHash,
    pub created_at: OffsetDateTime,
    /// Bumped whenever the password changes.
    pub updated_at: OffsetDateTime,
}

/// Form data for creating a user.
#[derive(Debug, Serialize, Deserialize)]
pub struct NewUserFormData {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Form data for changing a user's password.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChangePasswordFormData {
    pub new_password: String,
    pub confirm_password: String,
}
