//! Database functions for users.

use rusqlite::{Connection, Row, params, types::Type};
use time::OffsetDateTime;

use crate::{
    Error,
    db::is_unique_violation,
    user::{Email, PasswordHash, Role, User, UserId},
};

/// Create the user table.
///
/// Roles are stored as a JSON array of strings.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
            id INTEGER PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            roles TEXT NOT NULL,
            password TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        (),
    )?;

    Ok(())
}

fn roles_to_json(roles: &[Role]) -> Result<String, Error> {
    serde_json::to_string(roles).map_err(|error| {
        tracing::error!("could not serialize roles: {error}");
        Error::SqlError(rusqlite::Error::ToSqlConversionFailure(Box::new(error)))
    })
}

/// Create and insert a new user into the database.
///
/// # Errors
///
/// Returns [Error::DuplicateEmail] if a user already has `email` and
/// [Error::SqlError] if some other SQL error occurred.
pub fn create_user(
    email: Email,
    roles: Vec<Role>,
    password_hash: PasswordHash,
    connection: &Connection,
) -> Result<User, Error> {
    let now = OffsetDateTime::now_utc();

    connection
        .execute(
            "INSERT INTO user (email, roles, password, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?4)",
            params![
                email.as_ref(),
                roles_to_json(&roles)?,
                password_hash.as_ref(),
                now
            ],
        )
        .map_err(|error| {
            if is_unique_violation(&error) {
                Error::DuplicateEmail(email.to_string())
            } else {
                error.into()
            }
        })?;

    Ok(User {
        id: connection.last_insert_rowid(),
        email,
        roles,
        password_hash,
        created_at: now,
        updated_at: now,
    })
}

/// Get the user with an ID equal to `user_id`.
///
/// # Errors
///
/// Returns [Error::NotFound] if `user_id` does not belong to a user.
pub fn get_user(user_id: UserId, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(
            "SELECT id, email, roles, password, created_at, updated_at FROM user WHERE id = :id",
        )?
        .query_row(&[(":id", &user_id)], map_row)
        .map_err(|error| error.into())
}

/// All users ordered by ID.
pub fn get_all_users(connection: &Connection) -> Result<Vec<User>, Error> {
    connection
        .prepare(
            "SELECT id, email, roles, password, created_at, updated_at FROM user ORDER BY id ASC",
        )?
        .query_map([], map_row)?
        .map(|maybe_user| maybe_user.map_err(|error| error.into()))
        .collect()
}

/// Get the number of users in the database.
pub fn count_users(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM user", [], |row| row.get(0))
        .map_err(|error| error.into())
}

/// Replace the password of a user and bump `updated_at`.
///
/// # Errors
///
/// Returns [Error::UpdateMissingUser] if the user does not exist.
pub fn update_password(
    user_id: UserId,
    password_hash: &PasswordHash,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE user SET password = ?1, updated_at = ?2 WHERE id = ?3",
        params![password_hash.as_ref(), OffsetDateTime::now_utc(), user_id],
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingUser);
    }

    Ok(())
}

/// Delete a user.
///
/// # Errors
///
/// Returns [Error::DeleteMissingUser] if the user does not exist.
pub fn delete_user(user_id: UserId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM user WHERE id = ?1", [user_id])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingUser);
    }

    Ok(())
}

fn map_row(row: &Row) -> Result<User, rusqlite::Error> {
    let raw_email: String = row.get(1)?;
    let raw_roles: String = row.get(2)?;
    let raw_password_hash: String = row.get(3)?;

    let roles = serde_json::from_str(&raw_roles)
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(error)))?;

    Ok(User {
        id: row.get(0)?,
        email: Email::new_unchecked(&raw_email),
        roles,
        password_hash: PasswordHash::new_unchecked(&raw_password_hash),
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}
