//! Database operations for categories.

use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::{
    Error,
    category::{Category, CategoryFields, CategoryId, CategoryName},
    db::is_foreign_key_violation,
    pagination::Page,
};

/// Initialize the category table.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS category (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT,
            icon TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_category_name ON category(name);",
    )?;

    Ok(())
}

/// Create a category and return it with its generated ID.
pub fn create_category(fields: CategoryFields, connection: &Connection) -> Result<Category, Error> {
    connection.execute(
        "INSERT INTO category (icon, name, description) VALUES (?1, ?2, ?3)",
        params![fields.icon, fields.name.as_ref(), fields.description],
    )?;

    Ok(Category {
        id: connection.last_insert_rowid(),
        icon: fields.icon,
        name: fields.name,
        description: fields.description,
    })
}

/// Retrieve a single category by ID.
pub fn get_category(category_id: CategoryId, connection: &Connection) -> Result<Category, Error> {
    connection
        .prepare("SELECT id, icon, name, description FROM category WHERE id = :id")?
        .query_row(&[(":id", &category_id)], map_row)
        .map_err(|error| error.into())
}

/// Retrieve all categories ordered by name, e.g. for select inputs.
pub fn get_all_categories(connection: &Connection) -> Result<Vec<Category>, Error> {
    connection
        .prepare("SELECT id, icon, name, description FROM category ORDER BY name ASC")?
        .query_map([], map_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Retrieve one page of categories in ID order.
pub fn list_categories(page: Page, connection: &Connection) -> Result<Vec<Category>, Error> {
    connection
        .prepare(
            "SELECT id, icon, name, description FROM category ORDER BY id ASC LIMIT ?1 OFFSET ?2",
        )?
        .query_map(params![page.limit(), page.offset()], map_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Count all categories.
pub fn count_categories(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("SELECT COUNT(*) FROM category", [], |row| row.get(0))
        .map_err(|error| error.into())
}

/// Find the category with exactly `name`, taking the lowest ID if several share it.
pub fn get_category_by_name(
    name: &str,
    connection: &Connection,
) -> Result<Option<Category>, Error> {
    connection
        .prepare(
            "SELECT id, icon, name, description FROM category WHERE name = ?1 ORDER BY id ASC LIMIT 1",
        )?
        .query_row([name], map_row)
        .optional()
        .map_err(|error| error.into())
}

/// The category with the lowest ID, if any category exists.
pub fn get_first_category(connection: &Connection) -> Result<Option<Category>, Error> {
    connection
        .prepare("SELECT id, icon, name, description FROM category ORDER BY id ASC LIMIT 1")?
        .query_row([], map_row)
        .optional()
        .map_err(|error| error.into())
}

/// Update the fields of a category.
///
/// # Errors
/// Returns [Error::UpdateMissingCategory] if the category does not exist.
pub fn update_category(
    category_id: CategoryId,
    fields: CategoryFields,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE category SET icon = ?1, name = ?2, description = ?3 WHERE id = ?4",
        params![
            fields.icon,
            fields.name.as_ref(),
            fields.description,
            category_id
        ],
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingCategory);
    }

    Ok(())
}

/// Delete a category.
///
/// # Errors
/// Returns [Error::CategoryInUse] if transactions still use the category and
/// [Error::DeleteMissingCategory] if it does not exist.
pub fn delete_category(category_id: CategoryId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection
        .execute("DELETE FROM category WHERE id = ?1", [category_id])
        .map_err(|error| {
            if is_foreign_key_violation(&error) {
                Error::CategoryInUse
            } else {
                error.into()
            }
        })?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingCategory);
    }

    Ok(())
}

fn map_row(row: &Row) -> Result<Category, rusqlite::Error> {
    let raw_name: String = row.get(2)?;

    Ok(Category {
        id: row.get(0)?,
        icon: row.get(1)?,
        name: CategoryName::new_unchecked(&raw_name),
        description: row.get(3)?,
    })
}
