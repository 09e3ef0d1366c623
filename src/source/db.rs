//! Database operations for sources.

use rusqlite::{Connection, Row, params};

use crate::{
    Error,
    db::is_foreign_key_violation,
    pagination::Page,
    source::{Source, SourceFields, SourceId, SourceName},
};

/// Initialize the source table.
pub fn create_source_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS source (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT,
            ai_instruction TEXT
        )",
        (),
    )?;

    Ok(())
}

/// Create a source and return it with its generated ID.
pub fn create_source(fields: SourceFields, connection: &Connection) -> Result<Source, Error> {
    connection.execute(
        "INSERT INTO source (name, description, ai_instruction) VALUES (?1, ?2, ?3)",
        params![
            fields.name.as_ref(),
            fields.description,
            fields.ai_instruction
        ],
    )?;

    Ok(Source {
        id: connection.last_insert_rowid(),
        name: fields.name,
        description: fields.description,
        ai_instruction: fields.ai_instruction,
    })
}

/// Retrieve a single source by ID.
pub fn get_source(source_id: SourceId, connection: &Connection) -> Result<Source, Error> {
    connection
        .prepare("SELECT id, name, description, ai_instruction FROM source WHERE id = :id")?
        .query_row(&[(":id", &source_id)], map_row)
        .map_err(|error| error.into())
}

/// Retrieve all sources ordered by name, e.g. for select inputs.
pub fn get_all_sources(connection: &Connection) -> Result<Vec<Source>, Error> {
    connection
        .prepare("SELECT id, name, description, ai_instruction FROM source ORDER BY name ASC")?
        .query_map([], map_row)?
        .map(|maybe_source| maybe_source.map_err(|error| error.into()))
        .collect()
}

/// Build a `LIKE` pattern for `search`, or match everything if there is none.
fn search_pattern(search: Option<&str>) -> String {
    match search.map(str::trim).filter(|search| !search.is_empty()) {
        Some(search) => {
            let escaped = search
                .replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_");
            format!("%{escaped}%")
        }
        None => "%".to_owned(),
    }
}

const SEARCH_CLAUSE: &str = "(name LIKE ?1 ESCAPE '\\' OR IFNULL(description, '') LIKE ?1 ESCAPE '\\')";

/// Retrieve one page of sources, newest first, whose name or description
/// contains `search`.
pub fn search_sources(
    search: Option<&str>,
    page: Page,
    connection: &Connection,
) -> Result<Vec<Source>, Error> {
    let query = format!(
        "SELECT id, name, description, ai_instruction FROM source
        WHERE {SEARCH_CLAUSE}
        ORDER BY id DESC
        LIMIT ?2 OFFSET ?3"
    );

    connection
        .prepare(&query)?
        .query_map(
            params![search_pattern(search), page.limit(), page.offset()],
            map_row,
        )?
        .map(|maybe_source| maybe_source.map_err(|error| error.into()))
        .collect()
}

/// Count the sources whose name or description contains `search`.
pub fn count_sources(search: Option<&str>, connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row(
            &format!("SELECT COUNT(*) FROM source WHERE {SEARCH_CLAUSE}"),
            [search_pattern(search)],
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Update the fields of a source.
///
/// # Errors
/// Returns [Error::UpdateMissingSource] if the source does not exist.
pub fn update_source(
    source_id: SourceId,
    fields: SourceFields,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE source SET name = ?1, description = ?2, ai_instruction = ?3 WHERE id = ?4",
        params![
            fields.name.as_ref(),
            fields.description,
            fields.ai_instruction,
            source_id
        ],
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingSource);
    }

    Ok(())
}

/// Delete a source.
///
/// # Errors
/// Returns [Error::SourceInUse] if statements still reference the source and
/// [Error::DeleteMissingSource] if it does not exist.
pub fn delete_source(source_id: SourceId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection
        .execute("DELETE FROM source WHERE id = ?1", [source_id])
        .map_err(|error| {
            if is_foreign_key_violation(&error) {
                Error::SourceInUse
            } else {
                error.into()
            }
        })?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingSource);
    }

    Ok(())
}

fn map_row(row: &Row) -> Result<Source, rusqlite::Error> {
    let raw_name: String = row.get(1)?;

    Ok(Source {
        id: row.get(0)?,
        name: SourceName::new_unchecked(&raw_name),
        description: row.get(2)?,
        ai_instruction: row.get(3)?,
    })
}
