//! Core statement domain types.

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{database_id::DatabaseId, source::SourceId};

/// Database identifier for a statement.
pub type StatementId = DatabaseId;

/// An uploaded bank or credit card statement.
///
/// `filename` is the name of the file in the statement storage directory. It
/// is generated by the upload flow and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub id: StatementId,
    pub filename: String,
    pub uploaded_at: OffsetDateTime,
    /// When the transactions in the statement were extracted, if ever.
    pub processed_at: Option<OffsetDateTime>,
    /// The closing date printed on the statement.
    pub statement_date: Option<Date>,
    pub source_id: SourceId,
}

/// A statement together with the name of its source, for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementWithSource {
    pub statement: Statement,
    pub source_name: String,
}

impl StatementWithSource {
    /// A short label for select inputs, e.g. "#3 anz-0a1b2c3d4e5f.csv (ANZ)".
    pub fn label(&self) -> String {
        format!(
            "#{} {} ({})",
            self.statement.id, self.statement.filename, self.source_name
        )
    }
}

/// The fields of a statement that can be chosen by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementFields {
    pub source_id: SourceId,
    pub statement_date: Option<Date>,
}

/// Form data for editing a statement. The file itself cannot be replaced.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatementFormData {
    #[serde(default)]
    pub source_id: Option<SourceId>,
    #[serde(default)]
    pub statement_date: Option<Date>,
}

/// Conditions for listing statements. `None` fields match everything.
///
/// The date ranges are inclusive.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StatementFilter {
    pub id: Option<StatementId>,
    pub source_id: Option<SourceId>,
    pub processed_from: Option<Date>,
    pub processed_to: Option<Date>,
    pub statement_date_from: Option<Date>,
    pub statement_date_to: Option<Date>,
}
