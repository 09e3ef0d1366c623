//! Core source domain types.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{Error, database_id::DatabaseId};

/// A validated, non-empty source name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct SourceName(String);

impl SourceName {
    /// Create a source name.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::EmptySourceName] if `name` is empty
    /// or only whitespace.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::EmptySourceName)
        } else {
            Ok(Self(name.to_owned()))
        }
    }

    /// Create a source name without validation.
    ///
    /// The caller should ensure that the string is not empty.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_owned())
    }
}

impl AsRef<str> for SourceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for SourceName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Database identifier for a source.
pub type SourceId = DatabaseId;

/// The institution or account a statement comes from, e.g. a bank account or
/// credit card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub id: SourceId,
    pub name: SourceName,
    pub description: Option<String>,
    /// Free-text guidance for whatever later processes the statements of
    /// this source. Only stored and displayed.
    pub ai_instruction: Option<String>,
}

/// The editable fields of a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFields {
    pub name: SourceName,
    pub description: Option<String>,
    pub ai_instruction: Option<String>,
}

/// Form data for source creation and editing.
#[derive(Debug, Serialize, Deserialize)]
pub struct SourceFormData {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub ai_instruction: Option<String>,
}

impl TryFrom<SourceFormData> for SourceFields {
    type Error = Error;

    fn try_from(form: SourceFormData) -> Result<Self, Self::Error> {
        Ok(Self {
            name: SourceName::new(&form.name)?,
            description: crate::html::optional_text(form.description),
            ai_instruction: crate::html::optional_text(form.ai_instruction),
        })
    }
}
