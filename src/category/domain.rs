//! Core category domain types.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{Error, database_id::DatabaseId, html::optional_text};

/// The name of the category new transactions are put in when none is chosen.
pub const DEFAULT_CATEGORY_NAME: &str = "Other Transactions";

/// A validated, non-empty category name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct CategoryName(String);

impl CategoryName {
    /// Create a category name.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::EmptyCategoryName] if `name` is
    /// empty or only whitespace.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::EmptyCategoryName)
        } else {
            Ok(Self(name.to_owned()))
        }
    }

    /// Create a category name without validation.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_owned())
    }
}

impl AsRef<str> for CategoryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for CategoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Database identifier for a category.
pub type CategoryId = DatabaseId;

/// A category for grouping transactions, e.g. "Groceries".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: CategoryId,
    /// A short icon, usually an emoji, shown next to the name.
    pub icon: String,
    pub name: CategoryName,
    pub description: Option<String>,
}

/// The editable fields of a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryFields {
    pub icon: String,
    pub name: CategoryName,
    pub description: Option<String>,
}

/// Form data for category creation and editing.
#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryFormData {
    pub icon: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl TryFrom<CategoryFormData> for CategoryFields {
    type Error = Error;

    fn try_from(form: CategoryFormData) -> Result<Self, Self::Error> {
        let icon = form.icon.trim();
        if icon.is_empty() {
            return Err(Error::EmptyCategoryIcon);
        }

        Ok(Self {
            icon: icon.to_owned(),
            name: CategoryName::new(&form.name)?,
            description: optional_text(form.description),
        })
    }
}
