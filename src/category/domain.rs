//! Core category domain types.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, database_id::DatabaseId};

/// A validated, non-empty category name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct CategoryName(String);

impl CategoryName {
    /// Create a category name.
    ///
    /// Leading and trailing whitespace is removed.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::EmptyCategoryName] if `name` is empty or only
    /// whitespace.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::EmptyCategoryName)
        } else {
            Ok(Self(name.to_string()))
        }
    }

    /// Create a category name without validation.
    ///
    /// The caller should ensure that the string is not empty.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl AsRef<str> for CategoryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for CategoryName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CategoryName::new(s)
    }
}

impl Display for CategoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Database identifier for a category.
pub type CategoryId = DatabaseId;

/// A group of related products, e.g. 'Books' or 'Electronics'.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct Category {
    /// The ID of the category.
    pub id: CategoryId,
    /// The unique name of the category.
    pub name: CategoryName,
    /// An optional longer description.
    pub description: Option<String>,
}

/// The data needed to create a category.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCategory {
    /// The name of the new category, must not already be in use.
    pub name: CategoryName,
    /// An optional longer description.
    pub description: Option<String>,
}

/// A partial update to a category.
///
/// Fields set to `None` are left unchanged. For `description`, `Some(None)`
/// clears the description.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryPatch {
    /// The new name.
    pub name: Option<CategoryName>,
    /// The new description.
    pub description: Option<Option<String>>,
}

impl CategoryPatch {
    /// Whether the patch would not change anything.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }
}

#[cfg(test)]
mod category_name_tests {
    use crate::{Error, category::CategoryName};

    #[test]
    fn new_fails_on_empty_string() {
        let name = CategoryName::new("");

        assert_eq!(name, Err(Error::EmptyCategoryName));
    }

    #[test]
    fn new_fails_on_just_whitespace() {
        let name = CategoryName::new("\n\t \r");

        assert_eq!(name, Err(Error::EmptyCategoryName));
    }

    #[test]
    fn new_trims_whitespace() {
        let name = CategoryName::new("  Books ").unwrap();

        assert_eq!(name.as_ref(), "Books");
    }
}
