//! Product category tag.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Category`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CategoryError {
    /// The tag is empty after trimming.
    #[error("category cannot be empty")]
    Empty,
}

/// A catalog category such as `"Electrónica"` or `"Ropa de mujer"`.
///
/// Stored trimmed; comparison is exact, matching how the catalog filters by
/// category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Category(String);

impl Category {
    /// Create a category tag.
    ///
    /// # Errors
    ///
    /// Returns [`CategoryError::Empty`] if the tag is blank.
    pub fn new(tag: &str) -> Result<Self, CategoryError> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(CategoryError::Empty);
        }
        Ok(Self(tag.to_owned()))
    }

    /// The tag text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Category {
    type Err = CategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Category {
    type Error = CategoryError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(&s)
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.0
    }
}
