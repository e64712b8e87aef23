//! Domain types for searches and listings with strong typing.
//!
//! Newtype identifiers keep search ids and marketplace listing ids from being
//! mixed up, and [`SearchTarget`] owns the rules for composing the search name
//! that identifies a recurring search in the store.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Unique identifier for a Search row.
///
/// # Examples
///
/// ```rust
/// use toribot::domain::SearchId;
///
/// let id = SearchId::new(7);
/// assert_eq!(id.value(), 7);
/// assert_eq!(id.to_string(), "7");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SearchId(i32);

impl SearchId {
    #[must_use]
    pub const fn new(id: i32) -> Self {
        debug_assert!(id >= 0, "SearchId should be non-negative");
        Self(id)
    }

    #[must_use]
    pub const fn value(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for SearchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for SearchId {
    fn from(id: i32) -> Self {
        Self::new(id)
    }
}

impl From<SearchId> for i32 {
    fn from(id: SearchId) -> Self {
        id.0
    }
}

/// Marketplace-assigned listing identifier.
///
/// This is the deduplication key: a listing id is stored at most once across
/// the whole store, regardless of which search discovered it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingId(String);

impl ListingId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ListingId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ListingId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    #[error("either a search query or a product category must be provided")]
    MissingQueryOrCategory,
}

/// What to search for on the marketplace.
///
/// Blank strings are treated as absent, so a value coming from an empty
/// environment variable does not count as a search term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTarget {
    query: Option<String>,
    category: Option<String>,
    location: Option<String>,
}

impl SearchTarget {
    pub fn new(
        query: Option<&str>,
        category: Option<&str>,
        location: Option<&str>,
    ) -> Result<Self, TargetError> {
        let target = Self {
            query: normalize(query),
            category: normalize(category),
            location: normalize(location),
        };

        if target.query.is_none() && target.category.is_none() {
            return Err(TargetError::MissingQueryOrCategory);
        }

        Ok(target)
    }

    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    #[must_use]
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    /// The identity of this search in the store.
    ///
    /// The raw query wins over the category; a location is appended as
    /// ` in location:<loc>`.
    ///
    /// ```rust
    /// use toribot::domain::SearchTarget;
    ///
    /// let target = SearchTarget::new(None, Some("93"), Some("0.100018")).unwrap();
    /// assert_eq!(target.search_name(), "category:93 in location:0.100018");
    /// ```
    #[must_use]
    pub fn search_name(&self) -> String {
        let mut name = match (&self.query, &self.category) {
            (Some(query), _) => query.clone(),
            (None, Some(category)) => format!("category:{category}"),
            (None, None) => String::new(),
        };

        if let Some(location) = &self.location {
            name.push_str(" in location:");
            name.push_str(location);
        }

        name
    }
}

impl fmt::Display for SearchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.search_name())
    }
}

fn normalize(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}
