use crate::domain::{ListingId, SearchId};
use serde::{Deserialize, Serialize};

/// Ordered key/value technical attributes from a listing's detail page.
///
/// Keeps the order the marketplace presents the attributes in; a repeated
/// key replaces the earlier value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TechnicalDetails(Vec<(String, String)>);

impl TechnicalDetails {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.0.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.0.push((key, value));
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TechnicalDetails {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut details = Self::new();
        for (k, v) in iter {
            details.insert(k, v);
        }
        details
    }
}

/// One ad as it appears on a search results page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingSummary {
    pub id: ListingId,
    pub title: String,
    pub price: Option<String>,
    pub price_number: Option<i64>,
    pub location: Option<String>,
    pub link: String,
    pub image: Option<String>,
    pub seller: Option<String>,
    pub timestamp: Option<String>,
    pub badges: Option<String>,
}

/// Extra data scraped from a listing's own page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingDetail {
    pub description: Option<String>,
    pub details: TechnicalDetails,
}

/// A listing ready to be written for the first time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewListing {
    pub summary: ListingSummary,
    pub description: Option<String>,
    pub details: Option<TechnicalDetails>,
}

impl NewListing {
    /// Combines the summary with the detail fetch result, if there was one.
    #[must_use]
    pub fn new(summary: ListingSummary, detail: Option<ListingDetail>) -> Self {
        match detail {
            Some(detail) => Self {
                summary,
                description: detail.description,
                details: Some(detail.details),
            },
            None => Self {
                summary,
                description: None,
                details: None,
            },
        }
    }

    #[must_use]
    pub const fn id(&self) -> &ListingId {
        &self.summary.id
    }
}

/// A listing as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Listing {
    pub id: ListingId,
    pub search_id: SearchId,
    pub title: String,
    pub price: Option<String>,
    pub price_number: Option<i64>,
    pub location: Option<String>,
    pub link: String,
    pub image: Option<String>,
    pub seller: Option<String>,
    pub timestamp: Option<String>,
    pub badges: Option<String>,
    pub description: Option<String>,
    pub details: TechnicalDetails,
    pub first_seen: String,
    pub last_seen: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn details_keep_presentation_order() {
        let details: TechnicalDetails = [("Merkki", "Apple"), ("Kunto", "Hyvä"), ("Malli", "M1")]
            .into_iter()
            .collect();
        let keys: Vec<&str> = details.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["Merkki", "Kunto", "Malli"]);
    }

    #[test]
    fn repeated_key_replaces_in_place() {
        let mut details = TechnicalDetails::new();
        details.insert("Kunto", "Hyvä");
        details.insert("Merkki", "Apple");
        details.insert("Kunto", "Erinomainen");
        assert_eq!(details.len(), 2);
        assert_eq!(details.get("Kunto"), Some("Erinomainen"));
        assert_eq!(details.iter().next(), Some(("Kunto", "Erinomainen")));
    }
}
