//! Data model for authored content and its view events
//!
//! Rows are owned by whatever records them; the analytics core only reads
//! them through a [`ViewSource`](crate::source::ViewSource).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A country, unique by name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    pub id: u64,
    pub name: String,
}

/// An author of content items
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: u64,
    pub username: String,
    pub country_id: Option<u64>,
}

/// A piece of authored content (a blog post)
///
/// Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: u64,
    pub title: String,
    pub author_id: Option<u64>,
    pub created_at: DateTime<Utc>,
}

/// Accumulated views of one content item
///
/// `count` is the unit of volume and `viewed_at` the bucketing timestamp.
/// Aggregations never assume one row per view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewEvent {
    pub id: u64,
    pub content_item_id: u64,
    pub viewed_at: DateTime<Utc>,
    pub count: u64,
}

/// A view event left-joined to its content item, author and country
#[derive(Debug, Clone, PartialEq)]
pub struct ViewRow {
    pub view: ViewEvent,
    pub item: Option<ContentItem>,
    pub author: Option<Author>,
    pub country: Option<Country>,
}

impl ViewRow {
    /// Build a fully joined row
    pub fn new(
        view: ViewEvent,
        item: Option<ContentItem>,
        author: Option<Author>,
        country: Option<Country>,
    ) -> Self {
        Self {
            view,
            item,
            author,
            country,
        }
    }

    /// Id of the author who wrote the viewed item
    pub fn author_id(&self) -> Option<u64> {
        self.item.as_ref().and_then(|item| item.author_id)
    }

    /// Username of the author, if the join resolved
    pub fn username(&self) -> Option<&str> {
        self.author.as_ref().map(|a| a.username.as_str())
    }

    /// Country name of the author, if the join resolved
    pub fn country_name(&self) -> Option<&str> {
        self.country.as_ref().map(|c| c.name.as_str())
    }
}
