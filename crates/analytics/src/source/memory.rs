//! In-memory view store
//!
//! Holds the four tables behind one `RwLock`. Scans take a read lock and
//! evaluate the compiled predicate against each joined row; recording a
//! view takes the write lock, so increments are never lost.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};
use crate::model::{Author, ContentItem, Country, ViewEvent, ViewRow};
use crate::source::{ViewScan, ViewSource};
use inkstat_query::QueryError;

/// Seed data for a [`MemoryStore`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Fixture {
    pub countries: Vec<Country>,
    pub authors: Vec<Author>,
    pub content_items: Vec<ContentItem>,
    pub views: Vec<ViewEvent>,
}

impl Fixture {
    /// Read a fixture from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, QueryError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[derive(Debug, Default)]
struct Tables {
    countries: HashMap<u64, Country>,
    authors: HashMap<u64, Author>,
    items: BTreeMap<u64, ContentItem>,
    views: Vec<ViewEvent>,
    /// Content item id -> index of its view row in `views`
    view_index: HashMap<u64, usize>,
    /// `None` once a view holds `u64::MAX`
    next_view_id: Option<u64>,
}

impl Tables {
    fn join(&self, view: &ViewEvent) -> ViewRow {
        let item = self.items.get(&view.content_item_id).cloned();
        let author = item
            .as_ref()
            .and_then(|i| i.author_id)
            .and_then(|id| self.authors.get(&id))
            .cloned();
        let country = author
            .as_ref()
            .and_then(|a| a.country_id)
            .and_then(|id| self.countries.get(&id))
            .cloned();
        ViewRow::new(view.clone(), item, author, country)
    }

    fn push_view(&mut self, view: ViewEvent) {
        self.next_view_id = match (self.next_view_id, view.id.checked_add(1)) {
            (Some(next), Some(after)) => Some(next.max(after)),
            _ => None,
        };
        self.view_index
            .entry(view.content_item_id)
            .or_insert(self.views.len());
        self.views.push(view);
    }
}

/// View store kept in process memory
#[derive(Debug)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    clock: Arc<dyn Clock>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store using the wall clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty store stamping recorded views with `clock`
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            tables: RwLock::new(Tables {
                next_view_id: Some(1),
                ..Default::default()
            }),
            clock,
        }
    }

    /// Create a store seeded from a fixture
    pub fn from_fixture(fixture: Fixture, clock: Arc<dyn Clock>) -> Self {
        let store = Self::with_clock(clock);
        store.load(fixture);
        store
    }

    /// Load every table of a fixture, replacing rows with the same id
    pub fn load(&self, fixture: Fixture) {
        let mut tables = self.tables.write();
        for country in fixture.countries {
            tables.countries.insert(country.id, country);
        }
        for author in fixture.authors {
            tables.authors.insert(author.id, author);
        }
        for item in fixture.content_items {
            tables.items.insert(item.id, item);
        }
        for view in fixture.views {
            tables.push_view(view);
        }
        tracing::debug!(
            countries = tables.countries.len(),
            authors = tables.authors.len(),
            items = tables.items.len(),
            views = tables.views.len(),
            "memory store loaded"
        );
    }

    pub fn insert_country(&self, country: Country) {
        self.tables.write().countries.insert(country.id, country);
    }

    pub fn insert_author(&self, author: Author) {
        self.tables.write().authors.insert(author.id, author);
    }

    pub fn insert_item(&self, item: ContentItem) {
        self.tables.write().items.insert(item.id, item);
    }

    /// Append a raw view row
    ///
    /// Seeding only; live traffic goes through [`MemoryStore::record_view`].
    pub fn insert_view(&self, view: ViewEvent) {
        self.tables.write().push_view(view);
    }

    /// Record one view of a content item
    ///
    /// Creates the item's view row on first use, then increments `count`
    /// and moves `viewed_at` to now, all under the write lock.
    pub fn record_view(&self, content_item_id: u64) -> Result<ViewEvent, QueryError> {
        let now = self.clock.now();
        let mut tables = self.tables.write();

        if !tables.items.contains_key(&content_item_id) {
            return Err(QueryError::Execution(format!(
                "unknown content item: {}",
                content_item_id
            )));
        }

        let existing = tables.view_index.get(&content_item_id).copied();
        let index = match existing {
            Some(index) => index,
            None => {
                let Some(id) = tables.next_view_id else {
                    return Err(QueryError::Execution("view ids exhausted".to_string()));
                };
                tables.push_view(ViewEvent {
                    id,
                    content_item_id,
                    viewed_at: now,
                    count: 0,
                });
                tables.views.len() - 1
            }
        };

        let view = &mut tables.views[index];
        view.count += 1;
        view.viewed_at = now;
        Ok(view.clone())
    }

    /// Current view row of a content item
    pub fn view_of(&self, content_item_id: u64) -> Option<ViewEvent> {
        let tables = self.tables.read();
        tables
            .view_index
            .get(&content_item_id)
            .map(|&index| tables.views[index].clone())
    }
}

#[async_trait]
impl ViewSource for MemoryStore {
    async fn views(&self, scan: &ViewScan<'_>) -> Result<Vec<ViewRow>, QueryError> {
        scan.predicate.validate()?;

        let tables = self.tables.read();
        let rows: Vec<ViewRow> = tables
            .views
            .iter()
            .map(|view| tables.join(view))
            .filter(|row| scan.admits(row))
            .collect();

        tracing::debug!(
            scanned = tables.views.len(),
            rows = rows.len(),
            "memory scan"
        );
        Ok(rows)
    }

    async fn content_items(&self, author_id: Option<u64>) -> Result<Vec<ContentItem>, QueryError> {
        let tables = self.tables.read();
        Ok(tables
            .items
            .values()
            .filter(|item| author_id.is_none() || item.author_id == author_id)
            .cloned()
            .collect())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
