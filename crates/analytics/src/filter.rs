//! Boolean filter expressions and their compiled predicates
//!
//! Clients send a nested JSON tree built from four node shapes:
//!
//! ```json
//! {"and": [{"eq": {"author.username": "john"}},
//!          {"not": {"eq": {"author.country.name": "Norway"}}}]}
//! ```
//!
//! Parsing never fails. Anything that is not one of the recognized shapes
//! degrades to [`FilterExpr::Empty`], which matches every row. Field paths
//! are resolved when the tree is compiled; an unknown path becomes a
//! [`Predicate::Invalid`] node that the data source rejects.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::model::ViewRow;
use crate::period::parse_timestamp;
use inkstat_query::QueryError;

/// Parse and compile a filter tree in one step
pub fn compile(spec: Option<&Value>) -> Predicate {
    FilterExpr::parse(spec).compile()
}

// =============================================================================
// Filter AST
// =============================================================================

/// A parsed filter tree
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    /// All children must hold
    And(Vec<FilterExpr>),
    /// Any child must hold
    Or(Vec<FilterExpr>),
    /// The child must not hold
    Not(Box<FilterExpr>),
    /// Every field path equals its literal
    Eq(Vec<(String, Value)>),
    /// Matches everything
    Empty,
}

impl FilterExpr {
    /// Parse a filter tree
    ///
    /// Recognized keys are checked in the order `and`, `or`, `not`, `eq`;
    /// only the first one present is looked at.
    pub fn parse(spec: Option<&Value>) -> Self {
        spec.map(Self::parse_node).unwrap_or(Self::Empty)
    }

    fn parse_node(value: &Value) -> Self {
        let Some(node) = value.as_object() else {
            return Self::Empty;
        };

        if let Some(children) = node.get("and") {
            return Self::parse_children(children).map_or(Self::Empty, Self::And);
        }
        if let Some(children) = node.get("or") {
            return Self::parse_children(children).map_or(Self::Empty, Self::Or);
        }
        if let Some(child) = node.get("not") {
            return Self::Not(Box::new(Self::parse_node(child)));
        }
        if let Some(fields) = node.get("eq") {
            return match fields.as_object() {
                Some(map) if !map.is_empty() => Self::Eq(
                    map.iter()
                        .map(|(path, literal)| (path.clone(), literal.clone()))
                        .collect(),
                ),
                _ => Self::Empty,
            };
        }

        Self::Empty
    }

    /// Children of an `and`/`or` node, or `None` when there are none to combine
    fn parse_children(value: &Value) -> Option<Vec<Self>> {
        let items = value.as_array()?;
        if items.is_empty() {
            return None;
        }
        Some(items.iter().map(Self::parse_node).collect())
    }

    /// Compile into an executable predicate
    pub fn compile(&self) -> Predicate {
        match self {
            Self::Empty => Predicate::All,
            Self::And(children) => {
                Predicate::all_of(children.iter().map(Self::compile).collect())
            }
            Self::Or(children) => Predicate::any_of(children.iter().map(Self::compile).collect()),
            Self::Not(child) => child.compile().negate(),
            Self::Eq(pairs) => Predicate::all_of(
                pairs
                    .iter()
                    .map(|(path, literal)| Equality::compile(path, literal))
                    .collect(),
            ),
        }
    }
}

// =============================================================================
// Compiled predicate
// =============================================================================

/// An executable predicate over joined view rows
///
/// Data sources either evaluate it in memory ([`Predicate::matches`]) or
/// render it as a WHERE clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Matches every row
    All,
    /// One field equality test
    Eq(Equality),
    Not(Box<Predicate>),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    /// A leaf that could not be compiled, with the reason
    Invalid(String),
}

impl Predicate {
    /// Conjunction; match-all children are dropped
    pub fn all_of(children: Vec<Predicate>) -> Self {
        Self::combine(children, Self::And)
    }

    /// Disjunction; match-all children are dropped
    ///
    /// The empty filter is the identity for both combinators, so
    /// `or(empty, x)` is `x`.
    pub fn any_of(children: Vec<Predicate>) -> Self {
        Self::combine(children, Self::Or)
    }

    fn combine(children: Vec<Predicate>, wrap: fn(Vec<Predicate>) -> Predicate) -> Self {
        let mut children: Vec<Predicate> =
            children.into_iter().filter(|p| !p.is_all()).collect();
        match children.len() {
            0 => Self::All,
            1 => children.remove(0),
            _ => wrap(children),
        }
    }

    /// Negation; `not(all)` stays `all` and double negation cancels
    pub fn negate(self) -> Self {
        match self {
            Self::All => Self::All,
            Self::Not(inner) => *inner,
            other => Self::Not(Box::new(other)),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    /// Evaluate against one joined row
    ///
    /// Invalid leaves never match; call [`Predicate::validate`] first to
    /// surface them as errors.
    pub fn matches(&self, row: &ViewRow) -> bool {
        match self {
            Self::All => true,
            Self::Eq(eq) => eq.matches(row),
            Self::Not(inner) => !inner.matches(row),
            Self::And(children) => children.iter().all(|p| p.matches(row)),
            Self::Or(children) => children.iter().any(|p| p.matches(row)),
            Self::Invalid(_) => false,
        }
    }

    /// First reason the predicate cannot be executed, if any
    pub fn invalid_reason(&self) -> Option<&str> {
        match self {
            Self::Invalid(reason) => Some(reason.as_str()),
            Self::Not(inner) => inner.invalid_reason(),
            Self::And(children) | Self::Or(children) => {
                children.iter().find_map(|p| p.invalid_reason())
            }
            Self::All | Self::Eq(_) => None,
        }
    }

    /// Reject predicates containing invalid leaves
    pub fn validate(&self) -> std::result::Result<(), QueryError> {
        match self.invalid_reason() {
            Some(reason) => Err(QueryError::InvalidField(reason.to_string())),
            None => Ok(()),
        }
    }
}

/// `field = literal`, or `field IS NULL` for a null literal
#[derive(Debug, Clone, PartialEq)]
pub struct Equality {
    pub field: Field,
    pub value: Literal,
}

impl Equality {
    /// Resolve the path and coerce the literal to the field's type
    fn compile(path: &str, literal: &Value) -> Predicate {
        let Some(field) = Field::resolve(path) else {
            return Predicate::Invalid(format!("unknown field path: {}", path));
        };

        match Literal::coerce(field.kind(), literal) {
            Some(value) => Predicate::Eq(Self { field, value }),
            None => Predicate::Invalid(format!(
                "field {} expects {}, got {}",
                path,
                field.kind().as_str(),
                literal
            )),
        }
    }

    pub fn matches(&self, row: &ViewRow) -> bool {
        let actual = self.field.extract(row);
        match &self.value {
            Literal::Null => actual.is_none(),
            expected => actual.as_ref() == Some(expected),
        }
    }
}

// =============================================================================
// Fields
// =============================================================================

/// A filterable column of the joined view row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    ViewId,
    ViewCount,
    ViewedAt,
    ItemId,
    ItemTitle,
    ItemCreatedAt,
    AuthorId,
    AuthorUsername,
    CountryId,
    CountryName,
}

/// Value type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Int,
    Text,
    Time,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Int => "an integer",
            Self::Text => "text",
            Self::Time => "a timestamp",
        }
    }
}

impl Field {
    /// Resolve a field path rooted at the view row
    ///
    /// Dotted (`blog.author.username`) and double-underscore
    /// (`blog__author__username`) forms are equivalent. `content_item` and
    /// `item` alias `blog`, `user` aliases `author`, and paths may start at
    /// the author (`author.username`) or the country (`country.name`).
    pub fn resolve(path: &str) -> Option<Self> {
        let normalized = path.trim().replace("__", ".");
        let mut segments: Vec<&str> = normalized.split('.').map(canonical_segment).collect();

        match segments.first().copied() {
            Some("author") | Some("author_id") => segments.insert(0, "blog"),
            Some("country") | Some("country_id") => {
                segments.insert(0, "author");
                segments.insert(0, "blog");
            }
            _ => {}
        }

        let field = match segments.as_slice() {
            ["id"] => Self::ViewId,
            ["count"] => Self::ViewCount,
            ["viewed_at"] => Self::ViewedAt,
            ["blog"] | ["blog_id"] | ["blog", "id"] => Self::ItemId,
            ["blog", "title"] => Self::ItemTitle,
            ["blog", "created_at"] => Self::ItemCreatedAt,
            ["blog", "author"] | ["blog", "author_id"] | ["blog", "author", "id"] => {
                Self::AuthorId
            }
            ["blog", "author", "username"] => Self::AuthorUsername,
            ["blog", "author", "country"]
            | ["blog", "author", "country_id"]
            | ["blog", "author", "country", "id"] => Self::CountryId,
            ["blog", "author", "country", "name"] => Self::CountryName,
            _ => return None,
        };

        Some(field)
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Self::ViewId | Self::ViewCount | Self::ItemId | Self::AuthorId | Self::CountryId => {
                FieldKind::Int
            }
            Self::ItemTitle | Self::AuthorUsername | Self::CountryName => FieldKind::Text,
            Self::ViewedAt | Self::ItemCreatedAt => FieldKind::Time,
        }
    }

    /// Whether the field comes from a left join and may be missing
    pub fn nullable(&self) -> bool {
        !matches!(
            self,
            Self::ViewId | Self::ViewCount | Self::ViewedAt | Self::ItemId
        )
    }

    /// Column in the joined SQL view (`v` views, `b` items, `u` authors, `c` countries)
    pub fn column(&self) -> &'static str {
        match self {
            Self::ViewId => "v.id",
            Self::ViewCount => "v.count",
            Self::ViewedAt => "v.viewed_at",
            Self::ItemId => "v.blog_id",
            Self::ItemTitle => "b.title",
            Self::ItemCreatedAt => "b.created_at",
            Self::AuthorId => "b.author_id",
            Self::AuthorUsername => "u.username",
            Self::CountryId => "u.country_id",
            Self::CountryName => "c.name",
        }
    }

    /// Value of this field on a joined row; `None` when the join is missing
    pub fn extract(&self, row: &ViewRow) -> Option<Literal> {
        let int = |v: u64| i64::try_from(v).ok().map(Literal::Int);
        match self {
            Self::ViewId => int(row.view.id),
            Self::ViewCount => int(row.view.count),
            Self::ViewedAt => Some(Literal::Time(row.view.viewed_at)),
            Self::ItemId => int(row.view.content_item_id),
            Self::ItemTitle => row.item.as_ref().map(|i| Literal::Text(i.title.clone())),
            Self::ItemCreatedAt => row.item.as_ref().map(|i| Literal::Time(i.created_at)),
            Self::AuthorId => row.author_id().and_then(int),
            Self::AuthorUsername => row.username().map(|u| Literal::Text(u.to_string())),
            Self::CountryId => row
                .author
                .as_ref()
                .and_then(|a| a.country_id)
                .and_then(int),
            Self::CountryName => row.country_name().map(|c| Literal::Text(c.to_string())),
        }
    }
}

fn canonical_segment(segment: &str) -> &str {
    match segment {
        "content_item" | "item" => "blog",
        "content_item_id" | "item_id" => "blog_id",
        "user" => "author",
        "user_id" => "author_id",
        other => other,
    }
}

// =============================================================================
// Literals
// =============================================================================

/// A typed comparison value
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Int(i64),
    Text(String),
    Time(DateTime<Utc>),
}

impl Literal {
    /// Coerce a JSON literal to a field kind
    ///
    /// Integers accept numbers, numeric strings and booleans; text accepts
    /// strings and numbers; timestamps accept RFC 3339, `YYYY-MM-DD HH:MM:SS`
    /// and bare dates. Null is accepted everywhere.
    pub fn coerce(kind: FieldKind, value: &Value) -> Option<Self> {
        if value.is_null() {
            return Some(Self::Null);
        }

        match kind {
            FieldKind::Int => match value {
                Value::Number(n) => n.as_i64().map(Self::Int),
                Value::String(s) => s.trim().parse().ok().map(Self::Int),
                Value::Bool(b) => Some(Self::Int(i64::from(*b))),
                _ => None,
            },
            FieldKind::Text => match value {
                Value::String(s) => Some(Self::Text(s.clone())),
                Value::Number(n) => Some(Self::Text(n.to_string())),
                _ => None,
            },
            FieldKind::Time => value
                .as_str()
                .and_then(|s| parse_timestamp(s).ok())
                .map(Self::Time),
        }
    }
}
