//! Declarative filter / sort / paginate queries.
//!
//! A [`Query`] names fields by their dotted path (`vendor.name`,
//! `material_type.vendor.id`, ...). [`plan::Plan::resolve`] checks every
//! path against the entity's field registry ([`schema::Schema`]) and turns
//! the query into a plan a [`crate::store::Store`] can execute. The
//! [`engine::QueryEngine`] drives the count / page round trips and the
//! two-pass color filter.

pub mod engine;
pub mod params;
pub mod plan;
pub mod schema;

pub use engine::{QueryEngine, SearchResult};
pub use plan::{Plan, Predicate, SortKey};
pub use schema::{FieldDef, FieldValue, Schema};

use std::marker::PhantomData;

use thiserror::Error;

use crate::color::Lab;

#[derive(Debug, Error, PartialEq)]
pub enum QueryError {
    #[error("invalid id {value:?} in filter {field}")]
    InvalidId { field: &'static str, value: String },
    #[error("invalid sort token {0:?}: expected field:asc or field:desc")]
    InvalidSort(String),
    #[error("unknown field {field:?} for {resource}")]
    UnknownField {
        resource: &'static str,
        field: String,
    },
    #[error("invalid color {0:?}: expected 6 or 8 hex digits")]
    InvalidColor(String),
    #[error("color similarity threshold must be between 0 and 100, got {0}")]
    InvalidThreshold(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub path: String,
    pub direction: Direction,
}

/// Comma-separated integer set. `-1` selects rows where the relation is
/// absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdSet {
    pub ids: Vec<i64>,
    pub include_null: bool,
}

/// Comma-separated substring set. An empty entry selects rows where the
/// field is null or empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TermSet {
    pub terms: Vec<String>,
    pub include_empty: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    IdIn { path: &'static str, set: IdSet },
    TextContains { path: &'static str, set: TermSet },
    /// Matches rows where the boolean field is false or unset.
    NotTrue { path: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorFilter {
    pub lab: Lab,
    /// Maximum CIEDE2000 difference, inclusive.
    pub threshold: f64,
}

/// A search request against the entity whose row type is `R`.
#[derive(Debug, Clone, PartialEq)]
pub struct Query<R> {
    pub filters: Vec<Filter>,
    pub sort: Vec<SortSpec>,
    pub color: Option<ColorFilter>,
    pub limit: Option<u64>,
    pub offset: u64,
    row: PhantomData<fn() -> R>,
}

impl<R> Default for Query<R> {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            sort: Vec::new(),
            color: None,
            limit: None,
            offset: 0,
            row: PhantomData,
        }
    }
}

impl<R> Query<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn sort_by(mut self, path: impl Into<String>, direction: Direction) -> Self {
        self.sort.push(SortSpec {
            path: path.into(),
            direction,
        });
        self
    }

    pub fn page(mut self, limit: Option<u64>, offset: u64) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }
}

pub fn parse_ids(field: &'static str, raw: &str) -> Result<IdSet, QueryError> {
    let mut set = IdSet::default();
    for part in raw.split(',') {
        let id: i64 = part.trim().parse().map_err(|_| QueryError::InvalidId {
            field,
            value: part.to_string(),
        })?;
        if id == -1 {
            set.include_null = true;
        } else {
            set.ids.push(id);
        }
    }
    Ok(set)
}

pub fn parse_terms(raw: &str) -> TermSet {
    let mut set = TermSet::default();
    for part in raw.split(',') {
        if part.is_empty() {
            set.include_empty = true;
        } else {
            set.terms.push(part.to_string());
        }
    }
    set
}

pub fn parse_sort(raw: &str) -> Result<Vec<SortSpec>, QueryError> {
    raw.split(',')
        .filter(|token| !token.trim().is_empty())
        .map(|token| {
            let (path, direction) = token
                .trim()
                .split_once(':')
                .ok_or_else(|| QueryError::InvalidSort(token.to_string()))?;
            let direction = match direction.trim().to_ascii_lowercase().as_str() {
                "asc" => Direction::Asc,
                "desc" => Direction::Desc,
                _ => return Err(QueryError::InvalidSort(token.to_string())),
            };
            Ok(SortSpec {
                path: path.trim().to_string(),
                direction,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ids_with_null_sentinel() {
        let set = parse_ids("vendor.id", "3, 7,-1").unwrap();
        assert_eq!(set.ids, vec![3, 7]);
        assert!(set.include_null);

        assert_eq!(
            parse_ids("vendor.id", "3,x"),
            Err(QueryError::InvalidId {
                field: "vendor.id",
                value: "x".to_string()
            })
        );
    }

    #[test]
    fn test_parse_terms_empty_entry() {
        let set = parse_terms("grey,,Tough");
        assert_eq!(set.terms, vec!["grey".to_string(), "Tough".to_string()]);
        assert!(set.include_empty);

        let set = parse_terms("");
        assert!(set.terms.is_empty());
        assert!(set.include_empty);
    }

    #[test]
    fn test_parse_sort() {
        let sort = parse_sort("vendor.name:asc,id:DESC").unwrap();
        assert_eq!(
            sort,
            vec![
                SortSpec {
                    path: "vendor.name".to_string(),
                    direction: Direction::Asc
                },
                SortSpec {
                    path: "id".to_string(),
                    direction: Direction::Desc
                },
            ]
        );
        assert!(matches!(
            parse_sort("name"),
            Err(QueryError::InvalidSort(_))
        ));
        assert!(matches!(
            parse_sort("name:sideways"),
            Err(QueryError::InvalidSort(_))
        ));
    }
}
