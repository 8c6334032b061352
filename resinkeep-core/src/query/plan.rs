use std::cmp::Ordering;

use super::schema::{FieldDef, FieldValue, Schema};
use super::{Direction, Filter, Query, QueryError};

/// A filter bound to a registry field.
#[derive(Debug, Clone)]
pub enum Predicate<R: 'static> {
    IdIn {
        field: &'static FieldDef<R>,
        ids: Vec<i64>,
        include_null: bool,
    },
    TextContains {
        field: &'static FieldDef<R>,
        terms: Vec<String>,
        include_empty: bool,
    },
    NotTrue {
        field: &'static FieldDef<R>,
    },
}

#[derive(Debug, Clone)]
pub struct SortKey<R: 'static> {
    pub field: &'static FieldDef<R>,
    pub direction: Direction,
}

/// A query with every field path resolved, ready for a store to execute.
///
/// Predicates are ANDed. Rows are ordered by `sort`, then by id. `limit`
/// and `offset` only apply when `limit` is set.
#[derive(Debug, Clone)]
pub struct Plan<R: 'static> {
    pub predicates: Vec<Predicate<R>>,
    pub sort: Vec<SortKey<R>>,
    pub limit: Option<u64>,
    pub offset: u64,
}

fn lookup<R: Schema>(path: &str) -> Result<&'static FieldDef<R>, QueryError> {
    R::field(path).ok_or_else(|| QueryError::UnknownField {
        resource: R::RESOURCE.as_str(),
        field: path.to_string(),
    })
}

impl<R: Schema> Plan<R> {
    pub fn resolve(query: &Query<R>) -> Result<Self, QueryError> {
        let predicates = query
            .filters
            .iter()
            .map(|filter| {
                Ok(match filter {
                    Filter::IdIn { path, set } => Predicate::IdIn {
                        field: lookup::<R>(path)?,
                        ids: set.ids.clone(),
                        include_null: set.include_null,
                    },
                    Filter::TextContains { path, set } => Predicate::TextContains {
                        field: lookup::<R>(path)?,
                        terms: set.terms.clone(),
                        include_empty: set.include_empty,
                    },
                    Filter::NotTrue { path } => Predicate::NotTrue {
                        field: lookup::<R>(path)?,
                    },
                })
            })
            .collect::<Result<Vec<_>, QueryError>>()?;

        let sort = query
            .sort
            .iter()
            .map(|spec| {
                Ok(SortKey {
                    field: lookup::<R>(&spec.path)?,
                    direction: spec.direction,
                })
            })
            .collect::<Result<Vec<_>, QueryError>>()?;

        Ok(Self {
            predicates,
            sort,
            limit: query.limit,
            offset: query.offset,
        })
    }

    /// Same filters, no ordering and no paging.
    pub fn unpaged(&self) -> Self {
        Self {
            predicates: self.predicates.clone(),
            sort: Vec::new(),
            limit: None,
            offset: 0,
        }
    }

    /// Restrict the plan to rows whose id is in `ids`.
    pub fn restrict_ids(&mut self, ids: Vec<i64>) -> Result<(), QueryError> {
        self.predicates.push(Predicate::IdIn {
            field: lookup::<R>("id")?,
            ids,
            include_null: false,
        });
        Ok(())
    }

    pub fn matches(&self, row: &R) -> bool {
        self.predicates.iter().all(|predicate| predicate.matches(row))
    }

    pub fn compare(&self, a: &R, b: &R) -> Ordering {
        for key in &self.sort {
            let ordering = (key.field.read)(a).compare(&(key.field.read)(b));
            let ordering = match key.direction {
                Direction::Asc => ordering,
                Direction::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        a.id().cmp(&b.id())
    }
}

impl<R: 'static> Predicate<R> {
    pub fn matches(&self, row: &R) -> bool {
        match self {
            Predicate::IdIn {
                field,
                ids,
                include_null,
            } => match (field.read)(row) {
                FieldValue::Null => *include_null,
                FieldValue::Int(id) => ids.contains(&id),
                _ => false,
            },
            Predicate::TextContains {
                field,
                terms,
                include_empty,
            } => match (field.read)(row) {
                FieldValue::Null => *include_empty,
                FieldValue::Text(text) if text.is_empty() => *include_empty,
                FieldValue::Text(text) => {
                    let text = text.to_lowercase();
                    terms
                        .iter()
                        .any(|term| text.contains(&term.to_lowercase()))
                }
                _ => false,
            },
            Predicate::NotTrue { field } => !matches!((field.read)(row), FieldValue::Bool(true)),
        }
    }
}
