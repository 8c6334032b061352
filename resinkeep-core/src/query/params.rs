//! Conversion of query-string DTOs into [`Query`]s.

use resinkeep_sdk::objects::query::DEFAULT_COLOR_SIMILARITY_THRESHOLD;
use resinkeep_sdk::objects::{ContainerQuery, MaterialTypeQuery, VendorQuery};

use super::{ColorFilter, Filter, Query, QueryError, parse_ids, parse_sort, parse_terms};
use crate::color::{Lab, normalize_hex};
use crate::entities::{ContainerRow, MaterialTypeRow, Vendor};

struct Builder<R> {
    query: Query<R>,
}

impl<R> Builder<R> {
    fn new() -> Self {
        Self {
            query: Query::new(),
        }
    }

    fn text(mut self, path: &'static str, raw: Option<&str>) -> Self {
        if let Some(raw) = raw {
            self.query.filters.push(Filter::TextContains {
                path,
                set: parse_terms(raw),
            });
        }
        self
    }

    fn ids(mut self, path: &'static str, raw: Option<&str>) -> Result<Self, QueryError> {
        if let Some(raw) = raw {
            self.query.filters.push(Filter::IdIn {
                path,
                set: parse_ids(path, raw)?,
            });
        }
        Ok(self)
    }

    fn finish(mut self, sort: Option<&str>, limit: Option<u64>, offset: u64) -> Result<Query<R>, QueryError> {
        if let Some(sort) = sort {
            self.query.sort = parse_sort(sort)?;
        }
        Ok(self.query.page(limit, offset))
    }
}

fn color_filter(hex: Option<&str>, threshold: Option<f64>) -> Result<Option<ColorFilter>, QueryError> {
    let Some(hex) = hex else {
        return Ok(None);
    };
    let invalid = || QueryError::InvalidColor(hex.to_string());
    let Some(normalized) = normalize_hex(hex).map_err(|_| invalid())? else {
        return Ok(None);
    };
    let lab = Lab::from_hex(&normalized).ok_or_else(invalid)?;
    let threshold = threshold.unwrap_or(DEFAULT_COLOR_SIMILARITY_THRESHOLD);
    if !(0.0..=100.0).contains(&threshold) {
        return Err(QueryError::InvalidThreshold(threshold));
    }
    Ok(Some(ColorFilter { lab, threshold }))
}

impl TryFrom<VendorQuery> for Query<Vendor> {
    type Error = QueryError;

    fn try_from(q: VendorQuery) -> Result<Self, QueryError> {
        Builder::new()
            .text("name", q.name.as_deref())
            .ids("id", q.id.as_deref())?
            .finish(q.sort.as_deref(), q.limit, q.offset)
    }
}

impl TryFrom<MaterialTypeQuery> for Query<MaterialTypeRow> {
    type Error = QueryError;

    fn try_from(q: MaterialTypeQuery) -> Result<Self, QueryError> {
        let mut query = Builder::new()
            .text("vendor.name", q.vendor_name.as_deref())
            .ids("vendor.id", q.vendor_id.as_deref())?
            .text("name", q.name.as_deref())
            .text("material", q.material.as_deref())
            .text("article_number", q.article_number.as_deref())
            .finish(q.sort.as_deref(), q.limit, q.offset)?;
        query.color = color_filter(q.color_hex.as_deref(), q.color_similarity_threshold)?;
        Ok(query)
    }
}

impl TryFrom<ContainerQuery> for Query<ContainerRow> {
    type Error = QueryError;

    fn try_from(q: ContainerQuery) -> Result<Self, QueryError> {
        let mut query = Builder::new()
            .text("material_type.name", q.material_type_name.as_deref())
            .ids("material_type.id", q.material_type_id.as_deref())?
            .text("material_type.material", q.material_type_material.as_deref())
            .text("material_type.vendor.name", q.vendor_name.as_deref())
            .ids("material_type.vendor.id", q.vendor_id.as_deref())?
            .text("location", q.location.as_deref())
            .text("lot_nr", q.lot_nr.as_deref())
            .finish(q.sort.as_deref(), q.limit, q.offset)?;
        if !q.allow_archived {
            query.filters.push(Filter::NotTrue { path: "archived" });
        }
        Ok(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Direction, IdSet};

    #[test]
    fn test_container_query_defaults_to_unarchived() {
        let query = Query::<ContainerRow>::try_from(ContainerQuery::default()).unwrap();
        assert_eq!(query.filters, vec![Filter::NotTrue { path: "archived" }]);

        let query = Query::<ContainerRow>::try_from(ContainerQuery {
            allow_archived: true,
            ..Default::default()
        })
        .unwrap();
        assert!(query.filters.is_empty());
    }

    #[test]
    fn test_material_type_query_maps_filters() {
        let query = Query::<MaterialTypeRow>::try_from(MaterialTypeQuery {
            vendor_id: Some("-1,4".to_string()),
            sort: Some("vendor.name:desc".to_string()),
            limit: Some(10),
            offset: 20,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            query.filters,
            vec![Filter::IdIn {
                path: "vendor.id",
                set: IdSet {
                    ids: vec![4],
                    include_null: true
                }
            }]
        );
        assert_eq!(query.sort[0].direction, Direction::Desc);
        assert_eq!((query.limit, query.offset), (Some(10), 20));
        assert!(query.color.is_none());
    }

    #[test]
    fn test_color_filter_validation() {
        let query = Query::<MaterialTypeRow>::try_from(MaterialTypeQuery {
            color_hex: Some("#00ff00".to_string()),
            ..Default::default()
        })
        .unwrap();
        let color = query.color.unwrap();
        assert_eq!(color.threshold, DEFAULT_COLOR_SIMILARITY_THRESHOLD);

        let err = Query::<MaterialTypeRow>::try_from(MaterialTypeQuery {
            color_hex: Some("00ff00".to_string()),
            color_similarity_threshold: Some(150.0),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err, QueryError::InvalidThreshold(150.0));

        assert!(
            Query::<MaterialTypeRow>::try_from(MaterialTypeQuery {
                color_hex: Some("green".to_string()),
                ..Default::default()
            })
            .is_err()
        );
    }
}
