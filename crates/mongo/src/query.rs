//! Query translation.
//!
//! Renders the storage-neutral [`Query`] into MongoDB filter and sort
//! documents plus skip/limit values. Translation is pure: the same query
//! always yields the same native query.

use mongodb::bson::{Bson, Document, doc};

use rested_resource::error::{QueryError, StorageError, StorageResult};
use rested_resource::item::ID_FIELD;
use rested_resource::query::{Predicate, Query, SortDirection, Window};

use crate::document::{ID_KEY, to_bson};

/// Renders the query predicates as a MongoDB filter.
///
/// Top-level predicates are combined with `$and`; an empty predicate list
/// matches every document.
pub fn translate_filter(query: &Query) -> StorageResult<Document> {
    match query.predicates.as_slice() {
        [] => Ok(Document::new()),
        [single] => translate_predicate(single),
        many => Ok(doc! { "$and": translate_all(many)? }),
    }
}

/// Renders the sort directives as a MongoDB sort document.
///
/// Without directives, documents are sorted by `_id` so pagination windows
/// are stable between calls.
pub fn translate_sort(query: &Query) -> StorageResult<Document> {
    if query.sort.is_empty() {
        return Ok(doc! { ID_KEY: 1 });
    }
    let mut sort = Document::new();
    for field in &query.sort {
        let direction = match field.direction {
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        };
        sort.insert(field_name(&field.name)?, direction);
    }
    Ok(sort)
}

/// Renders a window as MongoDB `(skip, limit)`.
///
/// A zero limit means "unlimited" to MongoDB; callers must handle
/// `window.limit == 0` before using the returned limit.
pub fn translate_window(window: &Window) -> (u64, i64) {
    let limit = i64::try_from(window.limit).unwrap_or(i64::MAX);
    (window.offset, limit)
}

/// Maps a resource field name to its document field name.
pub fn field_name(name: &str) -> StorageResult<String> {
    if name.is_empty() || name.starts_with('$') {
        return Err(StorageError::Query(QueryError::InvalidField {
            field: name.to_string(),
        }));
    }
    if name == ID_FIELD {
        return Ok(ID_KEY.to_string());
    }
    Ok(name.to_string())
}

fn translate_all(predicates: &[Predicate]) -> StorageResult<Vec<Document>> {
    predicates.iter().map(translate_predicate).collect()
}

fn translate_predicate(predicate: &Predicate) -> StorageResult<Document> {
    let translated = match predicate {
        Predicate::Equal { field, value } => on_field(field, to_bson(field, value)?)?,
        Predicate::NotEqual { field, value } => comparison(field, "$ne", value)?,
        Predicate::GreaterThan { field, value } => comparison(field, "$gt", value)?,
        Predicate::GreaterOrEqual { field, value } => comparison(field, "$gte", value)?,
        Predicate::LowerThan { field, value } => comparison(field, "$lt", value)?,
        Predicate::LowerOrEqual { field, value } => comparison(field, "$lte", value)?,
        Predicate::In { field, values } => membership(field, "$in", values)?,
        Predicate::NotIn { field, values } => membership(field, "$nin", values)?,
        Predicate::Exist { field } => on_field(field, doc! { "$exists": true })?,
        Predicate::NotExist { field } => on_field(field, doc! { "$exists": false })?,
        Predicate::Regex { field, pattern } => {
            on_field(field, doc! { "$regex": pattern.as_str() })?
        }
        Predicate::ElemMatch { field, predicates } => {
            let inner = match predicates.as_slice() {
                [] => return Err(empty_group("$elemMatch")),
                [single] => translate_predicate(single)?,
                many => doc! { "$and": translate_all(many)? },
            };
            on_field(field, doc! { "$elemMatch": inner })?
        }
        Predicate::And(predicates) => {
            if predicates.is_empty() {
                return Err(empty_group("$and"));
            }
            doc! { "$and": translate_all(predicates)? }
        }
        Predicate::Or(predicates) => {
            if predicates.is_empty() {
                return Err(empty_group("$or"));
            }
            doc! { "$or": translate_all(predicates)? }
        }
    };
    Ok(translated)
}

fn comparison(field: &str, operator: &str, value: &serde_json::Value) -> StorageResult<Document> {
    let mut condition = Document::new();
    condition.insert(operator, to_bson(field, value)?);
    on_field(field, condition)
}

fn membership(
    field: &str,
    operator: &str,
    values: &[serde_json::Value],
) -> StorageResult<Document> {
    let values = values
        .iter()
        .map(|value| to_bson(field, value))
        .collect::<StorageResult<Vec<Bson>>>()?;
    let mut condition = Document::new();
    condition.insert(operator, values);
    on_field(field, condition)
}

fn on_field(field: &str, condition: impl Into<Bson>) -> StorageResult<Document> {
    let mut document = Document::new();
    document.insert(field_name(field)?, condition);
    Ok(document)
}

fn empty_group(operator: &str) -> StorageError {
    StorageError::Query(QueryError::InvalidPredicate {
        message: format!("{operator} requires at least one predicate"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rested_resource::query::SortField;
    use serde_json::json;

    #[test]
    fn test_empty_query_matches_everything() {
        assert_eq!(translate_filter(&Query::new()).unwrap(), Document::new());
    }

    #[test]
    fn test_single_predicate_is_not_wrapped() {
        let query = Query::new().with_predicate(Predicate::eq("name", json!("John")));
        assert_eq!(translate_filter(&query).unwrap(), doc! { "name": "John" });
    }

    #[test]
    fn test_id_field_maps_to_underscore_id() {
        let query = Query::new().with_predicate(Predicate::is_in("id", vec![json!("a"), json!("b")]));
        assert_eq!(
            translate_filter(&query).unwrap(),
            doc! { "_id": { "$in": ["a", "b"] } }
        );
    }

    #[test]
    fn test_top_level_predicates_are_anded() {
        let query = Query::new()
            .with_predicate(Predicate::gte("age", json!(18)))
            .with_predicate(Predicate::lt("age", json!(65)));
        assert_eq!(
            translate_filter(&query).unwrap(),
            doc! { "$and": [ { "age": { "$gte": 18 } }, { "age": { "$lt": 65 } } ] }
        );
    }

    #[test]
    fn test_nested_groups_and_existence() {
        let query = Query::new().with_predicate(Predicate::or(vec![
            Predicate::ne("status", json!("draft")),
            Predicate::and(vec![
                Predicate::not_exists("status"),
                Predicate::regex("title", "^a"),
            ]),
        ]));
        assert_eq!(
            translate_filter(&query).unwrap(),
            doc! { "$or": [
                { "status": { "$ne": "draft" } },
                { "$and": [
                    { "status": { "$exists": false } },
                    { "title": { "$regex": "^a" } },
                ] },
            ] }
        );
    }

    #[test]
    fn test_elem_match() {
        let query = Query::new().with_predicate(Predicate::ElemMatch {
            field: "tags".into(),
            predicates: vec![Predicate::eq("name", json!("rust"))],
        });
        assert_eq!(
            translate_filter(&query).unwrap(),
            doc! { "tags": { "$elemMatch": { "name": "rust" } } }
        );
    }

    #[test]
    fn test_empty_groups_are_rejected() {
        for predicate in [Predicate::or(vec![]), Predicate::and(vec![])] {
            let query = Query::new().with_predicate(predicate);
            assert!(matches!(
                translate_filter(&query),
                Err(StorageError::Query(QueryError::InvalidPredicate { .. }))
            ));
        }
    }

    #[test]
    fn test_invalid_field_is_rejected() {
        let query = Query::new().with_predicate(Predicate::exists(""));
        assert!(matches!(
            translate_filter(&query),
            Err(StorageError::Query(QueryError::InvalidField { .. }))
        ));
    }

    #[test]
    fn test_sort_keeps_directive_order() {
        let query = Query::new()
            .with_sort(SortField::parse("-updated"))
            .with_sort(SortField::parse("id"));
        let sort = translate_sort(&query).unwrap();
        let keys: Vec<_> = sort.keys().cloned().collect();
        assert_eq!(keys, vec!["updated".to_string(), "_id".to_string()]);
        assert_eq!(sort, doc! { "updated": -1, "_id": 1 });
    }

    #[test]
    fn test_default_sort_is_by_id() {
        assert_eq!(translate_sort(&Query::new()).unwrap(), doc! { "_id": 1 });
    }

    #[test]
    fn test_translation_is_deterministic() {
        let query = Query::new()
            .with_predicate(Predicate::eq("a", json!(1)))
            .with_predicate(Predicate::is_in("b", vec![json!(true)]));
        assert_eq!(
            translate_filter(&query).unwrap(),
            translate_filter(&query).unwrap()
        );
    }

    #[test]
    fn test_window() {
        assert_eq!(translate_window(&Window::new(10, 5)), (10, 5));
        assert_eq!(translate_window(&Window::new(0, u64::MAX)), (0, i64::MAX));
    }
}
