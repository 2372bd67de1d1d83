//! Storage-neutral query model.
//!
//! A [`Query`] combines a predicate tree, sort directives and an optional
//! pagination [`Window`]. Storage handlers translate it into their native
//! query language.
//!
//! ```
//! use rested_resource::query::{Predicate, Query, SortField, Window};
//! use serde_json::json;
//!
//! let query = Query::new()
//!     .with_predicate(Predicate::eq("user", json!("u1")))
//!     .with_predicate(Predicate::or(vec![
//!         Predicate::eq("public", json!(true)),
//!         Predicate::exists("published"),
//!     ]))
//!     .with_sort(SortField::parse("-updated"))
//!     .with_window(Window::new(20, 10));
//!
//! assert_eq!(query.predicates.len(), 2);
//! assert_eq!(query.window.map(|w| w.limit), Some(10));
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A node of the filter tree.
///
/// Top-level predicates of a [`Query`] are implicitly combined with AND.
// Variant fields are named after what they hold
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "args", rename_all = "snake_case")]
pub enum Predicate {
    /// Field equals value.
    Equal { field: String, value: Value },
    /// Field differs from value.
    NotEqual { field: String, value: Value },
    /// Field is strictly greater than value.
    GreaterThan { field: String, value: Value },
    /// Field is greater than or equal to value.
    GreaterOrEqual { field: String, value: Value },
    /// Field is strictly lower than value.
    LowerThan { field: String, value: Value },
    /// Field is lower than or equal to value.
    LowerOrEqual { field: String, value: Value },
    /// Field equals one of the values.
    In { field: String, values: Vec<Value> },
    /// Field equals none of the values.
    NotIn { field: String, values: Vec<Value> },
    /// Field is present.
    Exist { field: String },
    /// Field is absent.
    NotExist { field: String },
    /// Field matches a regular expression.
    Regex { field: String, pattern: String },
    /// At least one element of an array field matches every sub-predicate.
    ElemMatch {
        field: String,
        predicates: Vec<Predicate>,
    },
    /// Every sub-predicate matches.
    And(Vec<Predicate>),
    /// At least one sub-predicate matches.
    Or(Vec<Predicate>),
}

impl Predicate {
    /// `field == value`
    pub fn eq(field: impl Into<String>, value: Value) -> Self {
        Predicate::Equal {
            field: field.into(),
            value,
        }
    }

    /// `field != value`
    pub fn ne(field: impl Into<String>, value: Value) -> Self {
        Predicate::NotEqual {
            field: field.into(),
            value,
        }
    }

    /// `field > value`
    pub fn gt(field: impl Into<String>, value: Value) -> Self {
        Predicate::GreaterThan {
            field: field.into(),
            value,
        }
    }

    /// `field >= value`
    pub fn gte(field: impl Into<String>, value: Value) -> Self {
        Predicate::GreaterOrEqual {
            field: field.into(),
            value,
        }
    }

    /// `field < value`
    pub fn lt(field: impl Into<String>, value: Value) -> Self {
        Predicate::LowerThan {
            field: field.into(),
            value,
        }
    }

    /// `field <= value`
    pub fn lte(field: impl Into<String>, value: Value) -> Self {
        Predicate::LowerOrEqual {
            field: field.into(),
            value,
        }
    }

    /// `field in values`
    pub fn is_in(field: impl Into<String>, values: Vec<Value>) -> Self {
        Predicate::In {
            field: field.into(),
            values,
        }
    }

    /// `field not in values`
    pub fn not_in(field: impl Into<String>, values: Vec<Value>) -> Self {
        Predicate::NotIn {
            field: field.into(),
            values,
        }
    }

    /// Field is present.
    pub fn exists(field: impl Into<String>) -> Self {
        Predicate::Exist {
            field: field.into(),
        }
    }

    /// Field is absent.
    pub fn not_exists(field: impl Into<String>) -> Self {
        Predicate::NotExist {
            field: field.into(),
        }
    }

    /// Field matches `pattern`.
    pub fn regex(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Predicate::Regex {
            field: field.into(),
            pattern: pattern.into(),
        }
    }

    /// Conjunction.
    pub fn and(predicates: Vec<Predicate>) -> Self {
        Predicate::And(predicates)
    }

    /// Disjunction.
    pub fn or(predicates: Vec<Predicate>) -> Self {
        Predicate::Or(predicates)
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SortDirection {
    /// Ascending order.
    #[default]
    Ascending,
    /// Descending order.
    Descending,
}

/// A sort directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortField {
    /// The field to sort by.
    pub name: String,
    /// The sort direction.
    pub direction: SortDirection,
}

impl SortField {
    /// Ascending sort on `name`.
    pub fn asc(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            direction: SortDirection::Ascending,
        }
    }

    /// Descending sort on `name`.
    pub fn desc(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            direction: SortDirection::Descending,
        }
    }

    /// Parses a sort value (e.g., "-updated" for descending).
    pub fn parse(s: &str) -> Self {
        match s.strip_prefix('-') {
            Some(stripped) => Self::desc(stripped),
            None => Self::asc(s),
        }
    }
}

/// A pagination window.
///
/// `limit == 0` asks for zero items, never for "no limit".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    /// Number of matching items to skip.
    pub offset: u64,
    /// Maximum number of items to return.
    pub limit: u64,
}

impl Window {
    /// Creates a window.
    pub fn new(offset: u64, limit: u64) -> Self {
        Self { offset, limit }
    }

    /// A window starting at the first item.
    pub fn first(limit: u64) -> Self {
        Self::new(0, limit)
    }
}

/// A complete query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Filter predicates, combined with AND. Empty matches everything.
    pub predicates: Vec<Predicate>,

    /// Sort directives, most significant first.
    pub sort: Vec<SortField>,

    /// Optional pagination window.
    pub window: Option<Window>,
}

impl Query {
    /// Creates a query matching every item.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a filter predicate.
    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Adds a sort directive.
    pub fn with_sort(mut self, sort: SortField) -> Self {
        self.sort.push(sort);
        self
    }

    /// Sets the pagination window.
    pub fn with_window(mut self, window: Window) -> Self {
        self.window = Some(window);
        self
    }
}
