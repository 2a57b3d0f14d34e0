//! Predicate composition
//!
//! [`compose`] validates a [`CriteriaSet`] against an entity schema and folds
//! it into a [`ComposedPredicate`] tree. Composition is pure: it never touches
//! storage, and every validation failure surfaces here, before any query runs.
//!
//! The tree is simplified as it is built, so a conjunction that contains an
//! unsatisfiable test collapses to [`ComposedPredicate::MatchNone`] and an empty
//! conjunction is [`ComposedPredicate::MatchAll`].
//!
//! # Example
//!
//! ```rust
//! use food_service::query::{compose, CompositionMode, ComposedPredicate, CriteriaSet, Criterion, EntityKind};
//!
//! let schema = EntityKind::Product.schema();
//!
//! let all = compose(schema, &CriteriaSet::new(), CompositionMode::Conjunctive).unwrap();
//! assert_eq!(all, ComposedPredicate::MatchAll);
//!
//! let none = CriteriaSet::new().with(Criterion::one_of::<&str>("categories", []));
//! let none = compose(schema, &none, CompositionMode::Conjunctive).unwrap();
//! assert_eq!(none, ComposedPredicate::MatchNone);
//! ```

use std::fmt;

use crate::query::criteria::{CriteriaSet, Criterion, Operator, Value};
use crate::query::error::{QueryError, QueryResult};
use crate::query::schema::{EntitySchema, FieldDef, FieldType, FieldValue, Record};

/// How the criteria of one request are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompositionMode {
    /// Every criterion must hold; empty set matches all
    #[default]
    Conjunctive,
    /// At least one criterion must hold; empty set matches none
    Disjunctive,
}

/// A validated test bound to a declared field
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    /// The declared field under test
    pub field: &'static FieldDef,
    /// Test and normalized operand
    pub op: Operator,
}

impl Predicate {
    /// Evaluate against one record; absent values never match
    pub fn matches<R: Record>(&self, record: &R) -> bool {
        let value = record.field(self.field.name);
        match &self.op {
            Operator::Equals(expected) => value_equals(value, expected),
            Operator::Contains(needle) => match value {
                FieldValue::Text(text) => text.contains(needle.as_str()),
                FieldValue::Identifier(id) => id.to_string().contains(needle.as_str()),
                _ => false,
            },
            Operator::Between(low, high) => match value {
                FieldValue::Number(n) => *low <= n && n <= *high,
                FieldValue::Identifier(id) => {
                    let n = id as f64;
                    *low <= n && n <= *high
                }
                _ => false,
            },
            Operator::In(values) => match value {
                FieldValue::TextList(items) => items.iter().any(|item| {
                    values
                        .iter()
                        .any(|v| matches!(v, Value::Text(t) if t == item))
                }),
                scalar => values.iter().any(|v| value_equals(scalar, v)),
            },
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field.name, self.op)
    }
}

fn value_equals(actual: FieldValue<'_>, expected: &Value) -> bool {
    match (actual, expected) {
        (FieldValue::Text(a), Value::Text(b)) => a == b,
        (FieldValue::Number(a), Value::Number(b)) => a == *b,
        (FieldValue::Boolean(a), Value::Boolean(b)) => a == *b,
        (FieldValue::Identifier(a), Value::Identifier(b)) => a == *b,
        _ => false,
    }
}

/// A tree of predicates ready to hand to storage
#[derive(Debug, Clone, PartialEq)]
pub enum ComposedPredicate {
    /// Matches every row
    MatchAll,
    /// Matches no row
    MatchNone,
    /// A single field test
    Test(Predicate),
    /// Every child must hold
    And(Vec<ComposedPredicate>),
    /// At least one child must hold
    Or(Vec<ComposedPredicate>),
}

impl ComposedPredicate {
    /// Conjunction with constant folding
    #[must_use]
    pub fn all_of(parts: Vec<ComposedPredicate>) -> Self {
        if parts.iter().any(|p| matches!(p, Self::MatchNone)) {
            return Self::MatchNone;
        }
        let mut parts: Vec<_> = parts
            .into_iter()
            .filter(|p| !matches!(p, Self::MatchAll))
            .collect();
        match parts.len() {
            0 => Self::MatchAll,
            1 => parts.remove(0),
            _ => Self::And(parts),
        }
    }

    /// Disjunction with constant folding
    #[must_use]
    pub fn any_of(parts: Vec<ComposedPredicate>) -> Self {
        if parts.iter().any(|p| matches!(p, Self::MatchAll)) {
            return Self::MatchAll;
        }
        let mut parts: Vec<_> = parts
            .into_iter()
            .filter(|p| !matches!(p, Self::MatchNone))
            .collect();
        match parts.len() {
            0 => Self::MatchNone,
            1 => parts.remove(0),
            _ => Self::Or(parts),
        }
    }

    /// Evaluate against one record
    pub fn matches<R: Record>(&self, record: &R) -> bool {
        match self {
            Self::MatchAll => true,
            Self::MatchNone => false,
            Self::Test(predicate) => predicate.matches(record),
            Self::And(parts) => parts.iter().all(|p| p.matches(record)),
            Self::Or(parts) => parts.iter().any(|p| p.matches(record)),
        }
    }
}

impl fmt::Display for ComposedPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MatchAll => write!(f, "TRUE"),
            Self::MatchNone => write!(f, "FALSE"),
            Self::Test(predicate) => write!(f, "{predicate}"),
            Self::And(parts) => write_joined(f, parts, "AND"),
            Self::Or(parts) => write_joined(f, parts, "OR"),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, parts: &[ComposedPredicate], sep: &str) -> fmt::Result {
    write!(f, "(")?;
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            write!(f, " {sep} ")?;
        }
        write!(f, "{part}")?;
    }
    write!(f, ")")
}

/// Validate and combine criteria for one entity kind
///
/// # Errors
///
/// - `InvalidCriterion` when a field is undeclared or an operand does not fit
///   the field's type
/// - `InvalidRange` when a `Between` has `low > high`
pub fn compose(
    schema: &EntitySchema,
    criteria: &CriteriaSet,
    mode: CompositionMode,
) -> QueryResult<ComposedPredicate> {
    let parts = criteria
        .iter()
        .map(|criterion| validate(schema, criterion))
        .collect::<QueryResult<Vec<_>>>()?;

    Ok(match mode {
        CompositionMode::Conjunctive => ComposedPredicate::all_of(parts),
        CompositionMode::Disjunctive => ComposedPredicate::any_of(parts),
    })
}

/// `Contains(keyword)` over the kind's keyword-search fields
#[must_use]
pub fn keyword_criteria(schema: &EntitySchema, keyword: &str) -> CriteriaSet {
    schema
        .search_fields
        .iter()
        .map(|field| Criterion::contains(*field, keyword))
        .collect()
}

fn validate(schema: &EntitySchema, criterion: &Criterion) -> QueryResult<ComposedPredicate> {
    let field = schema
        .field(&criterion.field)
        .ok_or_else(|| QueryError::undeclared_field(&criterion.field).with_entity(schema.kind))?;

    let mismatch = || {
        QueryError::invalid_criterion(
            field.name,
            format!(
                "Operator '{}' does not apply to {} field '{}'",
                criterion.op.name(),
                field.ty,
                field.name
            ),
        )
        .with_entity(schema.kind)
    };

    let op = match &criterion.op {
        Operator::Equals(value) => {
            if field.ty == FieldType::TextList {
                return Err(mismatch());
            }
            Operator::Equals(coerce(field, value).ok_or_else(mismatch)?)
        }
        Operator::Contains(text) => match field.ty {
            FieldType::Text | FieldType::Identifier => Operator::Contains(text.clone()),
            _ => return Err(mismatch()),
        },
        Operator::Between(low, high) => {
            if !matches!(field.ty, FieldType::Number | FieldType::Identifier) {
                return Err(mismatch());
            }
            if low.is_nan() || high.is_nan() {
                return Err(QueryError::invalid_criterion(
                    field.name,
                    "Range bounds must be numbers",
                )
                .with_entity(schema.kind));
            }
            if low > high {
                return Err(
                    QueryError::invalid_range(field.name, *low, *high).with_entity(schema.kind)
                );
            }
            Operator::Between(*low, *high)
        }
        Operator::In(values) => {
            let values = values
                .iter()
                .map(|value| coerce(field, value).ok_or_else(mismatch))
                .collect::<QueryResult<Vec<_>>>()?;
            if values.is_empty() {
                return Ok(ComposedPredicate::MatchNone);
            }
            Operator::In(values)
        }
    };

    Ok(ComposedPredicate::Test(Predicate { field, op }))
}

/// Fit an operand to the field's type, widening identifiers to numbers
fn coerce(field: &FieldDef, value: &Value) -> Option<Value> {
    match (field.ty, value) {
        (FieldType::Text | FieldType::TextList, Value::Text(_))
        | (FieldType::Number, Value::Number(_))
        | (FieldType::Boolean, Value::Boolean(_))
        | (FieldType::Identifier, Value::Identifier(_)) => Some(value.clone()),
        (FieldType::Number, Value::Identifier(id)) => Some(Value::Number(*id as f64)),
        _ => None,
    }
}
