//! Criteria: the closed set of field tests a request can ask for
//!
//! A [`Criterion`] pairs a field name with an [`Operator`] carrying its
//! operand. A [`CriteriaSet`] collects the criteria one request supplies;
//! anything the request left out is simply not in the set.
//!
//! # Example
//!
//! ```rust
//! use food_service::query::{CriteriaSet, Criterion};
//!
//! let criteria = CriteriaSet::new()
//!     .with(Criterion::contains("name", "pizza"))
//!     .with(Criterion::between("price", 5.0, 12.5))
//!     .with_optional(None::<Criterion>);
//!
//! assert_eq!(criteria.len(), 2);
//! ```

use std::fmt;

use crate::query::schema::FieldType;

/// A single operand value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Text value
    Text(String),
    /// Floating point value
    Number(f64),
    /// Boolean value
    Boolean(bool),
    /// Integer identifier
    Identifier(i64),
}

impl Value {
    /// Scalar type this value carries
    #[must_use]
    pub const fn value_type(&self) -> FieldType {
        match self {
            Self::Text(_) => FieldType::Text,
            Self::Number(_) => FieldType::Number,
            Self::Boolean(_) => FieldType::Boolean,
            Self::Identifier(_) => FieldType::Identifier,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => write!(f, "'{text}'"),
            Self::Number(number) => write!(f, "{number}"),
            Self::Boolean(flag) => write!(f, "{flag}"),
            Self::Identifier(id) => write!(f, "{id}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(id: i64) -> Self {
        Self::Identifier(id)
    }
}

/// Test applied to one field, carrying its operand
#[derive(Debug, Clone, PartialEq)]
pub enum Operator {
    /// Field equals the value
    Equals(Value),
    /// Field contains the text as a case-sensitive substring
    Contains(String),
    /// Field lies in the inclusive range `[low, high]`
    Between(f64, f64),
    /// Field (or any element of a list field) is one of the values
    In(Vec<Value>),
}

impl Operator {
    /// Short operator name for logs and errors
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Equals(_) => "equals",
            Self::Contains(_) => "contains",
            Self::Between(..) => "between",
            Self::In(_) => "in",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equals(value) => write!(f, "= {value}"),
            Self::Contains(text) => write!(f, "CONTAINS '{text}'"),
            Self::Between(low, high) => write!(f, "BETWEEN {low} AND {high}"),
            Self::In(values) => {
                write!(f, "IN (")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// One requested field test
#[derive(Debug, Clone, PartialEq)]
pub struct Criterion {
    /// Declared field name
    pub field: String,
    /// Test and operand
    pub op: Operator,
}

impl Criterion {
    /// Create a criterion from parts
    pub fn new(field: impl Into<String>, op: Operator) -> Self {
        Self {
            field: field.into(),
            op,
        }
    }

    /// Equality test
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Equals(value.into()))
    }

    /// Case-sensitive substring test
    pub fn contains(field: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(field, Operator::Contains(text.into()))
    }

    /// Inclusive numeric range test
    pub fn between(field: impl Into<String>, low: f64, high: f64) -> Self {
        Self::new(field, Operator::Between(low, high))
    }

    /// Set membership test
    pub fn one_of<V: Into<Value>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::new(field, Operator::In(values.into_iter().map(Into::into).collect()))
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.op)
    }
}

/// The criteria one request supplied
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CriteriaSet {
    criteria: Vec<Criterion>,
}

impl CriteriaSet {
    /// Empty set, which matches every row when composed conjunctively
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a criterion
    #[must_use]
    pub fn with(mut self, criterion: Criterion) -> Self {
        self.criteria.push(criterion);
        self
    }

    /// Add a criterion only when present
    #[must_use]
    pub fn with_optional(mut self, criterion: Option<Criterion>) -> Self {
        self.criteria.extend(criterion);
        self
    }

    /// Add a criterion in place
    pub fn push(&mut self, criterion: Criterion) {
        self.criteria.push(criterion);
    }

    /// Number of criteria
    #[must_use]
    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    /// Whether no criteria were supplied
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// Iterate over the criteria in insertion order
    pub fn iter(&self) -> std::slice::Iter<'_, Criterion> {
        self.criteria.iter()
    }
}

impl FromIterator<Criterion> for CriteriaSet {
    fn from_iter<I: IntoIterator<Item = Criterion>>(iter: I) -> Self {
        Self {
            criteria: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a CriteriaSet {
    type Item = &'a Criterion;
    type IntoIter = std::slice::Iter<'a, Criterion>;

    fn into_iter(self) -> Self::IntoIter {
        self.criteria.iter()
    }
}

impl IntoIterator for CriteriaSet {
    type Item = Criterion;
    type IntoIter = std::vec::IntoIter<Criterion>;

    fn into_iter(self) -> Self::IntoIter {
        self.criteria.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_conversions() {
        assert_eq!(Value::from("pending"), Value::Text("pending".to_string()));
        assert_eq!(Value::from(4.5), Value::Number(4.5));
        assert_eq!(Value::from(true), Value::Boolean(true));
        assert_eq!(Value::from(9_i64), Value::Identifier(9));
    }

    #[test]
    fn test_value_type() {
        assert_eq!(Value::from("x").value_type(), FieldType::Text);
        assert_eq!(Value::from(1_i64).value_type(), FieldType::Identifier);
    }

    #[test]
    fn test_criterion_constructors() {
        let c = Criterion::equals("status", "completed");
        assert_eq!(c.field, "status");
        assert_eq!(c.op, Operator::Equals(Value::Text("completed".into())));

        let c = Criterion::one_of("categories", ["Pizza", "Salad"]);
        assert_eq!(
            c.op,
            Operator::In(vec![Value::from("Pizza"), Value::from("Salad")])
        );
        assert_eq!(c.op.name(), "in");
    }

    #[test]
    fn test_empty_in_is_kept() {
        let c = Criterion::one_of::<&str>("categories", []);
        assert_eq!(c.op, Operator::In(Vec::new()));
    }

    #[test]
    fn test_criteria_set_optional() {
        let set = CriteriaSet::new()
            .with_optional(Some(Criterion::equals("available", true)))
            .with_optional(None);
        assert_eq!(set.len(), 1);
        assert!(!set.is_empty());
        assert!(CriteriaSet::new().is_empty());
    }

    #[test]
    fn test_criterion_display() {
        assert_eq!(
            Criterion::between("price", 1.0, 2.5).to_string(),
            "price BETWEEN 1 AND 2.5"
        );
        assert_eq!(
            Criterion::one_of("userId", [1_i64, 2]).to_string(),
            "userId IN (1, 2)"
        );
    }
}
