//! Sort specifications
//!
//! A [`SortSpec`] is an ordered, never-empty list of [`SortKey`]s. Keys apply
//! left to right, each breaking ties left by the ones before it.
//!
//! # Example
//!
//! ```rust
//! use food_service::query::{build_sort, EntityKind, SortDirection};
//!
//! let sort = build_sort(EntityKind::Product, &["price", "name"], &["desc"]).unwrap();
//! assert_eq!(sort.keys()[0].field.name, "price");
//! assert_eq!(sort.keys()[0].direction, SortDirection::Desc);
//! assert_eq!(sort.keys()[1].direction, SortDirection::Asc);
//! ```

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::query::error::{QueryError, QueryResult};
use crate::query::schema::{EntityKind, FieldDef, FieldValue, Record};

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending order (A-Z, 0-9)
    #[default]
    Asc,
    /// Descending order (Z-A, 9-0)
    Desc,
}

impl SortDirection {
    /// Parse a request token: `"asc"` in any case is ascending, anything else descending
    #[must_use]
    pub fn from_token(token: &str) -> Self {
        if token.trim().eq_ignore_ascii_case("asc") {
            Self::Asc
        } else {
            Self::Desc
        }
    }

    /// SQL keyword for this direction
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => write!(f, "asc"),
            Self::Desc => write!(f, "desc"),
        }
    }
}

/// One sort key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    /// Declared, sortable field
    pub field: &'static FieldDef,
    /// Direction
    pub direction: SortDirection,
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field.name, self.direction)
    }
}

/// Ordered sort keys for one entity kind, never empty
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    kind: EntityKind,
    keys: Vec<SortKey>,
}

impl SortSpec {
    /// The default ordering: identifier ascending
    #[must_use]
    pub fn by_id(kind: EntityKind) -> Self {
        Self {
            kind,
            keys: vec![SortKey {
                field: kind.schema().id_field(),
                direction: SortDirection::Asc,
            }],
        }
    }

    /// Entity kind the keys were validated against
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Keys in priority order
    #[must_use]
    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    /// Whether any key orders by the named field
    #[must_use]
    pub fn mentions(&self, field: &str) -> bool {
        self.keys.iter().any(|key| key.field.name == field)
    }

    /// Append `id Asc` unless a key already orders by the identifier
    #[must_use]
    pub fn with_id_tie_breaker(mut self) -> Self {
        let id = self.kind.schema().id_field();
        if !self.mentions(id.name) {
            self.keys.push(SortKey {
                field: id,
                direction: SortDirection::Asc,
            });
        }
        self
    }

    /// Compare two records key by key
    pub fn compare<R: Record>(&self, a: &R, b: &R) -> Ordering {
        for key in &self.keys {
            let ordering = compare_values(a.field(key.field.name), b.field(key.field.name));
            let ordering = match key.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, key) in self.keys.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{key}")?;
        }
        Ok(())
    }
}

/// Nulls sort after every value in ascending order, as PostgreSQL does
fn compare_values(a: FieldValue<'_>, b: FieldValue<'_>) -> Ordering {
    match (a, b) {
        (FieldValue::Null, FieldValue::Null) => Ordering::Equal,
        (FieldValue::Null, _) => Ordering::Greater,
        (_, FieldValue::Null) => Ordering::Less,
        (FieldValue::Text(x), FieldValue::Text(y)) => x.cmp(y),
        (FieldValue::Number(x), FieldValue::Number(y)) => x.total_cmp(&y),
        (FieldValue::Boolean(x), FieldValue::Boolean(y)) => x.cmp(&y),
        (FieldValue::Identifier(x), FieldValue::Identifier(y)) => x.cmp(&y),
        _ => Ordering::Equal,
    }
}

/// Build a sort specification from positional field and direction lists
///
/// Directions pair with fields by position; a field without a direction sorts
/// ascending and surplus directions are ignored. No fields yields `id Asc`.
///
/// # Errors
///
/// `UnknownSortField` when a field is undeclared or list-valued.
pub fn build_sort<F, D>(kind: EntityKind, fields: &[F], directions: &[D]) -> QueryResult<SortSpec>
where
    F: AsRef<str>,
    D: AsRef<str>,
{
    if fields.is_empty() {
        return Ok(SortSpec::by_id(kind));
    }

    let schema = kind.schema();
    let keys = fields
        .iter()
        .enumerate()
        .map(|(i, name)| -> QueryResult<SortKey> {
            let name = name.as_ref().trim();
            let field = schema
                .field(name)
                .filter(|field| field.is_sortable())
                .ok_or_else(|| QueryError::unknown_sort_field(name).with_entity(kind))?;
            let direction = directions
                .get(i)
                .map(|token| SortDirection::from_token(token.as_ref()))
                .unwrap_or_default();
            Ok(SortKey { field, direction })
        })
        .collect::<QueryResult<Vec<_>>>()?;

    Ok(SortSpec { kind, keys })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::error::QueryErrorKind;
    use crate::records::Product;

    const NONE: &[&str] = &[];

    fn product(id: i64, name: &str, price: f64) -> Product {
        Product {
            id,
            name: name.to_string(),
            price,
            description: None,
            available: true,
            menu_id: None,
            categories: Vec::new(),
        }
    }

    #[test]
    fn test_direction_tokens() {
        assert_eq!(SortDirection::from_token("asc"), SortDirection::Asc);
        assert_eq!(SortDirection::from_token("ASC"), SortDirection::Asc);
        assert_eq!(SortDirection::from_token("desc"), SortDirection::Desc);
        assert_eq!(SortDirection::from_token("sideways"), SortDirection::Desc);
        assert_eq!(SortDirection::from_token(""), SortDirection::Desc);
    }

    #[test]
    fn test_direction_display_and_sql() {
        assert_eq!(SortDirection::Asc.to_string(), "asc");
        assert_eq!(SortDirection::Desc.as_sql(), "DESC");
        assert_eq!(SortDirection::default(), SortDirection::Asc);
    }

    #[test]
    fn test_empty_fields_default_to_id() {
        let sort = build_sort(EntityKind::User, NONE, NONE).unwrap();
        assert_eq!(sort, SortSpec::by_id(EntityKind::User));
        assert_eq!(sort.to_string(), "id asc");
    }

    #[test]
    fn test_positional_pairing() {
        let sort = build_sort(EntityKind::Product, &["price", "name"], &["desc"]).unwrap();
        assert_eq!(sort.keys().len(), 2);
        assert_eq!(sort.keys()[0].field.name, "price");
        assert_eq!(sort.keys()[0].direction, SortDirection::Desc);
        assert_eq!(sort.keys()[1].field.name, "name");
        assert_eq!(sort.keys()[1].direction, SortDirection::Asc);
    }

    #[test]
    fn test_caller_keys_used_exactly() {
        let sort = build_sort(EntityKind::Product, &["name"], &["asc", "desc"]).unwrap();
        assert_eq!(sort.keys().len(), 1);
        assert!(!sort.mentions("id"));
    }

    #[test]
    fn test_unknown_and_list_fields_rejected() {
        let err = build_sort(EntityKind::Product, &["colour"], NONE).unwrap_err();
        assert_eq!(err.kind, QueryErrorKind::UnknownSortField);

        let err = build_sort(EntityKind::Product, &["categories"], NONE).unwrap_err();
        assert_eq!(err.kind, QueryErrorKind::UnknownSortField);
    }

    #[test]
    fn test_tie_breaker() {
        let sort = build_sort(EntityKind::Product, &["price"], &["desc"])
            .unwrap()
            .with_id_tie_breaker();
        assert_eq!(sort.to_string(), "price desc, id asc");

        let sort = build_sort(EntityKind::Product, &["id"], &["desc"])
            .unwrap()
            .with_id_tie_breaker();
        assert_eq!(sort.to_string(), "id desc");
    }

    #[test]
    fn test_compare_successive_keys() {
        let sort = build_sort(EntityKind::Product, &["price", "name"], &["desc", "asc"]).unwrap();
        let a = product(1, "Apple", 3.0);
        let b = product(2, "Banana", 3.0);
        let c = product(3, "Cherry", 5.0);

        assert_eq!(sort.compare(&c, &a), Ordering::Less);
        assert_eq!(sort.compare(&a, &b), Ordering::Less);
        assert_eq!(sort.compare(&a, &a), Ordering::Equal);
    }

    #[test]
    fn test_nulls_sort_last_ascending() {
        let sort = build_sort(EntityKind::Product, &["description"], NONE).unwrap();
        let mut with = product(1, "a", 1.0);
        with.description = Some("crispy".to_string());
        let without = product(2, "b", 1.0);
        assert_eq!(sort.compare(&with, &without), Ordering::Less);
    }
}
