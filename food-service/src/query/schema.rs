//! Entity kinds and their static field schemas
//!
//! Each [`EntityKind`] owns an [`EntitySchema`] listing the fields that may be
//! filtered and sorted on, the value type each field holds, and where the field
//! lives in the relational store. Column expressions come only from these
//! static tables, never from request input.
//!
//! Rows are exposed to the engine through the [`Record`] trait, which lets an
//! in-process evaluator read a field by its declared name.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::records::{order, product, user};

/// The record collections the services expose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// Customer orders
    Order,
    /// Menu products
    Product,
    /// Registered users
    User,
}

impl EntityKind {
    /// Static schema describing this kind's fields
    #[must_use]
    pub fn schema(self) -> &'static EntitySchema {
        match self {
            Self::Order => &order::SCHEMA,
            Self::Product => &product::SCHEMA,
            Self::User => &user::SCHEMA,
        }
    }

    /// Display name used in error bodies
    #[must_use]
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::Order => "Order",
            Self::Product => "Product",
            Self::User => "User",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Order => write!(f, "order"),
            Self::Product => write!(f, "product"),
            Self::User => write!(f, "user"),
        }
    }
}

/// Value type a field holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Free text
    Text,
    /// Floating point number
    Number,
    /// True or false
    Boolean,
    /// Integer identifier, including foreign-key references
    Identifier,
    /// List of text values reached through a relation
    TextList,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Number => write!(f, "number"),
            Self::Boolean => write!(f, "boolean"),
            Self::Identifier => write!(f, "identifier"),
            Self::TextList => write!(f, "text_list"),
        }
    }
}

/// Where a field's values live in the relational store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    /// A column of the entity's own table, qualified with the table alias
    Direct(&'static str),
    /// Values reached through a join
    Related {
        /// `FROM ... WHERE` clause correlating the related rows to the entity row
        from: &'static str,
        /// Expression selecting one value per related row
        value: &'static str,
    },
}

/// A declared, filterable field
#[derive(Debug, PartialEq, Eq)]
pub struct FieldDef {
    /// Name used by criteria, sort keys and request parameters
    pub name: &'static str,
    /// Declared value type
    pub ty: FieldType,
    /// Storage location
    pub column: Column,
}

impl FieldDef {
    /// Field stored directly on the entity table
    #[must_use]
    pub const fn direct(name: &'static str, ty: FieldType, column: &'static str) -> Self {
        Self {
            name,
            ty,
            column: Column::Direct(column),
        }
    }

    /// List-valued field reached through a join
    #[must_use]
    pub const fn related(name: &'static str, from: &'static str, value: &'static str) -> Self {
        Self {
            name,
            ty: FieldType::TextList,
            column: Column::Related { from, value },
        }
    }

    /// List-valued fields have no single value to order by
    #[must_use]
    pub fn is_sortable(&self) -> bool {
        !matches!(self.ty, FieldType::TextList)
    }
}

/// Static description of one entity kind
#[derive(Debug)]
pub struct EntitySchema {
    /// The kind this schema describes
    pub kind: EntityKind,
    /// Table with alias, as used in a `FROM` clause
    pub from: &'static str,
    /// Select list producing one row per entity
    pub select: &'static str,
    /// Declared fields, identifier first
    pub fields: &'static [FieldDef],
    /// Fields searched by keyword, in order
    pub search_fields: &'static [&'static str],
}

impl EntitySchema {
    /// Look up a declared field by name
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        let fields: &'static [FieldDef] = self.fields;
        fields.iter().find(|field| field.name == name)
    }

    /// The identifier field every kind declares as `id`
    ///
    /// Falls back to the first declared field, which every schema places as `id`.
    #[must_use]
    pub fn id_field(&self) -> &'static FieldDef {
        let fields: &'static [FieldDef] = self.fields;
        self.field("id").unwrap_or(&fields[0])
    }
}

/// A borrowed field value read from a record
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    /// Absent optional value
    Null,
    /// Text value
    Text(&'a str),
    /// Numeric value
    Number(f64),
    /// Boolean value
    Boolean(bool),
    /// Identifier value
    Identifier(i64),
    /// List of text values
    TextList(&'a [String]),
}

/// A row of one entity kind that the engine can evaluate and order
///
/// # Example
///
/// ```rust
/// use food_service::query::{EntityKind, FieldValue, Record};
/// use food_service::records::Order;
///
/// let order = Order::new(7, 1, 2, "completed");
/// assert_eq!(Order::KIND, EntityKind::Order);
/// assert_eq!(order.id(), 7);
/// assert_eq!(order.field("status"), FieldValue::Text("completed"));
/// ```
pub trait Record: Clone + Send + Sync + 'static {
    /// The entity kind this record belongs to
    const KIND: EntityKind;

    /// Primary identifier
    fn id(&self) -> i64;

    /// Value of a declared field, [`FieldValue::Null`] for unknown names
    fn field(&self, name: &str) -> FieldValue<'_>;
}
