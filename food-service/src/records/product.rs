//! Menu products
//!
//! A product may belong to one menu and to any number of categories; category
//! names are loaded with the product through the `product_category` join table.

use serde::{Deserialize, Serialize};

use crate::query::{EntityKind, EntitySchema, FieldDef, FieldType, FieldValue, Record};
use crate::storage::Writable;

const CATEGORY_JOIN: &str = "product_category pc JOIN categories c ON c.id = pc.category_id \
                             WHERE pc.product_id = p.id";

/// Product schema
pub static SCHEMA: EntitySchema = EntitySchema {
    kind: EntityKind::Product,
    from: "products p",
    select: concat!(
        "p.id, p.name, p.price, p.description, p.available, p.menu_id, ",
        "ARRAY(SELECT c.name FROM product_category pc JOIN categories c ON c.id = pc.category_id ",
        "WHERE pc.product_id = p.id ORDER BY c.name)::text[] AS categories"
    ),
    fields: &[
        FieldDef::direct("id", FieldType::Identifier, "p.id"),
        FieldDef::direct("name", FieldType::Text, "p.name"),
        FieldDef::direct("price", FieldType::Number, "p.price"),
        FieldDef::direct("description", FieldType::Text, "p.description"),
        FieldDef::direct("available", FieldType::Boolean, "p.available"),
        FieldDef::direct("menuId", FieldType::Identifier, "p.menu_id"),
        FieldDef::related("categories", CATEGORY_JOIN, "c.name"),
    ],
    search_fields: &["name", "description"],
};

/// A product offered on a menu
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "database", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub description: Option<String>,
    pub available: bool,
    pub menu_id: Option<i64>,
    /// Category names, alphabetical
    pub categories: Vec<String>,
}

impl Product {
    /// An available product with no description, menu or categories
    pub fn new(id: i64, name: impl Into<String>, price: f64) -> Self {
        Self {
            id,
            name: name.into(),
            price,
            description: None,
            available: true,
            menu_id: None,
            categories: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_menu(mut self, menu_id: i64) -> Self {
        self.menu_id = Some(menu_id);
        self
    }

    #[must_use]
    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self.categories.sort();
        self
    }

    #[must_use]
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }
}

/// Body of a product create request
///
/// Names must be unique. A product is available unless the body says
/// otherwise; category names that do not exist are not linked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_available")]
    pub available: bool,
    #[serde(default)]
    pub menu_id: Option<i64>,
    #[serde(default)]
    pub categories: Vec<String>,
}

fn default_available() -> bool {
    true
}

impl NewProduct {
    /// An available product with no description, menu or categories
    pub fn new(name: impl Into<String>, price: f64) -> Self {
        Self {
            name: name.into(),
            price,
            description: None,
            available: true,
            menu_id: None,
            categories: Vec::new(),
        }
    }

    /// Require a name and a positive, finite price
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Product name must not be blank".to_string());
        }
        if !self.price.is_finite() || self.price <= 0.0 {
            return Err("Product price must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// Body of a product update request
///
/// Absent fields keep their current value. So do a blank name and a price
/// that is not greater than zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub description: Option<String>,
    pub available: Option<bool>,
    pub menu_id: Option<i64>,
    pub categories: Option<Vec<String>>,
}

impl ProductChanges {
    /// The new name, if the changes set one
    pub fn new_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|name| !name.trim().is_empty())
    }

    /// Reject an infinite or NaN price
    pub fn validate(&self) -> Result<(), String> {
        match self.price {
            Some(price) if !price.is_finite() => {
                Err("Product price must be a finite number".to_string())
            }
            _ => Ok(()),
        }
    }
}

fn sorted_categories(mut categories: Vec<String>) -> Vec<String> {
    categories.sort();
    categories.dedup();
    categories
}

impl Record for Product {
    const KIND: EntityKind = EntityKind::Product;

    fn id(&self) -> i64 {
        self.id
    }

    fn field(&self, name: &str) -> FieldValue<'_> {
        match name {
            "id" => FieldValue::Identifier(self.id),
            "name" => FieldValue::Text(&self.name),
            "price" => FieldValue::Number(self.price),
            "description" => self
                .description
                .as_deref()
                .map_or(FieldValue::Null, FieldValue::Text),
            "available" => FieldValue::Boolean(self.available),
            "menuId" => self.menu_id.map_or(FieldValue::Null, FieldValue::Identifier),
            "categories" => FieldValue::TextList(&self.categories),
            _ => FieldValue::Null,
        }
    }
}

impl Writable for Product {
    type Create = NewProduct;
    type Update = ProductChanges;

    const UNIQUE_FIELD: Option<&'static str> = Some("name");

    fn create_key(data: &NewProduct) -> Option<&str> {
        Some(&data.name)
    }

    fn update_key(data: &ProductChanges) -> Option<&str> {
        data.new_name()
    }

    fn create(id: i64, data: NewProduct) -> Self {
        Self {
            id,
            name: data.name,
            price: data.price,
            description: data.description,
            available: data.available,
            menu_id: data.menu_id,
            categories: sorted_categories(data.categories),
        }
    }

    fn apply(&mut self, data: ProductChanges) {
        if let Some(name) = data.new_name() {
            self.name = name.to_string();
        }
        if let Some(price) = data.price.filter(|price| *price > 0.0) {
            self.price = price;
        }
        if let Some(description) = data.description {
            self.description = Some(description);
        }
        if let Some(available) = data.available {
            self.available = available;
        }
        if let Some(menu_id) = data.menu_id {
            self.menu_id = Some(menu_id);
        }
        if let Some(categories) = data.categories {
            self.categories = sorted_categories(categories);
        }
    }
}
