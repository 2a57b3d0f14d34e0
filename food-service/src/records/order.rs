//! Customer orders

use serde::{Deserialize, Serialize};

use crate::query::{EntityKind, EntitySchema, FieldDef, FieldType, FieldValue, Record};
use crate::storage::Writable;

/// Order schema: identifiers are searchable as text
pub static SCHEMA: EntitySchema = EntitySchema {
    kind: EntityKind::Order,
    from: "orders o",
    select: "o.id, o.user_id, o.product_id, o.status",
    fields: &[
        FieldDef::direct("id", FieldType::Identifier, "o.id"),
        FieldDef::direct("userId", FieldType::Identifier, "o.user_id"),
        FieldDef::direct("productId", FieldType::Identifier, "o.product_id"),
        FieldDef::direct("status", FieldType::Text, "o.status"),
    ],
    search_fields: &["status", "userId", "productId"],
};

/// An order placed by a user for a product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "database", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub product_id: i64,
    pub status: String,
}

impl Order {
    pub fn new(id: i64, user_id: i64, product_id: i64, status: impl Into<String>) -> Self {
        Self {
            id,
            user_id,
            product_id,
            status: status.into(),
        }
    }
}

/// Body of an order create or replace request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub user_id: i64,
    pub product_id: i64,
    pub status: String,
}

impl NewOrder {
    /// Reject a blank status
    pub fn validate(&self) -> Result<(), String> {
        if self.status.trim().is_empty() {
            return Err("Order status must not be blank".to_string());
        }
        Ok(())
    }
}

impl Record for Order {
    const KIND: EntityKind = EntityKind::Order;

    fn id(&self) -> i64 {
        self.id
    }

    fn field(&self, name: &str) -> FieldValue<'_> {
        match name {
            "id" => FieldValue::Identifier(self.id),
            "userId" => FieldValue::Identifier(self.user_id),
            "productId" => FieldValue::Identifier(self.product_id),
            "status" => FieldValue::Text(&self.status),
            _ => FieldValue::Null,
        }
    }
}

/// Orders are replaced whole on update
impl Writable for Order {
    type Create = NewOrder;
    type Update = NewOrder;

    fn create(id: i64, data: NewOrder) -> Self {
        Self::new(id, data.user_id, data.product_id, data.status)
    }

    fn apply(&mut self, data: NewOrder) {
        self.user_id = data.user_id;
        self.product_id = data.product_id;
        self.status = data.status;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_fields() {
        let order = Order::new(4, 7, 9, "pending");
        assert_eq!(order.field("userId"), FieldValue::Identifier(7));
        assert_eq!(order.field("productId"), FieldValue::Identifier(9));
        assert_eq!(order.field("status"), FieldValue::Text("pending"));
        assert_eq!(order.field("unknown"), FieldValue::Null);
    }

    #[test]
    fn test_order_serializes_camel_case() {
        let json = serde_json::to_value(Order::new(1, 2, 3, "completed")).unwrap();
        assert_eq!(json["userId"], 2);
        assert_eq!(json["productId"], 3);
        assert_eq!(json["status"], "completed");
    }

    #[test]
    fn test_new_order_from_json() {
        let body: NewOrder =
            serde_json::from_str(r#"{"userId": 3, "productId": 8, "status": "placed"}"#).unwrap();
        assert!(body.validate().is_ok());
        assert_eq!(Order::create(11, body), Order::new(11, 3, 8, "placed"));
    }

    #[test]
    fn test_blank_status_is_invalid() {
        let body = NewOrder {
            user_id: 1,
            product_id: 1,
            status: "  ".to_string(),
        };
        assert!(body.validate().is_err());
    }
}
