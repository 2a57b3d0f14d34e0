//! Registered users
//!
//! The `users` table also stores a password hash. It is written on create and
//! update but neither selected nor declared as a field, so it can never be
//! filtered on or returned.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::password::{PasswordError, PasswordHasher};
use crate::query::{EntityKind, EntitySchema, FieldDef, FieldType, FieldValue, Record};
use crate::storage::Writable;

/// User schema
pub static SCHEMA: EntitySchema = EntitySchema {
    kind: EntityKind::User,
    from: "users u",
    select: "u.id, u.name, u.email, u.phone, u.address",
    fields: &[
        FieldDef::direct("id", FieldType::Identifier, "u.id"),
        FieldDef::direct("name", FieldType::Text, "u.name"),
        FieldDef::direct("email", FieldType::Text, "u.email"),
        FieldDef::direct("phone", FieldType::Text, "u.phone"),
        FieldDef::direct("address", FieldType::Text, "u.address"),
    ],
    search_fields: &["name", "email", "phone", "address"],
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "database", derive(sqlx::FromRow))]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl User {
    pub fn new(id: i64, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
            phone: None,
            address: None,
        }
    }

    #[must_use]
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }
}

/// Body of a user create or replace request
#[derive(Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("phone", &self.phone)
            .field("address", &self.address)
            .finish()
    }
}

impl NewUser {
    /// Require a name and an email address
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("User name must not be blank".to_string());
        }
        if !self.email.contains('@') {
            return Err("User email must be an email address".to_string());
        }
        Ok(())
    }

    /// Replace the password with its hash
    ///
    /// # Errors
    ///
    /// `TooShort` when the password is below the hasher's minimum length.
    pub fn hash_password(self, hasher: &PasswordHasher) -> Result<UserWrite, PasswordError> {
        let password_hash = hasher.hash(&self.password)?;
        Ok(UserWrite {
            name: self.name,
            email: self.email,
            password_hash,
            phone: self.phone,
            address: self.address,
        })
    }
}

/// A user as written to storage, with the password already hashed
#[derive(Clone, PartialEq, Eq)]
pub struct UserWrite {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl fmt::Debug for UserWrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserWrite")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("phone", &self.phone)
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl Record for User {
    const KIND: EntityKind = EntityKind::User;

    fn id(&self) -> i64 {
        self.id
    }

    fn field(&self, name: &str) -> FieldValue<'_> {
        match name {
            "id" => FieldValue::Identifier(self.id),
            "name" => FieldValue::Text(&self.name),
            "email" => FieldValue::Text(&self.email),
            "phone" => optional_text(self.phone.as_deref()),
            "address" => optional_text(self.address.as_deref()),
            _ => FieldValue::Null,
        }
    }
}

fn optional_text(value: Option<&str>) -> FieldValue<'_> {
    value.map_or(FieldValue::Null, FieldValue::Text)
}

/// Users are replaced whole on update; emails are unique
///
/// The password hash has no place on [`User`], so storage that keeps only
/// records drops it.
impl Writable for User {
    type Create = UserWrite;
    type Update = UserWrite;

    const UNIQUE_FIELD: Option<&'static str> = Some("email");

    fn create_key(data: &UserWrite) -> Option<&str> {
        Some(&data.email)
    }

    fn update_key(data: &UserWrite) -> Option<&str> {
        Some(&data.email)
    }

    fn create(id: i64, data: UserWrite) -> Self {
        Self {
            id,
            name: data.name,
            email: data.email,
            phone: data.phone,
            address: data.address,
        }
    }

    fn apply(&mut self, data: UserWrite) {
        self.name = data.name;
        self.email = data.email;
        self.phone = data.phone;
        self.address = data.address;
    }
}
