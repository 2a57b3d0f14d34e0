//! The record kinds served by the food services
//!
//! Each submodule defines the row type, its static [`EntitySchema`](crate::query::EntitySchema),
//! its [`Record`](crate::query::Record) implementation and the request bodies
//! that create and change it.

pub mod order;
pub mod product;
pub mod user;

pub use order::{NewOrder, Order};
pub use product::{NewProduct, Product, ProductChanges};
pub use user::{NewUser, User, UserWrite};
