//! # food-service
//!
//! Record services for a food ordering system: orders, products and users
//! created, changed and deleted over HTTP, and read through one composable
//! filter-and-pagination query engine.
//!
//! ## Features
//!
//! - **Query engine**: typed criteria composed into predicates, validated
//!   against a static per-entity schema before storage is touched
//! - **Sorting and paging**: multi-key sorts paired by position, page metadata
//!   (`totalElements`, `totalPages`, `hasNext`, ...)
//! - **Storage**: in-memory reference store and a PostgreSQL store rendering
//!   parameterised SQL (`database` feature), both with create, update and
//!   delete
//! - **Passwords**: user passwords hashed with Argon2id before storage
//! - **HTTP**: axum routers per service with JSON error bodies
//! - **Configuration**: layered TOML files and `FOOD_` environment variables
//!
//! ## Example
//!
//! ```rust,no_run
//! use food_service::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let storage = MemoryStorage::new(vec![Order::new(1, 1, 2, "completed")]);
//!     let engine = QueryEngine::new(storage).with_stable_ordering(config.query.stable_ordering);
//!     let app = orders::routes(QueryState::new(engine, config.paging.clone()));
//!
//!     Server::new(config).serve(app).await
//! }
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod observability;
pub mod password;
pub mod query;
pub mod records;
pub mod server;
pub mod storage;

#[cfg(feature = "database")]
pub mod database;

pub use error::{Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{Config, DatabaseConfig, PagingConfig, PasswordConfig, QueryConfig};
    pub use crate::error::{Error, Result};
    pub use crate::handlers::{orders, products, users, ApiError, QueryState};
    pub use crate::observability::init_tracing;
    pub use crate::password::PasswordHasher;
    pub use crate::query::{
        CriteriaSet, Criterion, EntityKind, Page, PageRequest, QueryEngine, QueryError,
        QueryResult, Record, SortDirection, SortSpec,
    };
    pub use crate::records::{
        NewOrder, NewProduct, NewUser, Order, Product, ProductChanges, User,
    };
    pub use crate::server::Server;
    pub use crate::storage::{MemoryStorage, Repository, Storage, StorageError, Writable};

    #[cfg(feature = "database")]
    pub use crate::database::create_pool;

    #[cfg(feature = "database")]
    pub use crate::storage::PgStorage;

    pub use axum::{routing::get, Json, Router};
    pub use serde::{Deserialize, Serialize};
    pub use tokio;
    pub use tracing::{debug, error, info, instrument, warn};
}
