//! Write-side storage operations
//!
//! Reads always go through [`Storage::execute`]; [`Repository`] adds the
//! create, update and delete operations for record kinds that implement
//! [`Writable`].

use std::future::Future;

use crate::query::Record;
use crate::storage::{Storage, StorageResult};

/// A record kind that can be created and changed
///
/// # Example
///
/// ```rust
/// use food_service::records::{NewOrder, Order};
/// use food_service::storage::Writable;
///
/// let mut order = Order::create(
///     7,
///     NewOrder { user_id: 1, product_id: 2, status: "placed".into() },
/// );
/// order.apply(NewOrder { user_id: 1, product_id: 2, status: "delivered".into() });
/// assert_eq!(order.id, 7);
/// assert_eq!(order.status, "delivered");
/// ```
pub trait Writable: Record {
    /// Input for a new record
    type Create: Send + 'static;

    /// Input changing an existing record
    type Update: Send + 'static;

    /// Text field that no two records may share
    const UNIQUE_FIELD: Option<&'static str> = None;

    /// Value `data` would give [`Self::UNIQUE_FIELD`]
    fn create_key(_data: &Self::Create) -> Option<&str> {
        None
    }

    /// Value `data` would give [`Self::UNIQUE_FIELD`], if it changes it
    fn update_key(_data: &Self::Update) -> Option<&str> {
        None
    }

    /// Build the stored record under an assigned identifier
    fn create(id: i64, data: Self::Create) -> Self;

    /// Apply changes in place; the identifier never changes
    fn apply(&mut self, data: Self::Update);
}

/// Create, update and delete for one record kind
///
/// # Errors
///
/// Implementations report `NotFound` for an unknown identifier on update and
/// `AlreadyExists` when [`Writable::UNIQUE_FIELD`] would be duplicated.
pub trait Repository<R: Writable>: Storage<R> {
    /// Store a new record and return it with its assigned identifier
    fn create(&self, data: R::Create) -> impl Future<Output = StorageResult<R>> + Send;

    /// Change an existing record and return its new state
    fn update(&self, id: i64, data: R::Update) -> impl Future<Output = StorageResult<R>> + Send;

    /// Remove a record; `false` if there was none
    fn delete(&self, id: i64) -> impl Future<Output = StorageResult<bool>> + Send;
}
