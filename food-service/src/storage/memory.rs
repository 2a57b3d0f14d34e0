//! In-process storage

use std::sync::atomic::{AtomicI64, Ordering};

use tokio::sync::RwLock;

use crate::query::{ComposedPredicate, FieldValue, PageRequest, Record, SortSpec};
use crate::storage::{Repository, Storage, StorageError, StorageResult, Writable};

/// Storage holding its rows in memory
///
/// Rows are filtered with the composed predicate, stably sorted (rows that
/// compare equal keep insertion order) and sliced to the requested page. Text
/// compares by bytes, which is how `PgStorage` orders text as well.
///
/// Created records get the next identifier above every identifier seen so
/// far; identifiers of deleted records are not reused.
///
/// # Example
///
/// ```rust
/// use food_service::query::{ComposedPredicate, EntityKind, PageRequest, SortSpec};
/// use food_service::records::Order;
/// use food_service::storage::{MemoryStorage, Storage};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let storage = MemoryStorage::new(vec![
///     Order::new(1, 10, 100, "pending"),
///     Order::new(2, 11, 101, "completed"),
/// ]);
/// let sort = SortSpec::by_id(EntityKind::Order);
/// let page = PageRequest::new(0, 10).unwrap();
///
/// let (rows, total) = storage
///     .execute(&ComposedPredicate::MatchAll, &sort, &page)
///     .await
///     .unwrap();
/// assert_eq!(total, 2);
/// assert_eq!(rows.len(), 2);
/// # }
/// ```
#[derive(Debug)]
pub struct MemoryStorage<R> {
    rows: RwLock<Vec<R>>,
    last_id: AtomicI64,
}

impl<R> Default for MemoryStorage<R> {
    fn default() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            last_id: AtomicI64::new(0),
        }
    }
}

impl<R: Record> MemoryStorage<R> {
    /// Storage seeded with rows, in insertion order
    #[must_use]
    pub fn new(rows: Vec<R>) -> Self {
        let last_id = rows.iter().map(Record::id).max().unwrap_or(0);
        Self {
            rows: RwLock::new(rows),
            last_id: AtomicI64::new(last_id),
        }
    }

    /// Append a row as given, identifier included
    pub async fn insert(&self, row: R) {
        let mut rows = self.rows.write().await;
        self.last_id.fetch_max(row.id(), Ordering::SeqCst);
        rows.push(row);
    }

    /// Number of stored rows
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    /// Whether no rows are stored
    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

impl<R: Record> Storage<R> for MemoryStorage<R> {
    async fn execute(
        &self,
        predicate: &ComposedPredicate,
        sort: &SortSpec,
        page: &PageRequest,
    ) -> StorageResult<(Vec<R>, u64)> {
        let rows = self.rows.read().await;

        let mut matching: Vec<&R> = rows.iter().filter(|row| predicate.matches(*row)).collect();
        matching.sort_by(|a, b| sort.compare(*a, *b));

        let total = matching.len() as u64;
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let size = usize::try_from(page.size()).unwrap_or(usize::MAX);

        let items = matching
            .into_iter()
            .skip(offset)
            .take(size)
            .cloned()
            .collect();

        Ok((items, total))
    }
}

impl<R: Writable> Repository<R> for MemoryStorage<R> {
    async fn create(&self, data: R::Create) -> StorageResult<R> {
        let mut rows = self.rows.write().await;
        if let Some(value) = R::create_key(&data) {
            ensure_unique(&rows, value, None)?;
        }

        let id = self.last_id.fetch_add(1, Ordering::SeqCst) + 1;
        let record = R::create(id, data);
        rows.push(record.clone());
        Ok(record)
    }

    async fn update(&self, id: i64, data: R::Update) -> StorageResult<R> {
        let mut rows = self.rows.write().await;
        let index = rows
            .iter()
            .position(|row| row.id() == id)
            .ok_or_else(|| {
                StorageError::not_found(format!("No {} with id {id}", R::KIND))
            })?;
        if let Some(value) = R::update_key(&data) {
            ensure_unique(&rows, value, Some(id))?;
        }

        let row = &mut rows[index];
        row.apply(data);
        Ok(row.clone())
    }

    async fn delete(&self, id: i64) -> StorageResult<bool> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|row| row.id() != id);
        Ok(rows.len() < before)
    }
}

/// Reject `value` if a row other than `except` already holds it
fn ensure_unique<R: Writable>(rows: &[R], value: &str, except: Option<i64>) -> StorageResult<()> {
    let Some(field) = R::UNIQUE_FIELD else {
        return Ok(());
    };
    let taken = rows
        .iter()
        .any(|row| Some(row.id()) != except && row.field(field) == FieldValue::Text(value));
    if taken {
        return Err(StorageError::already_exists(format!(
            "{} with {field} '{value}' already exists",
            R::KIND.type_name()
        ))
        .with_context(field));
    }
    Ok(())
}
