//! End-to-end behaviour of the query engine over in-memory storage

use std::sync::atomic::{AtomicUsize, Ordering};

use food_service::query::{
    build_sort, ComposedPredicate, CriteriaSet, Criterion, EntityKind, PageRequest, QueryEngine,
    QueryErrorKind, Record, SortDirection, SortSpec,
};
use food_service::records::{Order, Product};
use food_service::storage::{MemoryStorage, Storage, StorageError, StorageErrorKind, StorageResult};

const NONE: &[&str] = &[];

/// Counts calls before delegating to memory storage
struct SpyStorage<R> {
    inner: MemoryStorage<R>,
    calls: AtomicUsize,
}

impl<R: Record> SpyStorage<R> {
    fn new(rows: Vec<R>) -> Self {
        Self {
            inner: MemoryStorage::new(rows),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<R: Record> Storage<R> for SpyStorage<R> {
    async fn execute(
        &self,
        predicate: &ComposedPredicate,
        sort: &SortSpec,
        page: &PageRequest,
    ) -> StorageResult<(Vec<R>, u64)> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.execute(predicate, sort, page).await
    }
}

struct UnavailableStorage;

impl Storage<Order> for UnavailableStorage {
    async fn execute(
        &self,
        _predicate: &ComposedPredicate,
        _sort: &SortSpec,
        _page: &PageRequest,
    ) -> StorageResult<(Vec<Order>, u64)> {
        Err(StorageError::timeout("statement timeout").with_context("orders o"))
    }
}

fn menu() -> Vec<Product> {
    vec![
        Product::new(1, "Margherita", 9.5).with_categories(["Pizza"]),
        Product::new(2, "Garden Salad", 6.0).with_categories(["Salad", "Vegan"]),
        Product::new(3, "Brownie", 4.0).with_categories(["Dessert"]),
        Product::new(4, "Soup of the Day", 6.0),
        Product::new(5, "Calzone", 11.0)
            .with_categories(["Pizza"])
            .unavailable(),
    ]
}

fn numbered_orders(count: i64) -> Vec<Order> {
    (1..=count)
        .map(|id| Order::new(id, id % 3, id % 5, "pending"))
        .collect()
}

fn page(index: i64, size: i64) -> PageRequest {
    PageRequest::new(index, size).unwrap()
}

#[tokio::test]
async fn empty_criteria_filter_equals_list() {
    let engine = QueryEngine::new(MemoryStorage::new(menu()));
    let sort = build_sort(EntityKind::Product, &["price"], &["desc"]).unwrap();

    let listed = engine.list(page(0, 3), sort.clone()).await.unwrap();
    let filtered = engine
        .filter(&CriteriaSet::new(), page(0, 3), sort)
        .await
        .unwrap();

    assert_eq!(listed, filtered);
    assert_eq!(listed.total_elements, 5);
}

#[tokio::test]
async fn inverted_range_never_reaches_storage() {
    let engine = QueryEngine::new(SpyStorage::new(menu()));
    let criteria = CriteriaSet::new().with(Criterion::between("price", 10.0, 5.0));

    let err = engine
        .filter(&criteria, page(0, 10), SortSpec::by_id(EntityKind::Product))
        .await
        .unwrap_err();

    assert_eq!(err.kind, QueryErrorKind::InvalidRange);
    assert_eq!(err.field.as_deref(), Some("price"));
    assert_eq!(engine.storage().calls(), 0);
}

#[tokio::test]
async fn validation_failures_never_reach_storage() {
    let engine = QueryEngine::new(SpyStorage::new(menu()));
    let by_id = SortSpec::by_id(EntityKind::Product);

    let undeclared = CriteriaSet::new().with(Criterion::equals("colour", "red"));
    let err = engine
        .filter(&undeclared, page(0, 10), by_id.clone())
        .await
        .unwrap_err();
    assert_eq!(err.kind, QueryErrorKind::InvalidCriterion);

    let err = engine.search("   ", page(0, 10), by_id).await.unwrap_err();
    assert_eq!(err.kind, QueryErrorKind::MissingKeyword);

    let foreign_sort = SortSpec::by_id(EntityKind::Order);
    let err = engine.list(page(0, 10), foreign_sort).await.unwrap_err();
    assert_eq!(err.kind, QueryErrorKind::UnknownSortField);

    assert_eq!(engine.storage().calls(), 0);
}

#[tokio::test]
async fn empty_membership_set_matches_nothing() {
    let engine = QueryEngine::new(MemoryStorage::new(menu()));
    let criteria = CriteriaSet::new().with(Criterion::one_of("categories", NONE.iter().copied()));

    let result = engine
        .filter(&criteria, page(0, 10), SortSpec::by_id(EntityKind::Product))
        .await
        .unwrap();

    assert!(result.items.is_empty());
    assert_eq!(result.total_elements, 0);
    assert_eq!(result.total_pages, 0);
}

#[tokio::test]
async fn membership_matches_any_listed_category() {
    let engine = QueryEngine::new(MemoryStorage::new(menu()));
    let criteria = CriteriaSet::new()
        .with(Criterion::one_of("categories", ["Vegan", "Dessert"]))
        .with(Criterion::equals("available", true));

    let result = engine
        .filter(&criteria, page(0, 10), SortSpec::by_id(EntityKind::Product))
        .await
        .unwrap();

    let ids: Vec<i64> = result.items.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![2, 3]);
}

#[test]
fn sort_directions_pair_by_position() {
    let sort = build_sort(EntityKind::Product, &["price", "name"], &["desc"]).unwrap();
    let keys: Vec<(&str, SortDirection)> = sort
        .keys()
        .iter()
        .map(|key| (key.field.name, key.direction))
        .collect();

    assert_eq!(
        keys,
        vec![("price", SortDirection::Desc), ("name", SortDirection::Asc)]
    );
}

#[tokio::test]
async fn order_search_covers_status_and_identifiers() {
    let engine = QueryEngine::new(MemoryStorage::new(vec![Order::new(1, 1, 2, "completed")]));
    let sort = SortSpec::by_id(EntityKind::Order);

    let hit = engine.search("complete", page(0, 10), sort.clone()).await.unwrap();
    assert_eq!(hit.total_elements, 1);
    assert_eq!(hit.items[0].status, "completed");

    let miss = engine.search("999", page(0, 10), sort).await.unwrap();
    assert_eq!(miss.total_elements, 0);
}

#[tokio::test]
async fn filter_is_idempotent_on_unchanged_data() {
    let engine = QueryEngine::new(MemoryStorage::new(numbered_orders(25)));
    let criteria = CriteriaSet::new().with(Criterion::equals("userId", 1_i64));
    let sort = build_sort(EntityKind::Order, &["productId"], &["desc"]).unwrap();

    let first = engine
        .filter(&criteria, page(0, 4), sort.clone())
        .await
        .unwrap();
    let second = engine.filter(&criteria, page(0, 4), sort).await.unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn pages_partition_the_result() {
    let engine = QueryEngine::new(MemoryStorage::new(numbered_orders(25)));
    let mut lengths = Vec::new();
    let mut seen = Vec::new();

    for index in 0..4 {
        let result = engine
            .list(page(index, 10), SortSpec::by_id(EntityKind::Order))
            .await
            .unwrap();
        assert_eq!(result.total_elements, 25);
        assert_eq!(result.total_pages, 3);
        lengths.push(result.items.len());
        seen.extend(result.items.iter().map(|order| order.id));
    }

    assert_eq!(lengths, vec![10, 10, 5, 0]);
    assert_eq!(seen, (1..=25).collect::<Vec<_>>());
}

#[tokio::test]
async fn stable_ordering_breaks_ties_by_id() {
    // Inserted in reverse so insertion order and id order disagree
    let rows: Vec<Order> = numbered_orders(12).into_iter().rev().collect();
    let sort = build_sort(EntityKind::Order, &["status"], NONE).unwrap();

    let plain = QueryEngine::new(MemoryStorage::new(rows.clone()));
    let result = plain.list(page(0, 3), sort.clone()).await.unwrap();
    let ids: Vec<i64> = result.items.iter().map(|o| o.id).collect();
    assert_eq!(ids, vec![12, 11, 10]);

    let stable = QueryEngine::new(MemoryStorage::new(rows)).with_stable_ordering(true);
    let result = stable.list(page(0, 3), sort).await.unwrap();
    let ids: Vec<i64> = result.items.iter().map(|o| o.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[tokio::test]
async fn storage_failures_are_wrapped() {
    let engine = QueryEngine::new(UnavailableStorage);

    let err = engine.by_id(7).await.unwrap_err();

    assert_eq!(err.kind, QueryErrorKind::StorageFailure);
    assert_eq!(err.entity, Some(EntityKind::Order));
    assert!(err.is_retriable());
    let source = err.source.unwrap();
    assert_eq!(source.kind, StorageErrorKind::Timeout);
    assert_eq!(source.context.as_deref(), Some("orders o"));
}

#[tokio::test]
async fn by_id_finds_single_record() {
    let engine = QueryEngine::new(SpyStorage::new(numbered_orders(5)));

    let found = engine.by_id(4).await.unwrap();
    assert_eq!(found.map(|o| o.id), Some(4));

    assert!(engine.by_id(40).await.unwrap().is_none());
    assert_eq!(engine.storage().calls(), 2);
}

#[tokio::test]
async fn rows_inserted_later_are_visible() {
    let engine = QueryEngine::new(MemoryStorage::new(numbered_orders(2)));
    engine
        .storage()
        .insert(Order::new(3, 9, 9, "delivered"))
        .await;

    let result = engine
        .search("deliver", page(0, 10), SortSpec::by_id(EntityKind::Order))
        .await
        .unwrap();
    assert_eq!(result.items, vec![Order::new(3, 9, 9, "delivered")]);
}
