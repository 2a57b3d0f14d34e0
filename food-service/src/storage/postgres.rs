//! PostgreSQL storage
//!
//! Renders a composed predicate, sort and page into a parameterised statement.
//! Every operand is bound; column expressions come from the static entity
//! schema. A second `COUNT(*)` statement with the same `WHERE` clause yields the
//! total. Text columns sort with `COLLATE "C"`, comparing bytes as
//! [`MemoryStorage`](crate::storage::MemoryStorage) does.
//!
//! Writes run in a transaction and read the written row back through the same
//! select list the queries use, so a created product reports only the
//! categories that exist.

use std::marker::PhantomData;

use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder};

use crate::query::{
    Column, ComposedPredicate, EntityKind, EntitySchema, FieldType, Operator, PageRequest,
    Predicate, Record, SortSpec, Value,
};
use crate::records::{NewOrder, NewProduct, Order, Product, ProductChanges, User, UserWrite};
use crate::storage::{Repository, Storage, StorageError, StorageResult, Writable};

/// Storage backed by a PostgreSQL pool
#[derive(Debug)]
pub struct PgStorage<R> {
    pool: PgPool,
    _record: PhantomData<fn() -> R>,
}

impl<R> Clone for PgStorage<R> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            _record: PhantomData,
        }
    }
}

impl<R> PgStorage<R> {
    /// Storage reading through the given pool
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _record: PhantomData,
        }
    }

    /// The underlying pool
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl<R> Storage<R> for PgStorage<R>
where
    R: Record + for<'r> FromRow<'r, PgRow> + Unpin,
{
    async fn execute(
        &self,
        predicate: &ComposedPredicate,
        sort: &SortSpec,
        page: &PageRequest,
    ) -> StorageResult<(Vec<R>, u64)> {
        let schema = R::KIND.schema();

        let mut select = select_statement(schema, predicate, sort, page);
        tracing::trace!(sql = select.sql(), "Executing page query");
        let rows = select
            .build_query_as::<R>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::from(e).with_context(schema.from))?;

        let mut count = count_statement(schema, predicate);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::from(e).with_context(schema.from))?;

        Ok((rows, u64::try_from(total).unwrap_or_default()))
    }
}

impl Repository<Order> for PgStorage<Order> {
    async fn create(&self, data: NewOrder) -> StorageResult<Order> {
        sqlx::query_as::<_, Order>(
            "INSERT INTO orders (user_id, product_id, status) VALUES ($1, $2, $3) \
             RETURNING id, user_id, product_id, status",
        )
        .bind(data.user_id)
        .bind(data.product_id)
        .bind(data.status)
        .fetch_one(&self.pool)
        .await
        .map_err(in_table("orders"))
    }

    async fn update(&self, id: i64, data: NewOrder) -> StorageResult<Order> {
        sqlx::query_as::<_, Order>(
            "UPDATE orders SET user_id = $1, product_id = $2, status = $3 WHERE id = $4 \
             RETURNING id, user_id, product_id, status",
        )
        .bind(data.user_id)
        .bind(data.product_id)
        .bind(data.status)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(in_table("orders"))?
        .ok_or_else(|| missing(EntityKind::Order, id))
    }

    async fn delete(&self, id: i64) -> StorageResult<bool> {
        delete_row(&self.pool, "orders", id).await
    }
}

impl Repository<Product> for PgStorage<Product> {
    async fn create(&self, data: NewProduct) -> StorageResult<Product> {
        let mut tx = self.pool.begin().await.map_err(in_table("products"))?;
        ensure_unique(&mut tx, EntityKind::Product, "products", "name", &data.name, None).await?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO products (name, price, description, available, menu_id) \
             VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(&data.name)
        .bind(data.price)
        .bind(&data.description)
        .bind(data.available)
        .bind(data.menu_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(in_table("products"))?;
        link_categories(&mut tx, id, data.categories).await?;

        let product = fetch_by_id::<Product>(&mut tx, id, false)
            .await?
            .ok_or_else(|| missing(EntityKind::Product, id))?;
        tx.commit().await.map_err(in_table("products"))?;
        Ok(product)
    }

    async fn update(&self, id: i64, changes: ProductChanges) -> StorageResult<Product> {
        let mut tx = self.pool.begin().await.map_err(in_table("products"))?;
        let mut product = fetch_by_id::<Product>(&mut tx, id, true)
            .await?
            .ok_or_else(|| missing(EntityKind::Product, id))?;

        if let Some(name) = Product::update_key(&changes) {
            ensure_unique(&mut tx, EntityKind::Product, "products", "name", name, Some(id))
                .await?;
        }
        let categories = changes.categories.clone();
        product.apply(changes);

        sqlx::query(
            "UPDATE products SET name = $1, price = $2, description = $3, available = $4, \
             menu_id = $5 WHERE id = $6",
        )
        .bind(&product.name)
        .bind(product.price)
        .bind(&product.description)
        .bind(product.available)
        .bind(product.menu_id)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(in_table("products"))?;

        if let Some(categories) = categories {
            sqlx::query("DELETE FROM product_category WHERE product_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(in_table("product_category"))?;
            link_categories(&mut tx, id, categories).await?;
        }

        let product = fetch_by_id::<Product>(&mut tx, id, false)
            .await?
            .ok_or_else(|| missing(EntityKind::Product, id))?;
        tx.commit().await.map_err(in_table("products"))?;
        Ok(product)
    }

    async fn delete(&self, id: i64) -> StorageResult<bool> {
        let mut tx = self.pool.begin().await.map_err(in_table("products"))?;
        sqlx::query("DELETE FROM product_category WHERE product_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(in_table("product_category"))?;
        let deleted = delete_row(&mut *tx, "products", id).await?;
        tx.commit().await.map_err(in_table("products"))?;
        Ok(deleted)
    }
}

impl Repository<User> for PgStorage<User> {
    async fn create(&self, data: UserWrite) -> StorageResult<User> {
        let mut tx = self.pool.begin().await.map_err(in_table("users"))?;
        ensure_unique(&mut tx, EntityKind::User, "users", "email", &data.email, None).await?;

        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (name, email, password, phone, address) \
             VALUES ($1, $2, $3, $4, $5) RETURNING id, name, email, phone, address",
        )
        .bind(data.name)
        .bind(data.email)
        .bind(data.password_hash)
        .bind(data.phone)
        .bind(data.address)
        .fetch_one(&mut *tx)
        .await
        .map_err(in_table("users"))?;
        tx.commit().await.map_err(in_table("users"))?;
        Ok(user)
    }

    async fn update(&self, id: i64, data: UserWrite) -> StorageResult<User> {
        let mut tx = self.pool.begin().await.map_err(in_table("users"))?;
        ensure_unique(&mut tx, EntityKind::User, "users", "email", &data.email, Some(id)).await?;

        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET name = $1, email = $2, password = $3, phone = $4, address = $5 \
             WHERE id = $6 RETURNING id, name, email, phone, address",
        )
        .bind(data.name)
        .bind(data.email)
        .bind(data.password_hash)
        .bind(data.phone)
        .bind(data.address)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(in_table("users"))?
        .ok_or_else(|| missing(EntityKind::User, id))?;
        tx.commit().await.map_err(in_table("users"))?;
        Ok(user)
    }

    async fn delete(&self, id: i64) -> StorageResult<bool> {
        delete_row(&self.pool, "users", id).await
    }
}

fn in_table(table: &'static str) -> impl Fn(sqlx::Error) -> StorageError {
    move |e| StorageError::from(e).with_context(table)
}

fn missing(kind: EntityKind, id: i64) -> StorageError {
    StorageError::not_found(format!("No {kind} with id {id}"))
}

async fn delete_row<'c, E>(executor: E, table: &'static str, id: i64) -> StorageResult<bool>
where
    E: sqlx::Executor<'c, Database = Postgres>,
{
    let mut qb = delete_statement(table, id);
    let result = qb
        .build()
        .execute(executor)
        .await
        .map_err(in_table(table))?;
    Ok(result.rows_affected() > 0)
}

/// Fail with `AlreadyExists` when another row holds `value` in `column`
async fn ensure_unique(
    conn: &mut PgConnection,
    kind: EntityKind,
    table: &'static str,
    column: &'static str,
    value: &str,
    except: Option<i64>,
) -> StorageResult<()> {
    let taken: bool = unique_check(table, column, value, except)
        .build_query_scalar()
        .fetch_one(&mut *conn)
        .await
        .map_err(in_table(table))?;

    if taken {
        return Err(StorageError::already_exists(format!(
            "{} with {column} '{value}' already exists",
            kind.type_name()
        ))
        .with_context(column));
    }
    Ok(())
}

/// Link a product to the named categories; unknown names are skipped
async fn link_categories(
    conn: &mut PgConnection,
    product_id: i64,
    categories: Vec<String>,
) -> StorageResult<()> {
    if categories.is_empty() {
        return Ok(());
    }
    sqlx::query(
        "INSERT INTO product_category (product_id, category_id) \
         SELECT $1, c.id FROM categories c WHERE c.name = ANY($2)",
    )
    .bind(product_id)
    .bind(categories)
    .execute(&mut *conn)
    .await
    .map_err(in_table("product_category"))?;
    Ok(())
}

async fn fetch_by_id<R>(conn: &mut PgConnection, id: i64, lock: bool) -> StorageResult<Option<R>>
where
    R: Record + for<'r> FromRow<'r, PgRow> + Unpin,
{
    let schema = R::KIND.schema();
    let mut qb = select_by_id(schema, id);
    if lock {
        qb.push(" FOR UPDATE");
    }
    qb.build_query_as::<R>()
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| StorageError::from(e).with_context(schema.from))
}

fn id_column(schema: &EntitySchema) -> &'static str {
    match schema.id_field().column {
        Column::Direct(column) => column,
        Column::Related { .. } => "id",
    }
}

fn select_by_id(schema: &EntitySchema, id: i64) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT ");
    qb.push(schema.select)
        .push(" FROM ")
        .push(schema.from)
        .push(" WHERE ")
        .push(id_column(schema))
        .push(" = ")
        .push_bind(id);
    qb
}

fn delete_statement(table: &'static str, id: i64) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("DELETE FROM ");
    qb.push(table).push(" WHERE id = ").push_bind(id);
    qb
}

fn unique_check(
    table: &'static str,
    column: &'static str,
    value: &str,
    except: Option<i64>,
) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT EXISTS (SELECT 1 FROM ");
    qb.push(table)
        .push(" WHERE ")
        .push(column)
        .push(" = ")
        .push_bind(value.to_string());
    if let Some(id) = except {
        qb.push(" AND id <> ").push_bind(id);
    }
    qb.push(")");
    qb
}

fn select_statement(
    schema: &EntitySchema,
    predicate: &ComposedPredicate,
    sort: &SortSpec,
    page: &PageRequest,
) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT ");
    qb.push(schema.select).push(" FROM ").push(schema.from);
    push_where(&mut qb, predicate);
    push_order_by(&mut qb, sort);
    qb.push(" LIMIT ")
        .push_bind(i64::try_from(page.size()).unwrap_or(i64::MAX))
        .push(" OFFSET ")
        .push_bind(i64::try_from(page.offset()).unwrap_or(i64::MAX));
    qb
}

fn count_statement(
    schema: &EntitySchema,
    predicate: &ComposedPredicate,
) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM ");
    qb.push(schema.from);
    push_where(&mut qb, predicate);
    qb
}

fn push_where(qb: &mut QueryBuilder<'static, Postgres>, predicate: &ComposedPredicate) {
    if matches!(predicate, ComposedPredicate::MatchAll) {
        return;
    }
    qb.push(" WHERE ");
    push_predicate(qb, predicate);
}

fn push_predicate(qb: &mut QueryBuilder<'static, Postgres>, predicate: &ComposedPredicate) {
    match predicate {
        ComposedPredicate::MatchAll => {
            qb.push("TRUE");
        }
        ComposedPredicate::MatchNone => {
            qb.push("FALSE");
        }
        ComposedPredicate::Test(test) => push_test(qb, test),
        ComposedPredicate::And(parts) => push_joined(qb, parts, " AND "),
        ComposedPredicate::Or(parts) => push_joined(qb, parts, " OR "),
    }
}

fn push_joined(
    qb: &mut QueryBuilder<'static, Postgres>,
    parts: &[ComposedPredicate],
    separator: &str,
) {
    qb.push("(");
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            qb.push(separator);
        }
        push_predicate(qb, part);
    }
    qb.push(")");
}

fn push_test(qb: &mut QueryBuilder<'static, Postgres>, test: &Predicate) {
    match test.field.column {
        Column::Direct(column) => push_direct_test(qb, column, test),
        Column::Related { from, value } => {
            // Only membership applies to related lists
            let Operator::In(values) = &test.op else {
                qb.push("FALSE");
                return;
            };
            let names: Vec<String> = values
                .iter()
                .filter_map(|v| match v {
                    Value::Text(text) => Some(text.clone()),
                    _ => None,
                })
                .collect();
            qb.push("EXISTS (SELECT 1 FROM ")
                .push(from)
                .push(" AND ")
                .push(value)
                .push(" = ANY(")
                .push_bind(names)
                .push("))");
        }
    }
}

fn push_direct_test(qb: &mut QueryBuilder<'static, Postgres>, column: &'static str, test: &Predicate) {
    match &test.op {
        Operator::Equals(value) => {
            qb.push(column).push(" = ");
            push_value(qb, value);
        }
        Operator::Contains(needle) => {
            // strpos keeps the match literal and case-sensitive
            qb.push("strpos(");
            if test.field.ty == FieldType::Identifier {
                qb.push("CAST(").push(column).push(" AS TEXT)");
            } else {
                qb.push(column);
            }
            qb.push(", ").push_bind(needle.clone()).push(") > 0");
        }
        Operator::Between(low, high) => {
            qb.push(column)
                .push(" BETWEEN ")
                .push_bind(*low)
                .push(" AND ")
                .push_bind(*high);
        }
        Operator::In(values) => {
            qb.push(column).push(" IN (");
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    qb.push(", ");
                }
                push_value(qb, value);
            }
            qb.push(")");
        }
    }
}

fn push_value(qb: &mut QueryBuilder<'static, Postgres>, value: &Value) {
    match value {
        Value::Text(text) => qb.push_bind(text.clone()),
        Value::Number(number) => qb.push_bind(*number),
        Value::Boolean(flag) => qb.push_bind(*flag),
        Value::Identifier(id) => qb.push_bind(*id),
    };
}

fn push_order_by(qb: &mut QueryBuilder<'static, Postgres>, sort: &SortSpec) {
    let mut first = true;
    for key in sort.keys() {
        let Column::Direct(column) = key.field.column else {
            continue;
        };
        qb.push(if first { " ORDER BY " } else { ", " }).push(column);
        if key.field.ty == FieldType::Text {
            qb.push(" COLLATE \"C\"");
        }
        qb.push(" ").push(key.direction.as_sql());
        first = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{build_sort, compose, CompositionMode, CriteriaSet, Criterion, EntityKind};

    const NONE: &[&str] = &[];

    fn predicate(kind: EntityKind, criteria: CriteriaSet, mode: CompositionMode) -> ComposedPredicate {
        compose(kind.schema(), &criteria, mode).unwrap()
    }

    #[test]
    fn test_select_without_criteria() {
        let schema = EntityKind::Order.schema();
        let sort = build_sort(EntityKind::Order, NONE, NONE).unwrap();
        let qb = select_statement(
            schema,
            &ComposedPredicate::MatchAll,
            &sort,
            &PageRequest::new(0, 10).unwrap(),
        );
        assert_eq!(
            qb.sql(),
            "SELECT o.id, o.user_id, o.product_id, o.status FROM orders o \
             ORDER BY o.id ASC LIMIT $1 OFFSET $2"
        );
    }

    #[test]
    fn test_conjunctive_filter_binds_values() {
        let criteria = CriteriaSet::new()
            .with(Criterion::contains("name", "pizza"))
            .with(Criterion::between("price", 5.0, 10.0))
            .with(Criterion::equals("available", true));
        let p = predicate(EntityKind::Product, criteria, CompositionMode::Conjunctive);
        let qb = count_statement(EntityKind::Product.schema(), &p);
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM products p WHERE (strpos(p.name, $1) > 0 \
             AND p.price BETWEEN $2 AND $3 AND p.available = $4)"
        );
    }

    #[test]
    fn test_keyword_search_casts_identifiers() {
        let schema = EntityKind::Order.schema();
        let p = compose(
            schema,
            &crate::query::keyword_criteria(schema, "7"),
            CompositionMode::Disjunctive,
        )
        .unwrap();
        let qb = count_statement(schema, &p);
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM orders o WHERE (strpos(o.status, $1) > 0 \
             OR strpos(CAST(o.user_id AS TEXT), $2) > 0 \
             OR strpos(CAST(o.product_id AS TEXT), $3) > 0)"
        );
    }

    #[test]
    fn test_category_membership_uses_exists() {
        let criteria = CriteriaSet::new().with(Criterion::one_of("categories", ["Vegan"]));
        let p = predicate(EntityKind::Product, criteria, CompositionMode::Conjunctive);
        let qb = count_statement(EntityKind::Product.schema(), &p);
        assert!(qb.sql().contains("EXISTS (SELECT 1 FROM product_category pc"));
        assert!(qb.sql().ends_with("AND c.name = ANY($1))"));
    }

    #[test]
    fn test_match_none_renders_false() {
        let criteria = CriteriaSet::new().with(Criterion::one_of::<&str>("categories", []));
        let p = predicate(EntityKind::Product, criteria, CompositionMode::Conjunctive);
        let qb = count_statement(EntityKind::Product.schema(), &p);
        assert_eq!(qb.sql(), "SELECT COUNT(*) FROM products p WHERE FALSE");
    }

    #[test]
    fn test_order_by_multiple_keys() {
        let sort = build_sort(EntityKind::Product, &["price", "name"], &["desc"]).unwrap();
        let qb = select_statement(
            EntityKind::Product.schema(),
            &ComposedPredicate::MatchAll,
            &sort,
            &PageRequest::new(2, 5).unwrap(),
        );
        assert!(qb
            .sql()
            .ends_with("ORDER BY p.price DESC, p.name COLLATE \"C\" ASC LIMIT $1 OFFSET $2"));
    }

    #[test]
    fn test_in_over_scalar_field() {
        let criteria = CriteriaSet::new().with(Criterion::one_of("userId", [1_i64, 2, 3]));
        let p = predicate(EntityKind::Order, criteria, CompositionMode::Conjunctive);
        let qb = count_statement(EntityKind::Order.schema(), &p);
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM orders o WHERE o.user_id IN ($1, $2, $3)"
        );
    }

    #[test]
    fn test_select_by_id_reuses_select_list() {
        let qb = select_by_id(EntityKind::User.schema(), 3);
        assert_eq!(
            qb.sql(),
            "SELECT u.id, u.name, u.email, u.phone, u.address FROM users u WHERE u.id = $1"
        );

        let qb = select_by_id(EntityKind::Product.schema(), 3);
        assert!(qb.sql().contains("AS categories FROM products p WHERE p.id = $1"));
    }

    #[test]
    fn test_delete_statement() {
        assert_eq!(
            delete_statement("orders", 9).sql(),
            "DELETE FROM orders WHERE id = $1"
        );
    }

    #[test]
    fn test_unique_check_excludes_own_row() {
        assert_eq!(
            unique_check("users", "email", "ada@example.com", None).sql(),
            "SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)"
        );
        assert_eq!(
            unique_check("products", "name", "Soup", Some(4)).sql(),
            "SELECT EXISTS (SELECT 1 FROM products WHERE name = $1 AND id <> $2)"
        );
    }

    #[test]
    fn test_missing_row_is_not_found() {
        let err = missing(EntityKind::Order, 12);
        assert_eq!(err.kind, crate::storage::StorageErrorKind::NotFound);
        assert_eq!(err.message, "No order with id 12");
    }
}
