//! Product service endpoints
//!
//! All routes live under `/api/products`. The three `filterBy*` routes each
//! require their parameter; `search` combines every product filter with AND.
//! `POST` creates a product, `PUT /api/products/{id}` changes only the fields
//! it names and `DELETE /api/products/{id}` removes one. Names are unique.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use super::params::{blank_as_none, optional_comma_separated, required};
use super::{
    validation, ApiError, ApiJson, ApiOperation, ApiQuery, PageParams, QueryState, SortParams,
};
use crate::query::{CriteriaSet, Criterion, Page, QueryError, QueryOperation};
use crate::records::{NewProduct, Product, ProductChanges};
use crate::storage::{Repository, Storage};

/// Multi-parameter product search
///
/// A single price bound leaves the other end open. `categories` matches
/// products in any of the named categories; a present but empty list matches
/// nothing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilter {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub min_price: Option<f64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub max_price: Option<f64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub available: Option<bool>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub menu_id: Option<i64>,
    #[serde(default, deserialize_with = "optional_comma_separated")]
    pub categories: Option<Vec<String>>,
}

impl ProductFilter {
    pub fn criteria(&self) -> CriteriaSet {
        let price = match (self.min_price, self.max_price) {
            (None, None) => None,
            (low, high) => Some(Criterion::between(
                "price",
                low.unwrap_or(f64::NEG_INFINITY),
                high.unwrap_or(f64::INFINITY),
            )),
        };

        CriteriaSet::new()
            .with_optional(self.name.as_deref().map(|n| Criterion::contains("name", n)))
            .with_optional(price)
            .with_optional(self.available.map(|a| Criterion::equals("available", a)))
            .with_optional(
                self.description
                    .as_deref()
                    .map(|d| Criterion::contains("description", d)),
            )
            .with_optional(self.menu_id.map(|id| Criterion::equals("menuId", id)))
            .with_optional(
                self.categories
                    .as_ref()
                    .map(|names| Criterion::one_of("categories", names.iter().map(String::as_str))),
            )
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NameParams {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceParams {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub min_price: Option<f64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub max_price: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AvailabilityParams {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub available: Option<bool>,
}

/// Product routes
pub fn routes<S>(state: QueryState<Product, S>) -> Router
where
    S: Repository<Product> + 'static,
{
    Router::new()
        .route("/api/products", get(list::<S>).post(create::<S>))
        .route("/api/products/filterByName", get(filter_by_name::<S>))
        .route("/api/products/filterByPrice", get(filter_by_price::<S>))
        .route(
            "/api/products/filterByAvailability",
            get(filter_by_availability::<S>),
        )
        .route("/api/products/search", get(search::<S>))
        .route(
            "/api/products/{id}",
            get(by_id::<S>).put(update::<S>).delete(remove::<S>),
        )
        .with_state(state)
}

async fn list<S: Repository<Product> + 'static>(
    State(state): State<QueryState<Product, S>>,
    ApiQuery(page): ApiQuery<PageParams>,
    ApiQuery(sort): ApiQuery<SortParams>,
) -> Result<Json<Page<Product>>, ApiError> {
    let (page, sort) = state.window(&page, &sort, QueryOperation::List)?;
    Ok(Json(state.engine.list(page, sort).await?))
}

async fn filter_by_name<S: Repository<Product> + 'static>(
    State(state): State<QueryState<Product, S>>,
    ApiQuery(page): ApiQuery<PageParams>,
    ApiQuery(params): ApiQuery<NameParams>,
) -> Result<Json<Page<Product>>, ApiError> {
    let name = required(params.name, "name").map_err(as_filter)?;
    let criteria = CriteriaSet::new().with(Criterion::contains("name", name));
    run_filter(&state, &page, &criteria).await
}

async fn filter_by_price<S: Repository<Product> + 'static>(
    State(state): State<QueryState<Product, S>>,
    ApiQuery(page): ApiQuery<PageParams>,
    ApiQuery(params): ApiQuery<PriceParams>,
) -> Result<Json<Page<Product>>, ApiError> {
    let low = required(params.min_price, "minPrice").map_err(as_filter)?;
    let high = required(params.max_price, "maxPrice").map_err(as_filter)?;
    let criteria = CriteriaSet::new().with(Criterion::between("price", low, high));
    run_filter(&state, &page, &criteria).await
}

async fn filter_by_availability<S: Repository<Product> + 'static>(
    State(state): State<QueryState<Product, S>>,
    ApiQuery(page): ApiQuery<PageParams>,
    ApiQuery(params): ApiQuery<AvailabilityParams>,
) -> Result<Json<Page<Product>>, ApiError> {
    let available = required(params.available, "available").map_err(as_filter)?;
    let criteria = CriteriaSet::new().with(Criterion::equals("available", available));
    run_filter(&state, &page, &criteria).await
}

async fn search<S: Repository<Product> + 'static>(
    State(state): State<QueryState<Product, S>>,
    ApiQuery(page): ApiQuery<PageParams>,
    ApiQuery(sort): ApiQuery<SortParams>,
    ApiQuery(filter): ApiQuery<ProductFilter>,
) -> Result<Json<Page<Product>>, ApiError> {
    let as_search = |e: QueryError| ApiError::from(e).with_operation(ApiOperation::Search);
    let (page, sort) = state
        .window(&page, &sort, QueryOperation::Search)
        .map_err(as_search)?;
    let result = state
        .engine
        .filter(&filter.criteria(), page, sort)
        .await
        .map_err(as_search)?;
    Ok(Json(result))
}

async fn by_id<S: Repository<Product> + 'static>(
    State(state): State<QueryState<Product, S>>,
    Path(id): Path<i64>,
) -> Result<Json<Product>, ApiError> {
    state
        .engine
        .by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Product", id))
}

async fn create<S: Repository<Product> + 'static>(
    State(state): State<QueryState<Product, S>>,
    ApiJson(data): ApiJson<NewProduct>,
) -> Result<impl IntoResponse, ApiError> {
    data.validate().map_err(|e| {
        validation(e)
            .with_operation(ApiOperation::Create)
            .with_entity_type("Product")
    })?;
    let product = state.create(data).await?;
    let location = format!("/api/products/{}", product.id);
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(product)))
}

async fn update<S: Repository<Product> + 'static>(
    State(state): State<QueryState<Product, S>>,
    Path(id): Path<i64>,
    ApiJson(changes): ApiJson<ProductChanges>,
) -> Result<Json<Product>, ApiError> {
    changes.validate().map_err(|e| {
        validation(e)
            .with_operation(ApiOperation::Update)
            .with_entity("Product", id.to_string())
    })?;
    Ok(Json(state.update(id, changes).await?))
}

async fn remove<S: Repository<Product> + 'static>(
    State(state): State<QueryState<Product, S>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Single-criterion filter, ordered by `id`
async fn run_filter<S: Storage<Product> + 'static>(
    state: &QueryState<Product, S>,
    page: &PageParams,
    criteria: &CriteriaSet,
) -> Result<Json<Page<Product>>, ApiError> {
    let (page, sort) = state.window(page, &SortParams::default(), QueryOperation::Filter)?;
    Ok(Json(state.engine.filter(criteria, page, sort).await?))
}

fn as_filter(error: ApiError) -> ApiError {
    error
        .with_operation(ApiOperation::Filter)
        .with_entity_type("Product")
}
