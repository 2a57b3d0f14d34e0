//! Order service endpoints
//!
//! | Route | Engine call |
//! |-------|-------------|
//! | `GET /orders` | `list` |
//! | `GET /orders/filter?status=&userId=&productId=` | `filter` |
//! | `GET /orders/search?keyword=` | `search` |
//! | `GET /orders/{id}` | `by_id` |
//! | `POST /orders` | `Repository::create` |
//! | `PUT /orders/{id}` | `Repository::update` |
//! | `DELETE /orders/{id}` | `Repository::delete` |

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use super::params::blank_as_none;
use super::{
    validation, ApiError, ApiJson, ApiOperation, ApiQuery, PageParams, QueryState, SortParams,
};
use crate::query::{CriteriaSet, Criterion, Page, QueryOperation};
use crate::records::{NewOrder, Order};
use crate::storage::Repository;

/// Structured order filter; absent fields do not constrain
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderFilter {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub user_id: Option<i64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub product_id: Option<i64>,
}

impl OrderFilter {
    pub fn criteria(&self) -> CriteriaSet {
        CriteriaSet::new()
            .with_optional(self.status.as_deref().map(|s| Criterion::equals("status", s)))
            .with_optional(self.user_id.map(|id| Criterion::equals("userId", id)))
            .with_optional(self.product_id.map(|id| Criterion::equals("productId", id)))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeywordParams {
    #[serde(default)]
    pub keyword: Option<String>,
}

/// Order routes
pub fn routes<S>(state: QueryState<Order, S>) -> Router
where
    S: Repository<Order> + 'static,
{
    Router::new()
        .route("/orders", get(list::<S>).post(create::<S>))
        .route("/orders/filter", get(filter::<S>))
        .route("/orders/search", get(search::<S>))
        .route(
            "/orders/{id}",
            get(by_id::<S>).put(update::<S>).delete(remove::<S>),
        )
        .with_state(state)
}

async fn list<S: Repository<Order> + 'static>(
    State(state): State<QueryState<Order, S>>,
    ApiQuery(page): ApiQuery<PageParams>,
    ApiQuery(sort): ApiQuery<SortParams>,
) -> Result<Json<Page<Order>>, ApiError> {
    let (page, sort) = state.window(&page, &sort, QueryOperation::List)?;
    Ok(Json(state.engine.list(page, sort).await?))
}

async fn filter<S: Repository<Order> + 'static>(
    State(state): State<QueryState<Order, S>>,
    ApiQuery(page): ApiQuery<PageParams>,
    ApiQuery(sort): ApiQuery<SortParams>,
    ApiQuery(filter): ApiQuery<OrderFilter>,
) -> Result<Json<Page<Order>>, ApiError> {
    let (page, sort) = state.window(&page, &sort, QueryOperation::Filter)?;
    Ok(Json(state.engine.filter(&filter.criteria(), page, sort).await?))
}

async fn search<S: Repository<Order> + 'static>(
    State(state): State<QueryState<Order, S>>,
    ApiQuery(page): ApiQuery<PageParams>,
    ApiQuery(sort): ApiQuery<SortParams>,
    ApiQuery(params): ApiQuery<KeywordParams>,
) -> Result<Json<Page<Order>>, ApiError> {
    let (page, sort) = state.window(&page, &sort, QueryOperation::Search)?;
    let keyword = params.keyword.unwrap_or_default();
    Ok(Json(state.engine.search(&keyword, page, sort).await?))
}

async fn by_id<S: Repository<Order> + 'static>(
    State(state): State<QueryState<Order, S>>,
    Path(id): Path<i64>,
) -> Result<Json<Order>, ApiError> {
    state
        .engine
        .by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Order", id))
}

async fn create<S: Repository<Order> + 'static>(
    State(state): State<QueryState<Order, S>>,
    ApiJson(data): ApiJson<NewOrder>,
) -> Result<impl IntoResponse, ApiError> {
    data.validate().map_err(|e| {
        validation(e)
            .with_operation(ApiOperation::Create)
            .with_entity_type("Order")
    })?;
    let order = state.create(data).await?;
    let location = format!("/orders/{}", order.id);
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(order)))
}

async fn update<S: Repository<Order> + 'static>(
    State(state): State<QueryState<Order, S>>,
    Path(id): Path<i64>,
    ApiJson(data): ApiJson<NewOrder>,
) -> Result<Json<Order>, ApiError> {
    data.validate().map_err(|e| {
        validation(e)
            .with_operation(ApiOperation::Update)
            .with_entity("Order", id.to_string())
    })?;
    Ok(Json(state.update(id, data).await?))
}

async fn remove<S: Repository<Order> + 'static>(
    State(state): State<QueryState<Order, S>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
