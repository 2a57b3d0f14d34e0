//! HTTP handlers for the order, product and user services
//!
//! Each service module exposes a `routes` function returning an axum
//! [`Router`](axum::Router) over a [`QueryState`] for its record type. Read
//! handlers turn query-string parameters into typed filters, apply the
//! configured paging defaults and call the [`QueryEngine`]. Write handlers
//! validate a JSON body and call the storage's [`Repository`] operations.
//!
//! # Example
//!
//! ```rust
//! use food_service::config::PagingConfig;
//! use food_service::handlers::{orders, QueryState};
//! use food_service::query::QueryEngine;
//! use food_service::records::Order;
//! use food_service::storage::MemoryStorage;
//!
//! let storage = MemoryStorage::new(vec![Order::new(1, 1, 2, "completed")]);
//! let state = QueryState::new(QueryEngine::new(storage), PagingConfig::default());
//! let app: axum::Router = orders::routes(state);
//! ```

mod error;
mod params;

pub mod orders;
pub mod products;
pub mod users;

pub use error::{ApiError, ApiErrorKind, ApiErrorResponse, ApiOperation};
pub use params::{ApiJson, ApiQuery, PageParams, SortParams};

use crate::config::PagingConfig;
use crate::query::{PageRequest, QueryEngine, QueryOperation, QueryResult, Record, SortSpec};
use crate::storage::{Repository, Storage, Writable};

/// Shared state of one service's router
pub struct QueryState<R, S> {
    pub engine: QueryEngine<R, S>,
    pub paging: PagingConfig,
}

impl<R, S> Clone for QueryState<R, S> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            paging: self.paging.clone(),
        }
    }
}

impl<R, S> QueryState<R, S>
where
    R: Record,
    S: Storage<R>,
{
    pub fn new(engine: QueryEngine<R, S>, paging: PagingConfig) -> Self {
        Self { engine, paging }
    }

    /// Resolve paging and sort parameters for `operation`
    fn window(
        &self,
        page: &PageParams,
        sort: &SortParams,
        operation: QueryOperation,
    ) -> QueryResult<(PageRequest, SortSpec)> {
        let resolved = page
            .resolve(&self.paging)
            .and_then(|page| Ok((page, sort.resolve(R::KIND)?)));
        resolved.map_err(|e| e.with_entity(R::KIND).with_operation(operation))
    }
}

impl<R, S> QueryState<R, S>
where
    R: Writable,
    S: Repository<R>,
{
    async fn create(&self, data: R::Create) -> Result<R, ApiError> {
        let record = self.engine.storage().create(data).await.map_err(|e| {
            ApiError::from(e)
                .with_operation(ApiOperation::Create)
                .with_entity_type(R::KIND.type_name())
        })?;
        tracing::info!(entity = %R::KIND, id = record.id(), "Created");
        Ok(record)
    }

    async fn update(&self, id: i64, data: R::Update) -> Result<R, ApiError> {
        let record = self.engine.storage().update(id, data).await.map_err(|e| {
            ApiError::from(e)
                .with_operation(ApiOperation::Update)
                .with_entity(R::KIND.type_name(), id.to_string())
        })?;
        tracing::info!(entity = %R::KIND, id, "Updated");
        Ok(record)
    }

    async fn delete(&self, id: i64) -> Result<(), ApiError> {
        let deleted = self.engine.storage().delete(id).await.map_err(|e| {
            ApiError::from(e)
                .with_operation(ApiOperation::Delete)
                .with_entity(R::KIND.type_name(), id.to_string())
        })?;
        if !deleted {
            return Err(
                ApiError::not_found(R::KIND.type_name(), id).with_operation(ApiOperation::Delete)
            );
        }
        tracing::info!(entity = %R::KIND, id, "Deleted");
        Ok(())
    }
}

/// Reject a request body that fails validation
fn validation(message: impl Into<String>) -> ApiError {
    ApiError::bad_request(message).with_code("VALIDATION_FAILED")
}

#[cfg(test)]
pub(crate) mod test_support {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        Router,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    /// Send a GET request and decode the JSON response
    pub async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    /// Send a request with an optional JSON body; an empty response is `Null`
    pub async fn send_json(
        app: Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let request = match body {
            Some(body) => Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        };
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        if bytes.is_empty() {
            (status, Value::Null)
        } else {
            (status, serde_json::from_slice(&bytes).unwrap())
        }
    }

    /// Item identifiers of a JSON page
    pub fn ids(page: &Value) -> Vec<i64> {
        page["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|item| item["id"].as_i64().unwrap())
            .collect()
    }
}
