//! User service endpoints
//!
//! Passwords are accepted on create and replace, hashed with Argon2id off the
//! async runtime, and never returned.

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
use crate::password::PasswordHasher;
use crate::query::{CriteriaSet, Criterion, Page, QueryOperation};
use crate::records::{NewUser, User, UserWrite};
use crate::storage::Repository;

/// Substring filters over the user's contact details
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilter {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub address: Option<String>,
}

impl UserFilter {
    pub fn criteria(&self) -> CriteriaSet {
        [
            ("name", &self.name),
            ("email", &self.email),
            ("phone", &self.phone),
            ("address", &self.address),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.as_deref().map(|v| Criterion::contains(field, v)))
        .collect()
    }
}

/// Router state: the query state plus the password hasher
pub struct UserState<S> {
    pub query: QueryState<User, S>,
    pub hasher: PasswordHasher,
}

impl<S> Clone for UserState<S> {
    fn clone(&self) -> Self {
        Self {
            query: self.query.clone(),
            hasher: self.hasher.clone(),
        }
    }
}

/// User routes with the default password hashing cost
pub fn routes<S>(state: QueryState<User, S>) -> Router
where
    S: Repository<User> + 'static,
{
    routes_with_hasher(state, PasswordHasher::default())
}

/// User routes hashing passwords with `hasher`
pub fn routes_with_hasher<S>(state: QueryState<User, S>, hasher: PasswordHasher) -> Router
where
    S: Repository<User> + 'static,
{
    Router::new()
        .route("/api/users", get(list::<S>).post(create::<S>))
        .route(
            "/api/users/{id}",
            get(by_id::<S>).put(update::<S>).delete(remove::<S>),
        )
        .with_state(UserState {
            query: state,
            hasher,
        })
}

/// `GET /api/users`: filtered, sorted and paged
async fn list<S: Repository<User> + 'static>(
    State(UserState { query, .. }): State<UserState<S>>,
    ApiQuery(page): ApiQuery<PageParams>,
    ApiQuery(sort): ApiQuery<SortParams>,
    ApiQuery(filter): ApiQuery<UserFilter>,
) -> Result<Json<Page<User>>, ApiError> {
    let (page, sort) = query.window(&page, &sort, QueryOperation::Filter)?;
    Ok(Json(query.engine.filter(&filter.criteria(), page, sort).await?))
}

async fn by_id<S: Repository<User> + 'static>(
    State(UserState { query, .. }): State<UserState<S>>,
    Path(id): Path<i64>,
) -> Result<Json<User>, ApiError> {
    query
        .engine
        .by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("User", id))
}

async fn create<S: Repository<User> + 'static>(
    State(state): State<UserState<S>>,
    ApiJson(data): ApiJson<NewUser>,
) -> Result<impl IntoResponse, ApiError> {
    let data = hashed(&state.hasher, data, ApiOperation::Create).await?;
    let user = state.query.create(data).await?;
    let location = format!("/api/users/{}", user.id);
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(user)))
}

async fn update<S: Repository<User> + 'static>(
    State(state): State<UserState<S>>,
    Path(id): Path<i64>,
    ApiJson(data): ApiJson<NewUser>,
) -> Result<Json<User>, ApiError> {
    let data = hashed(&state.hasher, data, ApiOperation::Update).await?;
    Ok(Json(state.query.update(id, data).await?))
}

async fn remove<S: Repository<User> + 'static>(
    State(state): State<UserState<S>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.query.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Validate the body, then hash its password on the blocking pool
async fn hashed(
    hasher: &PasswordHasher,
    data: NewUser,
    operation: ApiOperation,
) -> Result<UserWrite, ApiError> {
    let in_context = |e: ApiError| e.with_operation(operation).with_entity_type("User");

    data.validate().map_err(|e| in_context(validation(e)))?;
    let hasher = hasher.clone();
    tokio::task::spawn_blocking(move || data.hash_password(&hasher))
        .await
        .map_err(|e| {
            tracing::error!("Password hashing task failed: {}", e);
            in_context(ApiError::internal("An internal error occurred"))
        })?
        .map_err(|e| in_context(ApiError::from(e)))
}
