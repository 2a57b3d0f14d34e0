//! The three service routers merged into one application

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use food_service::prelude::*;
use serde_json::{json, Value};
use tower::ServiceExt;

fn app() -> Router {
    let paging = PagingConfig {
        default_size: 2,
        max_size: 3,
    };

    let orders_engine = QueryEngine::new(MemoryStorage::new(vec![
        Order::new(1, 10, 100, "completed"),
        Order::new(2, 11, 101, "pending"),
    ]));
    let products_engine = QueryEngine::new(MemoryStorage::new(vec![
        Product::new(100, "Ramen", 12.0).with_categories(["Noodles"]),
        Product::new(101, "Gyoza", 5.5).with_categories(["Sides"]),
    ]));
    let users_engine = QueryEngine::new(MemoryStorage::new(vec![
        User::new(10, "Kenji", "kenji@example.com"),
        User::new(11, "Mika", "mika@example.com"),
        User::new(12, "Noor", "noor@example.net"),
        User::new(13, "Olu", "olu@example.com"),
    ]));

    Router::new()
        .merge(orders::routes(QueryState::new(orders_engine, paging.clone())))
        .merge(products::routes(QueryState::new(products_engine, paging.clone())))
        .merge(users::routes(QueryState::new(users_engine, paging)))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    if bytes.is_empty() {
        return (status, Value::Null);
    }
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn get(uri: &str) -> (StatusCode, Value) {
    send(app(), Request::get(uri).body(Body::empty()).unwrap()).await
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn configured_default_page_size_applies() {
    let (status, body) = get("/api/users").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
    assert_eq!(body["pageSize"], 2);
    assert_eq!(body["totalElements"], 4);
    assert_eq!(body["hasNext"], true);
}

#[tokio::test]
async fn page_size_is_capped() {
    let (_, body) = get("/api/users?size=50").await;
    assert_eq!(body["pageSize"], 3);
    assert_eq!(body["items"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn each_service_answers_on_its_own_prefix() {
    let (status, body) = get("/orders/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["productId"], 100);

    let (status, body) = get("/api/products/101").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Gyoza");

    let (status, body) = get("/api/users/12").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "noor@example.net");
}

#[tokio::test]
async fn error_body_shape() {
    let (status, body) = get("/api/users?page=-1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_PAGE");
    assert_eq!(body["status"], 400);
    assert_eq!(body["operation"], "filter");
    assert_eq!(body["entity_type"], "User");
    assert!(body["error"].as_str().unwrap().contains("negative"));
}

#[tokio::test]
async fn order_lifecycle_through_merged_app() {
    let app = app();

    let (status, created) = send(
        app.clone(),
        json_request(
            Method::POST,
            "/orders",
            json!({"userId": 12, "productId": 101, "status": "pending"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_i64().unwrap();
    assert_eq!(id, 3);

    let (status, updated) = send(
        app.clone(),
        json_request(
            Method::PUT,
            &format!("/orders/{id}"),
            json!({"userId": 12, "productId": 101, "status": "completed"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "completed");

    let (_, page) = send(
        app.clone(),
        Request::get("/orders/filter?status=completed&size=3")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(page["totalElements"], 2);

    let delete = Request::builder()
        .method(Method::DELETE)
        .uri(format!("/orders/{id}"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app.clone(), delete).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());

    let (status, _) = send(
        app,
        Request::get(format!("/orders/{id}")).body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn duplicate_product_name_conflicts() {
    let (status, body) = send(
        app(),
        json_request(
            Method::POST,
            "/api/products",
            json!({"name": "Ramen", "price": 13.0}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ALREADY_EXISTS");
}
