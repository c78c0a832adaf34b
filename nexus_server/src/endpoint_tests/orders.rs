use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use nexus_engine::{OrderFlowApi, StoreError};

use super::{
    helpers::{bearer, item, order_for, send_request, user_token},
    mocks::MockStore,
};
use crate::routes::configure_routes;

fn with_store(store: MockStore) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg: &mut ServiceConfig| {
        cfg.app_data(web::Data::new(OrderFlowApi::new(store)));
        configure_routes::<MockStore>(cfg);
    }
}

fn place(token: &str, body: serde_json::Value) -> TestRequest {
    TestRequest::post().uri("/orders").insert_header(bearer(token)).set_json(body)
}

#[actix_web::test]
async fn fetch_my_orders() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store
        .expect_fetch_orders_for_user()
        .withf(|user| user == "alice")
        .times(1)
        .returning(|user| Ok(vec![order_for(1, user, &[]).order, order_for(4, user, &[]).order]));
    let req = TestRequest::get().uri("/orders").insert_header(bearer(&user_token("alice")));
    let (status, body) = send_request(req, with_store(store)).await;
    assert_eq!(status, StatusCode::OK);
    let orders: Vec<serde_json::Value> = serde_json::from_str(&body).unwrap();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[1]["id"], 4);
    assert_eq!(orders[1]["user_id"], "alice");
}

#[actix_web::test]
async fn fetch_own_order() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_fetch_order().withf(|id| *id == 7).returning(|id| Ok(Some(order_for(id, "alice", &[(1, 2), (3, 1)]))));
    let req = TestRequest::get().uri("/orders?order_id=7").insert_header(bearer(&user_token("alice")));
    let (status, body) = send_request(req, with_store(store)).await;
    assert_eq!(status, StatusCode::OK);
    let order: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(order["order"]["id"], 7);
    assert_eq!(order["order_items"].as_array().unwrap().len(), 2);
    assert_eq!(order["order_items"][0]["quantity"], 2);
}

#[actix_web::test]
async fn fetch_another_users_order() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_fetch_order().returning(|id| Ok(Some(order_for(id, "bob", &[(1, 2)]))));
    let req = TestRequest::get().uri("/orders?order_id=7").insert_header(bearer(&user_token("alice")));
    let (status, _) = send_request(req, with_store(store)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn fetch_missing_order() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_fetch_order().returning(|_| Ok(None));
    let req = TestRequest::get().uri("/orders?order_id=70").insert_header(bearer(&user_token("alice")));
    let (status, _) = send_request(req, with_store(store)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn malformed_order_id() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::get().uri("/orders?order_id=seven").insert_header(bearer(&user_token("alice")));
    let (status, _) = send_request(req, with_store(MockStore::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn place_order_coalesces_lines() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_fetch_item().returning(|id| Ok(Some(item(id, &format!("Item {id}"), 100, 10))));
    store
        .expect_place_order()
        .withf(|user, lines| user == "alice" && lines.len() == 2 && lines[&1] == 3 && lines[&2] == 1)
        .times(1)
        .returning(|_, _| Ok(12));
    let body = serde_json::json!({"items": [
        {"item_id": 1, "quantity": 2},
        {"item_id": 2, "quantity": 1},
        {"item_id": 1, "quantity": 1}
    ]});
    let (status, body) = send_request(place(&user_token("alice"), body), with_store(store)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, r#"{"order_id":12}"#);
}

#[actix_web::test]
async fn place_order_with_bad_quantity() {
    let _ = env_logger::try_init().ok();
    // No expectations: the store must not be touched
    let store = MockStore::new();
    let body = serde_json::json!({"items": [{"item_id": 1, "quantity": 2}, {"item_id": 2, "quantity": 0}]});
    let (status, _) = send_request(place(&user_token("alice"), body), with_store(store)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn place_empty_order() {
    let _ = env_logger::try_init().ok();
    let body = serde_json::json!({"items": []});
    let (status, _) = send_request(place(&user_token("alice"), body), with_store(MockStore::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn place_order_for_unknown_item() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_fetch_item().returning(|id| Ok((id == 1).then(|| item(1, "Widget", 100, 10))));
    store.expect_place_order().never();
    let body = serde_json::json!({"items": [{"item_id": 1, "quantity": 1}, {"item_id": 404, "quantity": 1}]});
    let (status, body) = send_request(place(&user_token("alice"), body), with_store(store)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("404"), "{body}");
}

#[actix_web::test]
async fn place_order_with_insufficient_stock() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_fetch_item().returning(|id| Ok(Some(item(id, "Widget", 100, 2))));
    store
        .expect_place_order()
        .returning(|_, _| Err(StoreError::InsufficientStock { item_id: 1, requested: 3, available: 2 }));
    let body = serde_json::json!({"items": [{"item_id": 1, "quantity": 3}]});
    let (status, _) = send_request(place(&user_token("alice"), body), with_store(store)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn place_order_with_malformed_body() {
    let _ = env_logger::try_init().ok();
    let body = serde_json::json!({"items": [{"item_id": "one", "quantity": 3}]});
    let (status, _) = send_request(place(&user_token("alice"), body), with_store(MockStore::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn delete_own_order() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_fetch_order().returning(|id| Ok(Some(order_for(id, "alice", &[(1, 1)]))));
    store.expect_delete_order().withf(|id| *id == 5).times(1).returning(|_| Ok(()));
    let req = TestRequest::delete().uri("/orders?order_id=5").insert_header(bearer(&user_token("alice")));
    let (status, body) = send_request(req, with_store(store)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());
}

#[actix_web::test]
async fn delete_another_users_order() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_fetch_order().returning(|id| Ok(Some(order_for(id, "bob", &[(1, 1)]))));
    store.expect_delete_order().never();
    let req = TestRequest::delete().uri("/orders?order_id=5").insert_header(bearer(&user_token("alice")));
    let (status, _) = send_request(req, with_store(store)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn delete_order_needs_an_id() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::delete().uri("/orders").insert_header(bearer(&user_token("alice")));
    let (status, body) = send_request(req, with_store(MockStore::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "Invalid request. order_id is required.");
}

#[actix_web::test]
async fn unsupported_method_on_orders() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::put().uri("/orders").insert_header(bearer(&user_token("alice")));
    let (status, _) = send_request(req, with_store(MockStore::new())).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}
