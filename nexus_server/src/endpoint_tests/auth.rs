use actix_web::{cookie::Cookie, http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use nexus_engine::{InventoryApi, OrderFlowApi};

use super::{
    helpers::{admin_token, bearer, claims_for, expired_token, issue_token, issue_token_with, send_request, user_token},
    mocks::MockStore,
};
use crate::{auth::ID_TOKEN_COOKIE, routes::configure_routes};

fn configure_orders(cfg: &mut ServiceConfig) {
    let mut store = MockStore::new();
    store.expect_fetch_orders_for_user().returning(|_| Ok(vec![]));
    cfg.app_data(web::Data::new(OrderFlowApi::new(store)));
    configure_routes::<MockStore>(cfg);
}

fn configure_items(cfg: &mut ServiceConfig) {
    let mut store = MockStore::new();
    store.expect_update_item_stock().returning(|_, _| Ok(()));
    store.expect_list_items().returning(|| Ok(vec![]));
    cfg.app_data(web::Data::new(InventoryApi::new(store)));
    configure_routes::<MockStore>(cfg);
}

#[actix_web::test]
async fn no_credentials() {
    let _ = env_logger::try_init().ok();
    let (status, body) = send_request(TestRequest::get().uri("/orders"), configure_orders).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, "No valid credential was supplied. Log in and try again.");
}

#[actix_web::test]
async fn malformed_authorization_header() {
    let _ = env_logger::try_init().ok();
    let token = user_token("alice");
    let req = TestRequest::get().uri("/orders").insert_header(("Authorization", format!("Token {token}")));
    let (status, _) = send_request(req, configure_orders).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn expired_token_is_rejected() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::get().uri("/orders").insert_header(bearer(&expired_token("alice")));
    let (status, body) = send_request(req, configure_orders).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, "The identity token is not valid. The token has expired");
}

#[actix_web::test]
async fn tampered_token() {
    let _ = env_logger::try_init().ok();
    let mut token = user_token("alice");
    let n = token.len();
    token.replace_range(n - 10..n - 5, "AAAAA");
    let req = TestRequest::get().uri("/orders").insert_header(bearer(&token));
    let (status, _) = send_request(req, configure_orders).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn token_from_another_signer() {
    let _ = env_logger::try_init().ok();
    let token = issue_token_with(claims_for("mallory", &["admin"]), None, b"some-other-secret");
    let req = TestRequest::get().uri("/orders").insert_header(bearer(&token));
    let (status, _) = send_request(req, configure_orders).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn valid_user_token_on_user_route() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::get().uri("/orders").insert_header(bearer(&user_token("alice")));
    let (status, body) = send_request(req, configure_orders).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "[]");
}

#[actix_web::test]
async fn token_in_cookie() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::get().uri("/orders").cookie(Cookie::new(ID_TOKEN_COOKIE, user_token("alice")));
    let (status, _) = send_request(req, configure_orders).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn non_admin_on_admin_route() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post()
        .uri("/items/update")
        .insert_header(bearer(&user_token("alice")))
        .set_json(serde_json::json!({"item_id": 1, "stock": 10}));
    let (status, body) = send_request(req, configure_items).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, "Insufficient permissions. This action requires the role(s): admin.");
}

#[actix_web::test]
async fn admin_route_without_credentials() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post().uri("/items/update").set_json(serde_json::json!({"item_id": 1, "stock": 10}));
    let (status, _) = send_request(req, configure_items).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn admin_on_admin_route() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post()
        .uri("/items/update")
        .insert_header(bearer(&admin_token("root")))
        .set_json(serde_json::json!({"item_id": 1, "stock": 10}));
    let (status, _) = send_request(req, configure_items).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn role_names_ignore_case() {
    let _ = env_logger::try_init().ok();
    let token = issue_token(claims_for("root", &["ADMIN"]));
    let req = TestRequest::post()
        .uri("/items/update")
        .insert_header(bearer(&token))
        .set_json(serde_json::json!({"item_id": 1, "stock": 10}));
    let (status, _) = send_request(req, configure_items).await;
    assert_eq!(status, StatusCode::OK);
}
