use actix_web::{cookie::Cookie, http::StatusCode, test, test::TestRequest, web, App};
use nexus_engine::UserApi;

use super::{
    helpers::{bearer, send_request, test_oidc_client, test_options, user_token},
    mocks::MockStore,
};
use crate::{
    auth::{ACCESS_TOKEN_COOKIE, ID_TOKEN_COOKIE},
    routes::configure_routes,
    session_routes::STATE_COOKIE,
};

fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::Data::new(UserApi::new(MockStore::new())));
    configure_routes::<MockStore>(cfg);
}

#[actix_web::test]
async fn health_check() {
    let _ = env_logger::try_init().ok();
    let (status, body) = send_request(TestRequest::get().uri("/health"), configure).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}

#[actix_web::test]
async fn login_redirects_to_provider() {
    let _ = env_logger::try_init().ok();
    let app = App::new()
        .app_data(web::Data::new(test_oidc_client()))
        .app_data(web::Data::new(test_options()))
        .configure(configure);
    let service = test::init_service(app).await;
    let res = test::call_service(&service, TestRequest::get().uri("/login").to_request()).await;
    assert_eq!(res.status(), StatusCode::FOUND);
    let location = res.headers().get("Location").unwrap().to_str().unwrap().to_string();
    assert!(location.starts_with("https://login.example.com/authorize?"), "{location}");
    let state = res.response().cookies().find(|c| c.name() == STATE_COOKIE).expect("No state cookie");
    assert_eq!(state.http_only(), Some(true));
    assert!(location.contains(&format!("state={}", state.value())), "{location}");
}

#[actix_web::test]
async fn redirect_without_code() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::get().uri("/redirect?state=abc").cookie(Cookie::new(STATE_COOKIE, "abc"));
    let (status, body) = send_request(req, configure).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "Invalid request. The authorization code is missing.");
}

#[actix_web::test]
async fn redirect_with_mismatched_state() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::get().uri("/redirect?code=xyz&state=abc").cookie(Cookie::new(STATE_COOKIE, "def"));
    let (status, _) = send_request(req, configure).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let req = TestRequest::get().uri("/redirect?code=xyz&state=abc");
    let (status, _) = send_request(req, configure).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn redirect_with_provider_error() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::get().uri("/redirect?error=access_denied&error_description=User+cancelled");
    let (status, _) = send_request(req, configure).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn logout_clears_cookies() {
    let _ = env_logger::try_init().ok();
    let app = App::new().app_data(web::Data::new(test_options())).configure(configure);
    let service = test::init_service(app).await;
    let res = test::call_service(&service, TestRequest::get().uri("/logout").to_request()).await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    let cleared = res.response().cookies().map(|c| (c.name().to_string(), c.value().to_string())).collect::<Vec<_>>();
    assert!(cleared.contains(&(ID_TOKEN_COOKIE.to_string(), String::new())));
    assert!(cleared.contains(&(ACCESS_TOKEN_COOKIE.to_string(), String::new())));
}

#[actix_web::test]
async fn me_requires_the_access_token_cookie() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::get().uri("/me").insert_header(bearer(&user_token("alice")));
    let (status, _) = send_request(req, configure).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn me_requires_authentication() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::get().uri("/me").cookie(Cookie::new(ACCESS_TOKEN_COOKIE, "graph-token"));
    let (status, _) = send_request(req, configure).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn login_rejects_other_methods() {
    let _ = env_logger::try_init().ok();
    let (status, _) = send_request(TestRequest::post().uri("/login"), configure).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}
