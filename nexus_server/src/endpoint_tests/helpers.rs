use actix_web::{
    http::StatusCode,
    test,
    test::TestRequest,
    web::{self, ServiceConfig},
    App,
};
use chrono::{TimeZone, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use log::debug;
use nexus_common::{Price, Secret};
use nexus_engine::db_types::{Item, Order, OrderLine, OrderWithLines};

use crate::{
    auth::{Audience, JwtClaims, TokenVerifier, VerificationKeys},
    config::{AuthConfig, ServerOptions},
    oidc::{OidcClient, ProviderMetadata},
    server::{json_config, query_config},
};

// Fixed keys for tests only. DO NOT re-use these anywhere.
pub const TEST_SECRET: &[u8] = b"nexus-endpoint-tests-hmac-secret-do-not-use";
pub const TEST_ISSUER: &str = "https://login.example.com/nexus-test/v2.0";
pub const TEST_CLIENT_ID: &str = "nexus-test-client";

pub fn claims_for(sub: &str, roles: &[&str]) -> JwtClaims {
    let now = Utc::now().timestamp();
    JwtClaims {
        sub: sub.to_string(),
        oid: None,
        roles: roles.iter().map(|r| r.to_string()).collect(),
        name: Some(format!("Test user {sub}")),
        preferred_username: None,
        email: None,
        iss: TEST_ISSUER.to_string(),
        aud: Audience::Single(TEST_CLIENT_ID.to_string()),
        exp: now + 3600,
        nbf: Some(now - 60),
        iat: Some(now - 60),
    }
}

pub fn issue_token(claims: JwtClaims) -> String {
    issue_token_with(claims, None, TEST_SECRET)
}

pub fn issue_token_with(claims: JwtClaims, kid: Option<&str>, secret: &[u8]) -> String {
    let mut header = Header::new(Algorithm::HS256);
    header.kid = kid.map(String::from);
    encode(&header, &claims, &EncodingKey::from_secret(secret)).expect("Failed to sign token")
}

pub fn user_token(sub: &str) -> String {
    issue_token(claims_for(sub, &["user"]))
}

pub fn admin_token(sub: &str) -> String {
    issue_token(claims_for(sub, &["Admin", "user"]))
}

pub fn expired_token(sub: &str) -> String {
    let mut claims = claims_for(sub, &["user"]);
    claims.exp = Utc::now().timestamp() - 3600;
    issue_token(claims)
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {token}"))
}

pub fn test_verifier() -> TokenVerifier {
    TokenVerifier::new(VerificationKeys::from_secret(TEST_SECRET), TEST_ISSUER, TEST_CLIENT_ID)
}

pub fn test_auth_config() -> AuthConfig {
    AuthConfig {
        issuer: TEST_ISSUER.to_string(),
        client_id: TEST_CLIENT_ID.to_string(),
        client_secret: Secret::new("not-a-real-secret".to_string()),
        redirect_url: "http://localhost:8080/redirect".to_string(),
        frontend_url: "http://localhost:3000/admin/add-item".to_string(),
        scopes: vec!["openid".to_string(), "profile".to_string()],
        token_leeway: 60,
    }
}

/// The endpoints point at a host that is never contacted by the tests.
pub fn test_oidc_client() -> OidcClient {
    let metadata = ProviderMetadata {
        issuer: TEST_ISSUER.to_string(),
        authorization_endpoint: "https://login.example.com/authorize".to_string(),
        token_endpoint: "https://login.example.com/token".to_string(),
        jwks_uri: "https://login.example.com/keys".to_string(),
    };
    OidcClient::new(test_auth_config(), metadata).expect("Failed to create OIDC client")
}

pub fn test_options() -> ServerOptions {
    ServerOptions {
        secure_cookies: false,
        uploads_dir: std::env::temp_dir().join("nexus_endpoint_test_uploads"),
        ..ServerOptions::default()
    }
}

pub fn item(id: i64, name: &str, cents: i64, stock: i64) -> Item {
    Item {
        id,
        name: name.to_string(),
        description: format!("A fine {name}"),
        price: Price::from_cents(cents).expect("Invalid test price"),
        stock,
        image_url: None,
    }
}

pub fn order_for(id: i64, user_id: &str, lines: &[(i64, i64)]) -> OrderWithLines {
    let order = Order {
        id,
        user_id: user_id.to_string(),
        created_at: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
    };
    let order_items =
        lines.iter().map(|&(item_id, quantity)| OrderLine { order_id: id, item_id, quantity }).collect();
    OrderWithLines { order, order_items }
}

/// Sends `req` to an app with the shared test configuration plus whatever `configure` registers. Errors raised by
/// middleware are converted into the status and body the client would have seen.
pub async fn send_request<F>(req: TestRequest, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let app = App::new()
        .app_data(json_config())
        .app_data(query_config())
        .app_data(web::Data::new(test_verifier()))
        .app_data(web::Data::new(test_options()))
        .app_data(web::Data::new(test_oidc_client()))
        .configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => {
            let status = res.status();
            let body = test::read_body(res).await;
            (status, String::from_utf8_lossy(&body).into_owned())
        },
        Err(e) => (e.as_response_error().status_code(), e.to_string()),
    }
}
