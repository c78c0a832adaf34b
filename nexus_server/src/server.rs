use std::time::Duration;

use actix_cors::Cors;
use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use nexus_engine::{InventoryApi, OrderFlowApi, SqliteDatabase, UserApi};

use crate::{
    auth::{TokenVerifier, VerificationKeys},
    config::ServerConfig,
    errors::ServerError,
    oidc::OidcClient,
    routes::configure_routes,
};

const MAX_JSON_BODY: usize = 256 * 1024;

/// Prepares the store and the identity provider connection, then runs the server until it is shut down.
///
/// The provider's signing keys are fetched once, here. The server does not refresh them while it runs.
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, config.db_max_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(format!("Database migration failed. {e}")))?;
    info!("🚀️ Database at {} is ready", db.url());
    let oidc = OidcClient::discover(config.auth.clone()).await?;
    let jwks = oidc.fetch_jwks().await?;
    let keys = VerificationKeys::from_jwk_set(&jwks)?;
    let srv = create_server_instance(config, db, oidc, keys)?;
    srv.await.map_err(ServerError::from)
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    oidc: OidcClient,
    keys: VerificationKeys,
) -> Result<Server, ServerError> {
    let verifier = TokenVerifier::new(keys, config.auth.issuer.clone(), config.auth.client_id.clone())
        .with_leeway(config.auth.token_leeway);
    let verifier = web::Data::new(verifier);
    let oidc = web::Data::new(oidc);
    let options = web::Data::new(config.options.clone());
    let cors_origin = config.cors_origin.clone();
    let srv = HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&cors_origin)
            .allow_any_method()
            .allow_any_header()
            .supports_credentials()
            .max_age(3600);
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %r").log_target("nexus::access_log"))
            .wrap(cors)
            .app_data(json_config())
            .app_data(query_config())
            .app_data(web::Data::new(InventoryApi::new(db.clone())))
            .app_data(web::Data::new(OrderFlowApi::new(db.clone())))
            .app_data(web::Data::new(UserApi::new(db.clone())))
            .app_data(verifier.clone())
            .app_data(oidc.clone())
            .app_data(options.clone())
            .configure(configure_routes::<SqliteDatabase>)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    info!("🚀️ Listening on {}:{}", config.host, config.port);
    Ok(srv)
}

/// Malformed JSON bodies are the client's fault, and get a 400 with the parser's explanation.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(MAX_JSON_BODY)
        .error_handler(|err, _req| ServerError::InvalidRequest(err.to_string()).into())
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| ServerError::InvalidRequest(err.to_string()).into())
}
