use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use log::*;
use nexus_common::{helpers::parse_boolean_flag, Secret};

use crate::errors::ServerError;

const DEFAULT_NEXUS_HOST: &str = "127.0.0.1";
const DEFAULT_NEXUS_PORT: u16 = 8080;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/nexus_store.db";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 25;
const DEFAULT_REDIRECT_URL: &str = "http://localhost:8080/redirect";
const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000/admin/add-item";
const DEFAULT_SCOPES: &str = "openid profile email offline_access User.Read";
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";
const DEFAULT_UPLOADS_DIR: &str = "uploads";
const DEFAULT_PROFILE_URL: &str = "https://graph.microsoft.com/v1.0/me";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_TOKEN_LEEWAY: u64 = 60;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub auth: AuthConfig,
    /// The single browser origin allowed to make credentialed cross-origin requests.
    pub cors_origin: String,
    pub options: ServerOptions,
}

/// Settings for the OpenID Connect login flow and identity token checks.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The expected `iss` claim. Discovery metadata is fetched from `{issuer}/.well-known/openid-configuration`.
    pub issuer: String,
    /// The OAuth client id. Identity tokens must name this as their audience.
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub redirect_url: String,
    /// Where the browser is sent once login completes.
    pub frontend_url: String,
    pub scopes: Vec<String>,
    /// Clock skew tolerated when checking `exp` and `nbf`, in seconds.
    pub token_leeway: u64,
}

/// Per-request settings shared with handlers and middleware through `web::Data`.
#[derive(Clone, Debug)]
pub struct ServerOptions {
    pub credential_source: CredentialSource,
    /// When true, session cookies are marked `Secure` and `SameSite=None`.
    pub secure_cookies: bool,
    pub uploads_dir: PathBuf,
    pub profile_url: String,
    /// Upper bound on each store call made while serving a request.
    pub request_timeout: Duration,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            credential_source: CredentialSource::default(),
            secure_cookies: true,
            uploads_dir: PathBuf::from(DEFAULT_UPLOADS_DIR),
            profile_url: DEFAULT_PROFILE_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Where the authentication middleware looks for the identity token.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CredentialSource {
    /// `Authorization: Bearer <token>` only
    Header,
    /// The `id_token` cookie only
    Cookie,
    /// Either. The header wins when both are present.
    #[default]
    Any,
}

impl FromStr for CredentialSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "header" => Ok(Self::Header),
            "cookie" => Ok(Self::Cookie),
            "any" => Ok(Self::Any),
            _ => Err(format!("'{s}' is not a valid credential source. Use 'header', 'cookie' or 'any'.")),
        }
    }
}

impl Display for CredentialSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Header => f.write_str("header"),
            Self::Cookie => f.write_str("cookie"),
            Self::Any => f.write_str("any"),
        }
    }
}

impl ServerConfig {
    /// Reads the configuration from the environment. Optional values fall back to their defaults with a log message.
    /// The identity provider settings have no sensible defaults, so their absence is an error.
    pub fn try_from_env() -> Result<Self, ServerError> {
        let host = env::var("NEXUS_HOST").ok().unwrap_or_else(|| DEFAULT_NEXUS_HOST.into());
        let port = parse_env("NEXUS_PORT", DEFAULT_NEXUS_PORT);
        let database_url = env::var("NEXUS_DATABASE_URL").ok().unwrap_or_else(|| {
            info!("🪛️ NEXUS_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.into()
        });
        let db_max_connections = parse_env("NEXUS_DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS);
        let auth = AuthConfig::try_from_env()?;
        let cors_origin = env::var("NEXUS_CORS_ORIGIN").ok().unwrap_or_else(|| {
            info!("🪛️ NEXUS_CORS_ORIGIN is not set. Allowing {DEFAULT_CORS_ORIGIN}.");
            DEFAULT_CORS_ORIGIN.into()
        });
        let options = ServerOptions::from_env_or_default();
        Ok(Self { host, port, database_url, db_max_connections, auth, cors_origin, options })
    }
}

impl AuthConfig {
    pub fn try_from_env() -> Result<Self, ServerError> {
        let issuer = match (env::var("NEXUS_OIDC_ISSUER"), env::var("NEXUS_AZUREAD_TENANT_ID")) {
            (Ok(issuer), _) => issuer.trim_end_matches('/').to_string(),
            (Err(_), Ok(tenant)) => format!("https://login.microsoftonline.com/{tenant}/v2.0"),
            _ => {
                return Err(ServerError::ConfigurationError(
                    "Either NEXUS_OIDC_ISSUER or NEXUS_AZUREAD_TENANT_ID must be set.".into(),
                ))
            },
        };
        info!("🪛️ Identity tokens must be issued by {issuer}");
        let client_id = env::var("NEXUS_CLIENT_ID")
            .map_err(|_| ServerError::ConfigurationError("NEXUS_CLIENT_ID must be set.".into()))?;
        let client_secret = env::var("NEXUS_CLIENT_SECRET")
            .map(Secret::new)
            .map_err(|_| ServerError::ConfigurationError("NEXUS_CLIENT_SECRET must be set.".into()))?;
        let redirect_url = env::var("NEXUS_REDIRECT_URL").ok().unwrap_or_else(|| {
            info!("🪛️ NEXUS_REDIRECT_URL is not set. Using the default, {DEFAULT_REDIRECT_URL}.");
            DEFAULT_REDIRECT_URL.into()
        });
        let frontend_url = env::var("NEXUS_FRONTEND_URL").ok().unwrap_or_else(|| {
            info!("🪛️ NEXUS_FRONTEND_URL is not set. Using the default, {DEFAULT_FRONTEND_URL}.");
            DEFAULT_FRONTEND_URL.into()
        });
        let scopes = env::var("NEXUS_SCOPES").ok().unwrap_or_else(|| DEFAULT_SCOPES.into());
        let scopes = scopes.split_whitespace().map(String::from).collect();
        let token_leeway = parse_env("NEXUS_TOKEN_LEEWAY", DEFAULT_TOKEN_LEEWAY);
        Ok(Self { issuer, client_id, client_secret, redirect_url, frontend_url, scopes, token_leeway })
    }
}

impl ServerOptions {
    pub fn from_env_or_default() -> Self {
        let credential_source = env::var("NEXUS_CREDENTIAL_SOURCE")
            .ok()
            .and_then(|s| {
                s.parse::<CredentialSource>()
                    .map_err(|e| warn!("🪛️ {e} Using the default, {}.", CredentialSource::default()))
                    .ok()
            })
            .unwrap_or_default();
        info!("🪛️ Identity tokens are read from: {credential_source}");
        let secure_cookies = parse_boolean_flag(env::var("NEXUS_SECURE_COOKIES").ok(), true);
        if !secure_cookies {
            warn!("🚨️ Session cookies will not be marked Secure. Do not run like this in production.");
        }
        let uploads_dir = env::var("NEXUS_UPLOADS_DIR").map(PathBuf::from).unwrap_or_else(|_| {
            info!("🪛️ NEXUS_UPLOADS_DIR is not set. Item images will be saved in ./{DEFAULT_UPLOADS_DIR}");
            PathBuf::from(DEFAULT_UPLOADS_DIR)
        });
        let profile_url = env::var("NEXUS_PROFILE_URL").ok().unwrap_or_else(|| DEFAULT_PROFILE_URL.into());
        let request_timeout =
            Duration::from_secs(parse_env("NEXUS_REQUEST_TIMEOUT", DEFAULT_REQUEST_TIMEOUT.as_secs()));
        Self { credential_source, secure_cookies, uploads_dir, profile_url, request_timeout }
    }
}

/// Parses an optional numeric environment variable, logging and falling back to `default` when it is missing or
/// malformed.
fn parse_env<T>(name: &str, default: T) -> T
where
    T: FromStr + Display + Copy,
    T::Err: Display,
{
    match env::var(name) {
        Ok(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            error!("🪛️ {s} is not a valid value for {name}. {e} Using the default, {default}, instead.");
            default
        }),
        Err(_) => {
            debug!("🪛️ {name} is not set. Using the default, {default}.");
            default
        },
    }
}
