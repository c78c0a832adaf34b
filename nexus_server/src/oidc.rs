//! OpenID Connect client.
//!
//! Talks to the identity provider for everything other than token verification: discovery, the JWK set, the
//! authorization code exchange and the profile endpoint.
use std::time::Duration;

use jsonwebtoken::jwk::JwkSet;
use log::*;
use nexus_engine::db_types::UserProfile;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

use crate::{config::AuthConfig, errors::ServerError};

const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// The subset of the provider's discovery document that the server uses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderMetadata {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub jwks_uri: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub id_token: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

#[derive(Clone)]
pub struct OidcClient {
    http: Client,
    metadata: ProviderMetadata,
    config: AuthConfig,
}

impl OidcClient {
    pub fn new(config: AuthConfig, metadata: ProviderMetadata) -> Result<Self, ServerError> {
        let http = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| ServerError::InitializeError(format!("Could not create HTTP client. {e}")))?;
        Ok(Self { http, metadata, config })
    }

    /// Fetches the provider metadata from `{issuer}/.well-known/openid-configuration`.
    pub async fn discover(config: AuthConfig) -> Result<Self, ServerError> {
        let url = format!("{}/.well-known/openid-configuration", config.issuer);
        info!("🔐️ Fetching identity provider metadata from {url}");
        let client = Self::new(config, ProviderMetadata::default())?;
        let metadata = client
            .get_json::<ProviderMetadata>(&url)
            .await
            .map_err(|e| ServerError::InitializeError(format!("OpenID discovery failed. {e}")))?;
        if metadata.issuer.trim_end_matches('/') != client.config.issuer {
            warn!(
                "🔐️ The provider reports its issuer as {}, but tokens will be checked against {}",
                metadata.issuer, client.config.issuer
            );
        }
        Ok(Self { metadata, ..client })
    }

    pub fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub async fn fetch_jwks(&self) -> Result<JwkSet, ServerError> {
        debug!("🔐️ Fetching signing keys from {}", self.metadata.jwks_uri);
        self.get_json::<JwkSet>(&self.metadata.jwks_uri)
            .await
            .map_err(|e| ServerError::InitializeError(format!("Could not fetch the provider's signing keys. {e}")))
    }

    /// The URL that starts an authorization code login at the provider.
    pub fn authorization_url(&self, state: &str) -> Result<Url, ServerError> {
        let scopes = self.config.scopes.join(" ");
        Url::parse_with_params(&self.metadata.authorization_endpoint, &[
            ("client_id", self.config.client_id.as_str()),
            ("response_type", "code"),
            ("redirect_uri", self.config.redirect_url.as_str()),
            ("response_mode", "query"),
            ("scope", scopes.as_str()),
            ("state", state),
        ])
        .map_err(|e| ServerError::ConfigurationError(format!("Invalid authorization endpoint. {e}")))
    }

    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, ServerError> {
        let scopes = self.config.scopes.join(" ");
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_url.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.reveal().as_str()),
            ("scope", scopes.as_str()),
        ];
        let response = self
            .http
            .post(&self.metadata.token_endpoint)
            .form(&params)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                warn!("🔐️ Authorization code exchange failed. {e}");
                ServerError::UpstreamError("The login could not be completed.".into())
            })?;
        response.json::<TokenResponse>().await.map_err(|e| {
            warn!("🔐️ The token endpoint returned an unexpected response. {e}");
            ServerError::UpstreamError("The login could not be completed.".into())
        })
    }

    /// Fetches the signed-in user's profile, using their access token as a bearer credential.
    pub async fn fetch_profile(&self, profile_url: &str, access_token: &str) -> Result<UserProfile, ServerError> {
        let response = self
            .http
            .get(profile_url)
            .bearer_auth(access_token)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                warn!("🔐️ Profile request failed. {e}");
                ServerError::UpstreamError("The user profile could not be fetched.".into())
            })?;
        response.json::<UserProfile>().await.map_err(|e| {
            warn!("🔐️ The profile endpoint returned an unexpected response. {e}");
            ServerError::UpstreamError("The user profile could not be read.".into())
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, reqwest::Error> {
        self.http.get(url).send().await?.error_for_status()?.json::<T>().await
    }
}
