//! Identity token verification.
//!
//! The identity provider signs OpenID Connect ID tokens with one of the keys it publishes in its JWK set. The
//! [`TokenVerifier`] holds those keys (as a [`VerificationKeys`] collection) together with the expected issuer and
//! audience, and turns a raw token into a set of [`JwtClaims`], or an [`AuthError::InvalidToken`].
//!
//! The key material is fetched once at startup and never changes afterwards. Tests construct a verifier from a shared
//! secret instead.
use std::future::{ready, Ready};

use actix_web::{dev::Payload, http::header, FromRequest, HttpMessage, HttpRequest};
use jsonwebtoken::{
    decode,
    decode_header,
    errors::ErrorKind,
    jwk::{AlgorithmParameters, Jwk, JwkSet},
    Algorithm,
    DecodingKey,
    Validation,
};
use log::*;
use nexus_engine::db_types::Role;
use serde::{Deserialize, Serialize};

use crate::{
    config::CredentialSource,
    errors::{AuthError, ServerError},
};

pub const ID_TOKEN_COOKIE: &str = "id_token";
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

//--------------------------------------      JwtClaims      ---------------------------------------------------------
/// The claims of a verified identity token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    #[serde(default)]
    pub sub: String,
    /// Azure AD's immutable object id for the user. Preferred over `sub` when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oid: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub iss: String,
    pub aud: Audience,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

/// The `aud` claim may be a single string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Many(Vec<String>),
}

impl JwtClaims {
    /// The stable identifier for the user: `oid` if the provider supplied one, otherwise `sub`.
    pub fn subject(&self) -> &str {
        match &self.oid {
            Some(oid) if !oid.is_empty() => oid.as_str(),
            _ => self.sub.as_str(),
        }
    }

    /// Role names are matched without regard to case, since providers differ on capitalisation.
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role.as_str()))
    }

    pub fn has_roles(&self, roles: &[Role]) -> bool {
        roles.iter().all(|r| self.has_role(*r))
    }
}

/// Handlers take `JwtClaims` as an argument to receive the identity established by the authentication middleware.
/// Routes without that middleware will always fail to extract it.
impl FromRequest for JwtClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let claims = req.extensions().get::<JwtClaims>().cloned();
        ready(claims.ok_or(ServerError::AuthenticationError(AuthError::NoCredential)))
    }
}

//--------------------------------------   Verification keys   -------------------------------------------------------
/// The group of signing algorithms that a key can verify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFamily {
    Hmac,
    Rsa,
    EllipticCurve,
    Ed,
}

impl KeyFamily {
    fn of(params: &AlgorithmParameters) -> Self {
        match params {
            AlgorithmParameters::OctetKey(_) => Self::Hmac,
            AlgorithmParameters::RSA(_) => Self::Rsa,
            AlgorithmParameters::EllipticCurve(_) => Self::EllipticCurve,
            AlgorithmParameters::OctetKeyPair(_) => Self::Ed,
        }
    }

    pub fn allows(&self, alg: Algorithm) -> bool {
        use Algorithm::*;
        matches!(
            (self, alg),
            (Self::Hmac, HS256 | HS384 | HS512) |
                (Self::Rsa, RS256 | RS384 | RS512 | PS256 | PS384 | PS512) |
                (Self::EllipticCurve, ES256 | ES384) |
                (Self::Ed, EdDSA)
        )
    }
}

#[derive(Clone)]
pub struct VerificationKey {
    kid: Option<String>,
    family: KeyFamily,
    key: DecodingKey,
}

impl VerificationKey {
    pub fn from_jwk(jwk: &Jwk) -> Result<Self, jsonwebtoken::errors::Error> {
        let key = DecodingKey::from_jwk(jwk)?;
        Ok(Self { kid: jwk.common.key_id.clone(), family: KeyFamily::of(&jwk.algorithm), key })
    }

    pub fn hmac(kid: Option<String>, secret: &[u8]) -> Self {
        Self { kid, family: KeyFamily::Hmac, key: DecodingKey::from_secret(secret) }
    }

    pub fn kid(&self) -> Option<&str> {
        self.kid.as_deref()
    }

    pub fn family(&self) -> KeyFamily {
        self.family
    }
}

/// The set of keys that identity tokens may be signed with.
#[derive(Clone, Default)]
pub struct VerificationKeys {
    keys: Vec<VerificationKey>,
}

impl VerificationKeys {
    /// Builds the key set from a provider's published JWK set. Keys that cannot be used for verification are skipped.
    pub fn from_jwk_set(set: &JwkSet) -> Result<Self, ServerError> {
        let keys = set
            .keys
            .iter()
            .filter_map(|jwk| {
                VerificationKey::from_jwk(jwk)
                    .map_err(|e| warn!("🔐️ Ignoring unusable key {:?}. {e}", jwk.common.key_id))
                    .ok()
            })
            .collect::<Vec<_>>();
        if keys.is_empty() {
            return Err(ServerError::InitializeError("The identity provider did not publish any usable keys".into()));
        }
        info!("🔐️ Loaded {} token verification keys", keys.len());
        Ok(Self { keys })
    }

    /// A single HMAC key with no key id.
    pub fn from_secret(secret: &[u8]) -> Self {
        Self::single(VerificationKey::hmac(None, secret))
    }

    pub fn single(key: VerificationKey) -> Self {
        Self { keys: vec![key] }
    }

    pub fn with_key(mut self, key: VerificationKey) -> Self {
        self.keys.push(key);
        self
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Picks the key for a token. A `kid` must match exactly, unless the set holds one key that has no id of its own.
    /// Tokens without a `kid` can only be checked against a single-key set.
    fn select(&self, kid: Option<&str>) -> Option<&VerificationKey> {
        let only_key = if self.keys.len() == 1 { self.keys.first() } else { None };
        match kid {
            Some(kid) => self.keys.iter().find(|k| k.kid() == Some(kid)).or(only_key.filter(|k| k.kid.is_none())),
            None => only_key,
        }
    }
}

//--------------------------------------    TokenVerifier     ---------------------------------------------------------
pub struct TokenVerifier {
    keys: VerificationKeys,
    issuer: String,
    audience: String,
    leeway: u64,
}

impl TokenVerifier {
    pub fn new<S: Into<String>>(keys: VerificationKeys, issuer: S, audience: S) -> Self {
        Self { keys, issuer: issuer.into(), audience: audience.into(), leeway: 60 }
    }

    /// Clock skew, in seconds, tolerated on the `exp` and `nbf` claims.
    pub fn with_leeway(mut self, leeway: u64) -> Self {
        self.leeway = leeway;
        self
    }

    /// Verifies a raw identity token and returns its claims.
    ///
    /// The token must decode, carry a valid signature from a known key of the right family, name the configured
    /// issuer and audience, and be within its validity window. Every failure is reported as
    /// [`AuthError::InvalidToken`].
    pub fn verify(&self, raw_token: &str) -> Result<JwtClaims, AuthError> {
        let header = decode_header(raw_token).map_err(|e| AuthError::InvalidToken(format!("Malformed token. {e}")))?;
        let key = self
            .keys
            .select(header.kid.as_deref())
            .ok_or_else(|| AuthError::InvalidToken("The token was not signed by a known key".into()))?;
        if !key.family.allows(header.alg) {
            return Err(AuthError::InvalidToken(format!("{:?} is not a valid algorithm for the signing key", header.alg)));
        }
        let mut validation = Validation::new(header.alg);
        validation.leeway = self.leeway;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        let data = decode::<JwtClaims>(raw_token, &key.key, &validation).map_err(|e| {
            let reason = describe_error(e.kind());
            debug!("🔐️ Token rejected. {reason}");
            AuthError::InvalidToken(reason)
        })?;
        let claims = data.claims;
        if claims.subject().is_empty() {
            return Err(AuthError::InvalidToken("The token does not identify a user".into()));
        }
        trace!("🔐️ Token verified for {}", claims.subject());
        Ok(claims)
    }
}

fn describe_error(kind: &ErrorKind) -> String {
    match kind {
        ErrorKind::ExpiredSignature => "The token has expired".into(),
        ErrorKind::ImmatureSignature => "The token is not valid yet".into(),
        ErrorKind::InvalidSignature => "The token signature is invalid".into(),
        ErrorKind::InvalidIssuer => "The token was issued by an unexpected issuer".into(),
        ErrorKind::InvalidAudience => "The token was issued for a different audience".into(),
        ErrorKind::InvalidAlgorithm => "The token algorithm does not match the signing key".into(),
        ErrorKind::MissingRequiredClaim(c) => format!("The token is missing the '{c}' claim"),
        other => format!("The token could not be read. {other:?}"),
    }
}

//--------------------------------------  Credential extraction  -----------------------------------------------------
/// Pulls the raw identity token out of a request, looking in the places allowed by `source`.
///
/// An `Authorization` header must use the `Bearer` scheme with a non-empty token. When `source` is `Any` and the
/// header is present, the header is used even if it is malformed.
pub fn extract_credential(req: &HttpRequest, source: CredentialSource) -> Result<String, AuthError> {
    match source {
        CredentialSource::Header => bearer_token(req).unwrap_or(Err(AuthError::NoCredential)),
        CredentialSource::Cookie => cookie_token(req).ok_or(AuthError::NoCredential),
        CredentialSource::Any => match bearer_token(req) {
            Some(result) => result,
            None => cookie_token(req).ok_or(AuthError::NoCredential),
        },
    }
}

fn bearer_token(req: &HttpRequest) -> Option<Result<String, AuthError>> {
    let value = req.headers().get(header::AUTHORIZATION)?;
    Some(parse_bearer(value.to_str().unwrap_or_default()))
}

fn parse_bearer(value: &str) -> Result<String, AuthError> {
    let (scheme, token) = value.trim().split_once(' ').ok_or(AuthError::NoCredential)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::NoCredential);
    }
    Ok(token.to_string())
}

fn cookie_token(req: &HttpRequest) -> Option<String> {
    req.cookie(ID_TOKEN_COOKIE).map(|c| c.value().to_string()).filter(|v| !v.is_empty())
}
