//! Login session plumbing: the authorization code flow with the identity provider, and the cookies that carry its
//! result.
//!
//! The id token from the login is stored in an HttpOnly cookie, which the authentication middleware accepts as a
//! credential. The access token is kept alongside it for calls to the provider's profile endpoint.
use actix_web::{
    cookie::{time::Duration, Cookie, SameSite},
    get,
    http::header,
    web,
    HttpRequest,
    HttpResponse,
};
use log::*;
use rand::{distributions::Alphanumeric, Rng};

use crate::{
    auth::{ACCESS_TOKEN_COOKIE, ID_TOKEN_COOKIE},
    config::ServerOptions,
    data_objects::RedirectParams,
    errors::ServerError,
    oidc::OidcClient,
};

pub const STATE_COOKIE: &str = "oauth_state";
const STATE_LIFETIME_MINUTES: i64 = 10;

#[get("/login")]
pub async fn login(
    oidc: web::Data<OidcClient>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    let state = new_state();
    let url = oidc.authorization_url(&state)?;
    let mut state_cookie = session_cookie(STATE_COOKIE, state, &options);
    state_cookie.set_max_age(Duration::minutes(STATE_LIFETIME_MINUTES));
    trace!("💻️ Redirecting to the identity provider for login");
    Ok(HttpResponse::Found().insert_header((header::LOCATION, url.as_str())).cookie(state_cookie).finish())
}

/// The identity provider sends the browser here after login, with an authorization code and the `state` value that
/// `/login` issued.
#[get("/redirect")]
pub async fn redirect(
    req: HttpRequest,
    query: web::Query<RedirectParams>,
    oidc: web::Data<OidcClient>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    let params = query.into_inner();
    if let Some(error) = params.error {
        let description = params.error_description.unwrap_or_default();
        warn!("💻️ The identity provider refused the login. {error}: {description}");
        return Err(ServerError::InvalidRequest(format!("The login was refused. {error}")));
    }
    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ServerError::InvalidRequest("The authorization code is missing.".into()))?;
    let expected = req.cookie(STATE_COOKIE).map(|c| c.value().to_string());
    match (params.state, expected) {
        (Some(state), Some(expected)) if !state.is_empty() && state == expected => {},
        _ => {
            debug!("💻️ Login state did not match the state cookie");
            return Err(ServerError::InvalidRequest("The login state does not match. Please log in again.".into()));
        },
    }
    let tokens = oidc.exchange_code(&code).await?;
    debug!("💻️ Login completed. Redirecting to {}", oidc.config().frontend_url);
    let mut response = HttpResponse::Found();
    response.insert_header((header::LOCATION, oidc.config().frontend_url.as_str()));
    response.cookie(session_cookie(ID_TOKEN_COOKIE, tokens.id_token, &options));
    if let Some(access_token) = tokens.access_token {
        response.cookie(session_cookie(ACCESS_TOKEN_COOKIE, access_token, &options));
    }
    response.cookie(removal_cookie(STATE_COOKIE, &options));
    Ok(response.finish())
}

#[get("/logout")]
pub async fn logout(options: web::Data<ServerOptions>) -> HttpResponse {
    trace!("💻️ Clearing session cookies");
    HttpResponse::NoContent()
        .cookie(removal_cookie(ID_TOKEN_COOKIE, &options))
        .cookie(removal_cookie(ACCESS_TOKEN_COOKIE, &options))
        .finish()
}

fn new_state() -> String {
    rand::thread_rng().sample_iter(&Alphanumeric).take(32).map(char::from).collect()
}

/// Session cookies are HttpOnly. Cross-site deployments need `secure_cookies`, which adds `Secure` and `SameSite=None`.
fn session_cookie(name: &'static str, value: String, options: &ServerOptions) -> Cookie<'static> {
    let builder = Cookie::build(name, value).path("/").http_only(true);
    if options.secure_cookies {
        builder.secure(true).same_site(SameSite::None).finish()
    } else {
        builder.same_site(SameSite::Lax).finish()
    }
}

fn removal_cookie(name: &'static str, options: &ServerOptions) -> Cookie<'static> {
    let mut cookie = session_cookie(name, String::new(), options);
    cookie.make_removal();
    cookie
}
