//! Authentication middleware.
//!
//! Extracts the identity token from the request, verifies it with the [`TokenVerifier`] registered as app data and
//! attaches the resulting [`JwtClaims`] to the request extensions. Requests without a usable credential are rejected
//! with 401 before they reach the handler.
use std::{future::Future, pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web,
    Error,
    HttpMessage,
    HttpRequest,
};
use futures::future::{ok, Ready};
use log::*;

use crate::{
    auth::{extract_credential, JwtClaims, TokenVerifier},
    config::ServerOptions,
    errors::ServerError,
};

#[derive(Default)]
pub struct AuthenticationFactory;

impl AuthenticationFactory {
    pub fn new() -> Self {
        Self
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthenticationFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthenticationService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthenticationService { service: Rc::new(service) })
    }
}

pub struct AuthenticationService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AuthenticationService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        Box::pin(async move {
            if !req.extensions().contains::<JwtClaims>() {
                let claims = authenticate(req.request())?;
                req.extensions_mut().insert(claims);
            }
            service.call(req).await
        })
    }
}

fn authenticate(req: &HttpRequest) -> Result<JwtClaims, ServerError> {
    let verifier = req.app_data::<web::Data<TokenVerifier>>().ok_or_else(|| {
        error!("🔐️ No token verifier has been registered with the app");
        ServerError::InitializeError("Token verification is not available.".into())
    })?;
    let source = req.app_data::<web::Data<ServerOptions>>().map(|o| o.credential_source).unwrap_or_default();
    let token = extract_credential(req, source).map_err(|e| {
        debug!("🔐️ No credential on {} {}", req.method(), req.path());
        e
    })?;
    let claims = verifier.verify(&token)?;
    trace!("🔐️ {} authenticated for {} {}", claims.subject(), req.method(), req.path());
    Ok(claims)
}
