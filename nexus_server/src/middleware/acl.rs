//! Access control list middleware for the Nexus server.
//! This middleware can be placed on any route or service, inside an [`AuthenticationFactory`](super::AuthenticationFactory).
//!
//! It reads the claims that the authentication middleware attached to the request and checks them against the roles
//! required for the route. If the user holds every required role, the request continues. Otherwise, a 403 Forbidden
//! response is returned.

use std::{future::Future, pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
    HttpMessage,
};
use futures::future::{ok, Ready};
use log::*;
use nexus_engine::db_types::Role;

use crate::{
    auth::JwtClaims,
    errors::{AuthError, ServerError},
};

pub struct AclMiddlewareFactory {
    required_roles: Vec<Role>,
}

impl AclMiddlewareFactory {
    pub fn new(required_roles: &[Role]) -> Self {
        AclMiddlewareFactory { required_roles: required_roles.to_vec() }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AclMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AclMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AclMiddlewareService { required_roles: self.required_roles.clone(), service: Rc::new(service) })
    }
}

pub struct AclMiddlewareService<S> {
    required_roles: Vec<Role>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AclMiddlewareService<S>
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
        let required_roles = self.required_roles.clone();
        Box::pin(async move {
            let allowed = match req.extensions().get::<JwtClaims>() {
                Some(claims) => {
                    let allowed = claims.has_roles(&required_roles);
                    if !allowed {
                        debug!("🔐️ {} lacks one of {:?} for {}", claims.subject(), required_roles, req.path());
                    }
                    allowed
                },
                None => {
                    warn!("🔐️ No identity claims found on {}. Is the authentication middleware missing?", req.path());
                    return Err(ServerError::AuthenticationError(AuthError::NoCredential).into());
                },
            };
            if allowed {
                service.call(req).await
            } else {
                let roles = required_roles.iter().map(|r| r.as_str()).collect::<Vec<_>>().join(", ");
                let err = AuthError::InsufficientPermissions(format!("This action requires the role(s): {roles}."));
                Err(ServerError::AuthenticationError(err).into())
            }
        })
    }
}
