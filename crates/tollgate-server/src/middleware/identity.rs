// Identity middleware for Actix-web
// The auth proxy in front of the server authenticates users and forwards the
// user name in a header; this middleware copies it into the request extensions.

use actix_service::forward_ready;
use actix_utils::future::{Ready, ok};
use actix_web::{
    Error, HttpMessage, HttpRequest,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    web::Data,
};
use futures::future::LocalBoxFuture;

use crate::model::{AppState, config::DEFAULT_USER_HEADER};

/// User acting on the request, as forwarded by the auth proxy
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reviewer(pub String);

/// Identity middleware transformer
pub struct Identity;

impl<S, B> Transform<S, ServiceRequest> for Identity
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = IdentityMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(IdentityMiddleware { service })
    }
}

pub struct IdentityMiddleware<S> {
    service: S,
}

fn extract_user(req: &ServiceRequest) -> Option<String> {
    let header = req
        .app_data::<Data<AppState>>()
        .map(|state| state.configuration.user_header())
        .unwrap_or_else(|| DEFAULT_USER_HEADER.to_string());

    req.headers()
        .get(header.as_str())
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|user| !user.is_empty())
        .map(str::to_string)
}

impl<S, B> Service<ServiceRequest> for IdentityMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if let Some(user) = extract_user(&req) {
            req.extensions_mut().insert(Reviewer(user));
        }

        let res = self.service.call(req);

        Box::pin(res)
    }
}

/// Helper trait to read the forwarded user from a request
pub trait ReviewerExt {
    /// The forwarded user, empty when the header was absent
    fn reviewer(&self) -> String;
}

impl ReviewerExt for HttpRequest {
    fn reviewer(&self) -> String {
        self.extensions()
            .get::<Reviewer>()
            .map(|reviewer| reviewer.0.clone())
            .unwrap_or_default()
    }
}
