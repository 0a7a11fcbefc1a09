/// Session Middleware
///
/// Resolves the session token of every request and injects the verified
/// `Identity` into request extensions. Requests without a valid session
/// pass through untouched; handlers that need an identity ask for one.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use std::sync::Arc;

use crate::auth::SessionResolver;

pub struct SessionMiddleware {
    resolver: Arc<SessionResolver>,
}

impl SessionMiddleware {
    pub fn new(resolver: Arc<SessionResolver>) -> Self {
        Self { resolver }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SessionMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = SessionMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(SessionMiddlewareService {
            service: Rc::new(service),
            resolver: Arc::clone(&self.resolver),
        }))
    }
}

pub struct SessionMiddlewareService<S> {
    service: Rc<S>,
    resolver: Arc<SessionResolver>,
}

impl<S, B> Service<ServiceRequest> for SessionMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let authorization = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        let identity = self.resolver.resolve_session(authorization, |name| {
            req.cookie(name).map(|c| c.value().to_string())
        });

        if let Some(identity) = identity {
            tracing::debug!(
                user_id = %identity.user_id,
                path = %req.path(),
                "Request authenticated"
            );
            req.extensions_mut().insert(identity);
        }

        let service = self.service.clone();
        Box::pin(async move { service.call(req).await })
    }
}
