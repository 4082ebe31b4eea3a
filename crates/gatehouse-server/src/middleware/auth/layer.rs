//! Authentication middleware layer.
//!
//! A valid token puts an [`AuthUser`] into the request extensions. Requests
//! without a token pass through anonymously and are rejected by the
//! extractors of routes that need an identity. A token that is present but
//! invalid or expired is rejected here.

use super::{jwt::decode_token, types::AuthUser};
use crate::error::ApiError;
use axum::{
    body::Body,
    http::{header, Request},
    response::{IntoResponse, Response},
};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::debug;

/// Cookie carrying the token when no `Authorization` header is sent.
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Authentication layer configuration.
#[derive(Clone)]
pub struct AuthLayer {
    jwt_secret: Arc<String>,
}

impl AuthLayer {
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: Arc::new(jwt_secret.into()),
        }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthMiddleware {
            inner,
            jwt_secret: self.jwt_secret.clone(),
        }
    }
}

/// Authentication middleware service.
#[derive(Clone)]
pub struct AuthMiddleware<S> {
    inner: S,
    jwt_secret: Arc<String>,
}

impl<S> Service<Request<Body>> for AuthMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let jwt_secret = self.jwt_secret.clone();
        // Take the instance that was polled ready, leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            match extract_token(&req) {
                Ok(Some(token)) => match decode_token(&token, &jwt_secret) {
                    Ok(claims) if claims.is_expired() => {
                        return Ok(ApiError::TokenExpired.into_response());
                    }
                    Ok(claims) => {
                        req.extensions_mut().insert(AuthUser::from_claims(claims));
                    }
                    Err(err) => {
                        debug!(error = %err, "Rejected bearer token");
                        return Ok(ApiError::from(err).into_response());
                    }
                },
                Ok(None) => {}
                Err(err) => return Ok(err.into_response()),
            }

            inner.call(req).await
        })
    }
}

fn extract_token(req: &Request<Body>) -> Result<Option<String>, ApiError> {
    if let Some(auth_header) = req.headers().get(header::AUTHORIZATION) {
        let auth_str = auth_header.to_str().map_err(|_| ApiError::InvalidToken)?;

        return match auth_str.strip_prefix("Bearer ") {
            Some(token) if !token.trim().is_empty() => Ok(Some(token.trim().to_string())),
            _ => Err(ApiError::InvalidToken),
        };
    }

    if let Some(cookie_header) = req.headers().get(header::COOKIE) {
        let cookie_str = cookie_header.to_str().map_err(|_| ApiError::InvalidToken)?;

        for cookie in cookie_str.split(';') {
            if let Some((name, value)) = cookie.trim().split_once('=') {
                if name == ACCESS_TOKEN_COOKIE && !value.is_empty() {
                    return Ok(Some(value.to_string()));
                }
            }
        }
    }

    Ok(None)
}
