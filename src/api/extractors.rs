//! Custom Axum extractors: caller identity, client metadata, and request
//! inputs whose rejections use the JSON error body.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use axum::Json;
use axum::extract::{ConnectInfo, FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::header::{AUTHORIZATION, USER_AGENT};
use axum::http::request::Parts;
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::app_state::AppState;
use crate::domain::{ClientInfo, UserId};
use crate::error::ServiceError;

/// Forwarded-for header consulted before the socket peer address.
const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Returns the bearer token, `None` when no `Authorization` header is sent.
fn bearer_token(parts: &Parts) -> Result<Option<&str>, ServiceError> {
    let Some(value) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| ServiceError::Unauthorized("invalid Authorization header".to_string()))?;
    value
        .strip_prefix("Bearer ")
        .map(|token| Some(token.trim()))
        .ok_or_else(|| ServiceError::Unauthorized("invalid Authorization header format".to_string()))
}

/// Optional caller identity. Anonymous when no credentials are sent; a
/// present but invalid token is still rejected.
#[derive(Debug, Clone, Copy)]
pub struct Viewer(pub Option<UserId>);

impl FromRequestParts<AppState> for Viewer {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match bearer_token(parts)? {
            Some(token) => Ok(Self(Some(state.user_service.authenticate(token).await?))),
            None => Ok(Self(None)),
        }
    }
}

/// Required caller identity.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub UserId);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?.ok_or_else(|| {
            ServiceError::Unauthorized("Authentication credentials were not provided.".to_string())
        })?;
        Ok(Self(state.user_service.authenticate(token).await?))
    }
}

/// Requester address and user agent, for the access log.
#[derive(Debug, Clone)]
pub struct Client(pub ClientInfo);

/// First parseable address of an `X-Forwarded-For` list.
fn forwarded_ip(parts: &Parts) -> Option<IpAddr> {
    parts
        .headers
        .get(X_FORWARDED_FOR)?
        .to_str()
        .ok()?
        .split(',')
        .next()?
        .trim()
        .parse()
        .ok()
}

impl<S: Send + Sync> FromRequestParts<S> for Client {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ip_address = forwarded_ip(parts)
            .or_else(|| {
                parts
                    .extensions
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip())
            })
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        let user_agent = parts
            .headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        Ok(Self(ClientInfo {
            ip_address,
            user_agent,
        }))
    }
}

/// JSON body that must deserialize and pass its `validator` rules.
/// Either failure is a 400 with the structured error body.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ServiceError::InvalidRequest(rejection.body_text()))?;
        value.validate()?;
        Ok(Self(value))
    }
}

/// Query string deserialized into `T`; a malformed value is a 400 with
/// the structured error body.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryParams<T>(pub T);

impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ServiceError::InvalidRequest(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// Path parameters deserialized into `T`, e.g. a snippet UUID; a
/// malformed segment is a 400 with the structured error body.
#[derive(Debug, Clone, Copy)]
pub struct PathParam<T>(pub T);

impl<S, T> FromRequestParts<S> for PathParam<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ServiceError::InvalidRequest(rejection.body_text()))?;
        Ok(Self(value))
    }
}
