//! Request extractors that reject with [`AppError`].

use axum::extract::{FromRequest, FromRequestParts};
use axum::http::request::Parts;
use record_core::model::{Actor, Role, UserId};

use crate::error::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// The authenticated caller, as forwarded by the upstream identity layer.
///
/// `x-user-id` is required. `x-user-role` defaults to `student` when absent.
#[derive(Debug, Clone)]
pub struct Caller(pub Actor);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized(format!("missing {USER_ID_HEADER} header")))?;
        let user_id = UserId::new(raw_id)
            .map_err(|_| AppError::Unauthorized(format!("invalid {USER_ID_HEADER} header")))?;

        let role = match parts.headers.get(USER_ROLE_HEADER) {
            None => Role::Student,
            Some(value) => value
                .to_str()
                .ok()
                .and_then(|v| v.parse::<Role>().ok())
                .ok_or_else(|| {
                    AppError::Unauthorized(format!("invalid {USER_ROLE_HEADER} header"))
                })?,
        };

        Ok(Caller(Actor::new(user_id, role)))
    }
}

/// `axum::Json` with decoding failures reported as validation errors.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);
