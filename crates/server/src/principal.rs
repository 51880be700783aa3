//! Caller identity from forwarded auth headers.
//!
//! The API sits behind an auth proxy that verifies the session and forwards
//! the caller as `x-user-id` / `x-user-role` headers. The extractor turns
//! that pair into a [`Principal`]; nothing downstream reads identity from
//! anywhere else. Missing or malformed headers are a 401, a principal whose
//! role may not use an endpoint is a 403 from [`require_role`].

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::Json;
use claimflow_core::domain::principal::{Principal, Role};

use crate::api::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Rejects the request with 401 unless both identity headers are present
/// and the role is one the workflow knows.
pub struct RequirePrincipal(pub Principal);

impl<S> FromRequestParts<S> for RequirePrincipal
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ApiError>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header_value(parts, USER_ID_HEADER)?;
        let role_value = header_value(parts, USER_ROLE_HEADER)?;
        let role = Role::parse(&role_value)
            .ok_or_else(|| unauthorized(format!("unknown role `{role_value}`")))?;

        Ok(Self(Principal::new(user_id, role)))
    }
}

fn header_value(parts: &Parts, name: &str) -> Result<String, (StatusCode, Json<ApiError>)> {
    let value = parts
        .headers
        .get(name)
        .ok_or_else(|| unauthorized(format!("missing `{name}` header")))?
        .to_str()
        .map_err(|_| unauthorized(format!("`{name}` header is not valid UTF-8")))?
        .trim();

    if value.is_empty() {
        return Err(unauthorized(format!("missing `{name}` header")));
    }
    Ok(value.to_string())
}

/// 403 unless the principal holds exactly the given role.
pub fn require_role(
    principal: &Principal,
    role: Role,
) -> Result<(), (StatusCode, Json<ApiError>)> {
    if principal.role == role {
        Ok(())
    } else {
        Err(forbidden(format!("role `{}` may not use this endpoint", principal.role.as_str())))
    }
}

pub fn forbidden(message: String) -> (StatusCode, Json<ApiError>) {
    (StatusCode::FORBIDDEN, Json(ApiError { kind: "forbidden".to_string(), message }))
}

fn unauthorized(message: String) -> (StatusCode, Json<ApiError>) {
    (StatusCode::UNAUTHORIZED, Json(ApiError { kind: "unauthorized".to_string(), message }))
}
