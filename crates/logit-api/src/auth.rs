//! Principal extractor.
//!
//! The upstream auth middleware verifies the caller's token and forwards the
//! result as two headers: `x-user-id` (a UUID) and `x-user-roles` (a
//! comma-separated list of role names, possibly empty).

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, request::Parts},
};
use logit_core::auth::{Principal, Role};
use uuid::Uuid;

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const ROLES_HEADER: &str = "x-user-roles";

/// The authenticated caller. Present in a handler means the principal
/// headers were well-formed.
#[derive(Debug, Clone)]
pub struct Acting(pub Principal);

impl Acting {
  /// The caller, if they log records as a driver.
  pub fn driver(&self) -> Result<&Principal, ApiError> {
    if self.0.has_role(Role::Driver) {
      Ok(&self.0)
    } else {
      Err(ApiError::Forbidden("driver role required".into()))
    }
  }

  /// The caller, if they are a driver or hold an elevated role.
  pub fn driver_or_elevated(&self) -> Result<&Principal, ApiError> {
    if self.0.has_role(Role::Driver) || self.0.is_elevated() {
      Ok(&self.0)
    } else {
      Err(ApiError::Forbidden("driver or administrator role required".into()))
    }
  }
}

/// Read the forwarded principal from request headers. Unknown role names are
/// skipped.
pub fn principal_from_headers(headers: &HeaderMap) -> Result<Principal, ApiError> {
  let user_id = headers
    .get(USER_ID_HEADER)
    .ok_or_else(|| ApiError::Unauthenticated(format!("missing {USER_ID_HEADER} header")))?
    .to_str()
    .ok()
    .and_then(|v| Uuid::parse_str(v.trim()).ok())
    .ok_or_else(|| ApiError::Unauthenticated(format!("malformed {USER_ID_HEADER} header")))?;

  let roles = headers
    .get(ROLES_HEADER)
    .and_then(|v| v.to_str().ok())
    .unwrap_or_default()
    .split(',')
    .map(str::trim)
    .filter(|name| !name.is_empty())
    .filter_map(|name| match name.parse::<Role>() {
      Ok(role) => Some(role),
      Err(_) => {
        tracing::debug!(role = name, "ignoring unknown role");
        None
      }
    });

  Ok(Principal::new(user_id, roles))
}

impl<S> FromRequestParts<S> for Acting
where
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    principal_from_headers(&parts.headers).map(Acting)
  }
}
