//! # 鉴权中间件
//!
//! 访问网关的两级拦截：先验证 JWT 身份 (`auth_middleware`)，
//! 再按角色授权 (`require_admin`)。授权级依赖认证级写入的 Claims，
//! 因此 `require_admin` 必须挂载在 `auth_middleware` 之后。

use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;

use crate::error::ApiError;
use crate::server::AppState;
use crate::token::{TokenError, verify_jwt};
use crate::types::Claims;
use stockcast_core::store::port::UserRole;

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            TokenError::InvalidSignature => {
                ApiError::Unauthorized("Invalid token".to_string())
            }
            TokenError::Signing => ApiError::Internal("Failed to sign token".to_string()),
        }
    }
}

/// 提取并验证 Authorization: Bearer <token>
///
/// 验证通过后将 Claims 注入 request extensions，供下游 handler 与
/// `require_admin` 读取。验证是纯计算，不访问存储，认证失败立即终止请求。
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req.headers().get(axum::http::header::AUTHORIZATION);

    let token = match auth_header {
        Some(header_val) => {
            let s = header_val
                .to_str()
                .map_err(|_| ApiError::Unauthorized("Invalid auth header".into()))?;
            if !s.starts_with("Bearer ") {
                tracing::warn!("Invalid Bearer format: {}", s);
                return Err(ApiError::Unauthorized("Invalid Bearer format".into()));
            }
            s[7..].to_string()
        }
        None => {
            tracing::warn!("Missing Authorization header");
            return Err(ApiError::Unauthorized("Missing Authorization header".into()));
        }
    };

    let claims = match verify_jwt(&state.app_config.server.jwt_secret, &token) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("JWT verification failed: {:?}", e);
            return Err(e.into());
        }
    };

    // 将 Claims 注入 request extensions
    // 以便 downstream handlers 用 `CurrentUser` 提取
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Admin 级别权限校验中间件
/// 必须在 `auth_middleware` 之后应用！
pub async fn require_admin(req: Request, next: Next) -> Result<Response, ApiError> {
    let claims = req
        .extensions()
        .get::<Claims>()
        .ok_or_else(|| ApiError::Unauthorized("User context not found".into()))?;

    if claims.role != UserRole::Admin.to_string() {
        return Err(ApiError::Forbidden("Admin privileges required".into()));
    }

    Ok(next.run(req).await)
}

// 在提取器中获取当前请求 Claims 的快捷方式
pub struct CurrentUser(pub Claims);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claims = parts
            .extensions
            .get::<Claims>()
            .cloned()
            .ok_or_else(|| ApiError::Unauthorized("Missing user context".into()))?;
        Ok(CurrentUser(claims))
    }
}
