//! # 身份验证路由控制器
//!
//! 实现注册、登录与当前用户查询等鉴权相关接口。

use axum::Json;
use axum::extract::State;

use crate::error::ApiError;
use crate::middleware::auth::CurrentUser;
use crate::server::AppState;
use crate::token::{TOKEN_VALIDITY_SECS, issue_jwt};
use crate::types::{ApiResponse, LoginRequest, LoginResponse, RegisterRequest, UserResponse};
use stockcast_core::store::port::{NewUser, UserRole};

/// 用户注册
///
/// 公开接口，新用户默认角色为 user。用户名与邮箱必须全局唯一。
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "鉴权 (Auth)",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "注册成功", body = ApiResponse<UserResponse>),
        (status = 400, description = "参数缺失或用户名/邮箱已被占用")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    if req.username.is_empty() || req.email.is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest(
            "username, email and password are required".into(),
        ));
    }

    // 1. 唯一性检查
    let taken = state
        .user_store
        .username_or_email_taken(&req.username, &req.email, None)
        .await?;
    if taken {
        return Err(ApiError::BadRequest(
            "Username or email already taken".into(),
        ));
    }

    // 2. 密码安全哈希
    let hashed = bcrypt::hash(&req.password, bcrypt::DEFAULT_COST)
        .map_err(|_| ApiError::Internal("Failed to hash password".into()))?;

    // 3. 创建用户 (默认角色 user)
    let new_user = NewUser {
        username: req.username,
        email: req.email,
        password_hash: hashed,
        role: UserRole::User,
    };
    let id = state.user_store.create_user(&new_user).await?;

    let user = state
        .user_store
        .get_user(id)
        .await?
        .ok_or_else(|| ApiError::Internal("User vanished after creation".into()))?;

    Ok(Json(ApiResponse::ok(UserResponse::from(&user))))
}

/// 用户登录
///
/// 验证用户名和密码，颁发 JWT Token (24 小时有效)。
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "鉴权 (Auth)",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "登录成功", body = ApiResponse<LoginResponse>),
        (status = 401, description = "用户名或密码错误")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    // 1. 获取用户
    let user = state.user_store.get_user_by_username(&req.username).await?;

    let user = match user {
        Some(u) => u,
        None => {
            return Err(ApiError::Unauthorized(
                "Invalid username or password".into(),
            ));
        }
    };

    // 2. 验证密码
    let valid = bcrypt::verify(&req.password, &user.password_hash).unwrap_or(false);

    if !valid {
        return Err(ApiError::Unauthorized(
            "Invalid username or password".into(),
        ));
    }

    // 3. 生成 JWT
    let token = issue_jwt(&state.app_config.server.jwt_secret, &user)?;

    Ok(Json(ApiResponse::ok(LoginResponse {
        token,
        expires_in: TOKEN_VALIDITY_SECS,
    })))
}

/// 查询当前登录用户
///
/// 根据令牌 Claims 回查用户信息。
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "鉴权 (Auth)",
    security(("bearer_jwt" = [])),
    responses(
        (status = 200, description = "当前用户信息", body = ApiResponse<UserResponse>),
        (status = 401, description = "未认证"),
        (status = 404, description = "账户已不存在")
    )
)]
pub async fn me(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let id: i64 = claims
        .sub
        .parse()
        .map_err(|_| ApiError::Unauthorized("Malformed subject claim".into()))?;

    let user = state
        .user_store
        .get_user(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    Ok(Json(ApiResponse::ok(UserResponse::from(&user))))
}
