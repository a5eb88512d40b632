//! # 用户管理路由控制器 (仅管理员)
//!
//! 提供用户的增删改查能力。
//! 对应的路由受 `auth_middleware` 和 `require_admin` 中间件验证保护。

use axum::Json;
use axum::extract::{Path, State};

use crate::error::ApiError;
use crate::middleware::auth::CurrentUser;
use crate::server::AppState;
use crate::types::{ApiResponse, CreateUserRequest, UpdateUserRequest, UserResponse};
use stockcast_core::store::port::{NewUser, UserRole, UserUpdate};

/// 列出全部用户
#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "用户管理 (Users)",
    security(("bearer_jwt" = [])),
    responses(
        (status = 200, description = "用户列表", body = ApiResponse<Vec<UserResponse>>),
        (status = 401, description = "未认证"),
        (status = 403, description = "无权限执行此操作")
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<UserResponse>>>, ApiError> {
    let users = state.user_store.list_users().await?;
    Ok(Json(ApiResponse::ok(
        users.iter().map(UserResponse::from).collect(),
    )))
}

/// 查询单个用户
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    tag = "用户管理 (Users)",
    security(("bearer_jwt" = [])),
    params(("id" = i64, Path, description = "用户主键")),
    responses(
        (status = 200, description = "用户信息", body = ApiResponse<UserResponse>),
        (status = 404, description = "用户不存在")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let user = state
        .user_store
        .get_user(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    Ok(Json(ApiResponse::ok(UserResponse::from(&user))))
}

/// 创建新用户
///
/// 只有 Admin 角色的用户可以调用此接口为他人创建账户，可直接指定角色。
#[utoipa::path(
    post,
    path = "/api/v1/users",
    tag = "用户管理 (Users)",
    security(("bearer_jwt" = [])),
    request_body = CreateUserRequest,
    responses(
        (status = 200, description = "用户创建成功", body = ApiResponse<UserResponse>),
        (status = 400, description = "无效的请求参数"),
        (status = 401, description = "未认证"),
        (status = 403, description = "无权限执行此操作")
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    tracing::info!("Received create_user request for username: {}", req.username);

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
        tracing::warn!("Username {} or email already exists!", req.username);
        return Err(ApiError::BadRequest(
            "Username or email already taken".into(),
        ));
    }

    // 2. 角色解析与密码安全哈希
    let role = req.role.parse::<UserRole>().map_err(ApiError::BadRequest)?;

    let hashed_pwd = bcrypt::hash(&req.password, bcrypt::DEFAULT_COST)
        .map_err(|_| ApiError::Internal("Failed to hash new user password".into()))?;

    // 3. 构造并保存
    let new_user = NewUser {
        username: req.username,
        email: req.email,
        password_hash: hashed_pwd,
        role,
    };
    let id = state.user_store.create_user(&new_user).await?;

    let user = state
        .user_store
        .get_user(id)
        .await?
        .ok_or_else(|| ApiError::Internal("User vanished after creation".into()))?;

    Ok(Json(ApiResponse::ok(UserResponse::from(&user))))
}

/// 更新用户信息
///
/// `password` 缺省时保留原密码；用户名/邮箱唯一性会排除被更新者自身。
#[utoipa::path(
    put,
    path = "/api/v1/users/{id}",
    tag = "用户管理 (Users)",
    security(("bearer_jwt" = [])),
    params(("id" = i64, Path, description = "用户主键")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "更新成功", body = ApiResponse<UserResponse>),
        (status = 400, description = "用户名/邮箱已被其他账户占用"),
        (status = 404, description = "用户不存在")
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    // 1. 目标必须存在
    state
        .user_store
        .get_user(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    // 2. 唯一性检查 (排除自身)
    let taken = state
        .user_store
        .username_or_email_taken(&req.username, &req.email, Some(id))
        .await?;
    if taken {
        return Err(ApiError::BadRequest(
            "Username or email already taken".into(),
        ));
    }

    let role = req.role.parse::<UserRole>().map_err(ApiError::BadRequest)?;

    // 3. 仅在提供了新密码时重新哈希
    let password_hash = match &req.password {
        Some(pwd) => Some(
            bcrypt::hash(pwd, bcrypt::DEFAULT_COST)
                .map_err(|_| ApiError::Internal("Failed to hash new password".into()))?,
        ),
        None => None,
    };

    let update = UserUpdate {
        username: req.username,
        email: req.email,
        password_hash,
        role,
    };
    state.user_store.update_user(id, &update).await?;

    let user = state
        .user_store
        .get_user(id)
        .await?
        .ok_or_else(|| ApiError::Internal("User vanished after update".into()))?;

    Ok(Json(ApiResponse::ok(UserResponse::from(&user))))
}

/// 删除用户
///
/// 不允许删除当前会话绑定的账户自身。
#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    tag = "用户管理 (Users)",
    security(("bearer_jwt" = [])),
    params(("id" = i64, Path, description = "用户主键")),
    responses(
        (status = 200, description = "删除成功", body = ApiResponse<String>),
        (status = 400, description = "不能删除当前会话绑定的账户"),
        (status = 404, description = "用户不存在")
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    // 禁止自删：会话主体与删除目标一致时拒绝
    if claims.sub == id.to_string() {
        return Err(ApiError::BadRequest(
            "Cannot delete the account bound to the active session".into(),
        ));
    }

    state
        .user_store
        .get_user(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    state.user_store.delete_user(id).await?;

    Ok(Json(ApiResponse::ok("User deleted".to_string())))
}
