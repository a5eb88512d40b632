//! # API 统一错误处理
//!
//! 将下层各 crate 的错误类型统一映射到 HTTP 状态码与 JSON 响应体。

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::types::ApiErrorResponse;
use stockcast_core::predict::error::PredictError;
use stockcast_core::store::error::StoreError;

/// API 层统一错误枚举
#[derive(Error, Debug)]
pub enum ApiError {
    /// 认证失败 (401)
    #[error("认证失败: {0}")]
    Unauthorized(String),

    /// 权限不足 (403)
    #[error("权限不足: {0}")]
    Forbidden(String),

    /// 资源未找到 (404)
    #[error("资源未找到: {0}")]
    NotFound(String),

    /// 请求参数错误 (400)
    #[error("请求参数错误: {0}")]
    BadRequest(String),

    /// 预测程序以非零状态退出 (500)，诊断文本只进日志
    #[error("预测程序执行失败: {0}")]
    PredictionFailed(String),

    /// 预测程序退出码为 0 但输出违反契约 (500)，原始文本只进日志
    #[error("预测输出不符合契约: {0}")]
    MalformedPrediction(String),

    /// 预测程序超时，已被强制终止 (504)
    #[error("预测超时: {0}")]
    PredictionTimeout(String),

    /// 下层业务错误 (500)
    #[error("内部服务错误: {0}")]
    Internal(String),
}

/// 将 `ApiError` 转换为 axum 的 HTTP 响应
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::PredictionFailed(diag) => {
                // 子进程退出码与 stderr 细节不向客户端透传
                tracing::error!("预测程序执行失败: {}", diag);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Prediction routine failed".to_string(),
                )
            }
            ApiError::MalformedPrediction(raw) => {
                tracing::error!("预测输出不符合契约: {}", raw);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Prediction routine returned malformed output".to_string(),
                )
            }
            ApiError::PredictionTimeout(msg) => (StatusCode::GATEWAY_TIMEOUT, msg.clone()),
            ApiError::Internal(msg) => {
                // 内部错误只记录日志，不向客户端透传细节
                tracing::error!("内部服务错误: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ApiErrorResponse::from_msg(message));
        (status, body).into_response()
    }
}

/// 从 `StoreError` 转换
impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::NotFound("Record not found".to_string()),
            StoreError::Conflict(msg) => ApiError::BadRequest(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

/// 从 `PredictError` 转换
impl From<PredictError> for ApiError {
    fn from(err: PredictError) -> Self {
        match err {
            PredictError::RoutineFailed(diag) => ApiError::PredictionFailed(diag),
            PredictError::MalformedOutput(raw) => ApiError::MalformedPrediction(raw),
            PredictError::Timeout(secs) => {
                ApiError::PredictionTimeout(format!("Prediction timed out after {secs}s"))
            }
            PredictError::Spawn(msg) => ApiError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predict_error_mapping() {
        let e: ApiError = PredictError::Timeout(30).into();
        assert!(matches!(e, ApiError::PredictionTimeout(_)));

        let e: ApiError = PredictError::RoutineFailed("trace".into()).into();
        assert!(matches!(e, ApiError::PredictionFailed(_)));

        let e: ApiError = PredictError::MalformedOutput("garbage".into()).into();
        assert!(matches!(e, ApiError::MalformedPrediction(_)));
    }

    #[test]
    fn test_store_error_mapping() {
        let e: ApiError = StoreError::NotFound.into();
        assert!(matches!(e, ApiError::NotFound(_)));

        let e: ApiError = StoreError::Conflict("taken".into()).into();
        assert!(matches!(e, ApiError::BadRequest(_)));
    }
}
