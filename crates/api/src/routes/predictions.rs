//! # 预测路由控制器
//!
//! 将一次 HTTP 请求桥接为恰好一次外部预测程序调用：
//! 先解析银行（失败则 404，绝不启动子进程），再同步等待子进程分类结果，
//! 成功的预测以 (银行, 当日) 为键写入台账后返回；失败的预测绝不入库。

use axum::Json;
use axum::extract::{Path, State};
use chrono::Utc;

use crate::error::ApiError;
use crate::server::AppState;
use crate::types::{ApiResponse, LatestPredictionResponse, PredictionResponse};

/// 对某银行执行一次股价预测
///
/// 请求体为任意 JSON 载荷，原样序列化后交给外部预测程序。
/// 同一银行同一日历日重复预测时覆盖台账中的预测价格（last-write-wins）。
#[utoipa::path(
    post,
    path = "/api/v1/banks/{bank_code}/predict",
    tag = "预测 (Predictions)",
    security(("bearer_jwt" = [])),
    params(("bank_code" = String, Path, description = "银行短代码")),
    request_body = serde_json::Value,
    responses(
        (status = 200, description = "预测成功", body = ApiResponse<PredictionResponse>),
        (status = 401, description = "未认证"),
        (status = 404, description = "银行不存在 (不会启动预测程序)"),
        (status = 500, description = "预测程序失败或输出违反契约"),
        (status = 504, description = "预测程序超时，已被强制终止")
    )
)]
pub async fn predict(
    State(state): State<AppState>,
    Path(bank_code): Path<String>,
    Json(input): Json<serde_json::Value>,
) -> Result<Json<ApiResponse<PredictionResponse>>, ApiError> {
    // 1. 解析银行；不存在则 404，避免白白启动子进程
    let bank = state
        .bank_store
        .get_bank_by_code(&bank_code)
        .await?
        .ok_or_else(|| ApiError::NotFound("Bank not found".into()))?;

    // 2. 调用外部预测程序 (本请求中唯一的阻塞点，只挂起自身任务)
    let forecast = state.predictor.predict(&bank.code, &input).await?;

    // 3. 写入预测台账，以 (银行, 当日) 为键覆盖
    let today = Utc::now().date_naive();
    state
        .prediction_store
        .upsert_prediction(bank.id, today, forecast.predicted_price)
        .await?;

    tracing::info!(
        "Recorded prediction for {} on {}: {}",
        bank.code,
        today,
        forecast.predicted_price
    );

    Ok(Json(ApiResponse::ok(PredictionResponse {
        bank_code: bank.code,
        bank_name: bank.name,
        prediction_date: today,
        predicted_price: forecast.predicted_price,
    })))
}

/// 获取各银行最新一条预测
#[utoipa::path(
    get,
    path = "/api/v1/predictions/latest",
    tag = "预测 (Predictions)",
    security(("bearer_jwt" = [])),
    responses(
        (status = 200, description = "各银行最新预测", body = ApiResponse<Vec<LatestPredictionResponse>>),
        (status = 401, description = "未认证")
    )
)]
pub async fn latest_predictions(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<LatestPredictionResponse>>>, ApiError> {
    let rows = state.prediction_store.latest_predictions().await?;
    Ok(Json(ApiResponse::ok(
        rows.into_iter().map(Into::into).collect(),
    )))
}
