//! # 银行与行情路由控制器
//!
//! 银行清单与行情历史为公开读取接口；行情写入仅限管理员。

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::server::AppState;
use crate::types::{ApiResponse, BankResponse, LatestStockResponse, StockDto};

/// 行情历史查询参数
#[derive(Deserialize, ToSchema)]
pub struct HistoryQuery {
    /// 回溯交易日数 (默认 30)
    pub limit: Option<u32>,
}

/// 列出全部银行
#[utoipa::path(
    get,
    path = "/api/v1/banks",
    tag = "银行与行情 (Banks)",
    responses(
        (status = 200, description = "银行列表", body = ApiResponse<Vec<BankResponse>>)
    )
)]
pub async fn list_banks(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<BankResponse>>>, ApiError> {
    let banks = state.bank_store.list_banks().await?;
    Ok(Json(ApiResponse::ok(
        banks.iter().map(BankResponse::from).collect(),
    )))
}

/// 获取各银行最新交易日的行情
#[utoipa::path(
    get,
    path = "/api/v1/banks/latest",
    tag = "银行与行情 (Banks)",
    responses(
        (status = 200, description = "各银行最新行情", body = ApiResponse<Vec<LatestStockResponse>>)
    )
)]
pub async fn latest_stocks(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<LatestStockResponse>>>, ApiError> {
    let rows = state.bank_store.latest_stocks().await?;
    Ok(Json(ApiResponse::ok(
        rows.into_iter().map(Into::into).collect(),
    )))
}

/// 获取某银行的行情历史
///
/// 按交易日升序返回最近 `limit` 个交易日（默认 30），便于前端画图。
#[utoipa::path(
    get,
    path = "/api/v1/banks/{bank_code}/stocks",
    tag = "银行与行情 (Banks)",
    params(
        ("bank_code" = String, Path, description = "银行短代码"),
        ("limit" = Option<u32>, Query, description = "回溯交易日数 (默认 30)")
    ),
    responses(
        (status = 200, description = "行情历史", body = ApiResponse<Vec<StockDto>>),
        (status = 404, description = "银行不存在")
    )
)]
pub async fn stock_history(
    State(state): State<AppState>,
    Path(bank_code): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<Vec<StockDto>>>, ApiError> {
    let bank = state
        .bank_store
        .get_bank_by_code(&bank_code)
        .await?
        .ok_or_else(|| ApiError::NotFound("Bank not found".into()))?;

    let limit = query.limit.unwrap_or(30);
    let rows = state.bank_store.stock_history(bank.id, limit).await?;

    Ok(Json(ApiResponse::ok(
        rows.into_iter().map(Into::into).collect(),
    )))
}

/// 写入某银行某交易日的行情 (仅管理员)
///
/// 以 (银行, 交易日) 为唯一键，重复提交覆盖当日数据。
#[utoipa::path(
    post,
    path = "/api/v1/banks/{bank_code}/stocks",
    tag = "银行与行情 (Banks)",
    security(("bearer_jwt" = [])),
    params(("bank_code" = String, Path, description = "银行短代码")),
    request_body = StockDto,
    responses(
        (status = 200, description = "写入成功", body = ApiResponse<String>),
        (status = 401, description = "未认证"),
        (status = 403, description = "无权限执行此操作"),
        (status = 404, description = "银行不存在")
    )
)]
pub async fn upsert_stock(
    State(state): State<AppState>,
    Path(bank_code): Path<String>,
    Json(req): Json<StockDto>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    let bank = state
        .bank_store
        .get_bank_by_code(&bank_code)
        .await?
        .ok_or_else(|| ApiError::NotFound("Bank not found".into()))?;

    state.bank_store.upsert_stock(bank.id, &req.into()).await?;

    Ok(Json(ApiResponse::ok("Stock row saved".to_string())))
}

/// 删除某银行某交易日的行情 (仅管理员)
#[utoipa::path(
    delete,
    path = "/api/v1/banks/{bank_code}/stocks/{date}",
    tag = "银行与行情 (Banks)",
    security(("bearer_jwt" = [])),
    params(
        ("bank_code" = String, Path, description = "银行短代码"),
        ("date" = String, Path, description = "交易日 (YYYY-MM-DD)")
    ),
    responses(
        (status = 200, description = "删除成功", body = ApiResponse<String>),
        (status = 401, description = "未认证"),
        (status = 403, description = "无权限执行此操作"),
        (status = 404, description = "银行或该交易日的行情行不存在")
    )
)]
pub async fn delete_stock(
    State(state): State<AppState>,
    Path((bank_code, date)): Path<(String, chrono::NaiveDate)>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    let bank = state
        .bank_store
        .get_bank_by_code(&bank_code)
        .await?
        .ok_or_else(|| ApiError::NotFound("Bank not found".into()))?;

    state.bank_store.delete_stock(bank.id, date).await?;

    Ok(Json(ApiResponse::ok("Stock row deleted".to_string())))
}
