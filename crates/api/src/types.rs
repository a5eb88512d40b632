//! # DTO (Data Transfer Object) 层
//!
//! 将内部领域模型转化为面向前端 JSON 输出的轻量结构体。
//! 所有 DTO 必须派生 `utoipa::ToSchema` 以自动进入 Swagger 文档。

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use stockcast_core::store::port::{Bank, BankStock, LatestBankStock, LatestPrediction, User};

// ============================================================
//  通用响应 DTO
// ============================================================

/// 统一 API 响应包装器
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T: Serialize + ToSchema> {
    /// 是否成功
    pub success: bool,
    /// 数据载荷 (成功时)
    pub data: Option<T>,
    /// 错误信息 (失败时)
    pub error: Option<String>,
}

impl<T: Serialize + ToSchema> ApiResponse<T> {
    /// 构建成功响应
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// 构建失败响应 (不含泛型载荷)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorResponse {
    /// 固定为 false
    pub success: bool,
    /// 错误描述信息
    pub error: String,
}

impl ApiErrorResponse {
    /// 从错误信息构建
    pub fn from_msg(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            error: msg.into(),
        }
    }
}

// ============================================================
//  鉴权 DTO
// ============================================================

/// 注册请求体
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    /// 用户名
    #[schema(example = "trader_01")]
    pub username: String,
    /// 邮箱
    #[schema(example = "trader01@example.com")]
    pub email: String,
    /// 密码
    #[schema(example = "P@ssw0rd!")]
    pub password: String,
}

/// 登录请求体
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// 用户名
    #[schema(example = "admin")]
    pub username: String,
    /// 密码
    #[schema(example = "password123")]
    pub password: String,
}

/// 登录成功返回的 Token
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    /// JWT Bearer Token
    #[schema(example = "eyJhbGciOiJIUzI1NiIs...")]
    pub token: String,
    /// Token 过期时间 (秒)
    #[schema(example = 86400)]
    pub expires_in: u64,
}

/// JWT Claims 内容 (内部使用，不暴露到 Swagger)
///
/// 无状态会话的全部内容：身份、显示名、角色与时间边界。
/// 签发后不可变，服务端不保存。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// 用户主键 (字符串形式)
    pub sub: String,
    /// 用户显示名
    pub name: String,
    /// 角色 ("user" 或 "admin")
    pub role: String,
    /// 签发时间 (Unix 时间戳)
    pub iat: usize,
    /// Token 过期时间 (Unix 时间戳)
    pub exp: usize,
}

// ============================================================
//  用户管理 DTO
// ============================================================

/// 创建新用户请求体 (仅管理员)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    /// 用户名
    #[schema(example = "trader_01")]
    pub username: String,
    /// 邮箱
    #[schema(example = "trader01@example.com")]
    pub email: String,
    /// 新用户密码
    #[schema(example = "P@ssw0rd!")]
    pub password: String,
    /// 角色 ("user" 或 "admin")
    #[schema(example = "user")]
    pub role: String,
}

/// 更新用户请求体 (仅管理员)；`password` 缺省时保留原密码
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    /// 用户名
    #[schema(example = "trader_01")]
    pub username: String,
    /// 邮箱
    #[schema(example = "trader01@example.com")]
    pub email: String,
    /// 新密码 (可选)
    pub password: Option<String>,
    /// 角色 ("user" 或 "admin")
    #[schema(example = "user")]
    pub role: String,
}

/// 用户基础信息响应 DTO
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    /// 用户主键
    #[schema(example = 1)]
    pub id: i64,
    /// 用户名
    #[schema(example = "admin")]
    pub username: String,
    /// 邮箱
    #[schema(example = "admin@stockcast.local")]
    pub email: String,
    /// 角色
    #[schema(example = "admin")]
    pub role: String,
    /// 注册时间
    #[schema(example = "2026-03-01T00:00:00Z")]
    pub created_at: String,
}

impl From<&User> for UserResponse {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            username: u.username.clone(),
            email: u.email.clone(),
            role: u.role.to_string(),
            created_at: u.created_at.to_rfc3339(),
        }
    }
}

// ============================================================
//  银行与行情 DTO
// ============================================================

/// 银行 DTO
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BankResponse {
    /// 银行主键
    #[schema(example = 1)]
    pub id: i64,
    /// 银行短代码
    #[schema(example = "KTB")]
    pub code: String,
    /// 银行全名
    #[schema(example = "Krung Thai Bank")]
    pub name: String,
}

impl From<&Bank> for BankResponse {
    fn from(b: &Bank) -> Self {
        Self {
            id: b.id,
            code: b.code.clone(),
            name: b.name.clone(),
        }
    }
}

/// 单日行情 DTO，读写共用（admin 写入行情时即提交此结构）
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StockDto {
    /// 交易日
    #[schema(example = "2026-08-28")]
    pub trade_date: NaiveDate,
    /// 收盘价
    pub close_price: Option<f64>,
    /// 开盘价
    pub open_price: Option<f64>,
    /// 最高价
    pub high: Option<f64>,
    /// 最低价
    pub low: Option<f64>,
    /// 成交量
    pub volume: Option<f64>,
    /// 涨跌幅 (%)
    pub percentage_change: Option<f64>,
    /// 宏观: GDP
    pub gdp: Option<f64>,
    /// 宏观: 利率
    pub interest_rate: Option<f64>,
    /// 总资产
    pub total_assets: Option<f64>,
    /// 股东权益
    pub total_equity: Option<f64>,
    /// 总负债
    pub total_liabilities: Option<f64>,
    /// 净利润
    pub net_profit: Option<f64>,
    /// 每股收益
    pub eps: Option<f64>,
    /// 市盈率
    pub pe: Option<f64>,
    /// 市净率
    pub pbv: Option<f64>,
    /// 市值
    pub market_cap: Option<f64>,
    /// 每股账面价值
    pub book_value_per_share: Option<f64>,
    /// 净资产收益率
    pub roe: Option<f64>,
    /// 总资产收益率
    pub roa: Option<f64>,
}

impl From<BankStock> for StockDto {
    fn from(s: BankStock) -> Self {
        Self {
            trade_date: s.trade_date,
            close_price: s.close_price,
            open_price: s.open_price,
            high: s.high,
            low: s.low,
            volume: s.volume,
            percentage_change: s.percentage_change,
            gdp: s.gdp,
            interest_rate: s.interest_rate,
            total_assets: s.total_assets,
            total_equity: s.total_equity,
            total_liabilities: s.total_liabilities,
            net_profit: s.net_profit,
            eps: s.eps,
            pe: s.pe,
            pbv: s.pbv,
            market_cap: s.market_cap,
            book_value_per_share: s.book_value_per_share,
            roe: s.roe,
            roa: s.roa,
        }
    }
}

impl From<StockDto> for BankStock {
    fn from(s: StockDto) -> Self {
        Self {
            trade_date: s.trade_date,
            close_price: s.close_price,
            open_price: s.open_price,
            high: s.high,
            low: s.low,
            volume: s.volume,
            percentage_change: s.percentage_change,
            gdp: s.gdp,
            interest_rate: s.interest_rate,
            total_assets: s.total_assets,
            total_equity: s.total_equity,
            total_liabilities: s.total_liabilities,
            net_profit: s.net_profit,
            eps: s.eps,
            pe: s.pe,
            pbv: s.pbv,
            market_cap: s.market_cap,
            book_value_per_share: s.book_value_per_share,
            roe: s.roe,
            roa: s.roa,
        }
    }
}

/// 各银行最新行情 DTO
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LatestStockResponse {
    /// 银行短代码
    #[schema(example = "KTB")]
    pub bank_code: String,
    /// 银行全名
    #[schema(example = "Krung Thai Bank")]
    pub bank_name: String,
    /// 最新行情行
    pub stock: StockDto,
}

impl From<LatestBankStock> for LatestStockResponse {
    fn from(l: LatestBankStock) -> Self {
        Self {
            bank_code: l.bank_code,
            bank_name: l.bank_name,
            stock: l.stock.into(),
        }
    }
}

// ============================================================
//  预测 DTO
// ============================================================

/// 预测成功响应 DTO
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PredictionResponse {
    /// 银行短代码
    #[schema(example = "KTB")]
    pub bank_code: String,
    /// 银行全名
    #[schema(example = "Krung Thai Bank")]
    pub bank_name: String,
    /// 预测所属日历日
    #[schema(example = "2026-08-30")]
    pub prediction_date: NaiveDate,
    /// 预测价格
    #[schema(example = 18.2)]
    pub predicted_price: f64,
}

/// 各银行最新预测 DTO
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LatestPredictionResponse {
    /// 银行短代码
    #[schema(example = "KTB")]
    pub bank_code: String,
    /// 银行全名
    #[schema(example = "Krung Thai Bank")]
    pub bank_name: String,
    /// 预测所属日历日
    #[schema(example = "2026-08-30")]
    pub prediction_date: NaiveDate,
    /// 预测价格
    #[schema(example = 18.2)]
    pub predicted_price: f64,
    /// 事后回填的实际价格 (可选)
    pub actual_price: Option<f64>,
    /// 预测误差百分比 (可选)
    pub error_percentage: Option<f64>,
}

impl From<LatestPrediction> for LatestPredictionResponse {
    fn from(p: LatestPrediction) -> Self {
        Self {
            bank_code: p.bank_code,
            bank_name: p.bank_name,
            prediction_date: p.prediction_date,
            predicted_price: p.predicted_price,
            actual_price: p.actual_price,
            error_percentage: p.error_percentage,
        }
    }
}
