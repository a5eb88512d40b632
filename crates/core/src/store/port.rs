use super::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// # Summary
/// 用户角色枚举，决定访问网关的授权级别。
///
/// # Invariants
/// - 序列化形式固定为小写 ("user" / "admin")，与 JWT claim 保持一致。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::User => write!(f, "user"),
            UserRole::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(UserRole::User),
            "admin" => Ok(UserRole::Admin),
            other => Err(format!("Unknown role: {other}")),
        }
    }
}

/// # Summary
/// 用户实体，代表系统的使用者。
///
/// # Invariants
/// - `username` 与 `email` 各自全局唯一。
/// - `password_hash` 为 bcrypt 哈希，绝不以明文出现。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    // 自增主键
    pub id: i64,
    // 登录用户名
    pub username: String,
    // 邮箱
    pub email: String,
    // bcrypt 密码哈希
    pub password_hash: String,
    // 角色
    pub role: UserRole,
    // 注册时间
    pub created_at: DateTime<Utc>,
}

/// 创建用户时的输入载荷（id 由数据库分配）
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
}

/// 更新用户时的输入载荷，`password_hash` 为 None 时保留原密码
#[derive(Debug, Clone)]
pub struct UserUpdate {
    pub username: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub role: UserRole,
}

/// # Summary
/// 银行实体，预测与行情数据的归属主体。
///
/// # Invariants
/// - `code` 为短代码 (如 "KTB", "BBL", "KBANK")，全局唯一。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bank {
    // 自增主键
    pub id: i64,
    // 银行短代码
    pub code: String,
    // 银行全名
    pub name: String,
}

/// # Summary
/// 单日银行股行情实体，包含价格与基本面指标。
///
/// # Invariants
/// - 同一银行同一交易日至多一行。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankStock {
    // 交易日
    pub trade_date: NaiveDate,
    // 收盘价
    pub close_price: Option<f64>,
    // 开盘价
    pub open_price: Option<f64>,
    // 最高价
    pub high: Option<f64>,
    // 最低价
    pub low: Option<f64>,
    // 成交量
    pub volume: Option<f64>,
    // 涨跌幅 (%)
    pub percentage_change: Option<f64>,
    // 宏观: GDP
    pub gdp: Option<f64>,
    // 宏观: 利率
    pub interest_rate: Option<f64>,
    // 总资产
    pub total_assets: Option<f64>,
    // 股东权益
    pub total_equity: Option<f64>,
    // 总负债
    pub total_liabilities: Option<f64>,
    // 净利润
    pub net_profit: Option<f64>,
    // 每股收益
    pub eps: Option<f64>,
    // 市盈率
    pub pe: Option<f64>,
    // 市净率
    pub pbv: Option<f64>,
    // 市值
    pub market_cap: Option<f64>,
    // 每股账面价值
    pub book_value_per_share: Option<f64>,
    // 净资产收益率
    pub roe: Option<f64>,
    // 总资产收益率
    pub roa: Option<f64>,
}

/// 各银行最新一行行情的查询结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatestBankStock {
    // 银行短代码
    pub bank_code: String,
    // 银行全名
    pub bank_name: String,
    // 最新行情
    pub stock: BankStock,
}

/// # Summary
/// 预测台账中各银行最新一条预测的查询结果。
///
/// # Invariants
/// - 每个银行至多一行，取 `created_at` 最大的预测。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatestPrediction {
    // 银行短代码
    pub bank_code: String,
    // 银行全名
    pub bank_name: String,
    // 预测所属日历日
    pub prediction_date: NaiveDate,
    // 预测价格
    pub predicted_price: f64,
    // 事后回填的实际价格 (可选)
    pub actual_price: Option<f64>,
    // 预测误差百分比 (可选)
    pub error_percentage: Option<f64>,
}

/// # Summary
/// 用户数据访问接口，负责账户的持久化与唯一性查询。
///
/// # Invariants
/// - 实现者必须保证 `username` / `email` 的唯一约束。
#[async_trait]
pub trait UserStore: Send + Sync {
    /// # Summary
    /// 根据主键获取用户。
    ///
    /// # Arguments
    /// * `id`: 用户主键。
    ///
    /// # Returns
    /// 存在返回 `Some(User)`，否则返回 `None`。
    async fn get_user(&self, id: i64) -> Result<Option<User>, StoreError>;

    /// # Summary
    /// 根据用户名获取用户（登录场景）。
    ///
    /// # Arguments
    /// * `username`: 登录用户名。
    ///
    /// # Returns
    /// 存在返回 `Some(User)`，否则返回 `None`。
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    /// # Summary
    /// 检查用户名或邮箱是否已被占用。
    ///
    /// # Logic
    /// 查询 `username` 或 `email` 匹配的记录；`exclude_id` 用于更新场景下
    /// 排除被更新者自身。
    ///
    /// # Arguments
    /// * `username`: 待检查的用户名。
    /// * `email`: 待检查的邮箱。
    /// * `exclude_id`: 排除的用户主键 (更新时为 Some)。
    ///
    /// # Returns
    /// 被占用返回 `true`。
    async fn username_or_email_taken(
        &self,
        username: &str,
        email: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool, StoreError>;

    /// # Summary
    /// 按主键升序列出全部用户。
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    /// # Summary
    /// 创建新用户。
    ///
    /// # Arguments
    /// * `user`: 新用户载荷。
    ///
    /// # Returns
    /// 返回数据库分配的主键。
    async fn create_user(&self, user: &NewUser) -> Result<i64, StoreError>;

    /// # Summary
    /// 更新用户信息，`password_hash` 为 None 时保留原密码。
    ///
    /// # Arguments
    /// * `id`: 用户主键。
    /// * `update`: 更新载荷。
    ///
    /// # Returns
    /// 目标不存在时返回 `StoreError::NotFound`。
    async fn update_user(&self, id: i64, update: &UserUpdate) -> Result<(), StoreError>;

    /// # Summary
    /// 删除用户。
    ///
    /// # Arguments
    /// * `id`: 用户主键。
    ///
    /// # Returns
    /// 目标不存在时返回 `StoreError::NotFound`。
    async fn delete_user(&self, id: i64) -> Result<(), StoreError>;
}

/// # Summary
/// 银行与行情数据访问接口。
#[async_trait]
pub trait BankStore: Send + Sync {
    /// # Summary
    /// 列出全部银行。
    async fn list_banks(&self) -> Result<Vec<Bank>, StoreError>;

    /// # Summary
    /// 根据短代码查找银行。
    ///
    /// # Arguments
    /// * `code`: 银行短代码。
    ///
    /// # Returns
    /// 存在返回 `Some(Bank)`，否则返回 `None`。
    async fn get_bank_by_code(&self, code: &str) -> Result<Option<Bank>, StoreError>;

    /// # Summary
    /// 获取各银行最新交易日的行情行。
    ///
    /// # Logic
    /// 按 `bank_id` 分组取 `trade_date` 最大的一行并连接银行表。
    async fn latest_stocks(&self) -> Result<Vec<LatestBankStock>, StoreError>;

    /// # Summary
    /// 获取某银行最近 `limit` 个交易日的行情，按日期升序返回（便于画图）。
    ///
    /// # Arguments
    /// * `bank_id`: 银行主键。
    /// * `limit`: 回溯天数上限。
    async fn stock_history(&self, bank_id: i64, limit: u32) -> Result<Vec<BankStock>, StoreError>;

    /// # Summary
    /// 写入或覆盖某银行某交易日的行情行。
    ///
    /// # Logic
    /// 以 `(bank_id, trade_date)` 为唯一键执行 Upsert。
    ///
    /// # Arguments
    /// * `bank_id`: 银行主键。
    /// * `stock`: 行情载荷。
    async fn upsert_stock(&self, bank_id: i64, stock: &BankStock) -> Result<(), StoreError>;

    /// # Summary
    /// 删除某银行某交易日的行情行。
    ///
    /// # Arguments
    /// * `bank_id`: 银行主键。
    /// * `date`: 交易日。
    ///
    /// # Returns
    /// 目标行不存在时返回 `StoreError::NotFound`。
    async fn delete_stock(&self, bank_id: i64, date: NaiveDate) -> Result<(), StoreError>;
}

/// # Summary
/// 预测台账访问接口，持久化已被接受的预测结果。
///
/// # Invariants
/// - 同一 `(bank_id, prediction_date)` 至多一行；重复写入以新值覆盖。
#[async_trait]
pub trait PredictionStore: Send + Sync {
    /// # Summary
    /// 写入或覆盖某银行某日历日的预测价格。
    ///
    /// # Logic
    /// 以 `(bank_id, prediction_date)` 为唯一键执行 Upsert，
    /// 同日重复预测覆盖价格并刷新 `created_at`。
    ///
    /// # Arguments
    /// * `bank_id`: 银行主键。
    /// * `date`: 预测所属日历日。
    /// * `predicted_price`: 预测价格。
    async fn upsert_prediction(
        &self,
        bank_id: i64,
        date: NaiveDate,
        predicted_price: f64,
    ) -> Result<(), StoreError>;

    /// # Summary
    /// 获取各银行最新一条预测。
    ///
    /// # Logic
    /// 按 `bank_id` 分组取 `created_at` 最大的一行并连接银行表。
    async fn latest_predictions(&self) -> Result<Vec<LatestPrediction>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        assert_eq!("admin".parse::<UserRole>().ok(), Some(UserRole::Admin));
        assert_eq!("user".parse::<UserRole>().ok(), Some(UserRole::User));
        assert!("root".parse::<UserRole>().is_err());
        assert_eq!(UserRole::Admin.to_string(), "admin");
        assert_eq!(UserRole::User.to_string(), "user");
    }
}
