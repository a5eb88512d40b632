use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::fs;
use tracing::warn;

use stockcast_core::store::error::StoreError;
use stockcast_core::store::port::{
    Bank, BankStock, BankStore, LatestBankStock, LatestPrediction, NewUser, PredictionStore, User,
    UserRole, UserStore, UserUpdate,
};

/// 默认系统数据库存储路径
const DEFAULT_SYSTEM_DB: &str = "app.db";

/// 首次初始化时种入的管理员账户（密码登录后应立即修改）
const SEED_ADMIN_USERNAME: &str = "admin";
const SEED_ADMIN_EMAIL: &str = "admin@stockcast.local";
const SEED_ADMIN_PASSWORD: &str = "admin123";

/// 预置的银行清单 (code, name)
const SEED_BANKS: [(&str, &str); 3] = [
    ("KTB", "Krung Thai Bank"),
    ("BBL", "Bangkok Bank"),
    ("KBANK", "Kasikornbank"),
];

/// SQLite 系统存储实现。
///
/// # Summary
/// 在中心化的 SQLite 数据库 (`app.db`) 中管理全部系统数据：
/// 用户、银行、行情与预测台账。同时实现三个存储端口，共享一个连接池。
///
/// # Invariants
/// * 数据库结构在存储实例创建时初始化。
/// * 所有操作均通过共享的 `SqlitePool` 执行。
pub struct SqliteSystemStore {
    pool: SqlitePool,
}

impl SqliteSystemStore {
    /// 创建新的 SqliteSystemStore 并初始化全局表结构。
    ///
    /// # Logic
    /// 1. 获取配置的数据根目录并确保其存在。
    /// 2. 配置 SQLite 连接选项，开启 `create_if_missing` 与 WAL。
    /// 3. 连接到数据库并执行 DDL 初始化系统表结构。
    /// 4. 种入预置银行；若用户表为空则种入默认管理员。
    ///
    /// # Returns
    /// * `Result<Self, StoreError>` - 存储实例 or 数据库错误。
    pub async fn new() -> Result<Self, StoreError> {
        let root = crate::config::get_root_dir();
        fs::create_dir_all(&root).map_err(|e| StoreError::InitError(e.to_string()))?;

        let db_path = root.join(DEFAULT_SYSTEM_DB);

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(10));

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(|e| StoreError::InitError(e.to_string()))?;

        // 初始化系统表
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'user',
                created_at DATETIME NOT NULL
            );

            CREATE TABLE IF NOT EXISTS banks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                bank_code TEXT NOT NULL UNIQUE,
                bank_name TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS bank_stocks (
                bank_id INTEGER NOT NULL,
                trade_date DATE NOT NULL,
                close_price REAL,
                open_price REAL,
                high REAL,
                low REAL,
                volume REAL,
                percentage_change REAL,
                gdp REAL,
                interest_rate REAL,
                total_assets REAL,
                total_equity REAL,
                total_liabilities REAL,
                net_profit REAL,
                eps REAL,
                pe REAL,
                pbv REAL,
                market_cap REAL,
                book_value_per_share REAL,
                roe REAL,
                roa REAL,
                PRIMARY KEY (bank_id, trade_date)
            );

            CREATE TABLE IF NOT EXISTS predictions (
                bank_id INTEGER NOT NULL,
                prediction_date DATE NOT NULL,
                predicted_price REAL NOT NULL,
                actual_price REAL,
                error_percentage REAL,
                created_at DATETIME NOT NULL,
                PRIMARY KEY (bank_id, prediction_date)
            );
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| StoreError::InitError(e.to_string()))?;

        let store = Self { pool };
        store.seed().await?;
        Ok(store)
    }

    /// 种入预置银行与默认管理员账户。
    async fn seed(&self) -> Result<(), StoreError> {
        for (code, name) in SEED_BANKS {
            sqlx::query("INSERT OR IGNORE INTO banks (bank_code, bank_name) VALUES (?, ?)")
                .bind(code)
                .bind(name)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::InitError(e.to_string()))?;
        }

        let user_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::InitError(e.to_string()))?;

        if user_count == 0 {
            let hashed = bcrypt::hash(SEED_ADMIN_PASSWORD, bcrypt::DEFAULT_COST)
                .map_err(|e| StoreError::InitError(e.to_string()))?;
            sqlx::query(
                "INSERT INTO users (username, email, password_hash, role, created_at) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(SEED_ADMIN_USERNAME)
            .bind(SEED_ADMIN_EMAIL)
            .bind(&hashed)
            .bind(UserRole::Admin.to_string())
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::InitError(e.to_string()))?;

            warn!(
                "Seeded default admin account '{}' - change its password immediately",
                SEED_ADMIN_USERNAME
            );
        }

        Ok(())
    }
}

/// users 表行 → User 实体
fn map_user(row: (i64, String, String, String, String, DateTime<Utc>)) -> Result<User, StoreError> {
    let role = row.4.parse::<UserRole>().map_err(StoreError::Database)?;
    Ok(User {
        id: row.0,
        username: row.1,
        email: row.2,
        password_hash: row.3,
        role,
        created_at: row.5,
    })
}

const USER_COLUMNS: &str = "id, username, email, password_hash, role, created_at";

#[async_trait]
impl UserStore for SqliteSystemStore {
    /// # Summary
    /// 根据主键获取用户。
    async fn get_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, (i64, String, String, String, String, DateTime<Utc>)>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?
        .map(map_user)
        .transpose()
    }

    /// # Summary
    /// 根据用户名获取用户。
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, (i64, String, String, String, String, DateTime<Utc>)>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?
        .map(map_user)
        .transpose()
    }

    /// # Summary
    /// 检查用户名或邮箱是否已被其他账户占用。
    async fn username_or_email_taken(
        &self,
        username: &str,
        email: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool, StoreError> {
        let count: i64 = match exclude_id {
            Some(id) => {
                sqlx::query_scalar(
                    "SELECT COUNT(*) FROM users WHERE (username = ? OR email = ?) AND id != ?",
                )
                .bind(username)
                .bind(email)
                .bind(id)
                .fetch_one(&self.pool)
                .await
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ? OR email = ?")
                    .bind(username)
                    .bind(email)
                    .fetch_one(&self.pool)
                    .await
            }
        }
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(count > 0)
    }

    /// # Summary
    /// 按主键升序列出全部用户。
    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        sqlx::query_as::<_, (i64, String, String, String, String, DateTime<Utc>)>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?
        .into_iter()
        .map(map_user)
        .collect()
    }

    /// # Summary
    /// 创建新用户，返回数据库分配的主键。
    ///
    /// # Logic
    /// 唯一约束冲突映射为 `StoreError::Conflict`，由上层翻译为 400。
    async fn create_user(&self, user: &NewUser) -> Result<i64, StoreError> {
        let result = sqlx::query(
            "INSERT INTO users (username, email, password_hash, role, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.to_string())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db) if db.is_unique_violation() => {
                StoreError::Conflict("username or email already taken".to_string())
            }
            _ => StoreError::Database(e.to_string()),
        })?;

        Ok(result.last_insert_rowid())
    }

    /// # Summary
    /// 更新用户信息，`password_hash` 为 None 时保留原密码。
    async fn update_user(&self, id: i64, update: &UserUpdate) -> Result<(), StoreError> {
        let result = match &update.password_hash {
            Some(hash) => {
                sqlx::query(
                    "UPDATE users SET username = ?, email = ?, password_hash = ?, role = ? WHERE id = ?",
                )
                .bind(&update.username)
                .bind(&update.email)
                .bind(hash)
                .bind(update.role.to_string())
                .bind(id)
                .execute(&self.pool)
                .await
            }
            None => {
                sqlx::query("UPDATE users SET username = ?, email = ?, role = ? WHERE id = ?")
                    .bind(&update.username)
                    .bind(&update.email)
                    .bind(update.role.to_string())
                    .bind(id)
                    .execute(&self.pool)
                    .await
            }
        }
        .map_err(|e| StoreError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// # Summary
    /// 删除用户。
    async fn delete_user(&self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

/// bank_stocks 表行结构（列太宽，不适合元组映射）
#[derive(sqlx::FromRow)]
struct StockRow {
    trade_date: NaiveDate,
    close_price: Option<f64>,
    open_price: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    volume: Option<f64>,
    percentage_change: Option<f64>,
    gdp: Option<f64>,
    interest_rate: Option<f64>,
    total_assets: Option<f64>,
    total_equity: Option<f64>,
    total_liabilities: Option<f64>,
    net_profit: Option<f64>,
    eps: Option<f64>,
    pe: Option<f64>,
    pbv: Option<f64>,
    market_cap: Option<f64>,
    book_value_per_share: Option<f64>,
    roe: Option<f64>,
    roa: Option<f64>,
}

impl From<StockRow> for BankStock {
    fn from(r: StockRow) -> Self {
        BankStock {
            trade_date: r.trade_date,
            close_price: r.close_price,
            open_price: r.open_price,
            high: r.high,
            low: r.low,
            volume: r.volume,
            percentage_change: r.percentage_change,
            gdp: r.gdp,
            interest_rate: r.interest_rate,
            total_assets: r.total_assets,
            total_equity: r.total_equity,
            total_liabilities: r.total_liabilities,
            net_profit: r.net_profit,
            eps: r.eps,
            pe: r.pe,
            pbv: r.pbv,
            market_cap: r.market_cap,
            book_value_per_share: r.book_value_per_share,
            roe: r.roe,
            roa: r.roa,
        }
    }
}

/// latest_stocks 连接查询的行结构
#[derive(sqlx::FromRow)]
struct LatestStockRow {
    bank_code: String,
    bank_name: String,
    #[sqlx(flatten)]
    stock: StockRow,
}

const STOCK_COLUMNS: &str = "trade_date, close_price, open_price, high, low, volume, \
     percentage_change, gdp, interest_rate, total_assets, total_equity, total_liabilities, \
     net_profit, eps, pe, pbv, market_cap, book_value_per_share, roe, roa";

#[async_trait]
impl BankStore for SqliteSystemStore {
    /// # Summary
    /// 按短代码升序列出全部银行。
    async fn list_banks(&self) -> Result<Vec<Bank>, StoreError> {
        let rows = sqlx::query_as::<_, (i64, String, String)>(
            "SELECT id, bank_code, bank_name FROM banks ORDER BY bank_code",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|r| Bank {
                id: r.0,
                code: r.1,
                name: r.2,
            })
            .collect())
    }

    /// # Summary
    /// 根据短代码查找银行。
    async fn get_bank_by_code(&self, code: &str) -> Result<Option<Bank>, StoreError> {
        let row = sqlx::query_as::<_, (i64, String, String)>(
            "SELECT id, bank_code, bank_name FROM banks WHERE bank_code = ?",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(row.map(|r| Bank {
            id: r.0,
            code: r.1,
            name: r.2,
        }))
    }

    /// # Summary
    /// 获取各银行最新交易日的行情行。
    ///
    /// # Logic
    /// 子查询按 `bank_id` 分组取最大 `trade_date`，再连接回行情表与银行表。
    async fn latest_stocks(&self) -> Result<Vec<LatestBankStock>, StoreError> {
        let rows = sqlx::query_as::<_, LatestStockRow>(&format!(
            r#"
            SELECT b.bank_code, b.bank_name, {STOCK_COLUMNS}
            FROM banks b
            JOIN (
                SELECT bank_id, MAX(trade_date) AS latest_date
                FROM bank_stocks
                GROUP BY bank_id
            ) latest ON b.id = latest.bank_id
            JOIN bank_stocks s ON s.bank_id = latest.bank_id AND s.trade_date = latest.latest_date
            ORDER BY b.bank_code
            "#
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|r| LatestBankStock {
                bank_code: r.bank_code,
                bank_name: r.bank_name,
                stock: r.stock.into(),
            })
            .collect())
    }

    /// # Summary
    /// 获取某银行最近 `limit` 个交易日的行情，按日期升序返回。
    ///
    /// # Logic
    /// 先按日期降序取 `limit` 行，再整体反转，便于前端画图。
    async fn stock_history(&self, bank_id: i64, limit: u32) -> Result<Vec<BankStock>, StoreError> {
        let mut rows = sqlx::query_as::<_, StockRow>(&format!(
            "SELECT {STOCK_COLUMNS} FROM bank_stocks WHERE bank_id = ? ORDER BY trade_date DESC LIMIT ?"
        ))
        .bind(bank_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        rows.reverse();
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// # Summary
    /// 写入或覆盖某银行某交易日的行情行。
    ///
    /// # Logic
    /// 以 `(bank_id, trade_date)` 为唯一键执行 `ON CONFLICT DO UPDATE`。
    async fn upsert_stock(&self, bank_id: i64, stock: &BankStock) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO bank_stocks (
                bank_id, trade_date, close_price, open_price, high, low, volume,
                percentage_change, gdp, interest_rate, total_assets, total_equity,
                total_liabilities, net_profit, eps, pe, pbv, market_cap,
                book_value_per_share, roe, roa
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(bank_id, trade_date) DO UPDATE SET
                close_price = excluded.close_price,
                open_price = excluded.open_price,
                high = excluded.high,
                low = excluded.low,
                volume = excluded.volume,
                percentage_change = excluded.percentage_change,
                gdp = excluded.gdp,
                interest_rate = excluded.interest_rate,
                total_assets = excluded.total_assets,
                total_equity = excluded.total_equity,
                total_liabilities = excluded.total_liabilities,
                net_profit = excluded.net_profit,
                eps = excluded.eps,
                pe = excluded.pe,
                pbv = excluded.pbv,
                market_cap = excluded.market_cap,
                book_value_per_share = excluded.book_value_per_share,
                roe = excluded.roe,
                roa = excluded.roa
            "#,
        )
        .bind(bank_id)
        .bind(stock.trade_date)
        .bind(stock.close_price)
        .bind(stock.open_price)
        .bind(stock.high)
        .bind(stock.low)
        .bind(stock.volume)
        .bind(stock.percentage_change)
        .bind(stock.gdp)
        .bind(stock.interest_rate)
        .bind(stock.total_assets)
        .bind(stock.total_equity)
        .bind(stock.total_liabilities)
        .bind(stock.net_profit)
        .bind(stock.eps)
        .bind(stock.pe)
        .bind(stock.pbv)
        .bind(stock.market_cap)
        .bind(stock.book_value_per_share)
        .bind(stock.roe)
        .bind(stock.roa)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }

    /// # Summary
    /// 删除某银行某交易日的行情行。
    async fn delete_stock(&self, bank_id: i64, date: NaiveDate) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM bank_stocks WHERE bank_id = ? AND trade_date = ?")
            .bind(bank_id)
            .bind(date)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl PredictionStore for SqliteSystemStore {
    /// # Summary
    /// 写入或覆盖某银行某日历日的预测价格。
    ///
    /// # Logic
    /// 以 `(bank_id, prediction_date)` 为唯一键执行 `ON CONFLICT DO UPDATE`，
    /// 同日重复预测只覆盖 `predicted_price` 并刷新 `created_at`，
    /// 已回填的 `actual_price` / `error_percentage` 保持不变。
    async fn upsert_prediction(
        &self,
        bank_id: i64,
        date: NaiveDate,
        predicted_price: f64,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO predictions (bank_id, prediction_date, predicted_price, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(bank_id, prediction_date) DO UPDATE SET
                predicted_price = excluded.predicted_price,
                created_at = excluded.created_at
            "#,
        )
        .bind(bank_id)
        .bind(date)
        .bind(predicted_price)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }

    /// # Summary
    /// 获取各银行最新一条预测。
    ///
    /// # Logic
    /// 子查询按 `bank_id` 分组取最大 `created_at`，再连接回预测表与银行表。
    async fn latest_predictions(&self) -> Result<Vec<LatestPrediction>, StoreError> {
        let rows = sqlx::query_as::<_, (String, String, NaiveDate, f64, Option<f64>, Option<f64>)>(
            r#"
            SELECT b.bank_code, b.bank_name, p.prediction_date, p.predicted_price,
                   p.actual_price, p.error_percentage
            FROM banks b
            JOIN (
                SELECT bank_id, MAX(created_at) AS latest_created
                FROM predictions
                GROUP BY bank_id
            ) latest ON b.id = latest.bank_id
            JOIN predictions p ON p.bank_id = latest.bank_id AND p.created_at = latest.latest_created
            ORDER BY b.bank_code
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|r| LatestPrediction {
                bank_code: r.0,
                bank_name: r.1,
                prediction_date: r.2,
                predicted_price: r.3,
                actual_price: r.4,
                error_percentage: r.5,
            })
            .collect())
    }
}
