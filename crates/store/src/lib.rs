//! # `stockcast-store` - SQLite 持久化层
//!
//! 以 `sqlx` + SQLite 实现 `stockcast-core` 定义的三个存储端口
//! (`UserStore` / `BankStore` / `PredictionStore`)。
//! 所有表集中在单个 `app.db` 中，由一个共享连接池访问。

pub mod config;
pub mod system;
