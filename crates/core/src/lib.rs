//! # `stockcast-core` - 领域核心层
//!
//! 定义 Stockcast 银行股价预测后端的领域实体、端口 (Port) 抽象与错误类型。
//! 本 crate 不依赖任何具体基础设施（数据库、HTTP、子进程），
//! 由 `crates/store`、`crates/predictor` 提供具体实现，`crates/app` 负责注入。

pub mod config;

pub mod store {
    pub mod error;
    pub mod port;
}

pub mod predict {
    pub mod entity;
    pub mod error;
    pub mod port;
}
