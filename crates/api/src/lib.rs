//! # `stockcast-api` - HTTP API 网关
//!
//! 本 crate 是 Stockcast 银行股价预测后端的 HTTP/REST 服务入口。
//! 使用 `axum` 构建路由与控制器，通过 `utoipa` 自动生成 OpenAPI 3.0 Swagger 文档。
//!
//! ## 架构职责
//! - 接收来自前端的 HTTP 请求
//! - 执行 JWT 鉴权后分发至 Public / User / Admin 路由组
//! - 调用下层存储端口与预测端口完成业务操作
//! - 将领域模型转换为 DTO 返回给前端

pub mod types;
pub mod error;
pub mod token;

pub mod middleware {
    pub mod auth;
}

pub mod routes {
    pub mod auth;
    pub mod banks;
    pub mod predictions;
    pub mod users;
}

pub mod server;
