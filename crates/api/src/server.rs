//! # API 服务启动器
//!
//! 组装 axum 路由、挂载 Swagger UI、配置 CORS 并绑定 TCP 端口对外提供服务。
//! 本模块不直接启动 `main()`, 而是由 `crates/app` 的 DI 容器持有并调用。

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;
use utoipa_swagger_ui::SwaggerUi;

use stockcast_core::config::AppConfig;
use stockcast_core::predict::port::PredictorPort;
use stockcast_core::store::port::{BankStore, PredictionStore, UserStore};

use crate::routes::{auth, banks, predictions, users};

// ============================================================
//  共享应用状态
// ============================================================

/// 全局应用状态，通过 axum 的 `State` 提取器注入到每个 Handler 中。
///
/// # Invariants
/// - 各端口在服务启动前由 DI 容器注入，生命周期与进程等同。
/// - `app_config` 持有 JWT 签名密钥，签发与校验必须使用同一份。
#[derive(Clone)]
pub struct AppState {
    /// 用户数据访问接口 (用于登录与用户管理)
    pub user_store: Arc<dyn UserStore>,
    /// 银行与行情数据访问接口
    pub bank_store: Arc<dyn BankStore>,
    /// 预测台账数据访问接口
    pub prediction_store: Arc<dyn PredictionStore>,
    /// 外部预测程序调用端口
    pub predictor: Arc<dyn PredictorPort>,
    /// 全局应用配置
    pub app_config: Arc<AppConfig>,
}

// ============================================================
//  OpenAPI 文档定义
// ============================================================

/// 全局 OpenAPI 文档结构
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Stockcast 银行股价预测 API",
        version = "0.1.0",
        description = "Stockcast 银行股价预测后端的 RESTful API 网关。提供用户鉴权、银行行情查询与外部模型预测功能。",
        contact(name = "Stockcast Team"),
        license(name = "MIT")
    ),
    tags(
        (name = "鉴权 (Auth)", description = "JWT 获取、注册与当前用户查询相关 API"),
        (name = "用户管理 (Users)", description = "用户增删改查 (仅管理员)"),
        (name = "银行与行情 (Banks)", description = "银行清单、行情历史查询与行情录入"),
        (name = "预测 (Predictions)", description = "外部模型预测执行与预测台账查询")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// 为 OpenAPI 文档注入全局 Bearer JWT 鉴权方案。
///
/// 注册后，Swagger UI 页面顶部将显示 🔒 Authorize 按钮，
/// 用户可以填入 JWT Token 后对所有标记了 `security` 的接口进行鉴权测试。
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        // 若 components 不存在则创建
        let components = openapi.components.get_or_insert_with(Default::default);

        // 注册名为 "bearer_jwt" 的 HTTP Bearer 鉴权方案
        components.add_security_scheme(
            "bearer_jwt",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .description(Some(
                        "在此处填入登录接口返回的 JWT Token（无需 'Bearer ' 前缀）",
                    ))
                    .build(),
            ),
        );
    }
}

// ============================================================
//  服务构建与启动
// ============================================================

/// 构建完整的 axum 应用路由树并启动 HTTP 监听。
///
/// # Arguments
/// * `state` - 由外部 DI 容器注入的共享状态
/// * `bind_addr` - 监听的地址与端口，如 `"0.0.0.0:8080"`
pub async fn start_server(
    state: AppState,
    bind_addr: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    // 1. 无需鉴权的公开路由
    let public_router = OpenApiRouter::new()
        .routes(routes!(auth::register))
        .routes(routes!(auth::login))
        .routes(routes!(banks::list_banks))
        .routes(routes!(banks::latest_stocks))
        .routes(routes!(banks::stock_history));

    // 2. 只需要合法 JWT 鉴权的路由 (普通用户)
    let user_protected_router = OpenApiRouter::new()
        .routes(routes!(auth::me))
        .routes(routes!(predictions::predict))
        .routes(routes!(predictions::latest_predictions))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::auth::auth_middleware,
        ));

    // 3. 需要 Admin 角色鉴权的路由
    let admin_protected_router = OpenApiRouter::new()
        .routes(routes!(users::list_users))
        .routes(routes!(users::get_user))
        .routes(routes!(users::create_user))
        .routes(routes!(users::update_user))
        .routes(routes!(users::delete_user))
        .routes(routes!(banks::upsert_stock))
        .routes(routes!(banks::delete_stock))
        .layer(axum::middleware::from_fn(
            crate::middleware::auth::require_admin,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::auth::auth_middleware,
        ));

    // 4. 合并所有路由与自动收集的 OpenAPI Doc
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .merge(public_router)
        .merge(user_protected_router)
        .merge(admin_protected_router)
        .with_state(state)
        .split_for_parts();

    // 5. 配置 CORS (开发阶段允许所有来源)
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // 6. 合并 Swagger UI 路由并应用中间件
    let app: Router = router
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api))
        .layer(cors);

    // 7. 绑定端口并启动
    tracing::info!("🚀 Stockcast API Server listening on {}", bind_addr);
    tracing::info!("📖 Swagger UI: http://{}/swagger-ui/", bind_addr);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
