use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use stockcast_api::server::{AppState, start_server};
use stockcast_core::config::AppConfig;
use stockcast_core::predict::port::PredictorPort;
use stockcast_core::store::port::{BankStore, PredictionStore, UserStore};
use stockcast_predictor::script::ScriptPredictor;
use stockcast_store::system::SqliteSystemStore;

/// # Summary
/// 加载应用配置：内置默认值 < 可选的 config.{toml,yaml,json} < 环境变量。
///
/// # Logic
/// 环境变量以 `STOCKCAST` 为前缀、`__` 为层级分隔符，
/// 如 `STOCKCAST__SERVER__JWT_SECRET` 覆盖 `server.jwt_secret`。
fn load_config() -> Result<AppConfig, config::ConfigError> {
    let defaults = config::Config::try_from(&AppConfig::default())?;

    config::Config::builder()
        .add_source(defaults)
        .add_source(config::File::with_name("config").required(false))
        .add_source(config::Environment::with_prefix("STOCKCAST").separator("__"))
        .build()?
        .try_deserialize::<AppConfig>()
}

/// # Summary
/// 应用启动入口，纯粹的 DI 容器。
/// 负责实例化所有具体实现组件并通过 Arc<dyn Trait> 注入到 API 层。
///
/// # Logic
/// 1. 初始化全局日志。
/// 2. 加载配置并固定数据目录。
/// 3. 实例化基础设施层（Store、Predictor）。
/// 4. 组装共享状态并启动 HTTP 服务（阻塞直至服务退出）。
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
    info!("Stockcast backend starting...");

    // 2. 加载配置
    let app_config = Arc::new(load_config()?);
    stockcast_store::config::set_root_dir(PathBuf::from(&app_config.database.data_dir));

    // 3. 实例化基础设施层
    let store = Arc::new(SqliteSystemStore::new().await?);
    let predictor: Arc<dyn PredictorPort> =
        Arc::new(ScriptPredictor::new(&app_config.predictor));

    // 4. 组装共享状态并启动 HTTP 服务
    let bind_addr = format!(
        "{}:{}",
        app_config.server.host, app_config.server.port
    );

    let state = AppState {
        user_store: store.clone() as Arc<dyn UserStore>,
        bank_store: store.clone() as Arc<dyn BankStore>,
        prediction_store: store as Arc<dyn PredictionStore>,
        predictor,
        app_config,
    };

    start_server(state, &bind_addr).await?;

    Ok(())
}
