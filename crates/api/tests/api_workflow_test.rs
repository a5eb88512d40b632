use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use utoipa::OpenApi;

use stockcast_api::server::AppState;
use stockcast_api::types::{
    ApiResponse, BankResponse, LatestPredictionResponse, LatestStockResponse, LoginRequest,
    LoginResponse, PredictionResponse, RegisterRequest, StockDto, UserResponse,
};
use stockcast_core::predict::port::PredictorPort;
use stockcast_core::store::port::{BankStore, PredictionStore, UserStore};
use stockcast_predictor::script::ScriptPredictor;
use stockcast_store::system::SqliteSystemStore;

// 帮助函数：以给定的存储与预测端口在随机端口启动测试服务器
//
// start_server 内部自行 bind，测试里改用已知端口的 listener 手动组装路由
async fn spawn_test_server(
    store: Arc<SqliteSystemStore>,
    predictor: Arc<dyn PredictorPort>,
) -> String {
    let state = AppState {
        user_store: store.clone() as Arc<dyn UserStore>,
        bank_store: store.clone() as Arc<dyn BankStore>,
        prediction_store: store as Arc<dyn PredictionStore>,
        predictor,
        app_config: Arc::new(stockcast_core::config::AppConfig::default()),
    };

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let addr = format!("http://127.0.0.1:{}", port);

    let (router, _api) = utoipa_axum::router::OpenApiRouter::with_openapi(
        stockcast_api::server::ApiDoc::openapi(),
    )
    .merge(
        utoipa_axum::router::OpenApiRouter::new()
            .routes(utoipa_axum::routes!(stockcast_api::routes::auth::register))
            .routes(utoipa_axum::routes!(stockcast_api::routes::auth::login))
            .routes(utoipa_axum::routes!(stockcast_api::routes::banks::list_banks))
            .routes(utoipa_axum::routes!(stockcast_api::routes::banks::latest_stocks))
            .routes(utoipa_axum::routes!(stockcast_api::routes::banks::stock_history)),
    )
    .merge(
        utoipa_axum::router::OpenApiRouter::new()
            .routes(utoipa_axum::routes!(stockcast_api::routes::auth::me))
            .routes(utoipa_axum::routes!(stockcast_api::routes::predictions::predict))
            .routes(utoipa_axum::routes!(
                stockcast_api::routes::predictions::latest_predictions
            ))
            .layer(axum::middleware::from_fn_with_state(
                state.clone(),
                stockcast_api::middleware::auth::auth_middleware,
            )),
    )
    .merge(
        utoipa_axum::router::OpenApiRouter::new()
            .routes(utoipa_axum::routes!(stockcast_api::routes::users::list_users))
            .routes(utoipa_axum::routes!(stockcast_api::routes::users::get_user))
            .routes(utoipa_axum::routes!(stockcast_api::routes::users::create_user))
            .routes(utoipa_axum::routes!(stockcast_api::routes::users::update_user))
            .routes(utoipa_axum::routes!(stockcast_api::routes::users::delete_user))
            .routes(utoipa_axum::routes!(stockcast_api::routes::banks::upsert_stock))
            .routes(utoipa_axum::routes!(stockcast_api::routes::banks::delete_stock))
            .layer(axum::middleware::from_fn(
                stockcast_api::middleware::auth::require_admin,
            ))
            .layer(axum::middleware::from_fn_with_state(
                state.clone(),
                stockcast_api::middleware::auth::auth_middleware,
            )),
    )
    .with_state(state)
    .split_for_parts();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    // 稍微等待服务器启动
    tokio::time::sleep(Duration::from_millis(500)).await;

    addr
}

#[tokio::test]
async fn test_full_api_workflow() {
    let _ = tracing_subscriber::fmt().with_env_filter("debug").try_init();

    let tmp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    stockcast_store::config::set_root_dir(tmp_dir.path().to_path_buf());

    // 种子数据：admin/admin123 + 三家银行
    let store = Arc::new(SqliteSystemStore::new().await.unwrap());

    // 固定输出的预测脚本桩
    let script = tmp_dir.path().join("predict_stub.sh");
    std::fs::write(&script, "#!/bin/sh\necho '{\"predicted_price\": 18.25}'\n").unwrap();
    let predictor: Arc<dyn PredictorPort> = Arc::new(ScriptPredictor::with_parts(
        "sh",
        &script,
        Duration::from_secs(5),
    ));

    let base_url = spawn_test_server(store.clone(), predictor).await;
    let client = reqwest::Client::new();

    // ============================================
    // Case 1: 未认证访问预测接口被拒绝
    // ============================================
    let res = client
        .post(format!("{}/api/v1/banks/KTB/predict", base_url))
        .json(&serde_json::json!({"window": 7}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());

    // ============================================
    // Case 2: 登录失败 (密码错误)
    // ============================================
    let res = client
        .post(format!("{}/api/v1/auth/login", base_url))
        .json(&LoginRequest {
            username: "admin".to_string(),
            password: "wrongpassword".to_string(),
        })
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // ============================================
    // Case 3: 成功登录种子 Admin
    // ============================================
    let res = client
        .post(format!("{}/api/v1/auth/login", base_url))
        .json(&LoginRequest {
            username: "admin".to_string(),
            password: "admin123".to_string(),
        })
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let login_data: ApiResponse<LoginResponse> = res.json().await.unwrap();
    let admin_token = login_data.data.unwrap().token;

    // ============================================
    // Case 4: 公开注册普通用户并登录
    // ============================================
    let res = client
        .post(format!("{}/api/v1/auth/register", base_url))
        .json(&RegisterRequest {
            username: "trader_01".to_string(),
            email: "trader01@example.com".to_string(),
            password: "trader_password".to_string(),
        })
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let reg_data: ApiResponse<UserResponse> = res.json().await.unwrap();
    assert_eq!(reg_data.data.unwrap().role, "user");

    // 重复注册同名用户被拒绝
    let res = client
        .post(format!("{}/api/v1/auth/register", base_url))
        .json(&RegisterRequest {
            username: "trader_01".to_string(),
            email: "other@example.com".to_string(),
            password: "whatever".to_string(),
        })
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(format!("{}/api/v1/auth/login", base_url))
        .json(&LoginRequest {
            username: "trader_01".to_string(),
            password: "trader_password".to_string(),
        })
        .send()
        .await
        .unwrap();
    let trader_login: ApiResponse<LoginResponse> = res.json().await.unwrap();
    let trader_token = trader_login.data.unwrap().token;

    // ============================================
    // Case 5: 权限隔离 - 普通用户访问用户管理被拒绝
    // ============================================
    let res = client
        .get(format!("{}/api/v1/users", base_url))
        .bearer_auth(&trader_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN, "非管理员无法管理用户");

    // Admin 可以列出用户 (种子 admin + trader_01)
    let res = client
        .get(format!("{}/api/v1/users", base_url))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let users: ApiResponse<Vec<UserResponse>> = res.json().await.unwrap();
    assert_eq!(users.data.unwrap().len(), 2);

    // ============================================
    // Case 6: 公开查询银行清单 (种子三家银行)
    // ============================================
    let res = client
        .get(format!("{}/api/v1/banks", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let banks: ApiResponse<Vec<BankResponse>> = res.json().await.unwrap();
    let banks = banks.data.unwrap();
    assert_eq!(banks.len(), 3);
    assert!(banks.iter().any(|b| b.code == "KTB"));

    // ============================================
    // Case 6b: 行情录入与删除 (仅管理员)
    // ============================================
    let stock = StockDto {
        trade_date: chrono::NaiveDate::from_ymd_opt(2026, 8, 28).unwrap(),
        close_price: Some(18.0),
        open_price: Some(17.8),
        high: Some(18.3),
        low: Some(17.6),
        volume: Some(1_000_000.0),
        percentage_change: Some(1.1),
        gdp: None,
        interest_rate: None,
        total_assets: None,
        total_equity: None,
        total_liabilities: None,
        net_profit: None,
        eps: None,
        pe: None,
        pbv: None,
        market_cap: None,
        book_value_per_share: None,
        roe: None,
        roa: None,
    };

    // 普通用户写入被拒绝
    let res = client
        .post(format!("{}/api/v1/banks/KTB/stocks", base_url))
        .bearer_auth(&trader_token)
        .json(&stock)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .post(format!("{}/api/v1/banks/KTB/stocks", base_url))
        .bearer_auth(&admin_token)
        .json(&stock)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // 公开的 latest 能看到刚写入的行
    let res = client
        .get(format!("{}/api/v1/banks/latest", base_url))
        .send()
        .await
        .unwrap();
    let rows: ApiResponse<Vec<LatestStockResponse>> = res.json().await.unwrap();
    let rows = rows.data.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].bank_code, "KTB");
    assert_eq!(rows[0].stock.close_price, Some(18.0));

    // 管理员删除该交易日的行情行；重复删除 404
    let res = client
        .delete(format!("{}/api/v1/banks/KTB/stocks/2026-08-28", base_url))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .delete(format!("{}/api/v1/banks/KTB/stocks/2026-08-28", base_url))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // ============================================
    // Case 7: 普通用户执行预测 (脚本桩输出 18.25)
    // ============================================
    let res = client
        .post(format!("{}/api/v1/banks/KTB/predict", base_url))
        .bearer_auth(&trader_token)
        .json(&serde_json::json!({"window": 7}))
        .send()
        .await
        .unwrap();
    let status = res.status();
    let body_text = res.text().await.unwrap();
    assert_eq!(
        status,
        StatusCode::OK,
        "Expected 200 OK but got {}: {}",
        status,
        body_text
    );
    let pred: ApiResponse<PredictionResponse> = serde_json::from_str(&body_text).unwrap();
    let pred = pred.data.unwrap();
    assert_eq!(pred.bank_code, "KTB");
    assert!((pred.predicted_price - 18.25).abs() < f64::EPSILON);

    // 预测已落入台账，latest 能查回来
    let res = client
        .get(format!("{}/api/v1/predictions/latest", base_url))
        .bearer_auth(&trader_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let latest: ApiResponse<Vec<LatestPredictionResponse>> = res.json().await.unwrap();
    let latest = latest.data.unwrap();
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].bank_code, "KTB");
    assert!((latest[0].predicted_price - 18.25).abs() < f64::EPSILON);

    // ============================================
    // Case 8: 未知银行预测 404 (不会启动子进程)
    // ============================================
    let res = client
        .post(format!("{}/api/v1/banks/NOPE/predict", base_url))
        .bearer_auth(&trader_token)
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // ============================================
    // Case 9: 被篡改的 Token 被拒绝
    // ============================================
    let mut tampered = trader_token.clone();
    tampered.pop();
    tampered.push('x');
    let res = client
        .get(format!("{}/api/v1/auth/me", base_url))
        .bearer_auth(&tampered)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // ============================================
    // Case 10: Admin 不能删除自己
    // ============================================
    let res = client
        .get(format!("{}/api/v1/auth/me", base_url))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    let me: ApiResponse<UserResponse> = res.json().await.unwrap();
    let admin_id = me.data.unwrap().id;

    let res = client
        .delete(format!("{}/api/v1/users/{}", base_url, admin_id))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST, "禁止删除当前会话账户");

    // ============================================
    // Case 11: 失败的预测程序 - 细节不透传、台账不写入
    // ============================================
    // 用一个永远失败的脚本桩再起一个服务实例，共享同一数据库
    let broken_script = tmp_dir.path().join("broken_stub.sh");
    std::fs::write(
        &broken_script,
        "#!/bin/sh\necho 'model blew up: secret path /opt/models' >&2\nexit 3\n",
    )
    .unwrap();
    let broken_predictor: Arc<dyn PredictorPort> = Arc::new(ScriptPredictor::with_parts(
        "sh",
        &broken_script,
        Duration::from_secs(5),
    ));
    let broken_url = spawn_test_server(store, broken_predictor).await;

    let res = client
        .post(format!("{}/api/v1/banks/BBL/predict", broken_url))
        .bearer_auth(&trader_token)
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = res.json().await.unwrap();
    // 对外不泄漏 stderr 细节与退出码
    let err = body["error"].as_str().unwrap();
    assert!(!err.contains("secret path"));
    assert!(!err.contains("exit"));

    // 失败的预测绝不入库：台账中仍只有 Case 7 的 KTB 一行
    let res = client
        .get(format!("{}/api/v1/predictions/latest", broken_url))
        .bearer_auth(&trader_token)
        .send()
        .await
        .unwrap();
    let latest: ApiResponse<Vec<LatestPredictionResponse>> = res.json().await.unwrap();
    let latest = latest.data.unwrap();
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].bank_code, "KTB");
}
