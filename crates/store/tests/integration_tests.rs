use chrono::NaiveDate;
use stockcast_core::store::port::{
    BankStock, BankStore, NewUser, PredictionStore, UserRole, UserStore, UserUpdate,
};
use stockcast_store::config::set_root_dir;
use stockcast_store::system::SqliteSystemStore;
use tempfile::tempdir;

fn sample_stock(date: NaiveDate, close: f64) -> BankStock {
    BankStock {
        trade_date: date,
        close_price: Some(close),
        open_price: Some(close - 0.2),
        high: Some(close + 0.5),
        low: Some(close - 0.5),
        volume: Some(1_000_000.0),
        percentage_change: Some(0.8),
        gdp: None,
        interest_rate: Some(2.5),
        total_assets: None,
        total_equity: None,
        total_liabilities: None,
        net_profit: None,
        eps: Some(1.1),
        pe: Some(8.4),
        pbv: Some(0.7),
        market_cap: None,
        book_value_per_share: None,
        roe: Some(9.3),
        roa: Some(1.2),
    }
}

#[tokio::test]
async fn test_store_full_integration() {
    // 1. 初始化临时测试环境
    let tmp_dir = tempdir().expect("Failed to create temp dir");
    set_root_dir(tmp_dir.path().to_path_buf());

    let store = SqliteSystemStore::new()
        .await
        .expect("Failed to create system store");

    // 2. 初始化应当种入默认管理员与三家银行
    let admin = store
        .get_user_by_username("admin")
        .await
        .unwrap()
        .expect("Seeded admin should exist");
    assert_eq!(admin.role, UserRole::Admin);

    let banks = store.list_banks().await.unwrap();
    assert_eq!(banks.len(), 3);
    let ktb = store
        .get_bank_by_code("KTB")
        .await
        .unwrap()
        .expect("KTB should be seeded");
    assert!(store.get_bank_by_code("XXX").await.unwrap().is_none());

    // 3. 用户 CRUD 与唯一约束
    let new_id = store
        .create_user(&NewUser {
            username: "trader".to_string(),
            email: "trader@example.com".to_string(),
            password_hash: "$2b$12$fakehash".to_string(),
            role: UserRole::User,
        })
        .await
        .unwrap();

    assert!(
        store
            .username_or_email_taken("trader", "other@example.com", None)
            .await
            .unwrap()
    );
    assert!(
        !store
            .username_or_email_taken("trader", "trader@example.com", Some(new_id))
            .await
            .unwrap()
    );

    // 重复用户名应映射为 Conflict
    let dup = store
        .create_user(&NewUser {
            username: "trader".to_string(),
            email: "second@example.com".to_string(),
            password_hash: "$2b$12$fakehash".to_string(),
            role: UserRole::User,
        })
        .await;
    assert!(matches!(
        dup,
        Err(stockcast_core::store::error::StoreError::Conflict(_))
    ));

    store
        .update_user(
            new_id,
            &UserUpdate {
                username: "trader".to_string(),
                email: "trader@example.com".to_string(),
                password_hash: None,
                role: UserRole::Admin,
            },
        )
        .await
        .unwrap();
    let updated = store.get_user(new_id).await.unwrap().unwrap();
    assert_eq!(updated.role, UserRole::Admin);
    // 未提供新密码时保留原哈希
    assert_eq!(updated.password_hash, "$2b$12$fakehash");

    store.delete_user(new_id).await.unwrap();
    assert!(matches!(
        store.delete_user(new_id).await,
        Err(stockcast_core::store::error::StoreError::NotFound)
    ));

    // 4. 行情 Upsert 与历史查询
    let d1 = NaiveDate::from_ymd_opt(2026, 8, 27).unwrap();
    let d2 = NaiveDate::from_ymd_opt(2026, 8, 28).unwrap();
    store.upsert_stock(ktb.id, &sample_stock(d1, 17.8)).await.unwrap();
    store.upsert_stock(ktb.id, &sample_stock(d2, 18.0)).await.unwrap();
    // 同一交易日重复写入应覆盖而非追加
    store.upsert_stock(ktb.id, &sample_stock(d2, 18.1)).await.unwrap();

    let history = store.stock_history(ktb.id, 30).await.unwrap();
    assert_eq!(history.len(), 2);
    // 升序返回：旧日期在前
    assert_eq!(history[0].trade_date, d1);
    assert_eq!(history[1].close_price, Some(18.1));

    let latest = store.latest_stocks().await.unwrap();
    let ktb_latest = latest
        .iter()
        .find(|s| s.bank_code == "KTB")
        .expect("KTB should have a latest row");
    assert_eq!(ktb_latest.stock.trade_date, d2);
    assert_eq!(ktb_latest.bank_name, "Krung Thai Bank");

    // 删除最新交易日的行情后，latest 回退到前一交易日
    store.delete_stock(ktb.id, d2).await.unwrap();
    assert!(matches!(
        store.delete_stock(ktb.id, d2).await,
        Err(stockcast_core::store::error::StoreError::NotFound)
    ));
    let latest = store.latest_stocks().await.unwrap();
    let ktb_latest = latest
        .iter()
        .find(|s| s.bank_code == "KTB")
        .expect("KTB should still have a latest row");
    assert_eq!(ktb_latest.stock.trade_date, d1);

    // 5. 预测台账 Upsert 幂等性
    let today = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
    store.upsert_prediction(ktb.id, today, 18.2).await.unwrap();
    store.upsert_prediction(ktb.id, today, 18.9).await.unwrap();

    let predictions = store.latest_predictions().await.unwrap();
    assert_eq!(predictions.len(), 1);
    assert_eq!(predictions[0].bank_code, "KTB");
    assert_eq!(predictions[0].prediction_date, today);
    // 同日重复预测以第二次为准
    assert_eq!(predictions[0].predicted_price, 18.9);
    assert!(predictions[0].actual_price.is_none());

    // 6. 不同日历日各自保留一行，latest 取 created_at 最大者
    let tomorrow = NaiveDate::from_ymd_opt(2026, 8, 31).unwrap();
    store.upsert_prediction(ktb.id, tomorrow, 19.0).await.unwrap();
    let predictions = store.latest_predictions().await.unwrap();
    assert_eq!(predictions.len(), 1);
    assert_eq!(predictions[0].prediction_date, tomorrow);
    assert_eq!(predictions[0].predicted_price, 19.0);
}
