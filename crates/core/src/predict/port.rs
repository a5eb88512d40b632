use crate::predict::entity::Forecast;
use crate::predict::error::PredictError;
use async_trait::async_trait;

/// # Summary
/// 预测调用能力接口 (Port)。
/// 由 `crates/predictor` 以子进程方式实现，通过 `crates/app` 注入到 API 层，
/// 使路由控制器无需编译期依赖任何具体预测实现。
///
/// # Invariants
/// - 实现类必须保证线程安全 (`Send` + `Sync`)。
/// - 每次调用彼此隔离：并发调用之间不得共享任何运行时状态。
#[async_trait]
pub trait PredictorPort: Send + Sync {
    /// # Summary
    /// 对指定银行执行一次预测调用。
    ///
    /// # Logic
    /// 1. 将 `input` 序列化为 JSON 传递给外部预测程序。
    /// 2. 等待程序完成并按退出状态分类结果。
    ///
    /// # Arguments
    /// * `bank_code`: 银行短代码，作为程序第一个位置参数。
    /// * `input`: 任意结构化输入载荷，序列化后作为第二个位置参数。
    ///
    /// # Returns
    /// 成功返回 `Forecast`，失败返回已分类的 `PredictError`。
    async fn predict(
        &self,
        bank_code: &str,
        input: &serde_json::Value,
    ) -> Result<Forecast, PredictError>;
}
