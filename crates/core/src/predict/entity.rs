use serde::{Deserialize, Serialize};

/// # Summary
/// 外部预测程序的结构化输出，是一次成功调用的唯一产物。
///
/// # Invariants
/// - `predicted_price` 来自子进程 stdout 的 JSON 对象，必须为有限数值。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Forecast {
    // 预测价格
    pub predicted_price: f64,
}
