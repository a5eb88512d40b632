use thiserror::Error;

/// # Summary
/// 预测域错误枚举，对一次子进程调用的失败方式分类。
///
/// # Invariants
/// - `RoutineFailed` 携带子进程 stderr 文本；`MalformedOutput` 携带原始 stdout 文本。
///   两者语义不同：前者是计算失败，后者是输出契约被违反。
#[derive(Error, Debug)]
pub enum PredictError {
    /// 子进程无法启动 (程序缺失、权限不足等)
    #[error("Failed to spawn prediction routine: {0}")]
    Spawn(String),
    /// 子进程以非零状态退出，携带 stderr 诊断文本
    #[error("Prediction routine failed: {0}")]
    RoutineFailed(String),
    /// 子进程退出码为 0 但 stdout 无法解析为预期结构
    #[error("Malformed prediction output: {0}")]
    MalformedOutput(String),
    /// 子进程超过硬超时，已被强制终止
    #[error("Prediction routine timed out after {0}s")]
    Timeout(u64),
}
