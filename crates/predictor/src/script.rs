use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use stockcast_core::config::PredictorConfig;
use stockcast_core::predict::entity::Forecast;
use stockcast_core::predict::error::PredictError;
use stockcast_core::predict::port::PredictorPort;

/// # Summary
/// 外部预测脚本的子进程调用实现。
///
/// 每次 `predict` 启动一个新的子进程：
/// `<program> <script> <bank_code> <json_payload>`，
/// 等待其退出后按退出状态分类结果。
///
/// # Invariants
/// - 每次调用恰好产生一个子进程，调用之间不共享任何进程状态。
/// - `kill_on_drop` 保证超时或请求被放弃时子进程被强制终止，不会泄漏。
pub struct ScriptPredictor {
    program: String,
    script: PathBuf,
    timeout: Duration,
}

impl ScriptPredictor {
    /// 从应用配置构建。
    pub fn new(config: &PredictorConfig) -> Self {
        Self {
            program: config.program.clone(),
            script: PathBuf::from(&config.script),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// 直接指定各参数构建（测试场景）。
    pub fn with_parts(
        program: impl Into<String>,
        script: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Self {
        Self {
            program: program.into(),
            script: script.into(),
            timeout,
        }
    }
}

#[async_trait]
impl PredictorPort for ScriptPredictor {
    /// # Summary
    /// 对指定银行执行一次预测调用。
    ///
    /// # Logic
    /// 1. 将输入载荷序列化为 JSON 文本。
    /// 2. 启动子进程，stdout / stderr 均为管道；`wait_with_output`
    ///    并发排空两个管道，stderr 再多的诊断输出也不会阻塞结果读取。
    /// 3. 超时则丢弃子进程句柄（`kill_on_drop` 负责终止）并返回 `Timeout`。
    /// 4. 非零退出状态返回 `RoutineFailed`，携带 stderr 文本，不解析 stdout。
    /// 5. 零退出状态解析 stdout JSON；解析失败返回 `MalformedOutput`。
    async fn predict(
        &self,
        bank_code: &str,
        input: &serde_json::Value,
    ) -> Result<Forecast, PredictError> {
        let payload = serde_json::to_string(input)
            .map_err(|e| PredictError::Spawn(format!("Failed to serialize input: {e}")))?;

        debug!("Spawning prediction routine for bank {}", bank_code);

        let mut cmd = Command::new(&self.program);
        cmd.arg(&self.script)
            .arg(bank_code)
            .arg(&payload)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd
            .spawn()
            .map_err(|e| PredictError::Spawn(e.to_string()))?;

        let output = match timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(PredictError::Spawn(format!(
                    "Failed to collect routine output: {e}"
                )));
            }
            Err(_) => {
                // 超时：child 随 future 一起被 drop，kill_on_drop 终止进程
                warn!(
                    "Prediction routine for bank {} exceeded {}s, killed",
                    bank_code,
                    self.timeout.as_secs()
                );
                return Err(PredictError::Timeout(self.timeout.as_secs()));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(
                "Prediction routine for bank {} exited with {}: {}",
                bank_code, output.status, stderr
            );
            return Err(PredictError::RoutineFailed(stderr));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let raw = stdout.trim();
        serde_json::from_str::<Forecast>(raw)
            .map_err(|_| PredictError::MalformedOutput(raw.to_string()))
    }
}
