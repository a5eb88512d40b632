use serde::{Deserialize, Serialize};

/// 全局应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub predictor: PredictorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub data_dir: String,
}

/// 外部预测脚本的调用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictorConfig {
    /// 解释器 (如 "python3")
    pub program: String,
    /// 预测脚本路径
    pub script: String,
    /// 单次预测的硬超时 (秒)，超时后子进程会被强制终止
    pub timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                jwt_secret: "YOUR_SUPER_SECRET_KEY".to_string(), // Default for dev, should be overwritten by config
            },
            database: DatabaseConfig {
                data_dir: "data".to_string(),
            },
            predictor: PredictorConfig {
                program: "python3".to_string(),
                script: "models/predict.py".to_string(),
                timeout_secs: 30,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.jwt_secret, "YOUR_SUPER_SECRET_KEY");
        assert_eq!(config.database.data_dir, "data");
        assert_eq!(config.predictor.program, "python3");
        assert_eq!(config.predictor.timeout_secs, 30);
    }
}
