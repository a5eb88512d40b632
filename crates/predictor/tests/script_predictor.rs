use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::json;
use stockcast_core::predict::error::PredictError;
use stockcast_core::predict::port::PredictorPort;
use stockcast_predictor::script::ScriptPredictor;
use tempfile::tempdir;

const TIMEOUT: Duration = Duration::from_secs(10);

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).expect("Failed to write stub script");
    path
}

#[tokio::test]
async fn test_successful_forecast_is_parsed() {
    let tmp = tempdir().unwrap();
    // 多余字段应被忽略，只要 predicted_price 存在
    let script = write_script(
        tmp.path(),
        "ok.sh",
        "echo '{\"predicted_price\": 42.5, \"model\": \"lstm-v2\"}'\n",
    );

    let predictor = ScriptPredictor::with_parts("sh", script, TIMEOUT);
    let forecast = predictor.predict("KTB", &json!({})).await.unwrap();
    assert_eq!(forecast.predicted_price, 42.5);
}

#[tokio::test]
async fn test_nonzero_exit_carries_stderr() {
    let tmp = tempdir().unwrap();
    let script = write_script(tmp.path(), "fail.sh", "echo 'model error' >&2\nexit 1\n");

    let predictor = ScriptPredictor::with_parts("sh", script, TIMEOUT);
    let err = predictor.predict("KTB", &json!({})).await.unwrap_err();
    match err {
        PredictError::RoutineFailed(diag) => assert!(diag.contains("model error")),
        other => panic!("Expected RoutineFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_nonzero_exit_wins_over_parseable_stdout() {
    let tmp = tempdir().unwrap();
    // 退出码非零时不得解析 stdout，即使其内容本身可解析
    let script = write_script(
        tmp.path(),
        "partial.sh",
        "echo '{\"predicted_price\": 1.0}'\necho 'diverged' >&2\nexit 2\n",
    );

    let predictor = ScriptPredictor::with_parts("sh", script, TIMEOUT);
    let err = predictor.predict("KTB", &json!({})).await.unwrap_err();
    assert!(matches!(err, PredictError::RoutineFailed(_)));
}

#[tokio::test]
async fn test_malformed_output_carries_raw_text() {
    let tmp = tempdir().unwrap();
    let script = write_script(tmp.path(), "garbage.sh", "echo 'not a json object'\n");

    let predictor = ScriptPredictor::with_parts("sh", script, TIMEOUT);
    let err = predictor.predict("KTB", &json!({})).await.unwrap_err();
    match err {
        PredictError::MalformedOutput(raw) => assert_eq!(raw, "not a json object"),
        other => panic!("Expected MalformedOutput, got {other:?}"),
    }
}

#[tokio::test]
async fn test_timeout_kills_routine() {
    let tmp = tempdir().unwrap();
    let script = write_script(
        tmp.path(),
        "slow.sh",
        "sleep 30\necho '{\"predicted_price\": 1.0}'\n",
    );

    let predictor = ScriptPredictor::with_parts("sh", script, Duration::from_secs(1));
    let started = std::time::Instant::now();
    let err = predictor.predict("KTB", &json!({})).await.unwrap_err();
    assert!(matches!(err, PredictError::Timeout(1)));
    // 超时应立即返回，而不是等子进程自然结束
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_spawn_failure_is_classified() {
    let predictor = ScriptPredictor::with_parts("/nonexistent/interpreter", "x.sh", TIMEOUT);
    let err = predictor.predict("KTB", &json!({})).await.unwrap_err();
    assert!(matches!(err, PredictError::Spawn(_)));
}

#[tokio::test]
async fn test_large_stderr_does_not_deadlock() {
    let tmp = tempdir().unwrap();
    // stderr 写入量远超管道缓冲区，若两个流未并发排空此测试会卡死
    let script = write_script(
        tmp.path(),
        "noisy.sh",
        "i=0\nwhile [ $i -lt 20000 ]; do echo \"diagnostic noise line $i\" >&2; i=$((i+1)); done\necho '{\"predicted_price\": 5.0}'\n",
    );

    let predictor = ScriptPredictor::with_parts("sh", script, TIMEOUT);
    let forecast = predictor.predict("KTB", &json!({})).await.unwrap();
    assert_eq!(forecast.predicted_price, 5.0);
}

#[tokio::test]
async fn test_positional_argument_contract() {
    let tmp = tempdir().unwrap();
    // $1 = 银行代码, $2 = JSON 序列化后的输入载荷
    let script = write_script(
        tmp.path(),
        "args.sh",
        "[ \"$1\" = 'KTB' ] || { echo \"bad code: $1\" >&2; exit 9; }\n\
         [ \"$2\" = '{\"window\":7}' ] || { echo \"bad payload: $2\" >&2; exit 9; }\n\
         echo '{\"predicted_price\": 3.0}'\n",
    );

    let predictor = ScriptPredictor::with_parts("sh", script, TIMEOUT);
    let forecast = predictor.predict("KTB", &json!({"window": 7})).await.unwrap();
    assert_eq!(forecast.predicted_price, 3.0);
}

#[tokio::test]
async fn test_concurrent_invocations_are_isolated() {
    let tmp = tempdir().unwrap();
    // 以银行代码回显价格，各并发调用必须各自拿到自己的结果
    let script = write_script(
        tmp.path(),
        "echo_code.sh",
        "echo \"{\\\"predicted_price\\\": $1}\"\n",
    );

    let predictor = std::sync::Arc::new(ScriptPredictor::with_parts("sh", script, TIMEOUT));

    let tasks: Vec<_> = (1..=8)
        .map(|i| {
            let predictor = predictor.clone();
            tokio::spawn(async move {
                let code = format!("{i}");
                let forecast = predictor.predict(&code, &json!({})).await.unwrap();
                (i, forecast.predicted_price)
            })
        })
        .collect();

    for task in tasks {
        let (i, price) = task.await.unwrap();
        assert_eq!(price, f64::from(i));
    }
}
