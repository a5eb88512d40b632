//! # `stockcast-predictor` - 子进程预测调用层
//!
//! 以子进程方式实现 `stockcast-core` 的 `PredictorPort`：
//! 每次请求启动一个独立的外部预测程序，流式收集其 stdout / stderr，
//! 按退出状态对结果分类，并保证子进程绝不比本次调用活得更久。

pub mod script;
