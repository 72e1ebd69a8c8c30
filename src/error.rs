//! 全局错误类型定义

use thiserror::Error;
use regex::Error as RegexError;
use serde_json::Error as SerdeJsonError;
use std::io::Error as IoError;
use url::ParseError as UrlParseError;

#[derive(Error, Debug)]
pub enum DispensaryError {
    // 记录级错误（单条记录丢弃，流水线继续）
    #[error("原始记录缺少必填字段：来源={source_id}，门店={store}，字段={field}")]
    MalformedRecord {
        source_id: String,
        store: String,
        field: &'static str,
    },

    // 数据源级错误（隔离到单个适配器）
    #[error("数据源 [{source_id}] 拉取失败：{reason}")]
    AdapterFailure { source_id: String, reason: String },
    #[error("数据源 [{source_id}] 超时（{secs} 秒）")]
    AdapterTimeout { source_id: String, secs: u64 },

    // 快照存储相关错误
    #[error("快照存储不可用：{0}")]
    SinkUnavailable(String),
    #[error("无可用数据：{0}")]
    NoData(String),

    // 标准化映射表相关错误
    #[error("映射表加载失败：{0}")]
    MapLoadError(String),
    #[error("映射表冲突：{0}")]
    MapConflict(String),

    // 网络相关错误
    #[error("网络请求失败：{0}")]
    HttpError(#[from] reqwest::Error),

    // 序列化/反序列化错误
    #[error("JSON解析失败：{0}")]
    JsonError(#[from] SerdeJsonError),
    #[error("MessagePack序列化/反序列化失败：{0}")]
    MsgPackError(String),

    // 基础错误
    #[error("正则编译失败：{0}")]
    RegexCompileError(#[from] RegexError),
    #[error("IO操作失败：{0}")]
    IoError(#[from] IoError),
    #[error("URL解析失败：{0}")]
    UrlError(#[from] UrlParseError),
    #[error("无效日期键：{0}")]
    InvalidDateKey(String),
    #[error("无效输入：{0}")]
    InvalidInput(String),
}

impl DispensaryError {
    /// 是否为数据源级失败（超时也算）
    pub fn is_adapter_failure(&self) -> bool {
        matches!(
            self,
            DispensaryError::AdapterFailure { .. } | DispensaryError::AdapterTimeout { .. }
        )
    }
}

// 全局Result类型
pub type DispResult<T> = Result<T, DispensaryError>;
