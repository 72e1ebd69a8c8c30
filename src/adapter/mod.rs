//! 数据源适配器：每个零售商/菜单平台一个适配器，产出原始记录
pub mod vendor;
pub mod memory;
pub mod replay;
pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DispResult;
use crate::model::RawProductRecord;

pub use self::vendor::VendorSchema;
pub use self::memory::{StaticAdapter, StaticBehavior};
pub use self::replay::ReplayAdapter;
pub use self::http::HttpMenuAdapter;

/// 门店引用：id 用于拼接请求/目录，name 写入记录的门店标记
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoreRef {
    pub id: String,
    pub name: String,
}

impl StoreRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// id 与 name 相同的门店
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: name.clone(),
            name,
        }
    }
}

/// 单个门店的失败（数据源其余门店照常返回）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreFailure {
    pub store: String,
    pub reason: String,
}

/// 一次拉取的结果：原始记录 + 被跳过的门店
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOutcome {
    pub records: Vec<RawProductRecord>,
    pub store_failures: Vec<StoreFailure>,
}

impl From<Vec<RawProductRecord>> for FetchOutcome {
    fn from(records: Vec<RawProductRecord>) -> Self {
        Self {
            records,
            store_failures: Vec::new(),
        }
    }
}

/// 数据源适配器
/// 一次运行内每个适配器只调用一次；返回错误视为该数据源整体失败
#[async_trait]
pub trait ScraperAdapter: std::fmt::Debug + Send + Sync + 'static {
    /// 数据源标识（写入记录的来源标记）
    fn source_id(&self) -> &str;

    /// 拉取给定门店的全部原始记录
    async fn fetch(&self, stores: &[StoreRef]) -> DispResult<Vec<RawProductRecord>>;

    /// 拉取并附带单门店失败明细；按门店拉取的适配器应覆盖此方法
    async fn fetch_with_report(&self, stores: &[StoreRef]) -> DispResult<FetchOutcome> {
        Ok(FetchOutcome::from(self.fetch(stores).await?))
    }
}
