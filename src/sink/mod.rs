//! 快照存储：按日期键保存/读取统一数据集
pub mod msgpack_store;
pub mod memory_store;

use async_trait::async_trait;

use crate::error::DispResult;
use crate::model::{DateKey, UnifiedDataset};

pub use self::msgpack_store::MsgPackSnapshotStore;
pub use self::memory_store::MemorySnapshotStore;

/// 快照存储后端
/// 同一日期键至多一个快照，保存会整体替换已有快照
#[async_trait]
pub trait SnapshotSink: std::fmt::Debug + Send + Sync {
    /// 日期键对应的快照是否存在
    async fn exists(&self, key: DateKey) -> DispResult<bool>;

    /// 读取快照，不存在返回 None
    async fn load(&self, key: DateKey) -> DispResult<Option<UnifiedDataset>>;

    /// 保存快照（以数据集自身的日期键为准）
    async fn save(&self, dataset: &UnifiedDataset) -> DispResult<()>;

    /// 早于给定日期的最近一次快照
    async fn latest_before(&self, _key: DateKey) -> DispResult<Option<UnifiedDataset>> {
        Ok(None)
    }

    /// 后端类型（用于日志）
    fn backend_type(&self) -> &'static str;
}
