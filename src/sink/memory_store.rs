//! 内存快照存储
//! 进程内保存，可注入读写故障

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use async_trait::async_trait;
use tokio::sync::RwLock;

use super::SnapshotSink;
use crate::error::{DispResult, DispensaryError};
use crate::model::{DateKey, UnifiedDataset};

/// 内存快照存储（克隆体共享同一份数据）
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotStore {
    snapshots: Arc<RwLock<BTreeMap<DateKey, UnifiedDataset>>>,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
    saves: Arc<AtomicUsize>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 读操作（exists/load/latest_before）返回存储不可用
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// 写操作返回存储不可用
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// 成功保存的次数
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.snapshots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.snapshots.read().await.is_empty()
    }

    fn check_reads(&self) -> DispResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(DispensaryError::SinkUnavailable("内存存储读取被禁用".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl SnapshotSink for MemorySnapshotStore {
    async fn exists(&self, key: DateKey) -> DispResult<bool> {
        self.check_reads()?;
        Ok(self.snapshots.read().await.contains_key(&key))
    }

    async fn load(&self, key: DateKey) -> DispResult<Option<UnifiedDataset>> {
        self.check_reads()?;
        Ok(self.snapshots.read().await.get(&key).cloned())
    }

    async fn save(&self, dataset: &UnifiedDataset) -> DispResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DispensaryError::SinkUnavailable("内存存储写入被禁用".to_string()));
        }
        self.snapshots.write().await.insert(dataset.date_key, dataset.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn latest_before(&self, key: DateKey) -> DispResult<Option<UnifiedDataset>> {
        self.check_reads()?;
        let snapshots = self.snapshots.read().await;
        Ok(snapshots.range(..key).next_back().map(|(_, d)| d.clone()))
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}
