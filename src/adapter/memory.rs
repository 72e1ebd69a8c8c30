//! 内存数据源适配器
//! 直接返回预置的原始记录，可模拟失败、延迟与挂起

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use async_trait::async_trait;
use tracing::debug;

use super::{ScraperAdapter, StoreRef};
use crate::error::{DispResult, DispensaryError};
use crate::model::RawProductRecord;

/// 预置适配器的行为
#[derive(Debug, Clone, PartialEq)]
pub enum StaticBehavior {
    /// 返回预置记录
    Serve,
    /// 延迟后返回预置记录
    Delay(Duration),
    /// 返回数据源失败
    Fail(String),
    /// 永不返回
    Hang,
    /// 任务内 panic
    Panic(String),
}

/// 内存数据源适配器
#[derive(Debug, Clone)]
pub struct StaticAdapter {
    source_id: String,
    records: Vec<RawProductRecord>,
    behavior: StaticBehavior,
    fetch_count: Arc<AtomicUsize>,
}

impl StaticAdapter {
    pub fn new(source_id: impl Into<String>, records: Vec<RawProductRecord>) -> Self {
        Self {
            source_id: source_id.into(),
            records,
            behavior: StaticBehavior::Serve,
            fetch_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(source_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(source_id, Vec::new()).with_behavior(StaticBehavior::Fail(reason.into()))
    }

    pub fn hanging(source_id: impl Into<String>) -> Self {
        Self::new(source_id, Vec::new()).with_behavior(StaticBehavior::Hang)
    }

    pub fn panicking(source_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(source_id, Vec::new()).with_behavior(StaticBehavior::Panic(message.into()))
    }

    pub fn with_behavior(mut self, behavior: StaticBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// fetch 被调用的次数（克隆体共享计数）
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    /// 按门店过滤：门店列表为空时返回全部
    fn records_for(&self, stores: &[StoreRef]) -> Vec<RawProductRecord> {
        if stores.is_empty() {
            return self.records.clone();
        }
        self.records
            .iter()
            .filter(|r| stores.iter().any(|s| s.name == r.store || s.id == r.store))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ScraperAdapter for StaticAdapter {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    async fn fetch(&self, stores: &[StoreRef]) -> DispResult<Vec<RawProductRecord>> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            StaticBehavior::Serve => {}
            StaticBehavior::Delay(d) => tokio::time::sleep(*d).await,
            StaticBehavior::Fail(reason) => {
                return Err(DispensaryError::AdapterFailure {
                    source_id: self.source_id.clone(),
                    reason: reason.clone(),
                });
            }
            StaticBehavior::Hang => std::future::pending::<()>().await,
            StaticBehavior::Panic(message) => panic!("[{}] {}", self.source_id, message),
        }
        let records = self.records_for(stores);
        debug!("[{}] 返回预置记录 {} 条", self.source_id, records.len());
        Ok(records)
    }
}
