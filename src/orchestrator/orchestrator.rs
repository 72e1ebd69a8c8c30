//! 流水线编排器
//! 日期键快照命中则直接返回，否则并发运行全部数据源，标准化后拼接为统一数据集并写入快照

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::report::{AdapterReport, AdapterStatus, DatasetOrigin, RunOutcome, RunReport};
use crate::adapter::{FetchOutcome, ScraperAdapter, StoreRef};
use crate::canonicalizer::{Canonicalizer, UnmappedLog};
use crate::config::{ConfigManager, GlobalConfig};
use crate::error::{DispResult, DispensaryError};
use crate::model::{DateKey, UnifiedDataset};
use crate::sink::{MsgPackSnapshotStore, SnapshotSink};
use crate::standard::{MapLoader, StandardizationMaps, default_maps};

/// 已注册的数据源及其门店列表
#[derive(Debug, Clone)]
struct AdapterSlot {
    adapter: Arc<dyn ScraperAdapter>,
    stores: Vec<StoreRef>,
}

/// 单个数据源的拉取结果（耗时只计 fetch 本身，不含排队等待）
struct FetchResult {
    outcome: DispResult<FetchOutcome>,
    elapsed_ms: u64,
}

/// 流水线编排器
#[derive(Debug, Clone)]
pub struct Orchestrator {
    config: Arc<GlobalConfig>,
    canonicalizer: Canonicalizer,
    sink: Arc<dyn SnapshotSink>,
    adapters: Vec<AdapterSlot>,
}

impl Orchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::default()
    }

    pub fn config(&self) -> &GlobalConfig {
        &self.config
    }

    pub fn maps(&self) -> &Arc<StandardizationMaps> {
        self.canonicalizer.maps()
    }

    pub fn sink(&self) -> &Arc<dyn SnapshotSink> {
        &self.sink
    }

    /// 已注册的数据源标识（注册顺序）
    pub fn sources(&self) -> Vec<&str> {
        self.adapters.iter().map(|slot| slot.adapter.source_id()).collect()
    }

    /// 执行一次运行
    pub async fn run(&self, date_key: DateKey) -> DispResult<RunOutcome> {
        let mut sink_warnings = Vec::new();

        // 1. 当日快照：命中直接返回，读取失败降级为重新拉取
        match self.load_cached(date_key).await {
            Ok(Some(dataset)) => {
                info!("命中 {} 快照（{}条记录），跳过拉取", date_key, dataset.len());
                let mut report = RunReport::new(date_key, DatasetOrigin::Cache);
                report.sink_warnings = sink_warnings;
                return Ok(RunOutcome { dataset, report });
            }
            Ok(None) => debug!("{} 无快照，开始拉取", date_key),
            Err(e) => {
                warn!("读取 {} 快照失败，改为重新拉取：{}", date_key, e);
                sink_warnings.push(format!("读取快照失败：{}", e));
            }
        }

        // 2. 复用最近一次快照（不以当日键重新保存）
        if self.config.use_latest_snapshot {
            match self.sink.latest_before(date_key).await {
                Ok(Some(dataset)) => {
                    info!("复用 {} 的快照（{}条记录）", dataset.date_key, dataset.len());
                    let mut report = RunReport::new(date_key, DatasetOrigin::RecentSnapshot(dataset.date_key));
                    report.sink_warnings = sink_warnings;
                    return Ok(RunOutcome { dataset, report });
                }
                Ok(None) => debug!("{} 之前无可复用快照", date_key),
                Err(e) => {
                    warn!("查找最近快照失败：{}", e);
                    sink_warnings.push(format!("查找最近快照失败：{}", e));
                }
            }
        }

        // 3. 并发拉取
        let results = self.fetch_all().await;
        if results.iter().all(|r| r.outcome.is_err()) {
            return Err(DispensaryError::NoData(if self.adapters.is_empty() {
                format!("{} 无快照且未注册任何数据源", date_key)
            } else {
                format!("{} 无快照且全部 {} 个数据源失败", date_key, self.adapters.len())
            }));
        }

        // 4. 按注册顺序标准化并拼接
        let mut report = RunReport::new(date_key, DatasetOrigin::Fetched);
        report.sink_warnings = sink_warnings;
        let mut records = Vec::new();
        for (slot, result) in self.adapters.iter().zip(results) {
            let source = slot.adapter.source_id().to_string();
            let mut adapter_report = AdapterReport {
                source: source.clone(),
                stores: slot.stores.len(),
                status: AdapterStatus::Succeeded,
                stats: Default::default(),
                store_failures: Vec::new(),
                elapsed_ms: result.elapsed_ms,
            };
            match result.outcome {
                Ok(fetched) => {
                    let mut unmapped = UnmappedLog::new();
                    let (kept, stats) = self.canonicalizer.canonicalize_batch(&fetched.records, &mut unmapped);
                    debug!("[{}] {}", source, stats);
                    adapter_report.stats = stats;
                    adapter_report.store_failures = fetched.store_failures;
                    report.unmapped.merge(unmapped);
                    records.extend(kept);
                }
                Err(e) => {
                    warn!("[{}] 数据源失败，本次运行不含其数据：{}", source, e);
                    adapter_report.status = AdapterStatus::Failed(e.to_string());
                }
            }
            report.adapters.push(adapter_report);
        }
        let dataset = UnifiedDataset::new(date_key, records);

        // 5. 写入快照：失败只告警，数据集照常返回
        if dataset.is_empty() && !self.config.persist_empty {
            debug!("{} 数据集为空，不写入快照", date_key);
        } else if let Err(e) = self.sink.save(&dataset).await {
            warn!("写入 {} 快照失败（{}）：{}", date_key, self.sink.backend_type(), e);
            report.sink_warnings.push(format!("写入快照失败：{}", e));
        }

        if self.config.verbose && !report.unmapped.is_empty() {
            warn!(
                "未命中映射：品牌{:?}，子品类{:?}，合物{:?}，品类{:?}",
                report.unmapped.brands,
                report.unmapped.subcategories,
                report.unmapped.compounds,
                report.unmapped.categories
            );
        }

        let total = report.total_stats();
        info!(
            "✅ {} 运行完成：{}个数据源成功，{}个失败，{}",
            date_key,
            report.successes().count(),
            report.failures().count(),
            total
        );
        Ok(RunOutcome { dataset, report })
    }

    async fn load_cached(&self, date_key: DateKey) -> DispResult<Option<UnifiedDataset>> {
        if !self.sink.exists(date_key).await? {
            return Ok(None);
        }
        self.sink.load(date_key).await
    }

    /// 每个数据源一个任务，信号量限制并发，单个数据源超时即失败；结果按注册顺序返回
    async fn fetch_all(&self) -> Vec<FetchResult> {
        let semaphore = Arc::new(Semaphore::new(self.config.effective_parallelism()));
        let deadline = Duration::from_secs(self.config.adapter_timeout);

        let handles: Vec<_> = self
            .adapters
            .iter()
            .map(|slot| {
                let slot = slot.clone();
                let semaphore = Arc::clone(&semaphore);
                tokio::spawn(async move {
                    let source_id = slot.adapter.source_id().to_string();
                    let _permit = match semaphore.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(e) => {
                            let outcome = Err(DispensaryError::AdapterFailure {
                                source_id,
                                reason: e.to_string(),
                            });
                            return FetchResult { outcome, elapsed_ms: 0 };
                        }
                    };
                    let started = Instant::now();
                    let outcome = match tokio::time::timeout(deadline, slot.adapter.fetch_with_report(&slot.stores)).await {
                        Ok(result) => result,
                        Err(_) => Err(DispensaryError::AdapterTimeout {
                            source_id,
                            secs: deadline.as_secs(),
                        }),
                    };
                    FetchResult {
                        outcome,
                        elapsed_ms: started.elapsed().as_millis() as u64,
                    }
                })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (slot, handle) in self.adapters.iter().zip(handles) {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => FetchResult {
                    outcome: Err(DispensaryError::AdapterFailure {
                        source_id: slot.adapter.source_id().to_string(),
                        reason: format!("任务异常退出：{}", e),
                    }),
                    elapsed_ms: 0,
                },
            };
            results.push(result);
        }
        results
    }
}

/// 编排器构建器
#[derive(Debug, Default)]
pub struct OrchestratorBuilder {
    config: Option<GlobalConfig>,
    maps: Option<Arc<StandardizationMaps>>,
    sink: Option<Arc<dyn SnapshotSink>>,
    adapters: Vec<AdapterSlot>,
}

impl OrchestratorBuilder {
    pub fn config(mut self, config: GlobalConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn maps(mut self, maps: Arc<StandardizationMaps>) -> Self {
        self.maps = Some(maps);
        self
    }

    pub fn sink(self, sink: impl SnapshotSink + 'static) -> Self {
        self.sink_arc(Arc::new(sink))
    }

    /// 共享快照存储（调用方保留句柄）
    pub fn sink_arc(mut self, sink: Arc<dyn SnapshotSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn adapter(self, adapter: impl ScraperAdapter, stores: Vec<StoreRef>) -> Self {
        self.adapter_arc(Arc::new(adapter), stores)
    }

    pub fn adapter_arc(mut self, adapter: Arc<dyn ScraperAdapter>, stores: Vec<StoreRef>) -> Self {
        self.adapters.push(AdapterSlot { adapter, stores });
        self
    }

    /// 构建编排器
    /// 未指定映射表时：配置了覆盖文件则加载合并，否则使用内置映射表；未指定存储时使用快照目录
    pub async fn build(self) -> DispResult<Orchestrator> {
        let config = self.config.unwrap_or_else(ConfigManager::get_default);

        let maps = match self.maps {
            Some(maps) => maps,
            None if config.maps_path.is_some() => Arc::new(MapLoader::load(&config).await?),
            None => default_maps()?,
        };

        let sink = match self.sink {
            Some(sink) => sink,
            None => Arc::new(MsgPackSnapshotStore::from_config(&config)) as Arc<dyn SnapshotSink>,
        };

        let mut seen = std::collections::HashSet::new();
        for slot in &self.adapters {
            if !seen.insert(slot.adapter.source_id().to_string()) {
                return Err(DispensaryError::InvalidInput(format!(
                    "数据源标识重复：{}",
                    slot.adapter.source_id()
                )));
            }
        }

        debug!(
            "编排器就绪：{}个数据源，快照后端 {}，并发上限 {}",
            self.adapters.len(),
            sink.backend_type(),
            config.effective_parallelism()
        );

        Ok(Orchestrator {
            config: Arc::new(config),
            canonicalizer: Canonicalizer::new(maps),
            sink,
            adapters: self.adapters,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::StaticAdapter;
    use crate::model::{RawBag, RawProductRecord};
    use crate::sink::MemorySnapshotStore;

    fn flower(source: &str, store: &str, name: &str) -> RawProductRecord {
        let mut fields = RawBag::new();
        fields.push("name", name);
        fields.push("category", "Flower");
        fields.push("brand", "Cresco");
        fields.push("price", 45.0);
        RawProductRecord::new(source, store, fields)
    }

    fn key() -> DateKey {
        "2024-01-01".parse().unwrap()
    }

    #[tokio::test]
    async fn test_adapter_order_is_registration_order() {
        // 测试场景：后注册的数据源先完成，输出仍按注册顺序拼接
        let slow = StaticAdapter::new("slow", vec![flower("slow", "A", "X")])
            .with_behavior(crate::adapter::StaticBehavior::Delay(Duration::from_millis(50)));
        let fast = StaticAdapter::new("fast", vec![flower("fast", "B", "Y")]);

        let orchestrator = Orchestrator::builder()
            .sink(MemorySnapshotStore::new())
            .adapter(slow, Vec::new())
            .adapter(fast, Vec::new())
            .build()
            .await
            .unwrap();

        let outcome = orchestrator.run(key()).await.unwrap();
        let sources: Vec<_> = outcome.dataset.iter().map(|r| r.source.as_str()).collect();
        assert_eq!(sources, vec!["slow", "fast"]);
        assert_eq!(outcome.report.origin, DatasetOrigin::Fetched);
    }

    #[tokio::test]
    async fn test_elapsed_is_per_adapter() {
        // 测试场景：先注册的慢数据源不应计入后注册的快数据源耗时
        let slow = StaticAdapter::new("slow", vec![flower("slow", "A", "X")])
            .with_behavior(crate::adapter::StaticBehavior::Delay(Duration::from_millis(300)));
        let fast = StaticAdapter::new("fast", vec![flower("fast", "B", "Y")]);

        let orchestrator = Orchestrator::builder()
            .sink(MemorySnapshotStore::new())
            .adapter(slow, Vec::new())
            .adapter(fast, Vec::new())
            .build()
            .await
            .unwrap();

        let report = orchestrator.run(key()).await.unwrap().report;
        assert!(report.adapters[0].elapsed_ms >= 250);
        assert!(report.adapters[1].elapsed_ms < 200);
    }

    #[tokio::test]
    async fn test_duplicate_source_rejected() {
        let err = Orchestrator::builder()
            .sink(MemorySnapshotStore::new())
            .adapter(StaticAdapter::new("dup", Vec::new()), Vec::new())
            .adapter(StaticAdapter::new("dup", Vec::new()), Vec::new())
            .build()
            .await
            .unwrap_err();
        assert!(matches!(err, DispensaryError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_no_adapters_is_no_data() {
        let orchestrator = Orchestrator::builder()
            .sink(MemorySnapshotStore::new())
            .build()
            .await
            .unwrap();
        let err = orchestrator.run(key()).await.unwrap_err();
        assert!(matches!(err, DispensaryError::NoData(_)));
    }

    #[tokio::test]
    async fn test_parallelism_zero_still_runs() {
        let config = ConfigManager::custom().max_parallel_adapters(0).build();
        let orchestrator = Orchestrator::builder()
            .config(config)
            .sink(MemorySnapshotStore::new())
            .adapter(StaticAdapter::new("a", vec![flower("a", "S", "X")]), Vec::new())
            .adapter(StaticAdapter::new("b", vec![flower("b", "S", "Y")]), Vec::new())
            .build()
            .await
            .unwrap();
        let outcome = orchestrator.run(key()).await.unwrap();
        assert_eq!(outcome.dataset.len(), 2);
    }
}
