//! 单次运行报告

use std::fmt;
use serde::Serialize;

use crate::adapter::StoreFailure;
use crate::canonicalizer::{CanonStats, UnmappedLog};
use crate::model::{DateKey, UnifiedDataset};

/// 数据集来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DatasetOrigin {
    /// 当日快照
    Cache,
    /// 当日快照缺失，复用的最近一次快照
    RecentSnapshot(DateKey),
    /// 本次运行拉取
    Fetched,
}

/// 数据源执行状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AdapterStatus {
    Succeeded,
    Failed(String),
}

/// 单个数据源的执行报告
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdapterReport {
    pub source: String,
    pub stores: usize,
    pub status: AdapterStatus,
    pub stats: CanonStats,
    /// 被跳过的门店（数据源整体仍算成功）
    pub store_failures: Vec<StoreFailure>,
    /// 该数据源 fetch 自身的耗时
    pub elapsed_ms: u64,
}

impl AdapterReport {
    pub fn is_failure(&self) -> bool {
        matches!(self.status, AdapterStatus::Failed(_))
    }

    /// 成功但有门店失败
    pub fn is_partial(&self) -> bool {
        !self.is_failure() && !self.store_failures.is_empty()
    }
}

/// 单次运行报告
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub date_key: DateKey,
    pub origin: DatasetOrigin,
    /// 按注册顺序排列；命中快照时为空
    pub adapters: Vec<AdapterReport>,
    /// 快照存储的非致命问题（读取降级、写入失败）
    pub sink_warnings: Vec<String>,
    pub unmapped: UnmappedLog,
}

impl RunReport {
    pub(crate) fn new(date_key: DateKey, origin: DatasetOrigin) -> Self {
        Self {
            date_key,
            origin,
            adapters: Vec::new(),
            sink_warnings: Vec::new(),
            unmapped: UnmappedLog::default(),
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &AdapterReport> {
        self.adapters.iter().filter(|a| a.is_failure())
    }

    pub fn successes(&self) -> impl Iterator<Item = &AdapterReport> {
        self.adapters.iter().filter(|a| !a.is_failure())
    }

    /// 部分门店失败的数据源
    pub fn partial_failures(&self) -> impl Iterator<Item = &AdapterReport> {
        self.adapters.iter().filter(|a| a.is_partial())
    }

    /// 全部数据源的标准化统计之和
    pub fn total_stats(&self) -> CanonStats {
        let mut total = CanonStats::default();
        for adapter in &self.adapters {
            total.merge(&adapter.stats);
        }
        total
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let origin = match self.origin {
            DatasetOrigin::Cache => "当日快照".to_string(),
            DatasetOrigin::RecentSnapshot(key) => format!("最近快照（{}）", key),
            DatasetOrigin::Fetched => "实时拉取".to_string(),
        };
        writeln!(f, "日期：{}，来源：{}", self.date_key, origin)?;
        for adapter in &self.adapters {
            match &adapter.status {
                AdapterStatus::Succeeded => writeln!(
                    f,
                    "  ✅ {}（{}个门店，{}ms）：{}",
                    adapter.source, adapter.stores, adapter.elapsed_ms, adapter.stats
                )?,
                AdapterStatus::Failed(reason) => writeln!(f, "  ❌ {}：{}", adapter.source, reason)?,
            }
            for failure in &adapter.store_failures {
                writeln!(f, "    ⚠️ 门店 {} 失败：{}", failure.store, failure.reason)?;
            }
        }
        for warning in &self.sink_warnings {
            writeln!(f, "  ⚠️ {}", warning)?;
        }
        if !self.unmapped.is_empty() {
            writeln!(
                f,
                "  未命中映射：品牌{}个、子品类{}个、合物{}个、品类{}个",
                self.unmapped.brands.len(),
                self.unmapped.subcategories.len(),
                self.unmapped.compounds.len(),
                self.unmapped.categories.len()
            )?;
        }
        Ok(())
    }
}

/// 运行结果：数据集 + 报告
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub dataset: UnifiedDataset,
    pub report: RunReport,
}
