//! rsdispensary - 多源药房商品目录标准化与聚合流水线
//! 各零售商菜单 -> 原始记录 -> 规范记录 -> 按日期快照的统一数据集

// 导出全局错误类型
pub use self::error::{DispensaryError, DispResult};

// 导出配置模块
pub use self::config::{GlobalConfig, ConfigManager, CustomConfigBuilder};

// 导出数据模型
pub use self::model::{
    RawBag, RawValue, RawProductRecord, CanonicalProductRecord, MedicationCategory,
    UnifiedDataset, DateKey, DatasetTable, Cell
};

// 导出标准化映射表核心接口
pub use self::standard::{
    StandardizationMaps, MapDefinition, MapCompiler, MapLoader, MapStats,
    Resolution, CompoundResolution, CompoundClass, AggregationRule, default_maps
};

// 导出标准化与聚合接口
pub use self::canonicalizer::{Canonicalizer, Canonicalized, DropReason, CanonStats, UnmappedLog};
pub use self::aggregator::{AggregationEngine, CompoundAccumulator};

// 导出数据源与快照存储接口
pub use self::adapter::{
    ScraperAdapter, StoreRef, StoreFailure, FetchOutcome, VendorSchema, StaticAdapter, StaticBehavior, ReplayAdapter, HttpMenuAdapter
};
pub use self::sink::{SnapshotSink, MsgPackSnapshotStore, MemorySnapshotStore};

// 导出编排接口
pub use self::orchestrator::{
    Orchestrator, OrchestratorBuilder, RunOutcome, RunReport, AdapterReport, AdapterStatus, DatasetOrigin
};

// 导出工具模块核心接口
pub use self::utils::{KeyNormalizer, NumericParser, WeightParser};

// 声明所有子模块
pub mod config;
pub mod error;
pub mod model;
pub mod standard;
pub mod canonicalizer;
pub mod aggregator;
pub mod adapter;
pub mod sink;
pub mod orchestrator;
pub mod utils;
