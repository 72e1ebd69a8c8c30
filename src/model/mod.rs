//! 数据模型：原始记录、规范记录、统一数据集
pub mod raw;
pub mod canonical;
pub mod dataset;

// 导出核心接口
pub use self::raw::{RawBag, RawProductRecord, RawValue};
pub use self::canonical::{CanonicalProductRecord, MedicationCategory};
pub use self::dataset::{Cell, DatasetTable, DateKey, UnifiedDataset};
