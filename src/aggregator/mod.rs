//! 聚合模块：多个规范合物键求和为一个派生键
pub mod engine;

pub use self::engine::{AggregationEngine, CompoundAccumulator};
