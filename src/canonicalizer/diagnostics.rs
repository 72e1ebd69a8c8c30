//! 标准化诊断信息
//! 统计与未命中映射的原始值，用于维护映射表

use std::collections::BTreeSet;
use std::fmt;
use serde::Serialize;

/// 单批次标准化统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CanonStats {
    /// 输入的原始记录数
    pub raw: usize,
    /// 进入数据集的记录数
    pub kept: usize,
    /// 品类缺失或不在允许列表内而丢弃
    pub dropped_category: usize,
    /// 缺少必填字段而丢弃
    pub malformed: usize,
}

impl CanonStats {
    pub fn merge(&mut self, other: &CanonStats) {
        self.raw += other.raw;
        self.kept += other.kept;
        self.dropped_category += other.dropped_category;
        self.malformed += other.malformed;
    }
}

impl fmt::Display for CanonStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "原始{}条，保留{}条，品类丢弃{}条，字段缺失{}条",
            self.raw, self.kept, self.dropped_category, self.malformed
        )
    }
}

/// 未命中映射的原始值（按类型去重）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UnmappedLog {
    pub brands: BTreeSet<String>,
    pub subcategories: BTreeSet<String>,
    pub compounds: BTreeSet<String>,
    pub categories: BTreeSet<String>,
}

impl UnmappedLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_brand(&mut self, value: &str) {
        self.brands.insert(value.to_string());
    }

    pub fn record_subcategory(&mut self, value: &str) {
        self.subcategories.insert(value.to_string());
    }

    pub fn record_compound(&mut self, value: &str) {
        self.compounds.insert(value.to_string());
    }

    pub fn record_category(&mut self, value: &str) {
        self.categories.insert(value.to_string());
    }

    pub fn merge(&mut self, other: UnmappedLog) {
        self.brands.extend(other.brands);
        self.subcategories.extend(other.subcategories);
        self.compounds.extend(other.compounds);
        self.categories.extend(other.categories);
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn total(&self) -> usize {
        self.brands.len() + self.subcategories.len() + self.compounds.len() + self.categories.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unmapped_log_dedups_and_merges() {
        let mut a = UnmappedLog::new();
        a.record_brand("Local Farms");
        a.record_brand("Local Farms");
        let mut b = UnmappedLog::new();
        b.record_compound("Valencene");
        b.record_category("Accessories");
        a.merge(b);

        assert_eq!(a.brands.len(), 1);
        assert_eq!(a.total(), 3);
        assert!(!a.is_empty());
    }
}
