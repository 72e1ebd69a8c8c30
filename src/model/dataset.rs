//! 统一数据集模型
//! 一次运行中所有数据源的规范记录按顺序拼接，并以日期键标记

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use super::canonical::CanonicalProductRecord;
use crate::error::{DispResult, DispensaryError};

/// 快照日期键：每个自然日一个数据集
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DateKey(NaiveDate);

impl DateKey {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// 本地时区的今天
    pub fn today() -> Self {
        Self(Local::now().date_naive())
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for DateKey {
    type Err = DispensaryError;

    /// 接受 `YYYY-MM-DD`，分隔符也可以是 `_`
    fn from_str(s: &str) -> DispResult<Self> {
        let normalized = s.trim().replace('_', "-");
        NaiveDate::parse_from_str(&normalized, "%Y-%m-%d")
            .map(DateKey)
            .map_err(|e| DispensaryError::InvalidDateKey(format!("{}：{}", s, e)))
    }
}

/// 统一数据集：交给下游后不可变
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedDataset {
    pub date_key: DateKey,
    pub records: Vec<CanonicalProductRecord>,
}

impl UnifiedDataset {
    pub fn new(date_key: DateKey, records: Vec<CanonicalProductRecord>) -> Self {
        Self { date_key, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CanonicalProductRecord> {
        self.records.iter()
    }

    /// 某个数据源贡献的记录
    pub fn by_source<'a>(&'a self, source: &'a str) -> impl Iterator<Item = &'a CanonicalProductRecord> + 'a {
        self.records.iter().filter(move |r| r.source == source)
    }

    /// 本次运行中出现过的全部合物列（按名称排序）
    pub fn compound_columns(&self) -> Vec<String> {
        self.records
            .iter()
            .flat_map(|r| r.compounds.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// 转换为下游分析使用的二维表
    pub fn to_table(&self) -> DatasetTable {
        let compound_cols = self.compound_columns();
        let mut columns: Vec<String> = DatasetTable::BASE_COLUMNS.iter().map(|c| c.to_string()).collect();
        columns.extend(compound_cols.iter().cloned());

        let rows = self
            .records
            .iter()
            .map(|r| {
                let mut row = vec![
                    Cell::text(&r.source),
                    Cell::text(&r.store),
                    Cell::opt_text(r.brand.as_deref()),
                    Cell::text(r.category.as_str()),
                    Cell::opt_text(r.subcategory.as_deref()),
                    Cell::text(&r.name),
                    Cell::opt_number(r.price),
                    Cell::opt_number(r.weight_grams),
                    Cell::opt_text(r.weight_label.as_deref()),
                    Cell::opt_number(r.price_per_gram),
                ];
                // 该行缺失的合物保持 Missing，而不是 0
                row.extend(compound_cols.iter().map(|c| Cell::opt_number(r.compound(c))));
                row
            })
            .collect();

        DatasetTable { columns, rows }
    }
}

/// 表格单元格
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Missing,
    Text(String),
    Number(f64),
}

impl Cell {
    fn text(s: &str) -> Self {
        Cell::Text(s.to_string())
    }

    fn opt_text(s: Option<&str>) -> Self {
        s.map(Cell::text).unwrap_or(Cell::Missing)
    }

    fn opt_number(n: Option<f64>) -> Self {
        n.map(Cell::Number).unwrap_or(Cell::Missing)
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }
}

/// 下游消费的固定列二维表
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl DatasetTable {
    /// 固定基础列，合物列紧随其后
    pub const BASE_COLUMNS: [&'static str; 10] = [
        "Source", "Store", "Brand", "Category", "Subcategory", "Name",
        "Price", "Weight", "Weight_Str", "dpg",
    ];

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// 读取某行某列
    pub fn cell(&self, row: usize, column: &str) -> Option<&Cell> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }
}
