//! 规范化商品记录模型
//! 所有字段均已标准化，支持序列化/反序列化

use std::collections::BTreeMap;
use std::fmt;
use serde::{Deserialize, Serialize};

use crate::standard::{CompoundClass, StandardizationMaps};

/// 药用品类（固定允许列表）
/// 不在此列表中的原始品类（配件、服饰等）不会进入规范数据集
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MedicationCategory {
    Flower,
    #[serde(rename = "Pre-Rolls")]
    PreRolls,
    Vaporizers,
    Concentrates,
    Edibles,
    Tinctures,
    Topicals,
}

impl MedicationCategory {
    pub const ALL: [MedicationCategory; 7] = [
        MedicationCategory::Flower,
        MedicationCategory::PreRolls,
        MedicationCategory::Vaporizers,
        MedicationCategory::Concentrates,
        MedicationCategory::Edibles,
        MedicationCategory::Tinctures,
        MedicationCategory::Topicals,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MedicationCategory::Flower => "Flower",
            MedicationCategory::PreRolls => "Pre-Rolls",
            MedicationCategory::Vaporizers => "Vaporizers",
            MedicationCategory::Concentrates => "Concentrates",
            MedicationCategory::Edibles => "Edibles",
            MedicationCategory::Tinctures => "Tinctures",
            MedicationCategory::Topicals => "Topicals",
        }
    }
}

impl fmt::Display for MedicationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 规范化商品记录（输出数据集的基本单元）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalProductRecord {
    pub source: String,
    pub store: String,
    #[serde(default)]
    pub brand: Option<String>,
    pub category: MedicationCategory,
    #[serde(default)]
    pub subcategory: Option<String>,
    pub name: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub weight_grams: Option<f64>,
    #[serde(default)]
    pub weight_label: Option<String>,
    #[serde(default)]
    pub price_per_gram: Option<f64>,
    /// 规范化合物名 -> 含量；键必为规范名且唯一
    #[serde(default)]
    pub compounds: BTreeMap<String, f64>,
}

impl CanonicalProductRecord {
    /// 读取单个合物含量
    pub fn compound(&self, name: &str) -> Option<f64> {
        self.compounds.get(name).copied()
    }

    /// 按类别汇总合物含量；该类别无任何读数时返回 None
    pub fn total_by_class(&self, maps: &StandardizationMaps, class: CompoundClass) -> Option<f64> {
        let values: Vec<f64> = self
            .compounds
            .iter()
            .filter(|(name, _)| maps.compound_class(name) == Some(class))
            .map(|(_, v)| *v)
            .collect();
        (!values.is_empty()).then(|| values.iter().sum())
    }

    /// 萜烯总量（Total_Terps）
    pub fn total_terpenes(&self, maps: &StandardizationMaps) -> Option<f64> {
        self.total_by_class(maps, CompoundClass::Terpene)
    }

    /// 大麻素总量（TAC）
    pub fn total_cannabinoids(&self, maps: &StandardizationMaps) -> Option<f64> {
        self.total_by_class(maps, CompoundClass::Cannabinoid)
    }
}

// ======== 为 CanonicalProductRecord 实现 Display trait（用于 CLI / Report 输出） ========
impl fmt::Display for CanonicalProductRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.brand {
            Some(b) => write!(f, "[{}|{}] {} - {} ({})", self.source, self.store, b, self.name, self.category),
            None => write!(f, "[{}|{}] {} ({})", self.source, self.store, self.name, self.category),
        }
    }
}
