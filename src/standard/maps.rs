//! 编译后的标准化映射表
//! 进程内只读，可在多个并发任务之间共享

use std::collections::{HashMap, HashSet};
use std::fmt;

use super::model::{AggregationRule, CompoundClass};
use crate::model::MedicationCategory;
use crate::utils::KeyNormalizer;

/// 品牌/子品类查表结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// 命中映射，得到规范值
    Mapped(String),
    /// 未命中，原值（清理后）透传
    PassThrough(String),
}

impl Resolution {
    pub fn value(&self) -> &str {
        match self {
            Resolution::Mapped(v) | Resolution::PassThrough(v) => v,
        }
    }

    pub fn into_value(self) -> String {
        match self {
            Resolution::Mapped(v) | Resolution::PassThrough(v) => v,
        }
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self, Resolution::Mapped(_))
    }
}

/// 合物名查表结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompoundResolution {
    Canonical(String),
    /// 描述性键，不是读数
    Junk,
    /// 未知合物，丢弃并上报
    Unrecognized,
}

/// 原始字段角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldRole {
    Name,
    Brand,
    Category,
    Subcategory,
    Price,
    WeightGrams,
    WeightLabel,
    CompoundContainer,
}

/// 字段角色别名（均已归一化，保持声明顺序）
#[derive(Debug, Clone, Default)]
pub struct FieldRoles {
    pub(crate) name: Vec<String>,
    pub(crate) brand: Vec<String>,
    pub(crate) category: Vec<String>,
    pub(crate) subcategory: Vec<String>,
    pub(crate) price: Vec<String>,
    pub(crate) weight_grams: Vec<String>,
    pub(crate) weight_label: Vec<String>,
    pub(crate) compound_containers: Vec<String>,
}

impl FieldRoles {
    pub fn aliases(&self, role: FieldRole) -> &[String] {
        match role {
            FieldRole::Name => &self.name,
            FieldRole::Brand => &self.brand,
            FieldRole::Category => &self.category,
            FieldRole::Subcategory => &self.subcategory,
            FieldRole::Price => &self.price,
            FieldRole::WeightGrams => &self.weight_grams,
            FieldRole::WeightLabel => &self.weight_label,
            FieldRole::CompoundContainer => &self.compound_containers,
        }
    }

    /// 归一化字段名对应的角色（未声明返回 None）
    pub fn role_of(&self, normalized_key: &str) -> Option<FieldRole> {
        const ROLES: [FieldRole; 8] = [
            FieldRole::Name,
            FieldRole::Brand,
            FieldRole::Category,
            FieldRole::Subcategory,
            FieldRole::Price,
            FieldRole::WeightGrams,
            FieldRole::WeightLabel,
            FieldRole::CompoundContainer,
        ];
        ROLES
            .into_iter()
            .find(|role| self.aliases(*role).iter().any(|a| a == normalized_key))
    }
}

/// 映射表统计（CLI `maps` 子命令与调试日志使用）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MapStats {
    pub brand_aliases: usize,
    pub category_aliases: usize,
    pub subcategory_aliases: usize,
    pub canonical_compounds: usize,
    pub compound_aliases: usize,
    pub junk_keys: usize,
    pub aggregation_rules: usize,
}

impl fmt::Display for MapStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "品牌别名{}条、品类别名{}条、子品类别名{}条、规范合物{}种（别名{}条）、垃圾键{}条、聚合规则{}条",
            self.brand_aliases,
            self.category_aliases,
            self.subcategory_aliases,
            self.canonical_compounds,
            self.compound_aliases,
            self.junk_keys,
            self.aggregation_rules
        )
    }
}

/// 编译后的标准化映射表（所有键均已归一化）
#[derive(Debug, Clone, Default)]
pub struct StandardizationMaps {
    pub(crate) brands: HashMap<String, String>,
    pub(crate) categories: HashMap<String, MedicationCategory>,
    pub(crate) subcategory_global: HashMap<String, String>,
    pub(crate) subcategory_scoped: HashMap<MedicationCategory, HashMap<String, String>>,
    /// 归一化别名 -> 规范合物名
    pub(crate) compounds: HashMap<String, String>,
    /// 规范合物名 -> 类别
    pub(crate) compound_classes: HashMap<String, CompoundClass>,
    pub(crate) junk: HashSet<String>,
    pub(crate) rules: Vec<AggregationRule>,
    pub(crate) rule_members: HashSet<String>,
    pub(crate) fields: FieldRoles,
}

impl StandardizationMaps {
    /// 品牌：命中则归并到母品牌，否则透传清理后的原值
    pub fn canonicalize_brand(&self, raw: &str) -> Resolution {
        match self.brands.get(&KeyNormalizer::normalize(raw)) {
            Some(canonical) => Resolution::Mapped(canonical.clone()),
            None => Resolution::PassThrough(KeyNormalizer::display_form(raw)),
        }
    }

    /// 品类：未命中即不在允许列表内，记录应被丢弃
    pub fn canonicalize_category(&self, raw: &str) -> Option<MedicationCategory> {
        self.categories.get(&KeyNormalizer::normalize(raw)).copied()
    }

    /// 子品类：先查品类作用域映射，再查全局映射，最后透传
    pub fn canonicalize_subcategory(&self, raw: &str, category: MedicationCategory) -> Resolution {
        let key = KeyNormalizer::normalize(raw);
        let scoped = self.subcategory_scoped.get(&category).and_then(|m| m.get(&key));
        match scoped.or_else(|| self.subcategory_global.get(&key)) {
            Some(canonical) => Resolution::Mapped(canonical.clone()),
            None => Resolution::PassThrough(KeyNormalizer::display_form(raw)),
        }
    }

    pub fn canonicalize_compound(&self, raw: &str) -> CompoundResolution {
        let key = KeyNormalizer::normalize(raw);
        if let Some(canonical) = self.compounds.get(&key) {
            return CompoundResolution::Canonical(canonical.clone());
        }
        if self.junk.contains(&key) {
            return CompoundResolution::Junk;
        }
        CompoundResolution::Unrecognized
    }

    /// 规范合物名所属类别
    pub fn compound_class(&self, canonical: &str) -> Option<CompoundClass> {
        self.compound_classes.get(canonical).copied()
    }

    /// 全部规范合物名
    pub fn canonical_compounds(&self) -> impl Iterator<Item = &str> {
        self.compound_classes.keys().map(String::as_str)
    }

    /// 聚合规则（声明顺序）
    pub fn aggregation_rules(&self) -> &[AggregationRule] {
        &self.rules
    }

    /// 是否为某条聚合规则的成员（来源或目标）
    pub fn is_rule_member(&self, canonical: &str) -> bool {
        self.rule_members.contains(canonical)
    }

    pub fn fields(&self) -> &FieldRoles {
        &self.fields
    }

    pub fn stats(&self) -> MapStats {
        MapStats {
            brand_aliases: self.brands.len(),
            category_aliases: self.categories.len(),
            subcategory_aliases: self.subcategory_global.len()
                + self.subcategory_scoped.values().map(HashMap::len).sum::<usize>(),
            canonical_compounds: self.compound_classes.len(),
            compound_aliases: self.compounds.len(),
            junk_keys: self.junk.len(),
            aggregation_rules: self.rules.len(),
        }
    }
}
