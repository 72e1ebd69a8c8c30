//! 标准化映射表定义模型
//! 仅存储映射数据，无任何业务逻辑，支持 JSON 序列化/反序列化（用于覆盖文件）

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};

use crate::model::MedicationCategory;

/// 合物类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompoundClass {
    Cannabinoid,
    Terpene,
}

/// 单个规范合物及其别名
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundEntry {
    pub canonical: String,
    pub class: CompoundClass,
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// 聚合规则：多个来源合物键求和写入一个目标键
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationRule {
    pub target: String,
    pub sources: Vec<String>,
}

impl AggregationRule {
    pub fn new(target: impl Into<String>, sources: &[&str]) -> Self {
        Self {
            target: target.into(),
            sources: sources.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// 规则成员：全部来源键加上目标键本身
    pub fn members(&self) -> impl Iterator<Item = &str> {
        self.sources
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.target.as_str()))
    }
}

/// 子品类映射：全局映射 + 按品类划分的作用域映射
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubcategoryDefinition {
    #[serde(default)]
    pub global: BTreeMap<String, String>,
    #[serde(default)]
    pub scoped: BTreeMap<MedicationCategory, BTreeMap<String, String>>,
}

/// 字段角色别名：各数据源对同一语义字段的不同命名
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldAliases {
    #[serde(default)]
    pub name: Vec<String>,
    #[serde(default)]
    pub brand: Vec<String>,
    #[serde(default)]
    pub category: Vec<String>,
    #[serde(default)]
    pub subcategory: Vec<String>,
    /// 有序：排在前面的价格字段优先（折扣价应排在原价之前）
    #[serde(default)]
    pub price: Vec<String>,
    #[serde(default)]
    pub weight_grams: Vec<String>,
    #[serde(default)]
    pub weight_label: Vec<String>,
    /// 内部条目为合物读数的嵌套字段
    #[serde(default)]
    pub compound_containers: Vec<String>,
}

impl FieldAliases {
    /// 合并覆盖定义：覆盖方的别名排在前面（优先级更高），去重
    fn merge(&mut self, other: FieldAliases) {
        fn prepend(dst: &mut Vec<String>, src: Vec<String>) {
            let mut merged = src;
            for alias in dst.drain(..) {
                if !merged.contains(&alias) {
                    merged.push(alias);
                }
            }
            *dst = merged;
        }
        prepend(&mut self.name, other.name);
        prepend(&mut self.brand, other.brand);
        prepend(&mut self.category, other.category);
        prepend(&mut self.subcategory, other.subcategory);
        prepend(&mut self.price, other.price);
        prepend(&mut self.weight_grams, other.weight_grams);
        prepend(&mut self.weight_label, other.weight_label);
        prepend(&mut self.compound_containers, other.compound_containers);
    }
}

/// 完整映射表定义（编译前）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapDefinition {
    #[serde(default)]
    pub brands: BTreeMap<String, String>,
    #[serde(default)]
    pub categories: BTreeMap<String, MedicationCategory>,
    #[serde(default)]
    pub subcategories: SubcategoryDefinition,
    #[serde(default)]
    pub compounds: Vec<CompoundEntry>,
    #[serde(default)]
    pub junk: Vec<String>,
    #[serde(default)]
    pub aggregation_rules: Vec<AggregationRule>,
    #[serde(default)]
    pub fields: FieldAliases,
}

impl MapDefinition {
    /// 覆盖式合并：覆盖方的映射项覆盖已有项，列表项追加
    pub fn merge(&mut self, other: MapDefinition) {
        self.brands.extend(other.brands);
        self.categories.extend(other.categories);
        self.subcategories.global.extend(other.subcategories.global);
        for (category, scoped) in other.subcategories.scoped {
            self.subcategories.scoped.entry(category).or_default().extend(scoped);
        }

        for entry in other.compounds {
            match self.compounds.iter_mut().find(|e| e.canonical == entry.canonical) {
                Some(existing) => {
                    existing.class = entry.class;
                    for alias in entry.aliases {
                        if !existing.aliases.contains(&alias) {
                            existing.aliases.push(alias);
                        }
                    }
                }
                None => self.compounds.push(entry),
            }
        }

        for junk in other.junk {
            if !self.junk.contains(&junk) {
                self.junk.push(junk);
            }
        }

        // 同目标的规则整体替换，其余追加到末尾
        for rule in other.aggregation_rules {
            match self.aggregation_rules.iter_mut().find(|r| r.target == rule.target) {
                Some(existing) => *existing = rule,
                None => self.aggregation_rules.push(rule),
            }
        }

        self.fields.merge(other.fields);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_overrides_and_appends() {
        let mut base = MapDefinition::default();
        base.brands.insert("Good Green".into(), "GTI".into());
        base.compounds.push(CompoundEntry {
            canonical: "Limonene".into(),
            class: CompoundClass::Terpene,
            aliases: vec!["limonene".into()],
        });
        base.fields.price = vec!["price".into()];

        let override_json = r#"{
            "brands": {"Good Green": "Green Thumb", "Local Co": "Local"},
            "compounds": [{"canonical": "Limonene", "class": "Terpene", "aliases": ["d-limonene"]}],
            "fields": {"price": ["promo_price", "price"]}
        }"#;
        let other: MapDefinition = serde_json::from_str(override_json).unwrap();
        base.merge(other);

        assert_eq!(base.brands.get("Good Green").map(String::as_str), Some("Green Thumb"));
        assert_eq!(base.brands.len(), 2);
        assert_eq!(base.compounds[0].aliases, vec!["limonene".to_string(), "d-limonene".to_string()]);
        // 覆盖方的字段别名优先，且不重复
        assert_eq!(base.fields.price, vec!["promo_price".to_string(), "price".to_string()]);
    }

    #[test]
    fn test_rule_members_include_target() {
        let rule = AggregationRule::new("Pinene", &["alpha-Pinene", "beta-Pinene"]);
        let members: Vec<&str> = rule.members().collect();
        assert_eq!(members, vec!["alpha-Pinene", "beta-Pinene", "Pinene"]);
    }
}
