//! 映射表编译器
//! 将映射表定义编译为归一化键的查找表，并校验一致性

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::time::Instant;
use tracing::debug;

use super::maps::{FieldRoles, StandardizationMaps};
use super::model::{AggregationRule, CompoundClass, CompoundEntry, FieldAliases, MapDefinition};
use crate::error::{DispResult, DispensaryError};
use crate::model::MedicationCategory;
use crate::utils::KeyNormalizer;

/// 映射表编译器
pub struct MapCompiler;

impl MapCompiler {
    /// 编译映射表定义
    pub fn compile(def: &MapDefinition) -> DispResult<StandardizationMaps> {
        let start = Instant::now();

        // 1. 品牌与子品类（含规范值自映射）
        let brands = Self::compile_alias_table("品牌", &def.brands)?;
        let subcategory_global = Self::compile_alias_table("子品类", &def.subcategories.global)?;
        let mut subcategory_scoped = HashMap::new();
        for (category, table) in &def.subcategories.scoped {
            let label = format!("子品类[{}]", category);
            let scoped = Self::compile_alias_table(&label, table)?;
            Self::check_scope_against_global(&label, &scoped, &subcategory_global)?;
            subcategory_scoped.insert(*category, scoped);
        }

        // 2. 品类允许列表
        let categories = Self::compile_categories(&def.categories)?;

        // 3. 合物别名与垃圾键
        let (compounds, compound_classes) = Self::compile_compounds(&def.compounds)?;
        let mut junk = HashSet::new();
        for raw in &def.junk {
            let key = Self::normalized_non_empty("垃圾键", raw)?;
            if let Some(canonical) = compounds.get(&key) {
                return Err(DispensaryError::MapConflict(format!(
                    "垃圾键 '{}' 同时是合物 '{}' 的别名",
                    raw, canonical
                )));
            }
            junk.insert(key);
        }

        // 4. 聚合规则
        let rule_members = Self::validate_rules(&def.aggregation_rules, &compound_classes)?;

        let maps = StandardizationMaps {
            brands,
            categories,
            subcategory_global,
            subcategory_scoped,
            compounds,
            compound_classes,
            junk,
            rules: def.aggregation_rules.clone(),
            rule_members,
            fields: Self::compile_fields(&def.fields),
        };

        debug!("✅ 映射表编译完成，总耗时{:?}", start.elapsed());
        debug!("📊 映射统计：{}", maps.stats());
        Ok(maps)
    }

    /// 编译别名表：先插入全部别名，再为每个规范值插入自映射
    fn compile_alias_table(
        label: &str,
        table: &BTreeMap<String, String>,
    ) -> DispResult<HashMap<String, String>> {
        let mut map = HashMap::with_capacity(table.len() * 2);
        for (alias, canonical) in table {
            Self::insert_alias(&mut map, label, alias, canonical)?;
        }
        let canonicals: BTreeSet<&String> = table.values().collect();
        for canonical in canonicals {
            Self::insert_alias(&mut map, label, canonical, canonical)?;
        }
        Ok(map)
    }

    fn insert_alias(
        map: &mut HashMap<String, String>,
        label: &str,
        alias: &str,
        canonical: &str,
    ) -> DispResult<()> {
        let key = Self::normalized_non_empty(label, alias)?;
        match map.get(&key) {
            Some(existing) if existing != canonical => Err(DispensaryError::MapConflict(format!(
                "{}别名 '{}' 同时映射到 '{}' 与 '{}'",
                label, alias, existing, canonical
            ))),
            Some(_) => Ok(()),
            None => {
                map.insert(key, canonical.to_string());
                Ok(())
            }
        }
    }

    /// 全局子品类的规范值在作用域内不能被改写
    fn check_scope_against_global(
        label: &str,
        scoped: &HashMap<String, String>,
        global: &HashMap<String, String>,
    ) -> DispResult<()> {
        let global_canonicals: BTreeSet<&String> = global.values().collect();
        for canonical in global_canonicals {
            let key = KeyNormalizer::normalize(canonical);
            if let Some(scoped_value) = scoped.get(&key) {
                if scoped_value != canonical {
                    return Err(DispensaryError::MapConflict(format!(
                        "{}将全局规范值 '{}' 改写为 '{}'",
                        label, canonical, scoped_value
                    )));
                }
            }
        }
        Ok(())
    }

    fn compile_categories(
        table: &BTreeMap<String, MedicationCategory>,
    ) -> DispResult<HashMap<String, MedicationCategory>> {
        let mut map = HashMap::with_capacity(table.len() + MedicationCategory::ALL.len());
        let self_entries = MedicationCategory::ALL.iter().map(|c| (c.as_str().to_string(), *c));
        for (alias, category) in table.iter().map(|(k, v)| (k.clone(), *v)).chain(self_entries) {
            let key = Self::normalized_non_empty("品类", &alias)?;
            match map.get(&key) {
                Some(existing) if *existing != category => {
                    return Err(DispensaryError::MapConflict(format!(
                        "品类别名 '{}' 同时映射到 '{}' 与 '{}'",
                        alias, existing, category
                    )));
                }
                Some(_) => {}
                None => {
                    map.insert(key, category);
                }
            }
        }
        Ok(map)
    }

    fn compile_compounds(
        entries: &[CompoundEntry],
    ) -> DispResult<(HashMap<String, String>, HashMap<String, CompoundClass>)> {
        let mut aliases = HashMap::new();
        let mut classes = HashMap::with_capacity(entries.len());

        for entry in entries {
            if let Some(existing) = classes.insert(entry.canonical.clone(), entry.class) {
                if existing != entry.class {
                    return Err(DispensaryError::MapConflict(format!(
                        "合物 '{}' 被声明为两种类别",
                        entry.canonical
                    )));
                }
            }
            for alias in &entry.aliases {
                Self::insert_alias(&mut aliases, "合物", alias, &entry.canonical)?;
            }
        }
        // 自映射最后插入，别名抢占规范名的键同样视为冲突
        for entry in entries {
            Self::insert_alias(&mut aliases, "合物", &entry.canonical, &entry.canonical)?;
        }

        Ok((aliases, classes))
    }

    /// 校验聚合规则：目标唯一、来源集合两两不相交、来源不是其他规则的目标、成员均为已声明合物
    fn validate_rules(
        rules: &[AggregationRule],
        classes: &HashMap<String, CompoundClass>,
    ) -> DispResult<HashSet<String>> {
        let targets: HashSet<&str> = rules.iter().map(|r| r.target.as_str()).collect();
        if targets.len() != rules.len() {
            return Err(DispensaryError::MapConflict("聚合规则目标重复".to_string()));
        }

        let mut members = HashSet::new();
        let mut seen_sources = HashSet::new();
        for rule in rules {
            if rule.sources.is_empty() {
                return Err(DispensaryError::MapConflict(format!(
                    "聚合规则 '{}' 没有来源",
                    rule.target
                )));
            }
            for member in rule.members() {
                if !classes.contains_key(member) {
                    return Err(DispensaryError::MapConflict(format!(
                        "聚合规则 '{}' 的成员 '{}' 不是已声明的规范合物",
                        rule.target, member
                    )));
                }
            }
            for source in &rule.sources {
                if targets.contains(source.as_str()) {
                    return Err(DispensaryError::MapConflict(format!(
                        "合物 '{}' 既是聚合来源又是聚合目标",
                        source
                    )));
                }
                if !seen_sources.insert(source.as_str()) {
                    return Err(DispensaryError::MapConflict(format!(
                        "合物 '{}' 出现在多条聚合规则的来源中",
                        source
                    )));
                }
            }
            members.extend(rule.members().map(str::to_string));
        }
        Ok(members)
    }

    fn compile_fields(fields: &FieldAliases) -> FieldRoles {
        fn normalize_list(list: &[String]) -> Vec<String> {
            let mut out: Vec<String> = Vec::with_capacity(list.len());
            for alias in list {
                let key = KeyNormalizer::normalize(alias);
                if !key.is_empty() && !out.contains(&key) {
                    out.push(key);
                }
            }
            out
        }

        FieldRoles {
            name: normalize_list(&fields.name),
            brand: normalize_list(&fields.brand),
            category: normalize_list(&fields.category),
            subcategory: normalize_list(&fields.subcategory),
            price: normalize_list(&fields.price),
            weight_grams: normalize_list(&fields.weight_grams),
            weight_label: normalize_list(&fields.weight_label),
            compound_containers: normalize_list(&fields.compound_containers),
        }
    }

    fn normalized_non_empty(label: &str, raw: &str) -> DispResult<String> {
        let key = KeyNormalizer::normalize(raw);
        if key.is_empty() {
            return Err(DispensaryError::MapLoadError(format!("{}键 '{}' 归一化后为空", label, raw)));
        }
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::standard::defaults::default_definition;
    use crate::standard::{CompoundClass, CompoundResolution, Resolution};

    fn compiled_defaults() -> StandardizationMaps {
        MapCompiler::compile(&default_definition()).unwrap()
    }

    #[test]
    fn test_default_definition_compiles() {
        let maps = compiled_defaults();
        let stats = maps.stats();
        assert!(stats.brand_aliases > 50);
        assert_eq!(stats.aggregation_rules, 1);
        assert!(maps.is_rule_member("alpha-Pinene"));
        assert!(maps.is_rule_member("Pinene"));
        assert!(!maps.is_rule_member("Limonene"));
    }

    #[test]
    fn test_brand_lookup_folds_trademarks() {
        // 测试场景：商标符号、大小写、尾部空白不影响品牌归并
        let maps = compiled_defaults();
        assert_eq!(maps.canonicalize_brand("FloraCal™"), Resolution::Mapped("Cresco".into()));
        assert_eq!(maps.canonicalize_brand("cresco labs "), Resolution::Mapped("Cresco".into()));
        assert_eq!(maps.canonicalize_brand("KYND"), Resolution::Mapped("Ayr".into()));
        assert_eq!(
            maps.canonicalize_brand("  Local  Farms® "),
            Resolution::PassThrough("Local Farms".into())
        );
    }

    #[test]
    fn test_category_allow_list() {
        let maps = compiled_defaults();
        assert_eq!(maps.canonicalize_category("vapes"), Some(MedicationCategory::Vaporizers));
        assert_eq!(maps.canonicalize_category("Pre-Rolls"), Some(MedicationCategory::PreRolls));
        assert_eq!(maps.canonicalize_category("Concentrate"), Some(MedicationCategory::Concentrates));
        assert_eq!(maps.canonicalize_category("Accessories"), None);
        assert_eq!(maps.canonicalize_category("Apparel"), None);
    }

    #[test]
    fn test_subcategory_is_scoped_by_category() {
        // 测试场景：同一原始子品类在不同品类下得到不同规范值
        let maps = compiled_defaults();
        assert_eq!(
            maps.canonicalize_subcategory("live resin", MedicationCategory::Vaporizers).value(),
            "Live Resin Cartridges"
        );
        assert_eq!(
            maps.canonicalize_subcategory("Live Resin", MedicationCategory::Concentrates).value(),
            "Live Resin"
        );
        assert_eq!(
            maps.canonicalize_subcategory("cartridge", MedicationCategory::Vaporizers),
            Resolution::Mapped("Cartridges".into())
        );
    }

    #[test]
    fn test_compound_aliases_and_junk() {
        let maps = compiled_defaults();
        for raw in ["alpha-pinene", "a-pinene", "AlphaPinene", "alpha_pinene"] {
            assert_eq!(maps.canonicalize_compound(raw), CompoundResolution::Canonical("alpha-Pinene".into()));
        }
        assert_eq!(maps.canonicalize_compound("thc_content"), CompoundResolution::Canonical("THC".into()));
        assert_eq!(maps.canonicalize_compound("total_terps"), CompoundResolution::Junk);
        assert_eq!(maps.canonicalize_compound("package_number"), CompoundResolution::Junk);
        assert_eq!(maps.canonicalize_compound("unobtainium"), CompoundResolution::Unrecognized);
        assert_eq!(maps.compound_class("THCa"), Some(CompoundClass::Cannabinoid));
        assert_eq!(maps.compound_class("Linalool"), Some(CompoundClass::Terpene));
    }

    #[test]
    fn test_canonical_values_are_fixed_points() {
        // 测试场景：对规范值再次标准化结果不变
        let def = default_definition();
        let maps = compiled_defaults();

        for canonical in def.brands.values() {
            assert_eq!(maps.canonicalize_brand(canonical), Resolution::Mapped(canonical.clone()));
        }
        for category in MedicationCategory::ALL {
            assert_eq!(maps.canonicalize_category(category.as_str()), Some(category));
        }
        for (category, table) in &def.subcategories.scoped {
            for canonical in table.values() {
                assert_eq!(maps.canonicalize_subcategory(canonical, *category).value(), canonical);
            }
            for canonical in def.subcategories.global.values() {
                assert_eq!(maps.canonicalize_subcategory(canonical, *category).value(), canonical);
            }
        }
        for entry in &def.compounds {
            assert_eq!(
                maps.canonicalize_compound(&entry.canonical),
                CompoundResolution::Canonical(entry.canonical.clone())
            );
        }
    }

    #[test]
    fn test_alias_conflict_rejected() {
        // 测试场景：两个原始写法归一化后相同却映射到不同品牌
        let mut def = MapDefinition::default();
        def.brands.insert("Good Green".into(), "GTI".into());
        def.brands.insert("GOOD-GREEN".into(), "Other".into());
        assert!(matches!(MapCompiler::compile(&def), Err(DispensaryError::MapConflict(_))));
    }

    #[test]
    fn test_alias_shadowing_canonical_rejected() {
        // 测试场景：别名抢占另一个规范值的键，重复标准化将不稳定
        let mut def = MapDefinition::default();
        def.brands.insert("Select".into(), "Curaleaf".into());
        def.brands.insert("Curaleaf".into(), "Select".into());
        assert!(matches!(MapCompiler::compile(&def), Err(DispensaryError::MapConflict(_))));
    }

    #[test]
    fn test_rule_validation() {
        let terp = |name: &str| CompoundEntry {
            canonical: name.into(),
            class: CompoundClass::Terpene,
            aliases: vec![],
        };
        let mut def = MapDefinition::default();
        def.compounds = vec![terp("alpha-Pinene"), terp("beta-Pinene"), terp("Pinene"), terp("Ocimene")];

        // 来源集合相交
        def.aggregation_rules = vec![
            AggregationRule::new("Pinene", &["alpha-Pinene", "beta-Pinene"]),
            AggregationRule::new("Ocimene", &["beta-Pinene"]),
        ];
        assert!(MapCompiler::compile(&def).is_err());

        // 来源是另一条规则的目标
        def.aggregation_rules = vec![
            AggregationRule::new("Pinene", &["alpha-Pinene", "beta-Pinene"]),
            AggregationRule::new("Ocimene", &["Pinene"]),
        ];
        assert!(MapCompiler::compile(&def).is_err());

        // 成员未声明
        def.aggregation_rules = vec![AggregationRule::new("Pinene", &["alpha-Pinene", "gamma-Pinene"])];
        assert!(MapCompiler::compile(&def).is_err());

        def.aggregation_rules = vec![AggregationRule::new("Pinene", &["alpha-Pinene", "beta-Pinene"])];
        assert!(MapCompiler::compile(&def).is_ok());
    }

    #[test]
    fn test_junk_may_not_shadow_compound() {
        let mut def = MapDefinition::default();
        def.compounds = vec![CompoundEntry {
            canonical: "THC".into(),
            class: CompoundClass::Cannabinoid,
            aliases: vec!["thc_content".into()],
        }];
        def.junk = vec!["THC Content".into()];
        assert!(matches!(MapCompiler::compile(&def), Err(DispensaryError::MapConflict(_))));
    }
}
