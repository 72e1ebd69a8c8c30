//! 合物聚合引擎
//! 按声明顺序执行聚合规则：任一成员有读数则求和写入目标，全部缺失则不输出目标

use std::collections::{BTreeMap, HashMap};

use crate::standard::AggregationRule;

/// 单条记录中属于聚合规则成员的读数（仅保存有值的读数）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompoundAccumulator {
    readings: HashMap<String, f64>,
}

impl CompoundAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次读数；缺失读数不会覆盖已有读数，两个有值读数以后者为准
    pub fn record(&mut self, canonical: &str, value: Option<f64>) {
        if let Some(v) = value {
            self.readings.insert(canonical.to_string(), v);
        }
    }

    pub fn get(&self, canonical: &str) -> Option<f64> {
        self.readings.get(canonical).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    fn take(&mut self, canonical: &str) -> Option<f64> {
        self.readings.remove(canonical)
    }
}

/// 合物聚合引擎
pub struct AggregationEngine;

impl AggregationEngine {
    /// 执行全部聚合规则，结果写入规范合物表
    /// 被规则消费的成员键不会出现在输出中
    pub fn apply(
        rules: &[AggregationRule],
        mut accumulator: CompoundAccumulator,
        compounds: &mut BTreeMap<String, f64>,
    ) {
        for rule in rules {
            let present: Vec<f64> = rule
                .members()
                .filter_map(|member| accumulator.take(member))
                .collect();
            if !present.is_empty() {
                compounds.insert(rule.target.clone(), present.iter().sum());
            }
        }

        // 不属于任何规则的读数原样保留
        for (canonical, value) in accumulator.readings {
            compounds.insert(canonical, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pinene_rule() -> Vec<AggregationRule> {
        vec![AggregationRule::new("Pinene", &["alpha-Pinene", "beta-Pinene"])]
    }

    #[test]
    fn test_sums_present_sources() {
        // 测试场景：alpha 1.2 + beta 0.8 = Pinene 2.0，来源键不出现在输出中
        let mut acc = CompoundAccumulator::new();
        acc.record("alpha-Pinene", Some(1.2));
        acc.record("beta-Pinene", Some(0.8));
        let mut compounds = BTreeMap::new();
        AggregationEngine::apply(&pinene_rule(), acc, &mut compounds);

        assert!((compounds["Pinene"] - 2.0).abs() < 1e-9);
        assert!(!compounds.contains_key("alpha-Pinene"));
        assert!(!compounds.contains_key("beta-Pinene"));
    }

    #[test]
    fn test_single_present_source() {
        let mut acc = CompoundAccumulator::new();
        acc.record("alpha-Pinene", Some(1.2));
        acc.record("beta-Pinene", None);
        let mut compounds = BTreeMap::new();
        AggregationEngine::apply(&pinene_rule(), acc, &mut compounds);

        assert_eq!(compounds.get("Pinene"), Some(&1.2));
    }

    #[test]
    fn test_all_missing_omits_target() {
        // 测试场景：全部来源缺失时不输出目标（而不是 0）
        let mut acc = CompoundAccumulator::new();
        acc.record("alpha-Pinene", None);
        acc.record("beta-Pinene", None);
        let mut compounds = BTreeMap::new();
        compounds.insert("THC".to_string(), 20.0);
        AggregationEngine::apply(&pinene_rule(), acc, &mut compounds);

        assert!(!compounds.contains_key("Pinene"));
        assert_eq!(compounds.len(), 1);
    }

    #[test]
    fn test_reported_target_counts_as_member() {
        // 测试场景：数据源直接给出总量时，与同时给出的异构体读数求和
        let mut acc = CompoundAccumulator::new();
        acc.record("Pinene", Some(0.5));
        acc.record("beta-Pinene", Some(0.25));
        let mut compounds = BTreeMap::new();
        AggregationEngine::apply(&pinene_rule(), acc, &mut compounds);

        assert_eq!(compounds.get("Pinene"), Some(&0.75));
    }

    #[test]
    fn test_missing_does_not_override_present() {
        let mut acc = CompoundAccumulator::new();
        acc.record("alpha-Pinene", Some(1.0));
        acc.record("alpha-Pinene", None);
        assert_eq!(acc.get("alpha-Pinene"), Some(1.0));
        acc.record("alpha-Pinene", Some(1.5));
        assert_eq!(acc.get("alpha-Pinene"), Some(1.5));
    }
}
