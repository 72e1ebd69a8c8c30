//! 记录标准化器
//! 原始记录 -> 规范记录：品类、名称、品牌、子品类、价格/重量、合物读数

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use super::diagnostics::{CanonStats, UnmappedLog};
use crate::aggregator::{AggregationEngine, CompoundAccumulator};
use crate::error::{DispResult, DispensaryError};
use crate::model::{CanonicalProductRecord, MedicationCategory, RawBag, RawProductRecord, RawValue};
use crate::standard::{CompoundResolution, FieldRole, StandardizationMaps};
use crate::utils::{KeyNormalizer, NumericParser, WeightParser};

/// 嵌套合物容器的最大展开深度
const MAX_CONTAINER_DEPTH: usize = 3;

/// 记录被丢弃的原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// 品类不在药用允许列表内（配件、服饰等）
    UnmappedCategory(String),
    /// 记录没有品类字段
    MissingCategory,
}

/// 单条记录的标准化结果
#[derive(Debug, Clone, PartialEq)]
pub enum Canonicalized {
    Kept(CanonicalProductRecord),
    Dropped(DropReason),
}

/// 记录标准化器
#[derive(Debug, Clone)]
pub struct Canonicalizer {
    maps: Arc<StandardizationMaps>,
}

impl Canonicalizer {
    pub fn new(maps: Arc<StandardizationMaps>) -> Self {
        Self { maps }
    }

    pub fn maps(&self) -> &Arc<StandardizationMaps> {
        &self.maps
    }

    /// 标准化单条记录
    /// 缺少来源/门店标记或名称时返回 MalformedRecord；品类无法映射时返回 Dropped
    pub fn canonicalize(
        &self,
        raw: &RawProductRecord,
        unmapped: &mut UnmappedLog,
    ) -> DispResult<Canonicalized> {
        // 1. 来源/门店标记
        let source = Self::required_tag(raw, &raw.source, "source")?;
        let store = Self::required_tag(raw, &raw.store, "store")?;

        let index = FieldIndex::new(&raw.fields);

        // 2. 品类（允许列表）
        let Some(raw_category) = self.role_text(&index, FieldRole::Category) else {
            return Ok(Canonicalized::Dropped(DropReason::MissingCategory));
        };
        let Some(category) = self.maps.canonicalize_category(raw_category) else {
            let display = KeyNormalizer::display_form(raw_category);
            unmapped.record_category(&display);
            return Ok(Canonicalized::Dropped(DropReason::UnmappedCategory(display)));
        };

        // 3. 名称
        let name = self
            .role_text(&index, FieldRole::Name)
            .map(str::to_string)
            .ok_or_else(|| Self::malformed(raw, "name"))?;

        // 4. 品牌、子品类
        let brand = self.role_text(&index, FieldRole::Brand).map(|b| {
            let resolution = self.maps.canonicalize_brand(b);
            if !resolution.is_mapped() {
                unmapped.record_brand(resolution.value());
            }
            resolution.into_value()
        });
        let subcategory = self
            .role_text(&index, FieldRole::Subcategory)
            .map(|s| self.resolve_subcategory(s, category, unmapped));

        // 5. 价格、重量
        // 为 0 的折扣价视为没有折扣
        let price = self.role_positive(&index, FieldRole::Price);
        let weight_label = self.role_text(&index, FieldRole::WeightLabel).map(str::to_string);
        let weight_grams = self
            .role_positive(&index, FieldRole::WeightGrams)
            .or_else(|| weight_label.as_deref().and_then(WeightParser::to_grams))
            .or_else(|| WeightParser::from_product_name(&name));
        let price_per_gram = match (price, weight_grams) {
            (Some(p), Some(w)) if w > 0.0 => Some(p / w),
            _ => None,
        };

        // 6. 合物读数与聚合
        let compounds = self.collect_compounds(&index, unmapped);

        Ok(Canonicalized::Kept(CanonicalProductRecord {
            source,
            store,
            brand,
            category,
            subcategory,
            name,
            price,
            weight_grams,
            weight_label,
            price_per_gram,
            compounds,
        }))
    }

    /// 批量标准化：字段缺失的记录单独丢弃，不影响其余记录
    pub fn canonicalize_batch(
        &self,
        records: &[RawProductRecord],
        unmapped: &mut UnmappedLog,
    ) -> (Vec<CanonicalProductRecord>, CanonStats) {
        let mut stats = CanonStats {
            raw: records.len(),
            ..CanonStats::default()
        };
        let mut kept = Vec::with_capacity(records.len());

        for raw in records {
            match self.canonicalize(raw, unmapped) {
                Ok(Canonicalized::Kept(record)) => kept.push(record),
                Ok(Canonicalized::Dropped(_)) => stats.dropped_category += 1,
                Err(e) => {
                    debug!("丢弃原始记录：{}", e);
                    stats.malformed += 1;
                }
            }
        }
        stats.kept = kept.len();
        (kept, stats)
    }

    fn resolve_subcategory(
        &self,
        raw: &str,
        category: MedicationCategory,
        unmapped: &mut UnmappedLog,
    ) -> String {
        let resolution = self.maps.canonicalize_subcategory(raw, category);
        if !resolution.is_mapped() {
            unmapped.record_subcategory(resolution.value());
        }
        resolution.into_value()
    }

    /// 收集合物读数：容器字段内的条目逐个查表，顶层字段仅在能解析为规范合物时计入
    fn collect_compounds(&self, index: &FieldIndex<'_>, unmapped: &mut UnmappedLog) -> BTreeMap<String, f64> {
        let mut readings = Readings::default();
        let fields = self.maps.fields();

        for (key, raw_key, value) in &index.entries {
            match fields.role_of(key) {
                Some(FieldRole::CompoundContainer) => {
                    if let Some(bag) = value.as_nested() {
                        self.collect_container(bag, 0, &mut readings, unmapped);
                    }
                }
                Some(_) => {}
                None => {
                    if let CompoundResolution::Canonical(canonical) = self.maps.canonicalize_compound(raw_key) {
                        readings.record(&self.maps, &canonical, NumericParser::parse(value));
                    }
                }
            }
        }

        let mut compounds = readings.direct;
        AggregationEngine::apply(self.maps.aggregation_rules(), readings.accumulator, &mut compounds);
        compounds
    }

    fn collect_container(
        &self,
        bag: &RawBag,
        depth: usize,
        readings: &mut Readings,
        unmapped: &mut UnmappedLog,
    ) {
        for (key, value) in bag.iter() {
            if let RawValue::Nested(inner) = value {
                if depth < MAX_CONTAINER_DEPTH {
                    self.collect_container(inner, depth + 1, readings, unmapped);
                }
                continue;
            }
            // 纯下标键来自无名称的数组元素
            if key.chars().all(|c| c.is_ascii_digit()) {
                continue;
            }
            match self.maps.canonicalize_compound(key) {
                CompoundResolution::Canonical(canonical) => {
                    readings.record(&self.maps, &canonical, NumericParser::parse(value));
                }
                CompoundResolution::Junk => {}
                CompoundResolution::Unrecognized => {
                    unmapped.record_compound(&KeyNormalizer::display_form(key));
                }
            }
        }
    }

    /// 按角色别名的声明顺序取第一个非空文本
    fn role_text<'a>(&self, index: &FieldIndex<'a>, role: FieldRole) -> Option<&'a str> {
        self.maps
            .fields()
            .aliases(role)
            .iter()
            .find_map(|alias| index.values(alias).find_map(|v| v.as_text().map(str::trim).filter(|s| !s.is_empty())))
    }

    /// 按角色别名的声明顺序取第一个大于 0 的数值
    fn role_positive(&self, index: &FieldIndex<'_>, role: FieldRole) -> Option<f64> {
        self.maps
            .fields()
            .aliases(role)
            .iter()
            .find_map(|alias| {
                index
                    .values(alias)
                    .find_map(|v| NumericParser::parse(v).filter(|n| *n > 0.0))
            })
    }

    fn required_tag(raw: &RawProductRecord, tag: &str, field: &'static str) -> DispResult<String> {
        let trimmed = tag.trim();
        if trimmed.is_empty() {
            return Err(Self::malformed(raw, field));
        }
        Ok(trimmed.to_string())
    }

    fn malformed(raw: &RawProductRecord, field: &'static str) -> DispensaryError {
        DispensaryError::MalformedRecord {
            source_id: raw.source.clone(),
            store: raw.store.clone(),
            field,
        }
    }
}

/// 顶层字段的归一化索引（每条记录只归一化一次）
struct FieldIndex<'a> {
    entries: Vec<(String, &'a str, &'a RawValue)>,
}

impl<'a> FieldIndex<'a> {
    fn new(bag: &'a RawBag) -> Self {
        Self {
            entries: bag
                .iter()
                .map(|(k, v)| (KeyNormalizer::normalize(k), k, v))
                .collect(),
        }
    }

    fn values<'s>(&'s self, normalized_key: &'s str) -> impl Iterator<Item = &'a RawValue> + 's {
        self.entries
            .iter()
            .filter(move |(k, _, _)| k == normalized_key)
            .map(|(_, _, v)| *v)
    }
}

/// 单条记录的合物读数：规则成员进入累加器，其余直接写入
#[derive(Default)]
struct Readings {
    direct: BTreeMap<String, f64>,
    accumulator: CompoundAccumulator,
}

impl Readings {
    /// 同一规范键多次出现：有值覆盖缺失，两个有值以后者为准
    fn record(&mut self, maps: &StandardizationMaps, canonical: &str, value: Option<f64>) {
        if maps.is_rule_member(canonical) {
            self.accumulator.record(canonical, value);
        } else if let Some(v) = value {
            self.direct.insert(canonical.to_string(), v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::standard::default_maps;

    fn canonicalizer() -> Canonicalizer {
        Canonicalizer::new(default_maps().unwrap())
    }

    fn run(raw: &RawProductRecord) -> (DispResult<Canonicalized>, UnmappedLog) {
        let mut log = UnmappedLog::new();
        let outcome = canonicalizer().canonicalize(raw, &mut log);
        (outcome, log)
    }

    fn kept(raw: &RawProductRecord) -> CanonicalProductRecord {
        match run(raw).0.unwrap() {
            Canonicalized::Kept(record) => record,
            other => panic!("expected kept record, got {:?}", other),
        }
    }

    #[test]
    fn test_cresco_style_record() {
        // 测试场景：商标品牌归并、折扣价优先、克重字段、potency 容器内的合物
        let potency = RawBag::new()
            .with("thca", 24.1)
            .with("alpha_pinene", 1.2)
            .with("beta_pinene", 0.8)
            .with("total_terps", 3.3);
        let fields = RawBag::new()
            .with("name", "Bio Jesus [3.5g]")
            .with("brand", "FloraCal™")
            .with("category", "flower")
            .with("price", "50.00")
            .with("discounted_price", 40.0)
            .with("weight", "3.5g")
            .with("weight_in_g", 3.5)
            .with("potency", potency);
        let record = kept(&RawProductRecord::new("cresco", "Butler", fields));

        assert_eq!(record.brand.as_deref(), Some("Cresco"));
        assert_eq!(record.category, MedicationCategory::Flower);
        assert_eq!(record.price, Some(40.0));
        assert_eq!(record.weight_grams, Some(3.5));
        assert!((record.price_per_gram.unwrap() - 40.0 / 3.5).abs() < 1e-9);
        assert_eq!(record.compound("THCa"), Some(24.1));
        assert!((record.compound("Pinene").unwrap() - 2.0).abs() < 1e-9);
        assert_eq!(record.compound("alpha-Pinene"), None);
        assert_eq!(record.compounds.len(), 2);
    }

    #[test]
    fn test_unmapped_category_dropped() {
        let fields = RawBag::new().with("name", "Rolling Tray").with("category", "Accessories");
        let (outcome, log) = run(&RawProductRecord::new("cresco", "Butler", fields));

        assert_eq!(
            outcome.unwrap(),
            Canonicalized::Dropped(DropReason::UnmappedCategory("Accessories".into()))
        );
        assert!(log.categories.contains("Accessories"));
    }

    #[test]
    fn test_missing_category_dropped() {
        let fields = RawBag::new().with("name", "Mystery Item");
        let (outcome, _) = run(&RawProductRecord::new("cresco", "Butler", fields));
        assert_eq!(outcome.unwrap(), Canonicalized::Dropped(DropReason::MissingCategory));
    }

    #[test]
    fn test_missing_name_is_malformed() {
        let fields = RawBag::new().with("category", "flower").with("name", "  ");
        let (outcome, _) = run(&RawProductRecord::new("cresco", "Butler", fields));
        assert!(matches!(
            outcome,
            Err(DispensaryError::MalformedRecord { field: "name", .. })
        ));
    }

    #[test]
    fn test_missing_store_tag_is_malformed() {
        let fields = RawBag::new().with("category", "flower").with("name", "Blue Dream");
        let (outcome, _) = run(&RawProductRecord::new("cresco", "", fields));
        assert!(matches!(
            outcome,
            Err(DispensaryError::MalformedRecord { field: "store", .. })
        ));
    }

    #[test]
    fn test_pass_through_and_unrecognized_reported() {
        // 测试场景：未知品牌透传并记录，未知合物丢弃并记录，垃圾键静默忽略
        let compounds = RawBag::new()
            .with("Valencene", 0.3)
            .with("Limonene", 0.9)
            .with("lab tested", "yes");
        let fields = RawBag::new()
            .with("name", "Gummies")
            .with("brand", " Local Farms® ")
            .with("category", "edible")
            .with("subcategory", "Lozenges")
            .with("compounds", compounds);
        let (outcome, log) = run(&RawProductRecord::new("jane", "Camp Hill", fields));
        let Canonicalized::Kept(record) = outcome.unwrap() else {
            panic!("record should be kept");
        };

        assert_eq!(record.brand.as_deref(), Some("Local Farms"));
        assert_eq!(record.subcategory.as_deref(), Some("Lozenges"));
        assert_eq!(record.compound("Limonene"), Some(0.9));
        assert_eq!(record.compounds.len(), 1);
        assert!(log.brands.contains("Local Farms"));
        assert!(log.subcategories.contains("Lozenges"));
        assert!(log.compounds.contains("Valencene"));
        assert_eq!(log.compounds.len(), 1);
    }

    #[test]
    fn test_null_and_non_numeric_readings_are_missing() {
        // 测试场景：null / "N/A" 视为缺失，不会写成 0
        let terps = RawBag::new()
            .with("Linalool", RawValue::Null)
            .with("Humulene", "N/A")
            .with("AlphaPinene", RawValue::Null)
            .with("BetaPinene", RawValue::Null);
        let fields = RawBag::new()
            .with("name", "Blue Dream")
            .with("category", "flower")
            .with("terpenes", terps);
        let record = kept(&RawProductRecord::new("trulieve", "Camp Hill", fields));

        assert!(record.compounds.is_empty());
        assert_eq!(record.total_terpenes(&default_maps().unwrap()), None);
    }

    #[test]
    fn test_top_level_compound_fields() {
        // 测试场景：顶层的 thc_content 字段按合物读数处理，未知顶层字段忽略
        let fields = RawBag::new()
            .with("name", "Blue Dream")
            .with("category", "flower")
            .with("thc_content", 21.5)
            .with("cbd_content", RawValue::Null)
            .with("sku", "ABC-123");
        let (outcome, log) = run(&RawProductRecord::new("trulieve", "Camp Hill", fields));
        let Canonicalized::Kept(record) = outcome.unwrap() else {
            panic!("record should be kept");
        };

        assert_eq!(record.compound("THC"), Some(21.5));
        assert_eq!(record.compound("CBD"), None);
        assert!(log.is_empty());
    }

    #[test]
    fn test_duplicate_alias_later_present_wins() {
        let potency = RawBag::new()
            .with("THC", 18.0)
            .with("thc", RawValue::Null)
            .with("Thc", 19.0);
        let fields = RawBag::new()
            .with("name", "Blue Dream")
            .with("category", "flower")
            .with("potency", potency);
        let record = kept(&RawProductRecord::new("cresco", "Butler", fields));
        assert_eq!(record.compound("THC"), Some(19.0));
    }

    #[test]
    fn test_weight_from_label_then_name() {
        let from_label = RawBag::new()
            .with("name", "Live Resin Cart")
            .with("category", "vape")
            .with("subcategory", "live resin")
            .with("option", "0.5g")
            .with("price", 35.0);
        let record = kept(&RawProductRecord::new("trulieve", "Camp Hill", from_label));
        assert_eq!(record.weight_grams, Some(0.5));
        assert_eq!(record.price_per_gram, Some(70.0));
        assert_eq!(record.subcategory.as_deref(), Some("Live Resin Cartridges"));

        let from_name = RawBag::new().with("name", "Wedding Cake [7g]").with("category", "flower");
        let record = kept(&RawProductRecord::new("dutchie", "Ethos", from_name));
        assert_eq!(record.weight_grams, Some(7.0));
        assert_eq!(record.price_per_gram, None);
    }

    #[test]
    fn test_zero_sale_price_falls_back_to_regular_price() {
        // 测试场景：sale_unit_price 为 0 时使用 unit_price，每克价格随之正确
        let fields = RawBag::new()
            .with("name", "Blue Dream")
            .with("category", "Flower")
            .with("option", "1/8oz")
            .with("sale_unit_price", 0.0)
            .with("unit_price", 45.0);
        let record = kept(&RawProductRecord::new("trulieve", "Camp Hill", fields));
        assert_eq!(record.price, Some(45.0));
        assert_eq!(record.weight_grams, Some(3.5));
        assert!((record.price_per_gram.unwrap() - 45.0 / 3.5).abs() < 1e-9);

        let zero_weight = RawBag::new()
            .with("name", "Sour Diesel")
            .with("category", "Flower")
            .with("discounted_price", "0")
            .with("price", 50.0)
            .with("weight_in_g", 0.0)
            .with("net_weight_grams", 7.0);
        let record = kept(&RawProductRecord::new("cresco", "Butler", zero_weight));
        assert_eq!(record.price, Some(50.0));
        assert_eq!(record.weight_grams, Some(7.0));
    }

    #[test]
    fn test_canonicalize_is_idempotent() {
        // 测试场景：把规范记录的值作为原始输入再标准化一次，结果不变
        let terps = RawBag::new().with("a-pinene", 0.4).with("myrcene", 1.1);
        let fields = RawBag::new()
            .with("name", "Blue Dream")
            .with("brand", "Sunnyside")
            .with("category", "Flower")
            .with("subcategory", "smalls")
            .with("terpenes", terps);
        let first = kept(&RawProductRecord::new("cresco", "Butler", fields));

        let mut compounds = RawBag::new();
        for (k, v) in &first.compounds {
            compounds.push(k.clone(), *v);
        }
        let replay = RawBag::new()
            .with("name", first.name.as_str())
            .with("brand", first.brand.clone().unwrap())
            .with("category", first.category.as_str())
            .with("subcategory", first.subcategory.clone().unwrap())
            .with("compounds", compounds);
        let second = kept(&RawProductRecord::new("cresco", "Butler", replay));

        assert_eq!(first, second);
    }

    #[test]
    fn test_batch_counts() {
        let records = vec![
            RawProductRecord::new("s", "a", RawBag::new().with("name", "A").with("category", "flower")),
            RawProductRecord::new("s", "a", RawBag::new().with("name", "B").with("category", "apparel")),
            RawProductRecord::new("s", "a", RawBag::new().with("category", "flower")),
        ];
        let mut log = UnmappedLog::new();
        let (kept, stats) = canonicalizer().canonicalize_batch(&records, &mut log);

        assert_eq!(kept.len(), 1);
        assert_eq!(stats, CanonStats { raw: 3, kept: 1, dropped_category: 1, malformed: 1 });
    }
}
