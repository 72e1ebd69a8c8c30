//! 重量换算工具
//! 将 "1/8oz"、"3.5g"、"500mg"、"half gram" 等规格文本统一换算为克

use once_cell::sync::Lazy;
use regex::Regex;

/// 常见规格名称 -> 克（统一按 1/8 盎司 = 3.5g）
const NAMED_WEIGHTS: &[(&str, f64)] = &[
    ("gram", 1.0), ("1g", 1.0), ("1 g", 1.0), ("1gc", 1.0),
    ("two gram", 2.0), ("2g", 2.0), ("2 g", 2.0), ("2gc", 2.0), ("3gc", 3.0),
    ("half gram", 0.5), ("0.5g", 0.5), ("0.5 g", 0.5),
    ("eighth ounce", 3.5), ("eighth_ounce", 3.5), ("1/8oz", 3.5), ("1/8 oz", 3.5),
    ("3.5g", 3.5), ("3.5 g", 3.5), ("3.5gc", 3.5),
    ("quarter ounce", 7.0), ("quarter_ounce", 7.0), ("1/4oz", 7.0), ("1/4 oz", 7.0),
    ("7g", 7.0), ("7 g", 7.0),
    ("half ounce", 14.0), ("1/2oz", 14.0), ("1/2 oz", 14.0), ("14g", 14.0), ("14 g", 14.0),
    ("ounce", 28.0), ("1oz", 28.0), ("1 oz", 28.0), ("28g", 28.0), ("28 g", 28.0),
];

/// 重量换算工具
pub struct WeightParser;

impl WeightParser {
    /// 规格文本换算为克，无法识别返回 None
    pub fn to_grams(label: &str) -> Option<f64> {
        static GRAM_REGEX: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r#"^([\d.]+)\s*(?:g|gram|grams)\b"#).unwrap()
        });
        static MILLIGRAM_REGEX: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r#"^([\d.]+)\s*mg\b"#).unwrap()
        });
        static OUNCE_REGEX: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r#"^([\d.]+)\s*(?:oz|ounce|ounces)\b"#).unwrap()
        });

        let label = label.trim().to_lowercase();
        if label.is_empty() {
            return None;
        }

        if let Some((_, grams)) = NAMED_WEIGHTS.iter().find(|(name, _)| *name == label) {
            return Some(*grams);
        }

        if let Some(v) = Self::capture_number(&MILLIGRAM_REGEX, &label) {
            return Some(v / 1000.0);
        }
        if let Some(v) = Self::capture_number(&GRAM_REGEX, &label) {
            return Some(v);
        }
        if let Some(v) = Self::capture_number(&OUNCE_REGEX, &label) {
            return Some(v * 28.0);
        }

        None
    }

    /// 从商品名中的方括号规格提取重量，如 "Blue Dream [3.5g]"、"Gummies [500mg]"
    pub fn from_product_name(name: &str) -> Option<f64> {
        static BRACKET_REGEX: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r#"(?i)\[([\d.]+)\s*(mg|g)\]"#).unwrap()
        });

        let captures = BRACKET_REGEX.captures(name)?;
        let value = captures.get(1)?.as_str().parse::<f64>().ok()?;
        match captures.get(2)?.as_str().to_lowercase().as_str() {
            "mg" => Some(value / 1000.0),
            "g" => Some(value),
            _ => None,
        }
    }

    fn capture_number(regex: &Regex, label: &str) -> Option<f64> {
        regex
            .captures(label)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .filter(|v| v.is_finite())
    }
}
