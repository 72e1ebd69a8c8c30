//! 宽松数值解析
//! 缺失、null、非数值字符串一律视为缺失（None），而不是 0

use crate::model::RawValue;

/// 数值解析工具
pub struct NumericParser;

impl NumericParser {
    /// 从原始值解析有限浮点数
    pub fn parse(value: &RawValue) -> Option<f64> {
        match value {
            RawValue::Number(n) => Self::finite(*n),
            RawValue::Text(s) => Self::parse_str(s),
            RawValue::Null | RawValue::Bool(_) | RawValue::Nested(_) => None,
        }
    }

    /// 解析字符串数值，容忍 "$45.00"、"1.2%"、"1,234.5" 这类写法
    pub fn parse_str(raw: &str) -> Option<f64> {
        let trimmed = raw.trim().trim_start_matches('$').trim_end_matches('%').trim();
        if trimmed.is_empty() {
            return None;
        }
        let cleaned: String = trimmed.chars().filter(|c| *c != ',').collect();
        cleaned.parse::<f64>().ok().and_then(Self::finite)
    }

    fn finite(n: f64) -> Option<f64> {
        n.is_finite().then_some(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers_and_numeric_strings() {
        assert_eq!(NumericParser::parse(&RawValue::Number(1.5)), Some(1.5));
        assert_eq!(NumericParser::parse(&RawValue::Text(" 0.82% ".into())), Some(0.82));
        assert_eq!(NumericParser::parse(&RawValue::Text("$45.00".into())), Some(45.0));
        assert_eq!(NumericParser::parse(&RawValue::Text("1,234.5".into())), Some(1234.5));
    }

    #[test]
    fn test_missing_is_not_zero() {
        // 测试场景：null、空串、非数值字符串都应视为缺失
        assert_eq!(NumericParser::parse(&RawValue::Null), None);
        assert_eq!(NumericParser::parse(&RawValue::Text("".into())), None);
        assert_eq!(NumericParser::parse(&RawValue::Text("N/A".into())), None);
        assert_eq!(NumericParser::parse(&RawValue::Bool(true)), None);
        assert_eq!(NumericParser::parse(&RawValue::Number(f64::NAN)), None);
    }
}
