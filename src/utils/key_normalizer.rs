//! 映射键归一化工具
//! 原始键在查表前统一折叠大小写、空白与标点

/// 商标/注册标记字符
const TRADEMARK_GLYPHS: [char; 4] = ['™', '®', '©', '℠'];

/// 映射键归一化工具
pub struct KeyNormalizer;

impl KeyNormalizer {
    /// 归一化查表键：转小写、去商标符号、仅保留字母数字
    /// "Cresco™" / " cresco " / "CRESCO." 均得到 "cresco"
    pub fn normalize(raw: &str) -> String {
        raw.chars()
            .filter(|c| !TRADEMARK_GLYPHS.contains(c))
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect()
    }

    /// 展示形式：去首尾空白与商标符号，合并连续空白，保留原始大小写
    /// 用于未命中映射时原样透传
    pub fn display_form(raw: &str) -> String {
        let stripped: String = raw.chars().filter(|c| !TRADEMARK_GLYPHS.contains(c)).collect();
        stripped.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trademark_and_case_fold_identically() {
        // 测试场景：商标符号、大小写、尾部标点不影响查表键
        assert_eq!(KeyNormalizer::normalize("Cresco™"), "cresco");
        assert_eq!(KeyNormalizer::normalize("  CRESCO. "), "cresco");
        assert_eq!(KeyNormalizer::normalize("Supply®"), "supply");
    }

    #[test]
    fn test_separators_are_folded() {
        // 测试场景：连字符、下划线、空格、驼峰写法折叠到同一个键
        let expected = "alphapinene";
        assert_eq!(KeyNormalizer::normalize("alpha-Pinene"), expected);
        assert_eq!(KeyNormalizer::normalize("alpha_pinene"), expected);
        assert_eq!(KeyNormalizer::normalize("Alpha Pinene"), expected);
        assert_eq!(KeyNormalizer::normalize("AlphaPinene"), expected);
    }

    #[test]
    fn test_display_form_keeps_case() {
        // 测试场景：透传形式保留大小写，仅清理空白和商标符号
        assert_eq!(KeyNormalizer::display_form("  Local   Farms™ "), "Local Farms");
        assert_eq!(KeyNormalizer::display_form("R.O."), "R.O.");
    }
}
