//! 通用工具：键归一化、数值解析、重量换算
pub mod key_normalizer;
pub mod numeric;
pub mod weight;

pub use self::key_normalizer::KeyNormalizer;
pub use self::numeric::NumericParser;
pub use self::weight::WeightParser;
