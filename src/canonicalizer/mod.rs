//! 标准化模块：原始记录 -> 规范记录
pub mod canonicalizer;
pub mod diagnostics;

pub use self::canonicalizer::{Canonicalized, Canonicalizer, DropReason};
pub use self::diagnostics::{CanonStats, UnmappedLog};
