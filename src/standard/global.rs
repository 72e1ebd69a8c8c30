//! 进程级内置映射表单例
use once_cell::sync::OnceCell;
use std::sync::Arc;

use super::compiler::MapCompiler;
use super::defaults::default_definition;
use super::maps::StandardizationMaps;
use crate::error::DispResult;

/// 内置映射表实例（首次访问时编译）
static DEFAULT_MAPS: OnceCell<Arc<StandardizationMaps>> = OnceCell::new();

/// 获取内置映射表
pub fn default_maps() -> DispResult<Arc<StandardizationMaps>> {
    DEFAULT_MAPS
        .get_or_try_init(|| MapCompiler::compile(&default_definition()).map(Arc::new))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_maps_shared() {
        let a = default_maps().unwrap();
        let b = default_maps().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
