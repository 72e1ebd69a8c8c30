//! 映射表加载管理器
//! 内置映射表 + 可选的 JSON 覆盖文件

use std::path::Path;
use tracing::debug;

use super::compiler::MapCompiler;
use super::defaults::default_definition;
use super::maps::StandardizationMaps;
use super::model::MapDefinition;
use crate::config::GlobalConfig;
use crate::error::{DispResult, DispensaryError};

/// 映射表加载管理器
pub struct MapLoader;

impl MapLoader {
    /// 加载并编译映射表：未配置覆盖文件时使用内置映射表
    pub async fn load(config: &GlobalConfig) -> DispResult<StandardizationMaps> {
        let definition = Self::load_definition(config).await?;
        MapCompiler::compile(&definition)
    }

    /// 加载映射表定义（编译前）
    pub async fn load_definition(config: &GlobalConfig) -> DispResult<MapDefinition> {
        let mut definition = default_definition();
        if let Some(path) = &config.maps_path {
            let overrides = Self::read_override(path).await?;
            definition.merge(overrides);
            debug!("已合并映射表覆盖文件：{}", path.display());
        }
        Ok(definition)
    }

    /// 读取覆盖文件
    pub async fn read_override(path: &Path) -> DispResult<MapDefinition> {
        let data = tokio::fs::read(path).await.map_err(|e| {
            DispensaryError::MapLoadError(format!("读取 {} 失败：{}", path.display(), e))
        })?;
        serde_json::from_slice(&data).map_err(|e| {
            DispensaryError::MapLoadError(format!("解析 {} 失败：{}", path.display(), e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigManager;
    use crate::standard::Resolution;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_load_without_override_uses_defaults() {
        let maps = MapLoader::load(&ConfigManager::get_default()).await.unwrap();
        assert_eq!(maps.canonicalize_brand("Sunnyside"), Resolution::Mapped("Cresco".into()));
    }

    #[tokio::test]
    async fn test_override_file_merged_over_defaults() {
        // 测试场景：覆盖文件新增品牌别名，内置条目仍然可用
        let dir = tempdir().unwrap();
        let path = dir.path().join("maps.json");
        tokio::fs::write(&path, r#"{"brands": {"Local Leaf Co": "Local Leaf"}}"#).await.unwrap();

        let config = ConfigManager::custom().maps_path(Some(path)).build();
        let maps = MapLoader::load(&config).await.unwrap();
        assert_eq!(maps.canonicalize_brand("local leaf co"), Resolution::Mapped("Local Leaf".into()));
        assert_eq!(maps.canonicalize_brand("Sunnyside"), Resolution::Mapped("Cresco".into()));
    }

    #[tokio::test]
    async fn test_missing_override_is_load_error() {
        let config = ConfigManager::custom()
            .maps_path(Some("/nonexistent/rsdispensary/maps.json".into()))
            .build();
        assert!(matches!(MapLoader::load(&config).await, Err(DispensaryError::MapLoadError(_))));
    }

    #[tokio::test]
    async fn test_conflicting_override_rejected() {
        // 测试场景：覆盖文件把已有别名改指向别处，同时与另一条规范值冲突
        let dir = tempdir().unwrap();
        let path = dir.path().join("maps.json");
        tokio::fs::write(&path, r#"{"brands": {"Cresco": "Sunnyside Brand"}}"#).await.unwrap();

        let config = ConfigManager::custom().maps_path(Some(path)).build();
        assert!(matches!(MapLoader::load(&config).await, Err(DispensaryError::MapConflict(_))));
    }
}
