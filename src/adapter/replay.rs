//! 原始响应回放适配器
//! 读取 `<目录>/<门店>/*.json` 中保存的菜单接口响应，按菜单格式解析

use std::path::{Path, PathBuf};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use super::vendor::VendorSchema;
use super::{FetchOutcome, ScraperAdapter, StoreFailure, StoreRef};
use crate::error::{DispResult, DispensaryError};
use crate::model::RawProductRecord;

/// 原始响应回放适配器
#[derive(Debug, Clone)]
pub struct ReplayAdapter {
    source_id: String,
    root: PathBuf,
    schema: VendorSchema,
}

impl ReplayAdapter {
    pub fn new(source_id: impl Into<String>, root: impl Into<PathBuf>, schema: VendorSchema) -> Self {
        Self {
            source_id: source_id.into(),
            root: root.into(),
            schema,
        }
    }

    pub fn schema(&self) -> VendorSchema {
        self.schema
    }

    /// 根目录下的全部门店子目录（按名称排序）
    pub async fn discover_stores(&self) -> DispResult<Vec<StoreRef>> {
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        let mut stores = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                stores.push(StoreRef::named(entry.file_name().to_string_lossy().into_owned()));
            }
        }
        stores.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(stores)
    }

    /// 单个门店目录下的 JSON 文件（按文件名排序，保证回放顺序稳定）
    async fn payload_files(dir: &Path) -> DispResult<Vec<PathBuf>> {
        let mut entries = tokio::fs::read_dir(dir).await?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json")) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    async fn replay_store(&self, store: &StoreRef) -> DispResult<Vec<RawProductRecord>> {
        let dir = self.root.join(&store.id);
        let mut records = Vec::new();
        for file in Self::payload_files(&dir).await? {
            let data = tokio::fs::read(&file).await?;
            let payload: Value = serde_json::from_slice(&data)?;
            let extracted = self.schema.extract(&self.source_id, &store.name, &payload);
            debug!("[{}] 回放 {}：{} 条", self.source_id, file.display(), extracted.len());
            records.extend(extracted);
        }
        Ok(records)
    }
}

#[async_trait]
impl ScraperAdapter for ReplayAdapter {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    async fn fetch(&self, stores: &[StoreRef]) -> DispResult<Vec<RawProductRecord>> {
        Ok(self.fetch_with_report(stores).await?.records)
    }

    async fn fetch_with_report(&self, stores: &[StoreRef]) -> DispResult<FetchOutcome> {
        let stores = if stores.is_empty() {
            self.discover_stores().await.map_err(|e| DispensaryError::AdapterFailure {
                source_id: self.source_id.clone(),
                reason: format!("无法读取回放目录 {}：{}", self.root.display(), e),
            })?
        } else {
            stores.to_vec()
        };

        let mut outcome = FetchOutcome::default();
        for store in &stores {
            match self.replay_store(store).await {
                Ok(store_records) => outcome.records.extend(store_records),
                Err(e) => {
                    warn!("[{}] 门店 {} 回放失败：{}", self.source_id, store.name, e);
                    outcome.store_failures.push(StoreFailure {
                        store: store.name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if !stores.is_empty() && outcome.store_failures.len() == stores.len() {
            return Err(DispensaryError::AdapterFailure {
                source_id: self.source_id.clone(),
                reason: "全部门店回放失败".to_string(),
            });
        }
        Ok(outcome)
    }
}
