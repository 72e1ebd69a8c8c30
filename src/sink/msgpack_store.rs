//! MessagePack 文件快照存储
//! 每个日期键一个文件：`<目录>/snapshot_<YYYY-MM-DD>.mp`

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use async_trait::async_trait;
use rmp_serde::{Serializer, from_slice};
use serde::Serialize;
use tracing::debug;

use super::SnapshotSink;
use crate::config::GlobalConfig;
use crate::error::{DispResult, DispensaryError};
use crate::model::{DateKey, UnifiedDataset};

const FILE_PREFIX: &str = "snapshot_";
const FILE_SUFFIX: &str = ".mp";

/// MessagePack 文件快照存储
#[derive(Debug, Clone)]
pub struct MsgPackSnapshotStore {
    dir: PathBuf,
}

impl MsgPackSnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn from_config(config: &GlobalConfig) -> Self {
        Self::new(config.snapshot_dir.clone())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 日期键对应的快照文件路径
    pub fn path_for(&self, key: DateKey) -> PathBuf {
        self.dir.join(format!("{}{}{}", FILE_PREFIX, key, FILE_SUFFIX))
    }

    fn key_from_file_name(name: &str) -> Option<DateKey> {
        name.strip_prefix(FILE_PREFIX)?
            .strip_suffix(FILE_SUFFIX)?
            .parse()
            .ok()
    }

    fn unavailable(action: &str, path: &Path, e: impl std::fmt::Display) -> DispensaryError {
        DispensaryError::SinkUnavailable(format!("{} {} 失败：{}", action, path.display(), e))
    }
}

#[async_trait]
impl SnapshotSink for MsgPackSnapshotStore {
    async fn exists(&self, key: DateKey) -> DispResult<bool> {
        let path = self.path_for(key);
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| Self::unavailable("检查", &path, e))
    }

    async fn load(&self, key: DateKey) -> DispResult<Option<UnifiedDataset>> {
        let path = self.path_for(key);
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Self::unavailable("读取", &path, e)),
        };

        // MessagePack反序列化
        let dataset: UnifiedDataset = from_slice(&data)
            .map_err(|e| DispensaryError::MsgPackError(format!("反序列化失败：{}", e)))?;
        debug!("快照 {} 反序列化成功，记录数：{}", key, dataset.len());
        Ok(Some(dataset))
    }

    async fn save(&self, dataset: &UnifiedDataset) -> DispResult<()> {
        let mut buf = Vec::new();
        // MessagePack序列化
        dataset.serialize(&mut Serializer::new(&mut buf))
            .map_err(|e| DispensaryError::MsgPackError(format!("序列化失败：{}", e)))?;
        debug!("快照 {} 序列化成功，数据大小：{} 字节", dataset.date_key, buf.len());

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| Self::unavailable("创建目录", &self.dir, e))?;

        // 先写临时文件再改名
        let path = self.path_for(dataset.date_key);
        let tmp = path.with_extension("mp.tmp");
        tokio::fs::write(&tmp, buf)
            .await
            .map_err(|e| Self::unavailable("写入", &tmp, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| Self::unavailable("替换", &path, e))?;
        Ok(())
    }

    async fn latest_before(&self, key: DateKey) -> DispResult<Option<UnifiedDataset>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Self::unavailable("列出", &self.dir, e)),
        };

        let mut latest: Option<DateKey> = None;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Self::unavailable("列出", &self.dir, e))?
        {
            let name = entry.file_name();
            let Some(candidate) = name.to_str().and_then(Self::key_from_file_name) else {
                continue;
            };
            if candidate < key && latest.is_none_or(|l| candidate > l) {
                latest = Some(candidate);
            }
        }

        match latest {
            Some(found) => {
                debug!("找到 {} 之前最近的快照：{}", key, found);
                self.load(found).await
            }
            None => Ok(None),
        }
    }

    fn backend_type(&self) -> &'static str {
        "msgpack"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::tempdir;
    use crate::model::{CanonicalProductRecord, MedicationCategory};

    fn dataset(date: &str) -> UnifiedDataset {
        let record = CanonicalProductRecord {
            source: "cresco".into(),
            store: "Butler".into(),
            brand: Some("Cresco".into()),
            category: MedicationCategory::PreRolls,
            subcategory: None,
            name: "Bio Jesus".into(),
            price: Some(40.0),
            weight_grams: None,
            weight_label: Some("Each".into()),
            price_per_gram: None,
            compounds: BTreeMap::from([("THCa".to_string(), 24.1), ("Pinene".to_string(), 2.0)]),
        };
        UnifiedDataset::new(date.parse().unwrap(), vec![record])
    }

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        // 测试场景：保存后读取得到相同数据集，缺失字段仍为缺失
        let dir = tempdir().unwrap();
        let store = MsgPackSnapshotStore::new(dir.path().join("snapshots"));
        let original = dataset("2024-01-01");

        store.save(&original).await.unwrap();
        let key = original.date_key;
        assert!(store.exists(key).await.unwrap());
        assert_eq!(store.load(key).await.unwrap(), Some(original));
    }

    #[tokio::test]
    async fn test_absent_snapshot() {
        let dir = tempdir().unwrap();
        let store = MsgPackSnapshotStore::new(dir.path());
        let key: DateKey = "2024-01-01".parse().unwrap();
        assert!(!store.exists(key).await.unwrap());
        assert_eq!(store.load(key).await.unwrap(), None);
        assert_eq!(store.latest_before(key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_replaces_existing() {
        let dir = tempdir().unwrap();
        let store = MsgPackSnapshotStore::new(dir.path());
        store.save(&dataset("2024-01-01")).await.unwrap();
        let empty = UnifiedDataset::new("2024-01-01".parse().unwrap(), Vec::new());
        store.save(&empty).await.unwrap();
        assert_eq!(store.load(empty.date_key).await.unwrap(), Some(empty));
    }

    #[tokio::test]
    async fn test_latest_before_picks_most_recent_earlier() {
        // 测试场景：只考虑严格早于给定日期的快照，忽略无关文件
        let dir = tempdir().unwrap();
        let store = MsgPackSnapshotStore::new(dir.path());
        for date in ["2024-01-01", "2024-01-03", "2024-01-05"] {
            store.save(&dataset(date)).await.unwrap();
        }
        tokio::fs::write(dir.path().join("notes.txt"), "x").await.unwrap();

        let found = store.latest_before("2024-01-05".parse().unwrap()).await.unwrap().unwrap();
        assert_eq!(found.date_key.to_string(), "2024-01-03");
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_error() {
        let dir = tempdir().unwrap();
        let store = MsgPackSnapshotStore::new(dir.path());
        let key: DateKey = "2024-01-01".parse().unwrap();
        tokio::fs::write(store.path_for(key), b"not msgpack").await.unwrap();
        assert!(matches!(store.load(key).await, Err(DispensaryError::MsgPackError(_))));
    }
}
