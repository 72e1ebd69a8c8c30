//! 全局配置管理,存储所有可配置项

use std::path::PathBuf;

/// 全局配置
#[derive(Debug, Clone)]
pub struct GlobalConfig {
    // 每日快照目录
    pub snapshot_dir: PathBuf,
    // 映射表覆盖文件（JSON，合并到内置映射之上）
    pub maps_path: Option<PathBuf>,
    // 单次HTTP请求超时（单位：秒）
    pub http_timeout: u64,
    // 单个数据源整体截止时间（单位：秒）
    pub adapter_timeout: u64,
    // 并发运行的数据源上限
    pub max_parallel_adapters: usize,
    // 当日快照缺失时是否复用最近一次快照
    pub use_latest_snapshot: bool,
    // 空数据集是否也写入快照
    pub persist_empty: bool,
    // HTTP User-Agent
    pub user_agent: String,
    // 是否启用详细日志
    pub verbose: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            snapshot_dir: PathBuf::from("data/snapshots"),
            maps_path: None,
            http_timeout: 30,
            adapter_timeout: 600,
            max_parallel_adapters: 4,
            use_latest_snapshot: false,
            persist_empty: false,
            user_agent: format!("Rsdispensary/{}", env!("CARGO_PKG_VERSION")),
            verbose: false,
        }
    }
}

impl GlobalConfig {
    /// 实际生效的并发上限（0 视为 1）
    pub fn effective_parallelism(&self) -> usize {
        self.max_parallel_adapters.max(1)
    }
}

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 获取默认配置
    pub fn get_default() -> GlobalConfig {
        GlobalConfig::default()
    }

    /// 自定义配置
    pub fn custom() -> CustomConfigBuilder {
        CustomConfigBuilder::new()
    }
}

/// 配置构建器（便于自定义配置）
#[derive(Debug, Clone, Default)]
pub struct CustomConfigBuilder {
    config: GlobalConfig,
}

impl CustomConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: GlobalConfig::default(),
        }
    }

    pub fn snapshot_dir(mut self, path: PathBuf) -> Self {
        self.config.snapshot_dir = path;
        self
    }

    pub fn maps_path(mut self, path: Option<PathBuf>) -> Self {
        self.config.maps_path = path;
        self
    }

    pub fn http_timeout(mut self, timeout: u64) -> Self {
        self.config.http_timeout = timeout;
        self
    }

    pub fn adapter_timeout(mut self, timeout: u64) -> Self {
        self.config.adapter_timeout = timeout;
        self
    }

    pub fn max_parallel_adapters(mut self, n: usize) -> Self {
        self.config.max_parallel_adapters = n;
        self
    }

    pub fn use_latest_snapshot(mut self, enabled: bool) -> Self {
        self.config.use_latest_snapshot = enabled;
        self
    }

    pub fn persist_empty(mut self, enabled: bool) -> Self {
        self.config.persist_empty = enabled;
        self
    }

    pub fn user_agent(mut self, ua: String) -> Self {
        self.config.user_agent = ua;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.verbose = verbose;
        self
    }

    pub fn build(self) -> GlobalConfig {
        self.config
    }
}
