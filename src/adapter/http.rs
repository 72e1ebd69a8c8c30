//! HTTP 菜单适配器
//! 按门店拼接菜单接口地址，支持页码参数分页，响应按菜单格式解析

use std::time::Duration;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use super::vendor::VendorSchema;
use super::{FetchOutcome, ScraperAdapter, StoreFailure, StoreRef};
use crate::config::GlobalConfig;
use crate::error::{DispResult, DispensaryError};
use crate::model::RawProductRecord;

/// 地址模板中的门店占位符
const STORE_PLACEHOLDER: &str = "{store_id}";

/// 分页配置
#[derive(Debug, Clone, PartialEq, Eq)]
struct Pagination {
    param: String,
    first_page: u32,
    max_pages: u32,
}

/// HTTP 菜单适配器
#[derive(Debug, Clone)]
pub struct HttpMenuAdapter {
    source_id: String,
    url_template: String,
    schema: VendorSchema,
    pagination: Option<Pagination>,
    client: Client,
}

impl HttpMenuAdapter {
    /// 创建适配器，请求超时与 User-Agent 取自全局配置
    pub fn new(
        source_id: impl Into<String>,
        url_template: impl Into<String>,
        schema: VendorSchema,
        config: &GlobalConfig,
    ) -> DispResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            source_id: source_id.into(),
            url_template: url_template.into(),
            schema,
            pagination: None,
            client,
        })
    }

    /// 启用页码分页：从 first_page 开始，最多拉取 max_pages 页
    pub fn with_pagination(mut self, param: impl Into<String>, first_page: u32, max_pages: u32) -> Self {
        self.pagination = Some(Pagination {
            param: param.into(),
            first_page,
            max_pages: max_pages.max(1),
        });
        self
    }

    /// 门店请求地址
    pub fn store_url(&self, store: &StoreRef) -> DispResult<Url> {
        let raw = self.url_template.replace(STORE_PLACEHOLDER, &store.id);
        Ok(Url::parse(&raw)?)
    }

    async fn fetch_payload(&self, url: Url) -> DispResult<Value> {
        let response = self.client.get(url.clone())
            .header("Accept", "application/json")
            .header("Accept-Encoding", "gzip, deflate")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DispensaryError::AdapterFailure {
                source_id: self.source_id.clone(),
                reason: format!("URL {} 返回状态码 {}", url, response.status()),
            });
        }

        Ok(response.json().await?)
    }

    async fn fetch_store(&self, store: &StoreRef) -> DispResult<Vec<RawProductRecord>> {
        let base = self.store_url(store)?;

        let Some(pagination) = &self.pagination else {
            let payload = self.fetch_payload(base).await?;
            return Ok(self.schema.extract(&self.source_id, &store.name, &payload));
        };

        let mut records = Vec::new();
        let last_page = pagination.first_page.saturating_add(pagination.max_pages - 1);
        for page in pagination.first_page..=last_page {
            let mut url = base.clone();
            url.query_pairs_mut().append_pair(&pagination.param, &page.to_string());

            let payload = self.fetch_payload(url).await?;
            let page_records = self.schema.extract(&self.source_id, &store.name, &payload);
            debug!("[{}] 门店 {} 第{}页：{} 条", self.source_id, store.name, page, page_records.len());

            let done = page_records.is_empty() || !self.schema.has_next_page(&payload);
            records.extend(page_records);
            if done {
                break;
            }
            if page == last_page {
                warn!("[{}] 门店 {} 达到分页上限 {} 页，停止翻页", self.source_id, store.name, pagination.max_pages);
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl ScraperAdapter for HttpMenuAdapter {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    async fn fetch(&self, stores: &[StoreRef]) -> DispResult<Vec<RawProductRecord>> {
        Ok(self.fetch_with_report(stores).await?.records)
    }

    /// 单个门店失败只跳过该门店并记入明细；全部门店失败才视为数据源失败
    async fn fetch_with_report(&self, stores: &[StoreRef]) -> DispResult<FetchOutcome> {
        if stores.is_empty() {
            return Err(DispensaryError::AdapterFailure {
                source_id: self.source_id.clone(),
                reason: "未配置任何门店".to_string(),
            });
        }

        let mut outcome = FetchOutcome::default();
        for store in stores {
            match self.fetch_store(store).await {
                Ok(store_records) => outcome.records.extend(store_records),
                Err(e) => {
                    warn!("[{}] 门店 {} 拉取失败：{}", self.source_id, store.name, e);
                    outcome.store_failures.push(StoreFailure {
                        store: store.name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if outcome.store_failures.len() == stores.len() {
            let reason = outcome
                .store_failures
                .pop()
                .map(|f| f.reason)
                .unwrap_or_else(|| "全部门店拉取失败".to_string());
            return Err(DispensaryError::AdapterFailure {
                source_id: self.source_id.clone(),
                reason,
            });
        }
        Ok(outcome)
    }
}
