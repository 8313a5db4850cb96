use reqwest::Client;
use serde::Serialize;

use sr_domain::config::AuditConfig;
use sr_domain::error::{Error, Result};

use crate::util::{expect_success, from_reqwest};

/// One answered question, as stored by the question log.
#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    pub name: String,
    pub query: String,
    pub reply: String,
    pub user_id: String,
    pub session_id: String,
    /// 1 direct, 2 group.
    pub chat_type: u8,
}

#[async_trait::async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, record: &AuditRecord) -> Result<()>;
}

pub struct AuditClient {
    http: Client,
    url: String,
}

impl AuditClient {
    pub fn new(cfg: &AuditConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(cfg.timeout())
            .build()
            .map_err(from_reqwest)?;

        Ok(Self {
            http,
            url: format!("{}/questions/add/", cfg.base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait::async_trait]
impl AuditSink for AuditClient {
    async fn record(&self, record: &AuditRecord) -> Result<()> {
        let resp = self
            .http
            .post(&self.url)
            .json(record)
            .send()
            .await
            .map_err(from_reqwest)?;
        expect_success(resp, Error::Service).await?;
        Ok(())
    }
}
