use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use sr_domain::config::PermissionConfig;
use sr_domain::error::{Error, Result};
use sr_domain::trace::TraceEvent;

use crate::util::{expect_success, from_reqwest};

/// Per-user permission lookup.
#[async_trait::async_trait]
pub trait PermissionCheck: Send + Sync {
    /// Permission level of `user_id`.  A level `<= 0` means no access.
    async fn level(&self, user_id: &str, user_name: &str) -> Result<i64>;
}

/// Levels at or below zero may not use the relay.
pub fn is_allowed(level: i64) -> bool {
    level > 0
}

#[derive(Debug, Deserialize)]
struct UsersPage {
    #[serde(default)]
    users: Vec<UserRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct UserRecord {
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    name: String,
    permission_level: i64,
}

pub struct PermissionClient {
    http: Client,
    base_url: String,
    default_level: i64,
}

impl PermissionClient {
    pub fn new(cfg: &PermissionConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(cfg.timeout())
            .build()
            .map_err(from_reqwest)?;

        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_owned(),
            default_level: cfg.default_level,
        })
    }

    /// Register an unknown user with the default level.
    async fn enroll(&self, user_id: &str, user_name: &str) -> Result<i64> {
        let record = UserRecord {
            user_id: user_id.to_owned(),
            name: user_name.to_owned(),
            permission_level: self.default_level,
        };
        let resp = self
            .http
            .post(format!("{}/users", self.base_url))
            .json(&record)
            .send()
            .await
            .map_err(from_reqwest)?;

        if resp.status() != StatusCode::CREATED {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Service(format!(
                "enrolling user failed: HTTP {status} - {body}"
            )));
        }

        tracing::info!(user_id, permission_level = self.default_level, "user enrolled with default permission");
        Ok(self.default_level)
    }
}

#[async_trait::async_trait]
impl PermissionCheck for PermissionClient {
    async fn level(&self, user_id: &str, user_name: &str) -> Result<i64> {
        let resp = self
            .http
            .get(format!("{}/users", self.base_url))
            .query(&[("user_id", user_id)])
            .send()
            .await
            .map_err(from_reqwest)?;
        let resp = expect_success(resp, Error::Service).await?;
        let page: UsersPage = resp.json().await.map_err(from_reqwest)?;

        let level = match page.users.first() {
            Some(user) => user.permission_level,
            None => self.enroll(user_id, user_name).await?,
        };

        TraceEvent::PermissionChecked {
            user_id: user_id.to_owned(),
            level,
        }
        .emit();

        Ok(level)
    }
}
