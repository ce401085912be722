//! Persistent announcement store
//!
//! The store is a key-addressable upsert/query service consumed over a
//! PostgREST-style HTTP surface (Supabase). The [`AnnouncementStore`]
//! trait is the seam; tests run against an in-memory implementation.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::extract::Announcement;

/// Persisted row: an announcement plus the notification flag.
///
/// `is_sent` is the only cross-run state the pipeline depends on: inserted
/// `false`, flipped `true` after the notification round for the batch that
/// contained the row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredAnnouncement {
    #[serde(flatten)]
    pub announcement: Announcement,
    pub is_sent: bool,
}

/// The persistent store surface the pipeline consumes
#[async_trait]
pub trait AnnouncementStore: Send + Sync {
    /// Look up a row by id; `Ok(None)` is the expected path for new items
    async fn find_by_id(&self, id: &str) -> Result<Option<StoredAnnouncement>>;

    /// Insert a new row with `is_sent = false`; the store enforces id
    /// uniqueness
    async fn insert(&self, item: &Announcement) -> Result<()>;

    /// Bulk-flip `is_sent = true` for the given ids
    async fn mark_sent(&self, ids: &[String]) -> Result<()>;
}

/// Environment variable carrying the Supabase project URL
pub const ENV_SUPABASE_URL: &str = "SUPABASE_URL";
/// Environment variable carrying the Supabase service key
pub const ENV_SUPABASE_KEY: &str = "SUPABASE_KEY";

const TABLE: &str = "announcements";

/// Supabase (PostgREST) implementation of the store surface
#[derive(Clone)]
pub struct SupabaseStore {
    base_url: String,
    api_key: String,
    client: Client,
}

impl SupabaseStore {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            client: Client::new(),
        }
    }

    /// Build the store from the environment (loading a local `.env` during
    /// development). Missing credentials are a fatal configuration error;
    /// callers should exit non-zero before any navigation.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let url = std::env::var(ENV_SUPABASE_URL)
            .map_err(|_| Error::Config(format!("{} is required", ENV_SUPABASE_URL)))?;
        let key = std::env::var(ENV_SUPABASE_KEY)
            .map_err(|_| Error::Config(format!("{} is required", ENV_SUPABASE_KEY)))?;
        Ok(Self::new(url, key))
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url.trim_end_matches('/'), TABLE)
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }
}

/// PostgREST `in.(...)` filter over quoted ids (ids can carry spaces and
/// non-ASCII text when the fallback synthesis produced them)
fn in_filter(ids: &[String]) -> String {
    let quoted: Vec<String> = ids
        .iter()
        .map(|id| format!("\"{}\"", id.replace('"', "\\\"")))
        .collect();
    format!("in.({})", quoted.join(","))
}

#[async_trait]
impl AnnouncementStore for SupabaseStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<StoredAnnouncement>> {
        let resp = self
            .authed(self.client.get(self.table_url()))
            .query(&[("id", format!("eq.{}", id)), ("select", "*".into())])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Store(format!("query failed ({}): {}", status, body)));
        }

        let mut rows: Vec<StoredAnnouncement> = resp.json().await?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }

    async fn insert(&self, item: &Announcement) -> Result<()> {
        let row = StoredAnnouncement {
            announcement: item.clone(),
            is_sent: false,
        };
        let resp = self
            .authed(self.client.post(self.table_url()))
            .header("Prefer", "return=minimal")
            .json(&row)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Store(format!(
                "insert failed ({}): {}",
                status, body
            )));
        }
        Ok(())
    }

    async fn mark_sent(&self, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let resp = self
            .authed(self.client.patch(self.table_url()))
            .query(&[("id", in_filter(ids))])
            .json(&serde_json::json!({ "is_sent": true }))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Store(format!(
                "mark_sent failed ({}): {}",
                status, body
            )));
        }
        Ok(())
    }
}
