//! Discord notification
//!
//! Newly-inserted announcements are batched into Discord webhook messages.
//! The sink limits embeds per message, so batches are split into chunks of
//! ten; the summary header rides only on the first chunk. A failed chunk is
//! logged and never blocks the chunks after it.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::extract::Announcement;

/// Discord's embeds-per-message limit
pub const CHUNK_SIZE: usize = 10;

const EMBED_COLOR_GREEN: u32 = 0x00ff00;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Environment variable carrying the webhook URL; unset means
/// notifications are skipped
pub const ENV_WEBHOOK_URL: &str = "DISCORD_WEBHOOK_URL";

/// The notification sink surface the pipeline consumes
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Report one batch of new announcements
    async fn notify(&self, items: &[Announcement]) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Embed {
    pub title: String,
    pub url: String,
    pub color: u32,
    pub fields: Vec<EmbedField>,
    pub footer: EmbedFooter,
}

/// One webhook message: optional summary content plus up to ten embeds
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub embeds: Vec<Embed>,
}

fn build_embed(item: &Announcement) -> Embed {
    Embed {
        title: format!("[신규 공고] {}", item.title),
        url: item.link.clone(),
        color: EMBED_COLOR_GREEN,
        fields: vec![
            EmbedField {
                name: "진행일자".into(),
                value: item.date.clone(),
                inline: true,
            },
            EmbedField {
                name: "수요기관".into(),
                value: item.agency.clone(),
                inline: true,
            },
        ],
        footer: EmbedFooter {
            text: format!("ID: {}", item.id),
        },
    }
}

/// Split a batch into webhook payloads: `ceil(n / 10)` messages, summary
/// header on the first only
pub fn build_payloads(items: &[Announcement]) -> Vec<WebhookPayload> {
    let embeds: Vec<Embed> = items.iter().map(build_embed).collect();
    embeds
        .chunks(CHUNK_SIZE)
        .enumerate()
        .map(|(i, chunk)| WebhookPayload {
            content: (i == 0).then(|| {
                format!(
                    "🔔 **{}건의 새로운 발주 공고가 발견되었습니다!**",
                    items.len()
                )
            }),
            embeds: chunk.to_vec(),
        })
        .collect()
}

/// Webhook-backed notifier
#[derive(Clone)]
pub struct DiscordNotifier {
    webhook_url: String,
    client: Client,
}

impl DiscordNotifier {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            client: Client::new(),
        }
    }

    /// Build the notifier from the environment; `None` when no webhook is
    /// configured (the pipeline then skips sending entirely)
    pub fn from_env() -> Option<Self> {
        std::env::var(ENV_WEBHOOK_URL).ok().map(Self::new)
    }

    async fn post_chunk(&self, payload: &WebhookPayload) -> Result<()> {
        let resp = self
            .client
            .post(&self.webhook_url)
            .timeout(REQUEST_TIMEOUT)
            .json(payload)
            .send()
            .await?;

        if let Err(e) = resp.error_for_status_ref() {
            return Err(Error::Notify(format!("webhook returned an error: {}", e)));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn notify(&self, items: &[Announcement]) -> Result<()> {
        for (i, payload) in build_payloads(items).iter().enumerate() {
            match self.post_chunk(payload).await {
                Ok(()) => tracing::info!("Discord notification chunk {} sent", i + 1),
                Err(e) => {
                    // Chunk failures do not abort the round or the run
                    tracing::warn!("Failed to send Discord chunk {}: {}", i + 1, e);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(n: usize) -> Announcement {
        Announcement {
            id: n.to_string(),
            title: format!("공고 {}", n),
            link: format!("https://g2b/d?bidno={}&s=1", n),
            date: "2025/11/02".into(),
            agency: "국토지리정보원".into(),
            status: "Open".into(),
        }
    }

    fn batch(n: usize) -> Vec<Announcement> {
        (0..n).map(item).collect()
    }

    #[test]
    fn chunking_is_ceil_of_tenths() {
        assert_eq!(build_payloads(&batch(1)).len(), 1);
        assert_eq!(build_payloads(&batch(10)).len(), 1);
        assert_eq!(build_payloads(&batch(11)).len(), 2);
        assert_eq!(build_payloads(&batch(25)).len(), 3);
        assert!(build_payloads(&batch(0)).is_empty());
    }

    #[test]
    fn no_chunk_exceeds_the_embed_limit() {
        for payload in build_payloads(&batch(25)) {
            assert!(payload.embeds.len() <= CHUNK_SIZE);
        }
    }

    #[test]
    fn summary_rides_only_the_first_chunk() {
        let payloads = build_payloads(&batch(23));
        assert!(payloads[0].content.as_deref().unwrap().contains("23건"));
        assert!(payloads[1].content.is_none());
        assert!(payloads[2].content.is_none());
    }

    #[test]
    fn embed_carries_the_announcement_fields() {
        let payloads = build_payloads(&batch(1));
        let embed = &payloads[0].embeds[0];
        assert_eq!(embed.title, "[신규 공고] 공고 0");
        assert_eq!(embed.url, "https://g2b/d?bidno=0&s=1");
        assert_eq!(embed.color, 0x00ff00);
        assert_eq!(embed.fields[0].name, "진행일자");
        assert_eq!(embed.fields[1].name, "수요기관");
        assert!(embed.fields.iter().all(|f| f.inline));
        assert_eq!(embed.footer.text, "ID: 0");
    }

    #[test]
    fn payload_omits_absent_content_when_serialized() {
        let payloads = build_payloads(&batch(11));
        let second = serde_json::to_value(&payloads[1]).unwrap();
        assert!(second.get("content").is_none());
    }
}
