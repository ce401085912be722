//! Run orchestration
//!
//! One invocation = one strictly sequential pass: navigate to the results
//! page, extract announcements, diff against the store, insert the unseen
//! ones, notify, and flip `is_sent` for the notified batch. The browser
//! session is closed on every exit path.
//!
//! A failed navigation yields an empty item set instead of an error, so
//! the embedding process treats it as "no items this run". Operators can
//! still tell the two apart through [`RunStatus`].

use crate::driver::Driver;
use crate::error::Result;
use crate::extract::{self, Announcement};
use crate::navigate::Navigator;
use crate::notify::{Notifier, ENV_WEBHOOK_URL};
use crate::store::AnnouncementStore;
use crate::WatchConfig;

/// How the scraping phase of a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// The results page was reached and extracted (possibly zero rows)
    Completed,
    /// Navigation failed even after the deep-link fallback; the run
    /// proceeded with an empty item set
    NavigationFailed,
}

/// Summary of one watch run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub status: RunStatus,
    /// Announcements extracted from the results table
    pub found: usize,
    /// Announcements that were not in the store and got inserted
    pub new_items: Vec<Announcement>,
    /// Whether a notification round ran for the new items
    pub notified: bool,
}

/// Navigate and extract; the browser stays open for the caller to close
async fn scrape<D: Driver + ?Sized>(
    driver: &mut D,
    config: &WatchConfig,
) -> Result<Vec<Announcement>> {
    let frame = Navigator::new(driver, config).run().await?;
    extract::extract_from_frame(driver, &frame, &config.agency_name).await
}

/// Execute one full watch run.
///
/// Store lookups run one at a time; sequential dedup keeps insert logic
/// simple within a run, and runs themselves are serialized by the external
/// scheduler.
pub async fn run<D, N>(
    driver: &mut D,
    store: &dyn AnnouncementStore,
    notifier: Option<&N>,
    config: &WatchConfig,
) -> RunOutcome
where
    D: Driver + ?Sized,
    N: Notifier + ?Sized,
{
    let scraped = scrape(driver, config).await;
    if let Err(e) = driver.close().await {
        tracing::warn!("Closing the browser session failed: {}", e);
    }

    let (status, items) = match scraped {
        Ok(items) => (RunStatus::Completed, items),
        Err(e) => {
            tracing::error!("Scrape failed, treating as an empty run: {}", e);
            (RunStatus::NavigationFailed, Vec::new())
        }
    };
    let found = items.len();
    tracing::info!("Found {} announcements", found);

    let mut new_items: Vec<Announcement> = Vec::new();
    for item in &items {
        match store.find_by_id(&item.id).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                tracing::info!("New item found: {}", item.title);
                match store.insert(item).await {
                    Ok(()) => new_items.push(item.clone()),
                    Err(e) => tracing::error!("Error inserting {}: {}", item.id, e),
                }
            }
            // Conservative: on an ambiguous store error, skip the item
            // this run rather than risk a double insert
            Err(e) => tracing::error!("Error checking the store for {}: {}", item.id, e),
        }
    }

    let mut notified = false;
    if new_items.is_empty() {
        tracing::info!("No new items to notify");
    } else {
        match notifier {
            Some(notifier) => match notifier.notify(&new_items).await {
                Ok(()) => {
                    notified = true;
                    let ids: Vec<String> = new_items.iter().map(|i| i.id.clone()).collect();
                    if let Err(e) = store.mark_sent(&ids).await {
                        tracing::error!("Marking items as sent failed: {}", e);
                    }
                }
                // Insertions stay committed; is_sent remains false and no
                // retry is attempted this run
                Err(e) => tracing::error!("Notification round failed: {}", e),
            },
            None => {
                tracing::info!("{} is not set. Skipping notification", ENV_WEBHOOK_URL);
            }
        }
    }

    RunOutcome {
        status,
        found,
        new_items,
        notified,
    }
}
