//! Result extraction
//!
//! Turns the rendered results table into [`Announcement`] records. All
//! heuristics are pure functions over [`RowSnapshot`]s so they can be
//! exercised against fixtures without a browser.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::driver::{Driver, FrameId, RowLink, RowSnapshot};
use crate::error::Result;
use crate::signature::vocab;

/// Status every announcement carries at extraction time; not derived from
/// page state.
pub const STATUS_OPEN: &str = "Open";

/// Sentinel agency when no column text matches
pub const AGENCY_UNKNOWN: &str = "Unknown";

/// Rows with fewer columns are headers, footers, or decoration
const MIN_COLUMNS: usize = 5;

/// Posting date as rendered: `YYYY/MM/DD` prefix
static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}/\d{2}/\d{2}").expect("date regex"));

/// Numeric bid code embedded in detail links
static BIDNO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"bidno=(\d+)&").expect("bidno regex"));

/// One bid announcement as extracted from the results table
///
/// `id` is the sole deduplication key against the store. It is the numeric
/// `bidno` from the detail link when present; otherwise it is synthesized
/// as `title + "_" + date`, which can collide for two same-day
/// announcements with identical titles. That degraded fallback is a known
/// limitation kept deliberately; changing it would silently change dedup
/// semantics against existing stored rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    pub id: String,
    pub title: String,
    pub link: String,
    /// Posting date as rendered text, not normalized
    pub date: String,
    /// Issuing/demanding agency name, or [`AGENCY_UNKNOWN`]
    pub agency: String,
    pub status: String,
}

/// Derive the stable identifier for a result link
pub fn derive_id(link: &str, title: &str, date: &str) -> String {
    if let Some(caps) = BIDNO_RE.captures(link) {
        return caps[1].to_string();
    }
    format!("{}_{}", title, date)
}

/// Pick the title link of a row: a link inside a title-classed cell
/// (`div.tl a` / `td.tl a` in the portal markup), else the first link.
fn title_link(row: &RowSnapshot) -> Option<&RowLink> {
    row.links
        .iter()
        .find(|l| l.container_class.split_whitespace().any(|c| c == "tl"))
        .or_else(|| row.links.first())
}

/// Extract one announcement from a row, or `None` for rows that fail the
/// structural guards
fn extract_row(row: &RowSnapshot, agency_name: &str) -> Option<Announcement> {
    if row.cells.len() < MIN_COLUMNS {
        return None;
    }
    let link = title_link(row)?;
    let title = link.text.trim().to_string();
    if title.is_empty() {
        return None;
    }

    let date = row
        .cells
        .iter()
        .map(|c| c.trim())
        .find(|c| DATE_RE.is_match(c))
        .unwrap_or_default()
        .to_string();

    let agency = row
        .cells
        .iter()
        .map(|c| c.trim())
        .find(|c| c.contains(agency_name) || c.contains(vocab::COL_DEMANDING_AGENCY))
        .unwrap_or(AGENCY_UNKNOWN)
        .to_string();

    Some(Announcement {
        id: derive_id(&link.href, &title, &date),
        title,
        link: link.href.clone(),
        date,
        agency,
        status: STATUS_OPEN.to_string(),
    })
}

/// Extract announcements from row snapshots, preserving row order
pub fn extract_announcements(rows: &[RowSnapshot], agency_name: &str) -> Vec<Announcement> {
    rows.iter()
        .filter_map(|row| extract_row(row, agency_name))
        .collect()
}

/// Read the results table of the content frame into announcements.
///
/// An empty result list is a valid outcome: the portal renders a "no data"
/// banner instead of rows when the filters match nothing.
pub async fn extract_from_frame<D: Driver + ?Sized>(
    driver: &D,
    frame: &FrameId,
    agency_name: &str,
) -> Result<Vec<Announcement>> {
    let text = driver.frame_text(frame).await.unwrap_or_default();
    if text.contains(vocab::NO_DATA_A) || text.contains(vocab::NO_DATA_B) {
        tracing::info!("Results page reports no data for the current filters");
    }

    let rows = driver.table_rows(frame).await?;
    tracing::info!("Found {} table rows", rows.len());

    let announcements = extract_announcements(&rows, agency_name);
    tracing::info!("Extracted {} announcements", announcements.len());
    Ok(announcements)
}
