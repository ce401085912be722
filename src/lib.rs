//! # bidwatch
//!
//! Resilient crawler for new bid announcements on the G2B procurement
//! portal (나라장터).
//!
//! The portal is a frame-heavy, popup-laden web application with no stable
//! selectors. bidwatch drives it through a fallback-driven navigation flow
//! (menu traversal, search-form discovery, filter entry, result
//! extraction), records newly-seen announcements in a persistent store, and
//! posts a Discord notification for each batch of new items.
//!
//! The rendering engine, store backend, and notification sink are consumed
//! through seams: implement [`Driver`](driver::Driver) over your browser
//! automation layer, or use the provided [`SupabaseStore`](store::SupabaseStore)
//! and [`DiscordNotifier`](notify::DiscordNotifier) against their HTTP
//! surfaces.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bidwatch::{pipeline, WatchConfig};
//! use bidwatch::store::SupabaseStore;
//! use bidwatch::notify::DiscordNotifier;
//!
//! # async fn example(mut driver: impl bidwatch::driver::Driver) -> bidwatch::Result<()> {
//! let config = WatchConfig::default();
//! let store = SupabaseStore::from_env()?;
//! let notifier = DiscordNotifier::from_env();
//!
//! let outcome = pipeline::run(&mut driver, &store, notifier.as_ref(), &config).await;
//! println!("{} new announcements", outcome.new_items.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Process contract
//!
//! Embedding binaries should exit non-zero only when required store
//! configuration is absent at startup ([`Error::Config`](error::Error::Config)
//! from [`SupabaseStore::from_env`](store::SupabaseStore::from_env)). A run
//! that finds zero items, zero new items, or fails navigation entirely
//! completes normally; navigation failure is visible to operators through
//! [`RunStatus::NavigationFailed`](pipeline::RunStatus) and the logs, not
//! the exit code.

pub mod driver;
pub mod error;
pub mod extract;
pub mod locate;
pub mod navigate;
pub mod notify;
pub mod pipeline;
pub mod signature;
pub mod store;

use std::time::Duration;

// Re-exports
pub use driver::{Driver, ElementSnapshot, FrameId, RowSnapshot};
pub use error::{Error, Result};
pub use extract::Announcement;
pub use pipeline::{RunOutcome, RunStatus};

/// Configuration for a watch run
///
/// Every settle pause and poll budget is data here so tests can run with
/// zeroed waits against a scripted driver.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Portal home page
    pub portal_url: String,
    /// Direct deep link to the bid-announcement search application,
    /// bypassing the frameset wrapper when menu navigation fails
    pub deep_link_url: String,
    /// Demanding-agency code typed into the agency filter
    pub agency_code: String,
    /// Agency display name, matched against result columns
    pub agency_name: String,
    /// Search window: start date is this many months before today
    pub lookback_months: u32,
    /// Where the diagnostic full-page screenshot lands every run
    pub screenshot_path: String,

    /// Frame discovery polling budget
    pub frame_poll_attempts: u32,
    pub frame_poll_interval: Duration,
    /// Pause after dismissing each popup (closing animation)
    pub popup_settle: Duration,
    /// Pause after activating the top-level menu
    pub menu_settle: Duration,
    /// Pause before clicking the sub-menu entry
    pub pre_click_pause: Duration,
    /// Budget for detecting a new tab opened by the sub-menu click
    pub new_tab_wait: Duration,
    /// Pause after sub-menu navigation before verifying arrival
    pub page_load_settle: Duration,
    /// Pause after the deep-link fallback navigation
    pub deep_link_settle: Duration,
    /// Pause after expanding the advanced-filters section
    pub filter_settle: Duration,
    /// Pause before locating the agency filter
    pub pre_agency_pause: Duration,
    /// Pause waiting for the agency lookup popup to appear
    pub agency_popup_wait: Duration,
    /// Pause after submitting the code inside the lookup popup
    pub agency_popup_settle: Duration,
    /// Pause after triggering the search, for results to render
    pub results_settle: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            portal_url: "https://www.g2b.go.kr/".into(),
            deep_link_url: "https://www.g2b.go.kr:8101/ep/tbid/tbidFwd.do?taskClCd=1".into(),
            agency_code: "1613436".into(),
            agency_name: "국토지리정보원".into(),
            lookback_months: 6,
            screenshot_path: "debug_search_result.png".into(),

            frame_poll_attempts: 10,
            frame_poll_interval: Duration::from_secs(1),
            popup_settle: Duration::from_millis(500),
            menu_settle: Duration::from_secs(2),
            pre_click_pause: Duration::from_millis(500),
            new_tab_wait: Duration::from_secs(5),
            page_load_settle: Duration::from_secs(3),
            deep_link_settle: Duration::from_secs(4),
            filter_settle: Duration::from_secs(2),
            pre_agency_pause: Duration::from_secs(1),
            agency_popup_wait: Duration::from_secs(2),
            agency_popup_settle: Duration::from_millis(1500),
            results_settle: Duration::from_secs(5),
        }
    }
}

impl WatchConfig {
    /// Config with every wait zeroed and a single frame poll attempt.
    /// For tests against a scripted driver.
    pub fn instant() -> Self {
        Self {
            frame_poll_attempts: 1,
            frame_poll_interval: Duration::ZERO,
            popup_settle: Duration::ZERO,
            menu_settle: Duration::ZERO,
            pre_click_pause: Duration::ZERO,
            new_tab_wait: Duration::ZERO,
            page_load_settle: Duration::ZERO,
            deep_link_settle: Duration::ZERO,
            filter_settle: Duration::ZERO,
            pre_agency_pause: Duration::ZERO,
            agency_popup_wait: Duration::ZERO,
            agency_popup_settle: Duration::ZERO,
            results_settle: Duration::ZERO,
            ..Default::default()
        }
    }
}
