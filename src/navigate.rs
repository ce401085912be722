//! Navigation flow
//!
//! Drives the portal from its home page to a rendered results table:
//! open portal → dismiss popups → bid-info menu → sub-menu (possibly in a
//! new tab) → verify arrival by marker inputs, falling back to a direct
//! deep link → find the content frame → expand filters → set the agency
//! filter and date range → trigger the search.
//!
//! Only a failed arrival verification is fatal; every other step logs and
//! proceeds with best-effort defaults, because a later step or the
//! extraction itself will surface a true dead end.

use std::path::Path;

use chrono::{Local, Months};

use crate::driver::{Driver, FrameId, Key};
use crate::error::{Error, Result};
use crate::locate::{self, LocateOpts};
use crate::signature::{self, vocab, FrameSignature, Signature};
use crate::WatchConfig;

/// Menu entries and sub-menu entries live in these element kinds
const MENU_SELECTOR: &str = "a, button, span, li";
/// Label cells that can carry the agency filter caption
const LABEL_SELECTOR: &str = "label, th, td, span, b, strong";
/// Trigger controls next to a read-only agency input
const TRIGGER_SELECTOR: &str =
    "button, a, img[alt*=\"검색\"], img[src*=\"search\"], input[type=\"image\"], .w2trigger";
/// Search button candidates
const SEARCH_SELECTOR: &str = "a, button, input[type=\"submit\"], .btn_search, .w2trigger";
/// First result row inside the agency lookup popup
const POPUP_RESULT_SELECTOR: &str =
    "tr.gridBodyRow a, .gridBody a, .gridBody span[class*=\"click\"], td a";
/// Fallback search button inside the known button area
const BTN_AREA_FALLBACK_SELECTOR: &str = ".btn_area .btn_search, .btn_area a.btn_blue";

/// Drives one navigation run over a [`Driver`].
///
/// The working page context is owned here and swapped explicitly when the
/// portal opens a new tab.
pub struct Navigator<'a, D: Driver + ?Sized> {
    driver: &'a mut D,
    config: &'a WatchConfig,
}

impl<'a, D: Driver + ?Sized> Navigator<'a, D> {
    pub fn new(driver: &'a mut D, config: &'a WatchConfig) -> Self {
        Self { driver, config }
    }

    /// Run the full flow and return the content frame holding the rendered
    /// results table.
    pub async fn run(&mut self) -> Result<FrameId> {
        tracing::info!("Navigating to {}", self.config.portal_url);
        self.driver.goto(&self.config.portal_url).await?;
        locate::dismiss_popups(self.driver, self.config.popup_settle).await;

        self.open_bid_menu().await;
        self.open_sub_menu().await;

        tokio::time::sleep(self.config.page_load_settle).await;
        self.verify_arrival().await?;

        // A second popup wave is common after arriving at the search page
        locate::dismiss_popups(self.driver, self.config.popup_settle).await;

        let frame = locate::find_content_frame(
            self.driver,
            &FrameSignature::results_content(),
            self.config.frame_poll_attempts,
            self.config.frame_poll_interval,
        )
        .await;

        self.expand_filters(&frame).await;
        tokio::time::sleep(self.config.pre_agency_pause).await;
        self.set_agency_filter(&frame).await;
        if let Err(e) = self.set_date_range(&frame).await {
            tracing::warn!("Setting the date range failed: {}", e);
        }
        self.trigger_search(&frame).await;

        tokio::time::sleep(self.config.results_settle).await;
        self.capture_screenshot().await;

        Ok(frame)
    }

    /// Activate the top-level bid-information menu. Non-fatal: arrival
    /// verification catches a true navigation failure later.
    async fn open_bid_menu(&mut self) {
        let found = locate::find_first_in_frames(
            self.driver,
            MENU_SELECTOR,
            &[Signature::TextExact(vocab::MENU_BID_INFO)],
            LocateOpts::dom_only(),
        )
        .await;

        match found {
            Ok(Some((frame, el))) => {
                tracing::info!("Found \"{}\" menu. Clicking", vocab::MENU_BID_INFO);
                if let Err(e) = self.driver.click(&frame, el.handle).await {
                    tracing::warn!("Bid-info menu click failed: {}", e);
                }
                tokio::time::sleep(self.config.menu_settle).await;
            }
            Ok(None) => {
                tracing::warn!(
                    "Could not find \"{}\" menu. Proceeding anyway",
                    vocab::MENU_BID_INFO
                );
            }
            Err(e) => tracing::warn!("Bid-info menu search failed: {}", e),
        }
    }

    /// Activate the announcement-list sub-menu, switching the working page
    /// to a new tab when the click opens one. Non-fatal.
    async fn open_sub_menu(&mut self) {
        let found = locate::find_first_in_frames(
            self.driver,
            MENU_SELECTOR,
            &[
                Signature::TextExact(vocab::SUBMENU_ANNOUNCEMENTS),
                Signature::TextExact(vocab::SUBMENU_GOODS),
            ],
            LocateOpts::dom_only(),
        )
        .await;

        let (frame, el) = match found {
            Ok(Some(hit)) => hit,
            Ok(None) => {
                tracing::warn!(
                    "Could not find \"{}\" menu button",
                    vocab::SUBMENU_ANNOUNCEMENTS
                );
                return;
            }
            Err(e) => {
                tracing::warn!("Sub-menu search failed: {}", e);
                return;
            }
        };

        tracing::info!(
            "Found \"{}/{}\" button. Clicking",
            vocab::SUBMENU_ANNOUNCEMENTS,
            vocab::SUBMENU_GOODS
        );
        tokio::time::sleep(self.config.pre_click_pause).await;

        if let Err(e) = self.driver.click(&frame, el.handle).await {
            tracing::warn!("Sub-menu click failed: {}", e);
            return;
        }

        // The sub-menu usually updates an iframe in place, but sometimes
        // opens a popup tab whose opener is the current page.
        match self.driver.wait_for_new_tab(self.config.new_tab_wait).await {
            Ok(Some(tab)) => {
                tracing::info!("New tab opened. Switching context");
                if let Err(e) = self.driver.switch_to_tab(tab).await {
                    tracing::warn!("Switching to the new tab failed: {}", e);
                }
            }
            Ok(None) => {}
            Err(e) => tracing::debug!("New-tab wait failed: {}", e),
        }
    }

    /// Any marker input present on the top-level document?
    async fn markers_present(&self) -> bool {
        match self.driver.query(&FrameId::Top, "input").await {
            Ok(inputs) => {
                let markers = signature::arrival_markers();
                inputs.iter().any(|el| Signature::any_match(&markers, el))
            }
            Err(_) => false,
        }
    }

    /// Log the first 200 characters of page text for diagnosis
    async fn log_page_stub(&self, context: &str) {
        let text = self
            .driver
            .frame_text(&FrameId::Top)
            .await
            .unwrap_or_default();
        let stub: String = text.chars().take(200).collect();
        tracing::info!("Page stub {}: {}", context, stub);
    }

    /// Verify arrival on the search form via marker inputs; fall back to
    /// the direct deep link once. Failing both is fatal for the run.
    async fn verify_arrival(&mut self) -> Result<()> {
        let title = self.driver.title().await.unwrap_or_default();
        tracing::info!("Current page title: {}", title);

        let mut on_search_page = self.markers_present().await;

        if title == vocab::HOME_TITLE && !on_search_page {
            tracing::warn!(
                "Still on the portal home page and no search inputs found. \
                 Falling back to the direct URL"
            );
            self.driver.goto(&self.config.deep_link_url).await?;
            tokio::time::sleep(self.config.deep_link_settle).await;

            on_search_page = self.markers_present().await;
            if !on_search_page {
                self.log_page_stub("after direct URL").await;
                return Err(Error::Navigation(
                    "direct URL fallback also failed to load the search inputs".into(),
                ));
            }
        }

        if on_search_page {
            tracing::info!("Verified arrival on the search page (found marker inputs)");
            Ok(())
        } else {
            self.log_page_stub("at verification").await;
            Err(Error::Navigation("search inputs not found".into()))
        }
    }

    /// Open the advanced-filters section when the agency input is not yet
    /// visible. Non-fatal.
    async fn expand_filters(&mut self, frame: &FrameId) {
        let agency_visible = locate::find_first(
            self.driver,
            frame,
            "input",
            &signature::agency_inputs(),
            LocateOpts::default(),
        )
        .await
        .unwrap_or(None);

        if agency_visible.is_some() {
            tracing::info!("Detailed search inputs are already visible");
            return;
        }

        tracing::info!(
            "Detailed search inputs not visible. Looking for the \"{}\" toggle",
            vocab::TOGGLE_DETAIL
        );

        let mut toggle = locate::find_first(
            self.driver,
            frame,
            "a, button, span, label",
            &signature::filter_toggles(),
            LocateOpts::dom_only(),
        )
        .await
        .unwrap_or(None);

        if toggle.is_none() {
            // Id-based fallback; the toggle is occasionally a div
            toggle = locate::find_first(
                self.driver,
                frame,
                "[id*=\"btnSearchToggle\"]",
                &[Signature::IdContains("btnSearchToggle")],
                LocateOpts::dom_only(),
            )
            .await
            .unwrap_or(None);
        }

        match toggle {
            Some(el) => {
                if let Err(e) = self.driver.click(frame, el.handle).await {
                    tracing::warn!("Filter toggle click failed: {}", e);
                    return;
                }
                tracing::info!("Clicked the \"{}\" toggle", vocab::TOGGLE_DETAIL);
                tokio::time::sleep(self.config.filter_settle).await;
            }
            None => {
                tracing::warn!("Could not find the \"{}\" button", vocab::TOGGLE_DETAIL);
            }
        }
    }

    /// Locate the agency label, derive its data cell, and enter the agency
    /// code directly or through the lookup popup. Non-fatal: without the
    /// filter the search simply returns a broader set.
    async fn set_agency_filter(&mut self, frame: &FrameId) {
        let label_opts = LocateOpts {
            require_visible: false,
            require_editable: false,
            exclude_chrome: true,
        };
        let label = locate::find_first(
            self.driver,
            frame,
            LABEL_SELECTOR,
            &[
                Signature::TextExact(vocab::COL_DEMANDING_AGENCY),
                Signature::TextExact(vocab::COL_ORDERING_AGENCY),
            ],
            label_opts,
        )
        .await
        .unwrap_or(None);

        let Some(label) = label else {
            tracing::warn!(
                "Could not find the \"{}\" label",
                vocab::COL_DEMANDING_AGENCY
            );
            return;
        };
        tracing::info!("Found \"{}\" label. Locating its data cell", label.text);

        let cell = self
            .driver
            .sibling_cell(frame, label.handle)
            .await
            .unwrap_or(None);
        let Some(cell) = cell else {
            tracing::warn!("No data cell associated with the agency label");
            return;
        };

        let input = self
            .driver
            .query_within(frame, cell.handle, "input[type=\"text\"]")
            .await
            .unwrap_or_default()
            .into_iter()
            .next();

        if let Some(input) = &input {
            let locked = !input.enabled || input.read_only || input.class.contains("w2input_disabled");
            if locked {
                tracing::info!("Agency input is disabled/read-only. Using the lookup trigger");
            } else {
                tracing::info!("Found agency input. Typing the agency code");
                if let Err(e) = self.type_and_submit(frame, input.handle).await {
                    tracing::warn!("Typing into the agency input failed: {}", e);
                }
                return;
            }
        }

        let trigger = self
            .driver
            .query_within(frame, cell.handle, TRIGGER_SELECTOR)
            .await
            .unwrap_or_default()
            .into_iter()
            .next();

        let Some(trigger) = trigger else {
            tracing::warn!("Could not find an agency input or trigger near the label");
            return;
        };

        tracing::info!(
            "Found agency lookup trigger ({} id={}). Clicking",
            trigger.tag,
            trigger.id
        );
        if let Err(e) = self.driver.click(frame, trigger.handle).await {
            tracing::warn!("Agency trigger click failed: {}", e);
            return;
        }
        tokio::time::sleep(self.config.agency_popup_wait).await;

        let popup = self.find_agency_popup().await;
        let ctx = match &popup {
            Some(popup_frame) => {
                tracing::info!(frame = %popup_frame, "Switched context to the lookup popup frame");
                popup_frame.clone()
            }
            None => frame.clone(),
        };

        let popup_input = locate::find_first(
            self.driver,
            &ctx,
            "input",
            &signature::agency_inputs(),
            LocateOpts::dom_only(),
        )
        .await
        .unwrap_or(None);

        let Some(popup_input) = popup_input else {
            tracing::warn!("No agency input found in the lookup context");
            return;
        };

        tracing::info!("Found lookup input. Typing the agency code");
        if let Err(e) = self.type_and_submit(&ctx, popup_input.handle).await {
            tracing::warn!("Typing into the lookup input failed: {}", e);
            return;
        }
        tokio::time::sleep(self.config.agency_popup_settle).await;

        // Commit the selection by clicking the first result row
        let first_result = self
            .driver
            .query(&ctx, POPUP_RESULT_SELECTOR)
            .await
            .unwrap_or_default()
            .into_iter()
            .next();
        match first_result {
            Some(row) => {
                tracing::info!("Clicking the first lookup result");
                if let Err(e) = self.driver.click(&ctx, row.handle).await {
                    tracing::warn!("Lookup result click failed: {}", e);
                }
            }
            None => tracing::warn!("No clickable result found in the lookup popup"),
        }
    }

    /// Clear a field, type the agency code, and submit with Enter
    async fn type_and_submit(&mut self, frame: &FrameId, handle: u64) -> Result<()> {
        self.driver
            .clear_and_type(frame, handle, &self.config.agency_code)
            .await?;
        self.driver.press_key(frame, handle, Key::Enter).await
    }

    /// Find the lookup popup: a frame with popup-ish name whose content
    /// probe finds the lookup input
    async fn find_agency_popup(&self) -> Option<FrameId> {
        let frames = self.driver.frames().await.ok()?;
        let probe = [Signature::IdContains("ibxSrchDmstCd")];

        for frame in frames {
            let name = frame.name.as_deref().unwrap_or("");
            if name.is_empty() || !(name.contains("popup") || name.contains("frame")) {
                continue;
            }
            let inputs = match self.driver.query(&frame.id, "input").await {
                Ok(inputs) => inputs,
                Err(_) => continue,
            };
            if inputs.iter().any(|el| Signature::any_match(&probe, el)) {
                return Some(frame.id);
            }
        }
        None
    }

    /// Fill the start-date input and fire the form's change handlers with
    /// a Tab keypress
    async fn set_date_range(&mut self, frame: &FrameId) -> Result<()> {
        let start = start_date(self.config.lookback_months);
        tracing::info!("Setting the date range to start at {}", start);

        let input = locate::find_first(
            self.driver,
            frame,
            "input",
            &signature::date_start_inputs(),
            LocateOpts::dom_only(),
        )
        .await?;

        match input {
            Some(el) => {
                tracing::info!("Found date input [id: {}]. Setting to {}", el.id, start);
                self.driver.clear_and_type(frame, el.handle, &start).await?;
                self.driver.press_key(frame, el.handle, Key::Tab).await?;
            }
            None => tracing::warn!("Could not find the date start input"),
        }
        Ok(())
    }

    /// Click the main search button, excluding global-chrome decoys, with
    /// a generic button-area fallback. Non-fatal.
    async fn trigger_search(&mut self, frame: &FrameId) {
        let candidates = match self.driver.query(frame, SEARCH_SELECTOR).await {
            Ok(els) => els,
            Err(e) => {
                tracing::warn!("Search button query failed: {}", e);
                return;
            }
        };

        let sigs = signature::search_buttons();
        let mut clicked = false;
        for el in &candidates {
            if !Signature::any_match(&sigs, el) {
                continue;
            }
            if signature::looks_like_chrome_control(el) {
                tracing::debug!("Skipping chrome button: {}", el.id);
                continue;
            }
            if el.text.contains(vocab::EXCLUDE_SUGGEST) {
                continue;
            }
            tracing::info!("Clicking search button [id: {}] [text: {}]", el.id, el.text);
            if let Err(e) = self.driver.click(frame, el.handle).await {
                tracing::warn!("Search button click failed: {}", e);
            }
            clicked = true;
            break;
        }

        if !clicked {
            tracing::warn!("Could not identify a main search button");
            let fallback = self
                .driver
                .query(frame, BTN_AREA_FALLBACK_SELECTOR)
                .await
                .unwrap_or_default()
                .into_iter()
                .next();
            if let Some(el) = fallback {
                tracing::info!("Fallback: clicking the first button in the button area");
                if let Err(e) = self.driver.click(frame, el.handle).await {
                    tracing::warn!("Fallback search click failed: {}", e);
                }
            }
        }
    }

    /// Full-page diagnostic screenshot, captured regardless of outcome
    async fn capture_screenshot(&self) {
        let path = Path::new(&self.config.screenshot_path);
        match self.driver.screenshot(path).await {
            Ok(()) => tracing::info!("Saved {}", self.config.screenshot_path),
            Err(e) => tracing::warn!("Failed to capture the screenshot: {}", e),
        }
    }
}

/// Start date of the search window: `lookback_months` before today, in the
/// `YYYY/MM/DD` shape the portal's date inputs expect
fn start_date(lookback_months: u32) -> String {
    let today = Local::now().date_naive();
    let start = today
        .checked_sub_months(Months::new(lookback_months))
        .unwrap_or(today);
    start.format("%Y/%m/%d").to_string()
}
