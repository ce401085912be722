//! Frame and element location
//!
//! Three utilities the navigation flow leans on everywhere: finding the
//! content frame by text signature, dismissing the portal's popup waves,
//! and resolving the first element matching an ordered signature list.
//! All of them degrade instead of erroring wherever the flow can proceed
//! without the match.

use std::time::Duration;

use crate::driver::{Driver, ElementSnapshot, FrameId};
use crate::error::Result;
use crate::signature::{self, FrameSignature, Signature};

/// Interactive element kinds the popup scan enumerates
const POPUP_CANDIDATES: &str = "a, button, div, span, img";

/// Find the frame whose visible text matches `sig`, polling because frames
/// keep loading after the parent page reports ready.
///
/// Returns the top-level document when nothing matches within the attempt
/// budget; the portal sometimes serves the form unframed, so absence of a
/// match is not an error.
pub async fn find_content_frame<D: Driver + ?Sized>(
    driver: &D,
    sig: &FrameSignature,
    attempts: u32,
    interval: Duration,
) -> FrameId {
    for attempt in 0..attempts.max(1) {
        match driver.frames().await {
            Ok(frames) => {
                for frame in frames {
                    let text = driver.frame_text(&frame.id).await.unwrap_or_default();
                    if sig.matches(&text) {
                        tracing::info!(
                            frame = %frame.id,
                            name = frame.name.as_deref().unwrap_or("unnamed"),
                            "Found content frame"
                        );
                        return frame.id;
                    }
                }
            }
            Err(e) => {
                tracing::debug!("Frame enumeration failed on attempt {}: {}", attempt + 1, e);
            }
        }
        if attempt + 1 < attempts {
            tokio::time::sleep(interval).await;
        }
    }

    tracing::info!("No content frame matched; falling back to the top-level page");
    FrameId::Top
}

/// Dismiss every visible closeable popup across all frames.
///
/// Individual element failures (detached nodes, cross-origin frames) are
/// skipped; the scan itself never fails the run.
pub async fn dismiss_popups<D: Driver + ?Sized>(driver: &D, settle: Duration) {
    tracing::info!("Scanning frames for dismissable popups");

    let frames = match driver.frames().await {
        Ok(frames) => frames,
        Err(e) => {
            tracing::warn!("Popup scan could not list frames: {}", e);
            return;
        }
    };

    for frame in frames {
        let candidates = match driver.query(&frame.id, POPUP_CANDIDATES).await {
            Ok(els) => els,
            Err(e) => {
                tracing::debug!(frame = %frame.id, "Popup candidate query failed: {}", e);
                continue;
            }
        };

        for el in candidates {
            if !signature::is_closeable_popup(&el) || !el.visible {
                continue;
            }
            let label = if el.text.is_empty() {
                el.alt.clone().unwrap_or_else(|| "icon".into())
            } else {
                el.text.clone()
            };
            match driver.click(&frame.id, el.handle).await {
                Ok(()) => {
                    tracing::info!(frame = %frame.id, "Closed popup: {}", label);
                    // Let the closing transition finish before the next click
                    tokio::time::sleep(settle).await;
                }
                Err(e) => {
                    tracing::debug!(frame = %frame.id, "Popup click failed ({}): {}", label, e);
                }
            }
        }
    }
}

/// Options for [`find_first`] / [`find_first_in_frames`]
#[derive(Debug, Clone, Copy)]
pub struct LocateOpts {
    /// Require a rendered box
    pub require_visible: bool,
    /// Require not-disabled and not-readonly (form fields)
    pub require_editable: bool,
    /// Drop elements under global-chrome containers
    pub exclude_chrome: bool,
}

impl Default for LocateOpts {
    fn default() -> Self {
        Self {
            require_visible: true,
            require_editable: false,
            exclude_chrome: false,
        }
    }
}

impl LocateOpts {
    /// Visible, editable form field
    pub fn editable() -> Self {
        Self {
            require_editable: true,
            ..Default::default()
        }
    }

    /// DOM presence only; the portal's menu entries are clicked via their
    /// own click behavior, so a rendered box is not required
    pub fn dom_only() -> Self {
        Self {
            require_visible: false,
            require_editable: false,
            exclude_chrome: false,
        }
    }

    /// Visible element outside global chrome
    pub fn content_only() -> Self {
        Self {
            exclude_chrome: true,
            ..Default::default()
        }
    }
}

fn passes(el: &ElementSnapshot, opts: &LocateOpts) -> bool {
    if opts.require_visible && !el.visible {
        return false;
    }
    if opts.require_editable && (!el.enabled || el.read_only) {
        return false;
    }
    if opts.exclude_chrome && signature::under_global_chrome(el) {
        return false;
    }
    true
}

/// Pick the first snapshot satisfying any signature and the options
pub fn select_first(
    candidates: &[ElementSnapshot],
    signatures: &[Signature],
    opts: &LocateOpts,
) -> Option<ElementSnapshot> {
    candidates
        .iter()
        .find(|el| Signature::any_match(signatures, el) && passes(el, opts))
        .cloned()
}

/// Find the first element in one frame matching any of the signatures
pub async fn find_first<D: Driver + ?Sized>(
    driver: &D,
    frame: &FrameId,
    selector: &str,
    signatures: &[Signature],
    opts: LocateOpts,
) -> Result<Option<ElementSnapshot>> {
    let candidates = driver.query(frame, selector).await?;
    Ok(select_first(&candidates, signatures, &opts))
}

/// Find the first matching element across all frames of the working page.
///
/// Returns the owning frame together with the snapshot so callers can act
/// on the element in the right evaluation context.
pub async fn find_first_in_frames<D: Driver + ?Sized>(
    driver: &D,
    selector: &str,
    signatures: &[Signature],
    opts: LocateOpts,
) -> Result<Option<(FrameId, ElementSnapshot)>> {
    for frame in driver.frames().await? {
        let candidates = match driver.query(&frame.id, selector).await {
            Ok(els) => els,
            Err(e) => {
                tracing::debug!(frame = %frame.id, "Element query failed: {}", e);
                continue;
            }
        };
        if let Some(el) = select_first(&candidates, signatures, &opts) {
            return Ok(Some((frame.id, el)));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn el(text: &str, visible: bool) -> ElementSnapshot {
        ElementSnapshot {
            text: text.to_string(),
            visible,
            enabled: true,
            ..Default::default()
        }
    }

    #[test]
    fn select_first_skips_invisible_matches() {
        let hidden = el("검색", false);
        let shown = el("검색", true);
        let sigs = [Signature::TextExact("검색")];

        let picked = select_first(
            &[hidden, shown.clone()],
            &sigs,
            &LocateOpts::default(),
        )
        .unwrap();
        assert!(picked.visible);
    }

    #[test]
    fn select_first_respects_editable_requirement() {
        let mut locked = el("", true);
        locked.id = "ibxSrchDmstCd_x".into();
        locked.read_only = true;
        let sigs = [Signature::IdContains("ibxSrchDmstCd")];

        assert!(select_first(&[locked.clone()], &sigs, &LocateOpts::editable()).is_none());

        locked.read_only = false;
        assert!(select_first(&[locked], &sigs, &LocateOpts::editable()).is_some());
    }

    #[test]
    fn select_first_excludes_chrome_ancestry() {
        let mut decoy = el("수요기관", true);
        decoy.ancestor_classes = vec!["gnb".into()];
        let mut real = el("수요기관", true);
        real.ancestor_ids = vec!["contents".into()];
        let sigs = [Signature::TextExact("수요기관")];

        let picked = select_first(
            &[decoy, real],
            &sigs,
            &LocateOpts::content_only(),
        )
        .unwrap();
        assert_eq!(picked.ancestor_ids, vec!["contents".to_string()]);
    }

    #[test]
    fn select_first_preserves_candidate_order() {
        let mut second = el("조회", true);
        second.handle = 2;
        let mut first = el("검색", true);
        first.handle = 1;
        let sigs = [
            Signature::TextExact("검색"),
            Signature::TextExact("조회"),
        ];

        // Candidate order (document order) wins over signature order
        let picked = select_first(
            &[second.clone(), first],
            &sigs,
            &LocateOpts::default(),
        )
        .unwrap();
        assert_eq!(picked.handle, 2);
    }
}
