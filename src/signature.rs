//! Locator signatures
//!
//! The portal exposes no stable, semantically-named selectors: menus,
//! toggles, and inputs are found by human-readable text and best-effort
//! attribute heuristics. This module centralizes those heuristics as named,
//! ordered predicates over [`ElementSnapshot`]s so every "find X" step in
//! the navigation flow evaluates the same way and each matcher can be
//! tested against fixture snapshots.
//!
//! When the portal markup changes, update the vocabulary here and add a
//! fixture covering the new shape.

use crate::driver::ElementSnapshot;

/// Fixed portal vocabulary (labels, markers, exclusion text)
pub mod vocab {
    /// Top-level bid-information menu
    pub const MENU_BID_INFO: &str = "입찰정보";
    /// Announcement-list sub-menu
    pub const SUBMENU_ANNOUNCEMENTS: &str = "공고현황";
    /// Goods category entry; clicking it also reaches the list
    pub const SUBMENU_GOODS: &str = "물품";
    /// Portal home page title; still seeing it means navigation failed
    pub const HOME_TITLE: &str = "나라장터";

    /// Title column header of the results table
    pub const COL_TITLE: &str = "공고명";
    /// Demanding-agency column header / filter label
    pub const COL_DEMANDING_AGENCY: &str = "수요기관";
    /// Ordering-agency variant of the same label
    pub const COL_ORDERING_AGENCY: &str = "발주기관";

    /// Popup close button text
    pub const POPUP_CLOSE: &str = "닫기";
    /// Popup close-window button text
    pub const POPUP_CLOSE_WINDOW: &str = "창닫기";
    /// "don't show again today" checkbox/link fragment
    pub const POPUP_TODAY_FRAGMENT: &str = "오늘 하루 열지";

    /// Advanced-filters toggle text variants
    pub const TOGGLE_DETAIL: &str = "상세조건";
    pub const TOGGLE_DETAIL_OPEN: &str = "상세조건 열기";
    pub const TOGGLE_MORE: &str = "검색조건 더보기";

    /// Search / query button text
    pub const BTN_SEARCH: &str = "검색";
    pub const BTN_QUERY: &str = "조회";
    /// Suggestion-widget text that disqualifies a search-button candidate
    pub const EXCLUDE_SUGGEST: &str = "해당 검색어";

    /// Empty-result banner fragments
    pub const NO_DATA_A: &str = "데이터가 존재하지";
    pub const NO_DATA_B: &str = "조회된 데이터가 없습니다";
}

/// A single element-matching heuristic
///
/// Signatures are evaluated in order against snapshots; the first element
/// satisfying any signature in the list wins.
#[derive(Debug, Clone)]
pub enum Signature {
    /// Trimmed text equals the given string
    TextExact(&'static str),
    /// Trimmed text contains the given substring
    TextContains(&'static str),
    /// `id` attribute contains the given substring
    IdContains(&'static str),
    /// `name` attribute equals the given string
    NameExact(&'static str),
    /// `name` attribute contains the given substring
    NameContains(&'static str),
    /// `class` attribute contains the given substring
    ClassContains(&'static str),
    /// `alt` attribute equals the given string
    AltExact(&'static str),
}

impl Signature {
    /// Test one snapshot against this signature
    pub fn matches(&self, el: &ElementSnapshot) -> bool {
        match self {
            Signature::TextExact(t) => el.text == *t,
            Signature::TextContains(t) => el.text.contains(t),
            Signature::IdContains(s) => !s.is_empty() && el.id.contains(s),
            Signature::NameExact(n) => el.name == *n,
            Signature::NameContains(n) => !n.is_empty() && el.name.contains(n),
            Signature::ClassContains(c) => !c.is_empty() && el.class.contains(c),
            Signature::AltExact(a) => el.alt.as_deref() == Some(a),
        }
    }

    /// Test a snapshot against an ordered signature list
    pub fn any_match(signatures: &[Signature], el: &ElementSnapshot) -> bool {
        signatures.iter().any(|s| s.matches(el))
    }
}

/// Content signature for frame discovery: required marker AND any of the
/// alternative markers must appear in the frame's visible text
#[derive(Debug, Clone)]
pub struct FrameSignature {
    pub required: &'static str,
    pub any_of: &'static [&'static str],
}

impl FrameSignature {
    /// Frame holding the search form and results table
    pub fn results_content() -> Self {
        Self {
            required: vocab::COL_TITLE,
            any_of: &[vocab::COL_DEMANDING_AGENCY, vocab::COL_ORDERING_AGENCY],
        }
    }

    /// Test a frame's visible text against this signature
    pub fn matches(&self, text: &str) -> bool {
        text.contains(self.required) && self.any_of.iter().any(|m| text.contains(m))
    }
}

/// Closeable-popup signature: close text, close alt text, "don't show
/// today" fragment, or a `close` class
pub fn is_closeable_popup(el: &ElementSnapshot) -> bool {
    el.text == vocab::POPUP_CLOSE
        || el.text == vocab::POPUP_CLOSE_WINDOW
        || el.text.contains(vocab::POPUP_TODAY_FRAGMENT)
        || el.alt.as_deref() == Some(vocab::POPUP_CLOSE)
        || el.alt.as_deref() == Some(vocab::POPUP_CLOSE_WINDOW)
        || el.class.contains("close")
}

/// Ancestor id/class patterns marking global chrome (nav bar, header, top
/// menu). Elements under these containers are decoys, never content.
const CHROME_ANCESTOR_CLASSES: [&str; 2] = ["gnb", "top_menu"];
const CHROME_ANCESTOR_IDS: [&str; 1] = ["header"];

/// Whether the element sits under a global-chrome container
pub fn under_global_chrome(el: &ElementSnapshot) -> bool {
    el.ancestor_classes
        .iter()
        .any(|c| CHROME_ANCESTOR_CLASSES.iter().any(|p| c.contains(p)))
        || el
            .ancestor_ids
            .iter()
            .any(|i| CHROME_ANCESTOR_IDS.iter().any(|p| i.contains(p)))
}

/// Whether the element itself looks like a global-chrome control
/// (used when filtering search-button candidates by their own attributes)
pub fn looks_like_chrome_control(el: &ElementSnapshot) -> bool {
    const ID_PATTERNS: [&str; 4] = ["gnb", "global", "header", "Global"];
    const CLASS_PATTERNS: [&str; 2] = ["gnb", "top"];

    ID_PATTERNS.iter().any(|p| el.id.contains(p))
        || CLASS_PATTERNS.iter().any(|p| el.class.contains(p))
}

/// Marker inputs that exist only on the true search/results form.
/// Finding any of them verifies arrival.
pub fn arrival_markers() -> Vec<Signature> {
    vec![
        Signature::IdContains("inqrBgnDt"),
        Signature::NameExact("taskClCd"),
        Signature::IdContains("dminInstCd"),
    ]
}

/// Agency filter inputs (direct or inside the lookup popup)
pub fn agency_inputs() -> Vec<Signature> {
    vec![
        Signature::IdContains("ibxSrchDmstCd"),
        Signature::IdContains("txtPrcrmntInsttNm"),
        Signature::IdContains("prcrmntInsttNm"),
    ]
}

/// Start-date input heuristics, most specific first
pub fn date_start_inputs() -> Vec<Signature> {
    vec![
        Signature::IdContains("fromBidDt"),
        Signature::NameContains("fromBidDt"),
        Signature::IdContains("inqrBgnDt"),
        Signature::IdContains("from"),
        Signature::IdContains("From"),
        Signature::IdContains("Start"),
        Signature::IdContains("Beg"),
    ]
}

/// Advanced-filters toggle heuristics
pub fn filter_toggles() -> Vec<Signature> {
    vec![
        Signature::TextExact(vocab::TOGGLE_DETAIL),
        Signature::TextExact(vocab::TOGGLE_DETAIL_OPEN),
        Signature::TextExact(vocab::TOGGLE_MORE),
        Signature::IdContains("btnSearchToggle"),
    ]
}

/// Search-button heuristics
pub fn search_buttons() -> Vec<Signature> {
    vec![
        Signature::IdContains("btnS0001"),
        Signature::IdContains("btnSearch"),
        Signature::IdContains("S0001"),
        Signature::TextExact(vocab::BTN_SEARCH),
        Signature::TextExact(vocab::BTN_QUERY),
        Signature::ClassContains("btn_search"),
        Signature::ClassContains("search"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn el(text: &str) -> ElementSnapshot {
        ElementSnapshot {
            text: text.to_string(),
            visible: true,
            enabled: true,
            ..Default::default()
        }
    }

    #[test]
    fn text_signatures() {
        let menu = el("입찰정보");
        assert!(Signature::TextExact("입찰정보").matches(&menu));
        assert!(!Signature::TextExact("입찰").matches(&menu));
        assert!(Signature::TextContains("입찰").matches(&menu));
    }

    #[test]
    fn attribute_signatures() {
        let mut input = el("");
        input.id = "mf_wfm_container_inqrBgnDt_input".into();
        input.name = "taskClCd".into();
        input.class = "w2input btn_search_zone".into();

        assert!(Signature::IdContains("inqrBgnDt").matches(&input));
        assert!(!Signature::IdContains("dminInstCd").matches(&input));
        assert!(Signature::NameExact("taskClCd").matches(&input));
        assert!(Signature::ClassContains("btn_search").matches(&input));
    }

    #[test]
    fn alt_signature() {
        let mut img = el("");
        img.alt = Some("닫기".into());
        assert!(Signature::AltExact("닫기").matches(&img));
        assert!(!Signature::AltExact("창닫기").matches(&img));
    }

    #[test]
    fn any_match_respects_order_independence() {
        let mut btn = el("조회");
        btn.id = "btnWhatever".into();
        assert!(Signature::any_match(&search_buttons(), &btn));
        assert!(!Signature::any_match(&arrival_markers(), &btn));
    }

    #[test]
    fn frame_signature_requires_conjunction() {
        let sig = FrameSignature::results_content();
        assert!(sig.matches("공고명 수요기관 목록"));
        assert!(sig.matches("공고명 발주기관"));
        assert!(!sig.matches("공고명만 있는 프레임"));
        assert!(!sig.matches("수요기관만 있는 프레임"));
    }

    #[test]
    fn closeable_popup_vocabulary() {
        assert!(is_closeable_popup(&el("닫기")));
        assert!(is_closeable_popup(&el("창닫기")));
        assert!(is_closeable_popup(&el("오늘 하루 열지 않기")));
        assert!(!is_closeable_popup(&el("로그인")));

        let mut icon = el("");
        icon.alt = Some("창닫기".into());
        assert!(is_closeable_popup(&icon));

        let mut styled = el("");
        styled.class = "layer_close_btn".into();
        assert!(is_closeable_popup(&styled));
    }

    #[test]
    fn chrome_exclusion_by_ancestry() {
        let mut decoy = el("수요기관");
        decoy.ancestor_classes = vec!["gnb_menu_area".into()];
        assert!(under_global_chrome(&decoy));

        let mut content = el("수요기관");
        content.ancestor_classes = vec!["search_cond".into()];
        content.ancestor_ids = vec!["contents".into()];
        assert!(!under_global_chrome(&content));

        let mut headered = el("수요기관");
        headered.ancestor_ids = vec!["header".into()];
        assert!(under_global_chrome(&headered));
    }

    #[test]
    fn chrome_control_by_own_attributes() {
        let mut gnb_btn = el("검색");
        gnb_btn.id = "gnbSearchBtn".into();
        assert!(looks_like_chrome_control(&gnb_btn));

        let mut top_btn = el("검색");
        top_btn.class = "top_util_search".into();
        assert!(looks_like_chrome_control(&top_btn));

        let mut content_btn = el("검색");
        content_btn.id = "mf_wfm_btnS0001".into();
        content_btn.class = "w2trigger btn_cm".into();
        assert!(!looks_like_chrome_control(&content_btn));
    }
}
