//! Browser control surface
//!
//! bidwatch drives an external rendering engine through the [`Driver`]
//! trait. The engine itself (CDP, WebDriver, whatever renders the portal)
//! is not part of this crate; anything that can answer these calls can run
//! the pipeline, including the scripted driver used by the tests.
//!
//! The working page may be swapped mid-run when the portal opens a new
//! browser tab. That context switch is explicit: [`Driver::wait_for_new_tab`]
//! reports a tab whose opener is the current page, and
//! [`Driver::switch_to_tab`] makes it the working page. After a switch, all
//! other calls operate on the new tab.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Identifier of a frame within the working page
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameId {
    /// The top-level document
    Top,
    /// A sub-document (iframe), keyed by an engine-assigned id
    Sub(String),
}

impl FrameId {
    /// Whether this is the top-level document
    pub fn is_top(&self) -> bool {
        matches!(self, FrameId::Top)
    }
}

impl std::fmt::Display for FrameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameId::Top => write!(f, "top"),
            FrameId::Sub(id) => write!(f, "frame:{}", id),
        }
    }
}

/// Information about a frame of the working page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameInfo {
    /// Frame id, usable with the per-frame `Driver` calls
    pub id: FrameId,
    /// Frame name attribute (if any)
    pub name: Option<String>,
    /// Frame URL
    pub url: String,
}

/// Opaque token for a browser tab opened during the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabToken(pub u64);

/// Keys the pipeline sends to form fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Submit a filter value
    Enter,
    /// Leave a field so the form's own change handlers fire
    Tab,
}

/// Snapshot of a single element, taken in one engine round-trip
///
/// `text` carries whatever the element renders: innerText, falling back to
/// the `value` attribute for inputs and `alt` for images, trimmed.
/// `visible` is a layout-presence check (the element has a rendered box),
/// not mere DOM presence. Ancestor ids/classes let locators apply
/// exclusion zones without further round-trips.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElementSnapshot {
    /// Engine-assigned handle, valid until the next navigation
    pub handle: u64,
    /// Lowercase tag name
    pub tag: String,
    /// Rendered text (innerText / value / alt), trimmed
    pub text: String,
    /// `id` attribute ("" when absent)
    #[serde(default)]
    pub id: String,
    /// `name` attribute ("" when absent)
    #[serde(default)]
    pub name: String,
    /// `class` attribute ("" when absent)
    #[serde(default)]
    pub class: String,
    /// `alt` attribute (images)
    #[serde(default)]
    pub alt: Option<String>,
    /// Absolute `href` (anchors)
    #[serde(default)]
    pub href: Option<String>,
    /// Layout presence: the element has a rendered box
    pub visible: bool,
    /// Not disabled
    pub enabled: bool,
    /// `readonly` attribute set
    #[serde(default)]
    pub read_only: bool,
    /// `id` attributes of all ancestors, innermost first
    #[serde(default)]
    pub ancestor_ids: Vec<String>,
    /// `class` attributes of all ancestors, innermost first
    #[serde(default)]
    pub ancestor_classes: Vec<String>,
}

/// One link found inside a results row
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RowLink {
    /// Absolute URL
    pub href: String,
    /// Anchor text, trimmed
    pub text: String,
    /// Class of the cell/div directly containing the anchor
    #[serde(default)]
    pub container_class: String,
}

/// Snapshot of one `<tbody>` row of the results table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RowSnapshot {
    /// Text of each `<td>`, trimmed, in document order
    pub cells: Vec<String>,
    /// All anchors in the row, in document order
    pub links: Vec<RowLink>,
}

/// The browser capability consumed by the pipeline
///
/// Methods that change the working page context take `&mut self`; read and
/// interact calls take `&self`. The pipeline owns the driver exclusively
/// for the duration of a run, so no internal synchronization is assumed.
#[async_trait]
pub trait Driver: Send {
    /// Navigate the working page to a URL and wait for it to settle
    async fn goto(&mut self, url: &str) -> Result<()>;

    /// Title of the working page
    async fn title(&self) -> Result<String>;

    /// All frames of the working page, top-level document first
    async fn frames(&self) -> Result<Vec<FrameInfo>>;

    /// Visible body text of a frame
    async fn frame_text(&self, frame: &FrameId) -> Result<String>;

    /// Snapshot all elements matching a CSS selector within a frame
    async fn query(&self, frame: &FrameId, selector: &str) -> Result<Vec<ElementSnapshot>>;

    /// Snapshot elements matching a selector nested under `parent`
    async fn query_within(
        &self,
        frame: &FrameId,
        parent: u64,
        selector: &str,
    ) -> Result<Vec<ElementSnapshot>>;

    /// The data cell associated with a label element: the next sibling of
    /// the enclosing `th`/`td`, falling back to the enclosing row or the
    /// label's grandparent container
    async fn sibling_cell(&self, frame: &FrameId, label: u64)
        -> Result<Option<ElementSnapshot>>;

    /// Click an element (via its own click behavior, not coordinates)
    async fn click(&self, frame: &FrameId, element: u64) -> Result<()>;

    /// Clear a field (select-all semantics) and type a value into it
    async fn clear_and_type(&self, frame: &FrameId, element: u64, text: &str) -> Result<()>;

    /// Send a key press to an element
    async fn press_key(&self, frame: &FrameId, element: u64, key: Key) -> Result<()>;

    /// Wait up to `timeout` for a tab whose opener is the working page
    ///
    /// Returns `None` when no such tab appears within the budget.
    async fn wait_for_new_tab(&self, timeout: Duration) -> Result<Option<TabToken>>;

    /// Make the given tab the working page and bring it to the foreground
    async fn switch_to_tab(&mut self, tab: TabToken) -> Result<()>;

    /// Snapshot all `table tbody tr` rows of a frame
    async fn table_rows(&self, frame: &FrameId) -> Result<Vec<RowSnapshot>>;

    /// Capture a full-page screenshot to a file
    async fn screenshot(&self, path: &Path) -> Result<()>;

    /// Close the browser session; called on every exit path of a run
    async fn close(&mut self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_id_display() {
        assert_eq!(FrameId::Top.to_string(), "top");
        assert_eq!(FrameId::Sub("wq_uuid_42".into()).to_string(), "frame:wq_uuid_42");
        assert!(FrameId::Top.is_top());
        assert!(!FrameId::Sub("x".into()).is_top());
    }

    #[test]
    fn element_snapshot_deserializes_with_defaults() {
        let json = r#"{"handle":1,"tag":"a","text":"닫기","visible":true,"enabled":true}"#;
        let el: ElementSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(el.text, "닫기");
        assert!(el.id.is_empty());
        assert!(el.ancestor_classes.is_empty());
        assert!(!el.read_only);
    }
}
