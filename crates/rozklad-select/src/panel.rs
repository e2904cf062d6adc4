#![forbid(unsafe_code)]

//! Presentation state of the open option panel.
//!
//! The controller produces an [`OptionPanel`] describing what the list area
//! should show; hosts draw it with their own toolkit. [`OptionPanel::lines`]
//! renders it as plain text rows for terminal hosts and tests.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::option::OptionId;

const ELLIPSIS: &str = "…";

/// Localized strings shown by the control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectLabels {
    /// Trigger text when nothing is selected.
    pub placeholder: String,
    /// Shown while options load.
    pub loading: String,
    /// Shown when the loaded option set is empty.
    pub no_data: String,
    /// Shown when the search filters out every option.
    pub no_matches: String,
    /// Prepended to fetch error messages.
    pub error_prefix: String,
}

impl Default for SelectLabels {
    fn default() -> Self {
        Self {
            placeholder: "Select…".to_string(),
            loading: "Loading…".to_string(),
            no_data: "No data available".to_string(),
            no_matches: "Nothing found".to_string(),
            error_prefix: "Failed to load: ".to_string(),
        }
    }
}

/// One laid-out option row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedRow {
    /// Position in the filtered list.
    pub index: usize,
    /// Option id.
    pub id: OptionId,
    /// Option label, untruncated.
    pub label: String,
    /// Offset from the viewport top.
    pub top: i64,
    /// Keyboard highlight.
    pub highlighted: bool,
    /// Part of the current value.
    pub selected: bool,
}

/// What the list area shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionPanel {
    /// Fetch in progress.
    Loading,
    /// Fetch failed; carries the error message.
    Error(String),
    /// Loaded, but there are no options at all.
    NoData,
    /// Options exist but none match the search.
    NoMatches,
    /// Visible rows, in order.
    Rows(Vec<RenderedRow>),
}

impl OptionPanel {
    /// Rows, if this is the `Rows` state.
    #[must_use]
    pub fn rows(&self) -> &[RenderedRow] {
        match self {
            Self::Rows(rows) => rows,
            _ => &[],
        }
    }

    /// Render to text lines at most `width` columns wide.
    ///
    /// Rows get a two-column gutter: `>` marks the highlight, `*` marks a
    /// selected option.
    #[must_use]
    pub fn lines(&self, labels: &SelectLabels, width: usize) -> Vec<String> {
        let _span = rozklad_core::debug_span!("widget_render", widget = "OptionPanel").entered();
        match self {
            Self::Loading => vec![fit_label(&labels.loading, width).into_owned()],
            Self::Error(message) => {
                let text = format!("{}{message}", labels.error_prefix);
                vec![fit_label(&text, width).into_owned()]
            }
            Self::NoData => vec![fit_label(&labels.no_data, width).into_owned()],
            Self::NoMatches => vec![fit_label(&labels.no_matches, width).into_owned()],
            Self::Rows(rows) => rows
                .iter()
                .map(|row| {
                    let marker = match (row.highlighted, row.selected) {
                        (true, true) => ">*",
                        (true, false) => "> ",
                        (false, true) => " *",
                        (false, false) => "  ",
                    };
                    if width <= marker.len() {
                        return fit_label(marker, width).into_owned();
                    }
                    let label = fit_label(&row.label, width - marker.len());
                    format!("{marker}{label}")
                })
                .collect(),
        }
    }
}

/// Truncate `text` to `width` display columns, ending with an ellipsis if cut.
///
/// Truncation happens on grapheme boundaries; a wide grapheme that would
/// straddle the limit is dropped entirely.
#[must_use]
pub fn fit_label(text: &str, width: usize) -> Cow<'_, str> {
    if text.width() <= width {
        return Cow::Borrowed(text);
    }
    if width == 0 {
        return Cow::Borrowed("");
    }
    let budget = width - ELLIPSIS.width();
    let mut used = 0;
    let mut out = String::new();
    for grapheme in text.graphemes(true) {
        let w = grapheme.width();
        if used + w > budget {
            break;
        }
        used += w;
        out.push_str(grapheme);
    }
    out.push_str(ELLIPSIS);
    Cow::Owned(out)
}
