#![forbid(unsafe_code)]

//! The select controller: open/closed state, search, highlight and value.
//!
//! One [`SelectController`] backs one form field. It owns the field's option
//! set (through [`DataSource`]), the debounced search text, the filtered
//! index list, the keyboard highlight, the scroll window and the selected
//! value. Nothing here is shared between fields.
//!
//! # Usage
//!
//! ```
//! use std::time::Instant;
//! use rozklad_core::event::{Event, KeyCode};
//! use rozklad_select::{OptionId, OptionSource, SelectController, SelectOption, SelectValue};
//!
//! let options = vec![SelectOption::new(1, "Monday"), SelectOption::new(2, "Tuesday")];
//! let mut day = SelectController::new("day", OptionSource::Static(options));
//! let now = Instant::now();
//!
//! day.handle_event(&Event::key(KeyCode::Down), now); // open
//! day.handle_event(&Event::key(KeyCode::Down), now); // highlight Tuesday
//! day.handle_event(&Event::key(KeyCode::Enter), now); // select, close
//!
//! assert_eq!(day.value(), &SelectValue::Single(Some(OptionId::from(2))));
//! assert!(!day.is_open());
//! ```
//!
//! # Invariants
//!
//! 1. `highlighted < filtered.len()` whenever the filtered list is non-empty.
//! 2. Highlight resets to 0 whenever the filtered set changes.
//! 3. Closing (Escape, Tab, outside pointer, single selection) clears the
//!    search text and never alters the value.
//! 4. In multi mode the value holds no duplicates, in selection order.
//! 5. Fetch failures never clear the value.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use rozklad_core::debounce::{DEFAULT_DEBOUNCE, Debounced};
use rozklad_core::event::{Event, KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use rozklad_core::geometry::Rect;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use unicode_segmentation::UnicodeSegmentation;

use crate::filter::IncrementalFilter;
use crate::option::{OptionId, SearchKey, SelectOption};
use crate::panel::{OptionPanel, RenderedRow, SelectLabels};
use crate::source::{
    CacheKey, DataSource, FetchRequest, FetchResponse, LoadOutcome, LoadStatus, OptionSource,
};
use crate::virtualized::{ScrollAlign, VirtualListState};

// ---------------------------------------------------------------------------
// Value types
// ---------------------------------------------------------------------------

/// Single or multiple selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionMode {
    /// At most one id.
    #[default]
    Single,
    /// Ordered list of distinct ids.
    Multiple,
}

/// A field's selected value.
///
/// Deserializes from form JSON: `null` or `""` is the empty single value,
/// an array is a multi value, anything else a single id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SelectValue {
    /// Single mode; `None` is the empty value.
    Single(Option<OptionId>),
    /// Multi mode, in selection order.
    Multiple(Vec<OptionId>),
}

impl SelectValue {
    /// The empty value for a mode.
    #[must_use]
    pub fn empty(mode: SelectionMode) -> Self {
        match mode {
            SelectionMode::Single => Self::Single(None),
            SelectionMode::Multiple => Self::Multiple(Vec::new()),
        }
    }

    /// Whether nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Single(id) => id.is_none(),
            Self::Multiple(ids) => ids.is_empty(),
        }
    }

    /// Whether `id` is selected.
    #[must_use]
    pub fn contains(&self, id: &OptionId) -> bool {
        match self {
            Self::Single(current) => current.as_ref() == Some(id),
            Self::Multiple(ids) => ids.contains(id),
        }
    }

    /// Selected ids, in order.
    #[must_use]
    pub fn ids(&self) -> Vec<&OptionId> {
        match self {
            Self::Single(id) => id.iter().collect(),
            Self::Multiple(ids) => ids.iter().collect(),
        }
    }

    /// Convert to the shape required by `mode`, keeping what fits.
    ///
    /// Multi to single keeps the first id; duplicates are dropped.
    #[must_use]
    pub fn coerce(self, mode: SelectionMode) -> Self {
        match (self, mode) {
            (Self::Single(id), SelectionMode::Single) => Self::Single(id),
            (Self::Single(id), SelectionMode::Multiple) => Self::Multiple(id.into_iter().collect()),
            (Self::Multiple(ids), SelectionMode::Single) => Self::Single(ids.into_iter().next()),
            (Self::Multiple(ids), SelectionMode::Multiple) => {
                let mut out: Vec<OptionId> = Vec::with_capacity(ids.len());
                for id in ids {
                    if !out.contains(&id) {
                        out.push(id);
                    }
                }
                Self::Multiple(out)
            }
        }
    }

    /// Form-value JSON: the id (or `""`) in single mode, an id array in multi mode.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Single(Some(id)) => id.to_json(),
            Self::Single(None) => Value::String(String::new()),
            Self::Multiple(ids) => Value::Array(ids.iter().map(OptionId::to_json).collect()),
        }
    }
}

impl<'de> Deserialize<'de> for SelectValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        match &value {
            Value::Null => Ok(Self::Single(None)),
            Value::String(s) if s.trim().is_empty() => Ok(Self::Single(None)),
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    OptionId::from_json(item).ok_or_else(|| {
                        serde::de::Error::custom(format!("not an option id: {item}"))
                    })
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Self::Multiple),
            other => OptionId::from_json(other)
                .map(|id| Self::Single(Some(id)))
                .ok_or_else(|| serde::de::Error::custom(format!("not a select value: {other}"))),
        }
    }
}

/// Identifies the field in change notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMeta {
    /// Field name.
    pub name: String,
}

/// Change callback: receives the new value and the field it belongs to.
pub type OnChange = Box<dyn FnMut(&SelectValue, &FieldMeta)>;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Controller tuning and text.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectConfig {
    /// Quiet interval before search text is applied.
    pub debounce: Duration,
    /// Height of one option row.
    pub row_height: usize,
    /// Height of the list viewport.
    pub viewport_height: usize,
    /// Extra rows laid out below the window.
    pub overscan: usize,
    /// Option parts that participate in search.
    pub search_keys: Vec<SearchKey>,
    /// Localized strings.
    pub labels: SelectLabels,
}

impl Default for SelectConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            row_height: 1,
            viewport_height: 8,
            overscan: 2,
            search_keys: vec![SearchKey::Label],
            labels: SelectLabels::default(),
        }
    }
}

impl SelectConfig {
    /// Set the debounce delay.
    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Set row and viewport heights.
    #[must_use]
    pub fn with_geometry(mut self, row_height: usize, viewport_height: usize) -> Self {
        self.row_height = row_height;
        self.viewport_height = viewport_height;
        self
    }

    /// Set overscan rows.
    #[must_use]
    pub fn with_overscan(mut self, overscan: usize) -> Self {
        self.overscan = overscan;
        self
    }

    /// Set search keys.
    #[must_use]
    pub fn with_search_keys(mut self, keys: Vec<SearchKey>) -> Self {
        self.search_keys = keys;
        self
    }

    /// Set labels.
    #[must_use]
    pub fn with_labels(mut self, labels: SelectLabels) -> Self {
        self.labels = labels;
        self
    }
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// Something the host should react to after an event.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectAction {
    /// The panel opened and options must be fetched.
    Fetch(FetchRequest),
    /// The panel opened; options are already available or loading.
    Opened,
    /// The panel closed.
    Closed,
    /// The value changed (the change callback has already run).
    Changed,
}

/// A selected id with its display text, for multi-mode chips.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chip {
    /// Selected id.
    pub id: OptionId,
    /// Label, or the id's string form if unknown.
    pub label: String,
}

// ---------------------------------------------------------------------------
// SelectController
// ---------------------------------------------------------------------------

/// State machine behind one select field.
pub struct SelectController {
    name: String,
    mode: SelectionMode,
    value: SelectValue,
    on_change: Option<OnChange>,
    source: DataSource,
    disabled: bool,
    open: bool,
    search: Debounced<String>,
    filter: IncrementalFilter,
    filtered: Vec<usize>,
    /// Source generation the filtered list was computed from.
    seen_generation: u64,
    highlighted: usize,
    list: VirtualListState,
    config: SelectConfig,
    /// Labels of every option ever seen, so chips survive option reloads.
    known_labels: HashMap<OptionId, String>,
    trigger_area: Rect,
    panel_area: Rect,
}

impl fmt::Debug for SelectController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectController")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .field("value", &self.value)
            .field("open", &self.open)
            .field("disabled", &self.disabled)
            .field("search", &self.search.raw())
            .field("filtered", &self.filtered.len())
            .field("highlighted", &self.highlighted)
            .field("load", self.source.state())
            .finish_non_exhaustive()
    }
}

impl SelectController {
    /// Create a single-mode controller with the default config.
    pub fn new(name: impl Into<String>, source: OptionSource) -> Self {
        let config = SelectConfig::default();
        let mut controller = Self {
            name: name.into(),
            mode: SelectionMode::Single,
            value: SelectValue::Single(None),
            on_change: None,
            source: DataSource::new(source),
            disabled: false,
            open: false,
            search: Debounced::new(String::new(), config.debounce),
            filter: IncrementalFilter::new(),
            filtered: Vec::new(),
            seen_generation: 0,
            highlighted: 0,
            list: VirtualListState::new(config.row_height, config.viewport_height)
                .with_overscan(config.overscan),
            config,
            known_labels: HashMap::new(),
            trigger_area: Rect::default(),
            panel_area: Rect::default(),
        };
        controller.remember_labels();
        controller.refilter();
        controller
    }

    /// Switch between single and multi mode (builder).
    #[must_use]
    pub fn multiple(mut self, multiple: bool) -> Self {
        self.mode = if multiple {
            SelectionMode::Multiple
        } else {
            SelectionMode::Single
        };
        self.value = self.value.coerce(self.mode);
        self
    }

    /// Initial value (builder).
    #[must_use]
    pub fn with_value(mut self, value: SelectValue) -> Self {
        self.value = value.coerce(self.mode);
        self
    }

    /// Change callback (builder).
    #[must_use]
    pub fn on_change(mut self, callback: impl FnMut(&SelectValue, &FieldMeta) + 'static) -> Self {
        self.on_change = Some(Box::new(callback));
        self
    }

    /// Disabled flag (builder).
    #[must_use]
    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Placeholder text (builder).
    #[must_use]
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.config.labels.placeholder = placeholder.into();
        self
    }

    /// Search keys (builder).
    #[must_use]
    pub fn with_search_keys(mut self, keys: Vec<SearchKey>) -> Self {
        self.config.search_keys = keys;
        self.filter.invalidate();
        self.refilter();
        self
    }

    /// Initial dependency key (builder).
    #[must_use]
    pub fn with_dependency(mut self, key: Option<CacheKey>) -> Self {
        self.source.set_dependency(key);
        self.refilter();
        self
    }

    /// Replace the whole config (builder).
    #[must_use]
    pub fn with_config(mut self, config: SelectConfig) -> Self {
        self.search = Debounced::new(self.search.settled().clone(), config.debounce);
        self.list = VirtualListState::new(config.row_height, config.viewport_height)
            .with_overscan(config.overscan);
        self.config = config;
        self.filter.invalidate();
        self.refilter();
        self
    }

    // -- accessors ---------------------------------------------------------

    /// Field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Selection mode.
    #[must_use]
    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    /// Current value.
    #[must_use]
    pub fn value(&self) -> &SelectValue {
        &self.value
    }

    /// Whether the panel is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Whether the control ignores input.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Enable or disable the control. Disabling closes it.
    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
        if disabled && self.open {
            self.close();
        }
    }

    /// Raw search text, as typed.
    #[must_use]
    pub fn search_text(&self) -> &str {
        self.search.raw()
    }

    /// Search text filtering is currently based on.
    #[must_use]
    pub fn applied_search(&self) -> &str {
        self.search.settled()
    }

    /// When pending search text will settle, if any is pending.
    #[must_use]
    pub fn search_deadline(&self) -> Option<Instant> {
        self.search.deadline()
    }

    /// Data source state.
    #[must_use]
    pub fn source(&self) -> &DataSource {
        &self.source
    }

    /// Load status shorthand.
    #[must_use]
    pub fn load_status(&self) -> &LoadStatus {
        &self.source.state().status
    }

    /// All loaded options.
    #[must_use]
    pub fn options(&self) -> &[SelectOption] {
        self.source.options()
    }

    /// Options passing the current filter, in source order.
    pub fn filtered_options(&self) -> impl Iterator<Item = &SelectOption> + '_ {
        let options = self.source.options();
        self.filtered.iter().filter_map(move |&i| options.get(i))
    }

    /// Number of filtered options.
    #[must_use]
    pub fn filtered_count(&self) -> usize {
        self.filtered.len()
    }

    /// Highlight index into the filtered list.
    #[must_use]
    pub fn highlighted(&self) -> usize {
        self.highlighted
    }

    /// The highlighted option, if any.
    #[must_use]
    pub fn highlighted_option(&self) -> Option<&SelectOption> {
        self.filtered
            .get(self.highlighted)
            .and_then(|&i| self.source.options().get(i))
    }

    /// Scroll state.
    #[must_use]
    pub fn list(&self) -> &VirtualListState {
        &self.list
    }

    /// Config in effect.
    #[must_use]
    pub fn config(&self) -> &SelectConfig {
        &self.config
    }

    // -- commands ----------------------------------------------------------

    /// Open the panel. Returns a request if options must be fetched.
    ///
    /// Repeated calls while a fetch for the current dependency is pending
    /// return `None`.
    pub fn open(&mut self) -> Option<FetchRequest> {
        if self.disabled {
            return None;
        }
        self.open = true;
        let request = self.source.begin_load(&self.name);
        self.refilter();
        request
    }

    /// Close the panel and clear the search text. The value is untouched.
    pub fn close(&mut self) {
        self.open = false;
        self.search.reset(String::new());
        self.refilter();
        self.list.scroll_to_top();
    }

    /// Update the search text. Filtering follows once it settles.
    pub fn set_search(&mut self, text: impl Into<String>, now: Instant) {
        self.search.set(text.into(), now);
    }

    /// Apply settled search text. Returns `true` if filtering was recomputed.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.search.poll(now).is_some() {
            self.refilter();
            return true;
        }
        false
    }

    /// Apply pending search text immediately.
    pub fn flush_search(&mut self) -> bool {
        if self.search.flush().is_some() {
            self.refilter();
            return true;
        }
        false
    }

    /// Select an option by id.
    ///
    /// Single mode sets the value, closes and clears search. Multi mode
    /// toggles membership and stays open.
    pub fn select_option(&mut self, id: &OptionId) {
        if self.disabled {
            return;
        }
        match self.mode {
            SelectionMode::Single => {
                self.commit(SelectValue::Single(Some(id.clone())));
                self.close();
            }
            SelectionMode::Multiple => {
                let mut ids = match &self.value {
                    SelectValue::Multiple(ids) => ids.clone(),
                    SelectValue::Single(id) => id.iter().cloned().collect(),
                };
                if let Some(pos) = ids.iter().position(|existing| existing == id) {
                    ids.remove(pos);
                } else {
                    ids.push(id.clone());
                }
                self.commit(SelectValue::Multiple(ids));
            }
        }
    }

    /// Remove an id from the value. Absent ids are ignored.
    pub fn remove_option(&mut self, id: &OptionId) {
        let next = match &self.value {
            SelectValue::Multiple(ids) => {
                SelectValue::Multiple(ids.iter().filter(|x| *x != id).cloned().collect())
            }
            SelectValue::Single(Some(current)) if current == id => SelectValue::Single(None),
            SelectValue::Single(_) => return,
        };
        self.commit(next);
    }

    /// Reset the value to empty.
    pub fn clear(&mut self) {
        self.commit(SelectValue::empty(self.mode));
    }

    /// Replace the value from the host without notifying.
    pub fn set_value(&mut self, value: SelectValue) {
        self.value = value.coerce(self.mode);
    }

    /// Replace a static option list.
    pub fn set_options(&mut self, options: Vec<SelectOption>) {
        self.source.set_static_options(options);
        self.remember_labels();
        self.refilter();
    }

    /// Record a new dependency value.
    ///
    /// A change drops the loaded options. If the panel is open a fetch for
    /// the new key is requested right away.
    pub fn set_dependency(&mut self, key: Option<CacheKey>) -> Option<FetchRequest> {
        if !self.source.set_dependency(key) {
            return None;
        }
        self.refilter();
        if self.open {
            self.source.begin_load(&self.name)
        } else {
            None
        }
    }

    /// Deliver a fetch response.
    pub fn complete_fetch(&mut self, response: FetchResponse) -> LoadOutcome {
        let outcome = self.source.complete(response);
        if matches!(outcome, LoadOutcome::Loaded { .. }) {
            self.remember_labels();
            self.refilter();
        }
        outcome
    }

    /// Record where the trigger and panel are drawn, for pointer handling.
    ///
    /// A non-empty panel also sets the list viewport height.
    pub fn set_area(&mut self, trigger: Rect, panel: Rect) {
        self.trigger_area = trigger;
        self.panel_area = panel;
        if !panel.is_empty() {
            self.list
                .resize(usize::from(panel.height), self.filtered.len());
        }
    }

    /// Scroll the list by whole rows.
    pub fn scroll(&mut self, rows: i64) {
        self.list.scroll_rows(rows, self.filtered.len());
    }

    // -- presentation ------------------------------------------------------

    /// What the option panel should show.
    #[must_use]
    pub fn panel(&self) -> OptionPanel {
        match &self.source.state().status {
            LoadStatus::Unloaded | LoadStatus::Loading => OptionPanel::Loading,
            LoadStatus::Error(err) => OptionPanel::Error(err.to_string()),
            LoadStatus::Loaded if self.source.options().is_empty() => OptionPanel::NoData,
            LoadStatus::Loaded if self.filtered.is_empty() => OptionPanel::NoMatches,
            LoadStatus::Loaded => {
                let options = self.source.options();
                let rows = self
                    .list
                    .rows(self.filtered.len())
                    .filter_map(|slot| {
                        let option = options.get(*self.filtered.get(slot.index)?)?;
                        Some(RenderedRow {
                            index: slot.index,
                            id: option.id.clone(),
                            label: option.label.clone(),
                            top: slot.top,
                            highlighted: slot.index == self.highlighted,
                            selected: self.value.contains(&option.id),
                        })
                    })
                    .collect();
                OptionPanel::Rows(rows)
            }
        }
    }

    /// Label for an id: current options first, then any seen before.
    #[must_use]
    pub fn label_for(&self, id: &OptionId) -> Option<&str> {
        self.source
            .options()
            .iter()
            .find(|o| &o.id == id)
            .map(|o| o.label.as_str())
            .or_else(|| self.known_labels.get(id).map(String::as_str))
    }

    /// Selected ids with display labels.
    #[must_use]
    pub fn chips(&self) -> Vec<Chip> {
        self.value
            .ids()
            .into_iter()
            .map(|id| Chip {
                id: id.clone(),
                label: self
                    .label_for(id)
                    .map_or_else(|| id.to_string(), str::to_string),
            })
            .collect()
    }

    /// Trigger text: selected label(s) or the placeholder.
    #[must_use]
    pub fn display_text(&self) -> String {
        if self.value.is_empty() {
            return self.config.labels.placeholder.clone();
        }
        self.chips()
            .into_iter()
            .map(|chip| chip.label)
            .collect::<Vec<_>>()
            .join(", ")
    }

    // -- events ------------------------------------------------------------

    /// Handle an input event.
    pub fn handle_event(&mut self, event: &Event, now: Instant) -> Option<SelectAction> {
        if self.disabled {
            return None;
        }
        match event {
            Event::Key(key) if key.is_press() => self.handle_key(key, now),
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            Event::Paste(text) if self.open => {
                let mut search = self.search.raw().clone();
                search.extend(text.chars().filter(|c| !c.is_control()));
                self.set_search(search, now);
                None
            }
            Event::Focus(false) if self.open => {
                self.close();
                Some(SelectAction::Closed)
            }
            Event::Tick => {
                self.tick(now);
                None
            }
            _ => None,
        }
    }

    fn handle_key(&mut self, key: &KeyEvent, now: Instant) -> Option<SelectAction> {
        if !self.open {
            return match key.code {
                KeyCode::Enter | KeyCode::Down | KeyCode::Char(' ') if !key.ctrl() => {
                    Some(self.open_action())
                }
                _ => None,
            };
        }

        let page = self.list.page_rows();
        match key.code {
            KeyCode::Escape | KeyCode::Tab | KeyCode::BackTab => {
                self.close();
                return Some(SelectAction::Closed);
            }
            KeyCode::Enter => {
                self.flush_search();
                let id = self.highlighted_option().map(|o| o.id.clone())?;
                return Some(self.choose(&id));
            }
            KeyCode::Down => self.move_highlight(self.highlighted.saturating_add(1)),
            KeyCode::Up => self.move_highlight(self.highlighted.saturating_sub(1)),
            KeyCode::PageDown => self.move_highlight(self.highlighted.saturating_add(page)),
            KeyCode::PageUp => self.move_highlight(self.highlighted.saturating_sub(page)),
            KeyCode::Home => self.move_highlight(0),
            KeyCode::End => self.move_highlight(usize::MAX),
            KeyCode::Backspace => {
                let mut text = self.search.raw().clone();
                let cut = text.grapheme_indices(true).next_back().map(|(idx, _)| idx);
                if let Some(idx) = cut {
                    text.truncate(idx);
                    self.set_search(text, now);
                } else if let SelectValue::Multiple(ids) = &self.value
                    && let Some(last) = ids.last().cloned()
                {
                    self.remove_option(&last);
                    return Some(SelectAction::Changed);
                }
            }
            KeyCode::Char('u') if key.ctrl() => self.set_search(String::new(), now),
            KeyCode::Char(c) if !key.ctrl() && !key.alt() => {
                let mut text = self.search.raw().clone();
                text.push(c);
                self.set_search(text, now);
            }
            _ => {}
        }
        None
    }

    fn handle_mouse(&mut self, mouse: &MouseEvent) -> Option<SelectAction> {
        let (x, y) = mouse.position();
        match mouse.kind {
            MouseEventKind::Down(button) => {
                if self.trigger_area.is_empty() && self.panel_area.is_empty() {
                    return None;
                }
                let on_trigger = self.trigger_area.contains(x, y);
                let on_panel = self.open && self.panel_area.contains(x, y);
                if !on_trigger && !on_panel {
                    if self.open {
                        self.close();
                        return Some(SelectAction::Closed);
                    }
                    return None;
                }
                if on_panel {
                    if button != MouseButton::Left {
                        return None;
                    }
                    let offset = usize::from(y - self.panel_area.y);
                    let index = self.list.row_at(offset, self.filtered.len())?;
                    self.highlighted = index;
                    let id = self.highlighted_option().map(|o| o.id.clone())?;
                    return Some(self.choose(&id));
                }
                if self.open {
                    self.close();
                    return Some(SelectAction::Closed);
                }
                Some(self.open_action())
            }
            MouseEventKind::ScrollDown if self.open && self.panel_area.contains(x, y) => {
                self.scroll(1);
                None
            }
            MouseEventKind::ScrollUp if self.open && self.panel_area.contains(x, y) => {
                self.scroll(-1);
                None
            }
            _ => None,
        }
    }

    /// Select `id`. Re-choosing the current single value only closes.
    fn choose(&mut self, id: &OptionId) -> SelectAction {
        let before = self.value.clone();
        self.select_option(id);
        if self.value == before {
            SelectAction::Closed
        } else {
            SelectAction::Changed
        }
    }

    fn open_action(&mut self) -> SelectAction {
        match self.open() {
            Some(request) => SelectAction::Fetch(request),
            None => SelectAction::Opened,
        }
    }

    fn move_highlight(&mut self, target: usize) {
        if self.filtered.is_empty() {
            self.highlighted = 0;
            return;
        }
        self.highlighted = target.min(self.filtered.len() - 1);
        self.list
            .scroll_to_item(self.highlighted, self.filtered.len(), ScrollAlign::Smart);
    }

    fn refilter(&mut self) {
        let next = self
            .filter
            .filter(
                self.source.options(),
                self.search.settled(),
                &self.config.search_keys,
                self.source.generation(),
            )
            .to_vec();
        let generation = self.source.generation();
        if next != self.filtered || generation != self.seen_generation {
            self.filtered = next;
            self.seen_generation = generation;
            self.highlighted = 0;
            self.list.scroll_to_top();
        }
        self.list.clamp(self.filtered.len());
    }

    fn remember_labels(&mut self) {
        for option in self.source.options() {
            self.known_labels
                .insert(option.id.clone(), option.label.clone());
        }
    }

    fn commit(&mut self, next: SelectValue) {
        if next == self.value {
            return;
        }
        self.value = next;
        if let Some(callback) = self.on_change.as_mut() {
            let meta = FieldMeta {
                name: self.name.clone(),
            };
            callback(&self.value, &meta);
        }
    }
}
