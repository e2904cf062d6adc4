#![forbid(unsafe_code)]

//! Async virtualized select control.
//!
//! Building blocks, leaf first:
//!
//! - [`option`]: the `{id, label, raw}` option model and the record normalizer
//! - [`filter`]: case-insensitive substring filtering, with incremental reuse
//! - [`source`]: static or lazily fetched option sets with a stale-response guard
//! - [`virtualized`]: scroll window math for long lists
//! - [`panel`]: what the open list area shows, plus label fitting
//! - [`select`]: the controller tying these together
//!
//! Fetching is sans-IO. The controller returns [`FetchRequest`]s; the host
//! runs them and hands back [`FetchResponse`]s via
//! [`SelectController::complete_fetch`].

pub mod filter;
pub mod option;
pub mod panel;
pub mod select;
pub mod source;
pub mod virtualized;

pub use filter::{IncrementalFilter, filter_indices, matches};
pub use option::{FieldMap, Normalizer, OptionId, SearchKey, SelectOption, normalize};
pub use panel::{OptionPanel, RenderedRow, SelectLabels, fit_label};
pub use select::{
    Chip, FieldMeta, OnChange, SelectAction, SelectConfig, SelectController, SelectValue,
    SelectionMode,
};
pub use source::{
    CacheKey, DataSource, FetchError, FetchRequest, FetchResponse, LoadOutcome, LoadState,
    LoadStatus, OptionFetcher, OptionSource, RequestId, parse_envelope,
};
pub use virtualized::{RowSlot, ScrollAlign, VirtualListState};
