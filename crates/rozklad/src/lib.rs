#![forbid(unsafe_code)]

//! Timetable front-end core.
//!
//! This crate ties the workspace together:
//!
//! - [`select`]: async virtualized select fields (re-export of `rozklad-select`)
//! - [`timetable`]: occupancy cell grouping (re-export of `rozklad-timetable`)
//! - [`form`]: fields with dependency edges and cascading resets
//! - [`executor`]: runs option fetches on worker threads
//! - [`config`]: JSON config file, locale file, environment overrides
//! - [`logging`]: subscriber setup for binaries
//!
//! # Example
//!
//! ```
//! use rozklad::prelude::*;
//!
//! let records = vec![
//!     LessonOccupancy::new("Math", WeekType::Permanent, "A"),
//!     LessonOccupancy::new("Math", WeekType::Permanent, "B"),
//! ];
//! let cell = group_cell(&records, GroupingView::Room);
//! assert_eq!(cell.blocks().next().map(|b| b.groups.len()), Some(2));
//! ```

pub mod config;
pub mod executor;
pub mod form;
pub mod logging;

pub use rozklad_core as core;
pub use rozklad_select as select;
pub use rozklad_timetable as timetable;

pub use config::{ConfigError, Locale, RozkladConfig};
pub use executor::FetchExecutor;
pub use form::{Form, FormError, FormUpdate};

/// Common imports.
pub mod prelude {
    pub use crate::config::{ConfigError, RozkladConfig};
    pub use crate::executor::FetchExecutor;
    pub use crate::form::{Form, FormError, FormUpdate};
    pub use rozklad_core::event::{Event, KeyCode, KeyEvent, Modifiers, MouseEvent};
    pub use rozklad_core::geometry::Rect;
    pub use rozklad_select::{
        CacheKey, FetchError, FetchRequest, FetchResponse, FieldMap, LoadOutcome, LoadStatus,
        Normalizer, OptionFetcher, OptionId, OptionPanel, OptionSource, SearchKey, SelectAction,
        SelectConfig, SelectController, SelectLabels, SelectOption, SelectValue,
    };
    pub use rozklad_timetable::{
        CellContent, GroupingView, LessonOccupancy, OccupancySchedule, TimetableGrid,
        TimetableLabels, WeekType, cell_lines, group_cell,
    };
}
