#![forbid(unsafe_code)]

//! Timetable occupancy grouping for room and teacher views.
//!
//! [`group_cell`] is the pure core: it turns the occupancy rows of one
//! (day, hour) slot into a [`CellContent`]. [`TimetableGrid`] applies it to a
//! whole [`OccupancySchedule`], and [`cell_lines`] renders cells as text.

pub mod grid;
pub mod grouping;
pub mod occupancy;
pub mod render;

pub use grid::{Slot, TimetableGrid};
pub use grouping::{
    CellContent, CellKind, GroupingView, HalfCell, LessonBlock, group_cell, group_cell_refs,
};
pub use occupancy::{
    DayOccupancy, HourOccupancy, LessonOccupancy, OccupancySchedule, ScheduleError, WeekType,
};
pub use render::{TimetableLabels, block_lines, cell_lines};
