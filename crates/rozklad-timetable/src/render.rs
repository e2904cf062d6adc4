#![forbid(unsafe_code)]

//! Cell text with configurable (localized) labels.

use serde::{Deserialize, Serialize};

use crate::grouping::{CellContent, GroupingView, HalfCell, LessonBlock};

/// Localized placeholder and header strings for timetable cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimetableLabels {
    /// Upper half with nothing scheduled.
    pub free_upper: String,
    /// Lower half with nothing scheduled.
    pub free_lower: String,
    /// A cell with no lessons.
    pub empty: String,
    /// Heading of the upper half.
    pub upper_header: String,
    /// Heading of the lower half.
    pub lower_header: String,
}

impl Default for TimetableLabels {
    fn default() -> Self {
        Self {
            free_upper: "Upper week: free".to_string(),
            free_lower: "Lower week: free".to_string(),
            empty: "-".to_string(),
            upper_header: "Upper week".to_string(),
            lower_header: "Lower week".to_string(),
        }
    }
}

/// Text lines for one block.
///
/// Lesson and type first, then the teacher (room view) or the room (teacher
/// view), then the groups.
#[must_use]
pub fn block_lines(block: &LessonBlock, view: GroupingView) -> Vec<String> {
    let lesson = &block.lesson;
    let mut lines = Vec::with_capacity(3);
    if lesson.lesson_type_name.is_empty() {
        lines.push(lesson.lesson_name.clone());
    } else {
        lines.push(format!("{} ({})", lesson.lesson_name, lesson.lesson_type_name));
    }

    let who_or_where = match view {
        GroupingView::Room => join_non_empty(&[&lesson.teacher_surname, &lesson.teacher_name], " "),
        GroupingView::Teacher => join_non_empty(&[&lesson.room_name, &lesson.corp_id], " / "),
    };
    if !who_or_where.is_empty() {
        lines.push(who_or_where);
    }
    if !block.groups.is_empty() {
        lines.push(block.groups.join(", "));
    }
    lines
}

/// Text lines for a cell. Split cells always show both halves.
#[must_use]
pub fn cell_lines(cell: &CellContent, labels: &TimetableLabels, view: GroupingView) -> Vec<String> {
    let _span = rozklad_core::debug_span!("widget_render", widget = "TimetableCell").entered();
    match cell {
        CellContent::Empty => vec![labels.empty.clone()],
        CellContent::Single(blocks) => blocks.iter().flat_map(|b| block_lines(b, view)).collect(),
        CellContent::Split { upper, lower } => {
            let mut lines = Vec::new();
            half_lines(&mut lines, upper, &labels.upper_header, &labels.free_upper, view);
            half_lines(&mut lines, lower, &labels.lower_header, &labels.free_lower, view);
            lines
        }
    }
}

fn half_lines(out: &mut Vec<String>, half: &HalfCell, header: &str, free: &str, view: GroupingView) {
    match half {
        HalfCell::Free => out.push(free.to_string()),
        HalfCell::Blocks(blocks) => {
            out.push(format!("{header}:"));
            out.extend(blocks.iter().flat_map(|b| block_lines(b, view)));
        }
    }
}

fn join_non_empty(parts: &[&String], sep: &str) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(sep)
}
