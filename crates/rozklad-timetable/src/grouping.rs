#![forbid(unsafe_code)]

//! Cell grouping: collapse per-group occupancy rows into display blocks.
//!
//! The backend sends one row per attending group. Rows that describe the
//! same lesson (same name, type, teacher or room, and week) are merged into
//! one [`LessonBlock`] carrying the sorted list of groups. Blocks are then
//! arranged by week pattern:
//!
//! | Records present              | Result                              |
//! |------------------------------|-------------------------------------|
//! | any permanent                | `Single` (all permanent blocks)     |
//! | upper and/or lower, no perm. | `Split` with `Free` for a missing half |
//! | none                         | `Empty`                             |
//!
//! # Invariants
//!
//! 1. Output does not depend on input order.
//! 2. `groups` in every block is sorted and free of duplicates.
//! 3. `Single` always holds at least one block; `Split` always has at
//!    least one non-free half.
//! 4. Grouping never fails. Records with an unknown week type are dropped
//!    with a warning.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::occupancy::{LessonOccupancy, WeekType};

/// Which timetable a cell belongs to. Decides the merge key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupingView {
    /// A room's timetable; blocks are told apart by teacher.
    #[default]
    Room,
    /// A teacher's timetable; blocks are told apart by room.
    Teacher,
}

/// Composite identity of a lesson within one view.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct BlockKey {
    lesson_name: String,
    lesson_type_name: String,
    discriminator: (String, String),
    week: WeekType,
}

impl BlockKey {
    fn of(record: &LessonOccupancy, view: GroupingView) -> Self {
        let discriminator = match view {
            GroupingView::Room => (record.teacher_name.clone(), record.teacher_surname.clone()),
            GroupingView::Teacher => (record.room_name.clone(), record.corp_id.clone()),
        };
        Self {
            lesson_name: record.lesson_name.clone(),
            lesson_type_name: record.lesson_type_name.clone(),
            discriminator,
            week: record.week_type_name,
        }
    }
}

/// One or more occupancy rows merged into a single displayed lesson.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LessonBlock {
    /// Representative record. Chosen deterministically among the merged rows.
    pub lesson: LessonOccupancy,
    /// Attending groups, sorted, deduplicated.
    pub groups: Vec<String>,
}

impl LessonBlock {
    /// Lesson name shorthand.
    #[must_use]
    pub fn lesson_name(&self) -> &str {
        &self.lesson.lesson_name
    }

    /// Week pattern shorthand.
    #[must_use]
    pub fn week(&self) -> WeekType {
        self.lesson.week_type_name
    }
}

/// One half of a split cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum HalfCell {
    /// Nothing scheduled in this week.
    Free,
    /// Lessons in this week.
    Blocks(Vec<LessonBlock>),
}

impl HalfCell {
    fn from_blocks(blocks: Vec<LessonBlock>) -> Self {
        if blocks.is_empty() {
            Self::Free
        } else {
            Self::Blocks(blocks)
        }
    }

    /// Whether nothing is scheduled.
    #[must_use]
    pub fn is_free(&self) -> bool {
        matches!(self, Self::Free)
    }

    /// Blocks in this half.
    #[must_use]
    pub fn blocks(&self) -> &[LessonBlock] {
        match self {
            Self::Free => &[],
            Self::Blocks(blocks) => blocks,
        }
    }
}

/// Display-ready content of one (day, hour) cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CellContent {
    /// No lessons.
    Empty,
    /// Permanent lessons, stacked. Normally exactly one.
    Single(Vec<LessonBlock>),
    /// Alternating-week lessons.
    Split { upper: HalfCell, lower: HalfCell },
}

/// Discriminant of [`CellContent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKind {
    Empty,
    Single,
    Split,
}

impl CellContent {
    /// Which variant this is.
    #[must_use]
    pub fn kind(&self) -> CellKind {
        match self {
            Self::Empty => CellKind::Empty,
            Self::Single(_) => CellKind::Single,
            Self::Split { .. } => CellKind::Split,
        }
    }

    /// Every block in display order.
    pub fn blocks(&self) -> impl Iterator<Item = &LessonBlock> + '_ {
        let (first, second) = match self {
            Self::Empty => (&[][..], &[][..]),
            Self::Single(blocks) => (blocks.as_slice(), &[][..]),
            Self::Split { upper, lower } => (upper.blocks(), lower.blocks()),
        };
        first.iter().chain(second)
    }

    /// Whether a new lesson with the given week pattern would fit.
    ///
    /// A permanent lesson needs both weeks free; an upper or lower lesson
    /// needs its own half free. Unknown never fits.
    #[must_use]
    pub fn is_free_for(&self, week: WeekType) -> bool {
        match (self, week) {
            (_, WeekType::Unknown) => false,
            (Self::Empty, _) => true,
            (Self::Single(_), _) => false,
            (Self::Split { .. }, WeekType::Permanent) => false,
            (Self::Split { upper, .. }, WeekType::Upper) => upper.is_free(),
            (Self::Split { lower, .. }, WeekType::Lower) => lower.is_free(),
        }
    }
}

/// Merge one week bucket into blocks, ordered by key.
fn merge_bucket(records: &[&LessonOccupancy], view: GroupingView) -> Vec<LessonBlock> {
    let mut merged: BTreeMap<BlockKey, (Vec<String>, Vec<&LessonOccupancy>)> = BTreeMap::new();
    for &record in records {
        let (groups, members) = merged.entry(BlockKey::of(record, view)).or_default();
        if !record.group_name.is_empty() {
            groups.push(record.group_name.clone());
        }
        members.push(record);
    }

    merged
        .into_values()
        .filter_map(|(mut groups, members)| {
            groups.sort();
            groups.dedup();
            let lesson = representative(&members)?.clone();
            Some(LessonBlock { lesson, groups })
        })
        .collect()
}

/// Smallest record by group name, then by full serialized form.
fn representative<'a>(members: &[&'a LessonOccupancy]) -> Option<&'a LessonOccupancy> {
    members
        .iter()
        .copied()
        .min_by_key(|r| (r.group_name.clone(), serde_json::to_string(r).unwrap_or_default()))
}

/// Group the records of one cell.
#[must_use]
pub fn group_cell(records: &[LessonOccupancy], view: GroupingView) -> CellContent {
    group_cell_refs(&records.iter().collect::<Vec<_>>(), view)
}

/// [`group_cell`] over borrowed records.
#[must_use]
pub fn group_cell_refs(records: &[&LessonOccupancy], view: GroupingView) -> CellContent {
    let mut permanent = Vec::new();
    let mut upper = Vec::new();
    let mut lower = Vec::new();
    for &record in records {
        match record.week_type_name {
            WeekType::Permanent => permanent.push(record),
            WeekType::Upper => upper.push(record),
            WeekType::Lower => lower.push(record),
            WeekType::Unknown => {
                rozklad_core::warn!(
                    lesson = %record.lesson_name,
                    group = %record.group_name,
                    "dropping occupancy record with unknown week type"
                );
            }
        }
    }

    if !permanent.is_empty() {
        if !upper.is_empty() || !lower.is_empty() {
            rozklad_core::warn!(
                permanent = permanent.len(),
                upper = upper.len(),
                lower = lower.len(),
                "permanent lesson shadows alternating-week lessons in one cell"
            );
        }
        return CellContent::Single(merge_bucket(&permanent, view));
    }
    if upper.is_empty() && lower.is_empty() {
        return CellContent::Empty;
    }
    CellContent::Split {
        upper: HalfCell::from_blocks(merge_bucket(&upper, view)),
        lower: HalfCell::from_blocks(merge_bucket(&lower, view)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(lesson: &str, week: WeekType, group: &str) -> LessonOccupancy {
        LessonOccupancy::new(lesson, week, group)
            .with_type("lecture")
            .with_teacher("Olena", "Ivanenko")
            .with_room("101", "1")
    }

    fn groups(block: &LessonBlock) -> Vec<&str> {
        block.groups.iter().map(String::as_str).collect()
    }

    #[test]
    fn no_records_is_empty() {
        assert_eq!(group_cell(&[], GroupingView::Room), CellContent::Empty);
    }

    #[test]
    fn identical_lessons_merge_groups() {
        let cell = group_cell(
            &[
                rec("Math", WeekType::Permanent, "C"),
                rec("Math", WeekType::Permanent, "A"),
                rec("Math", WeekType::Permanent, "B"),
            ],
            GroupingView::Room,
        );
        let CellContent::Single(blocks) = &cell else {
            panic!("expected single, got {cell:?}");
        };
        assert_eq!(blocks.len(), 1);
        assert_eq!(groups(&blocks[0]), vec!["A", "B", "C"]);
    }

    #[test]
    fn duplicate_groups_are_deduplicated() {
        let cell = group_cell(
            &[
                rec("Math", WeekType::Permanent, "A"),
                rec("Math", WeekType::Permanent, "A"),
            ],
            GroupingView::Room,
        );
        assert_eq!(groups(cell.blocks().next().unwrap()), vec!["A"]);
    }

    #[test]
    fn upper_only_is_split_with_free_lower() {
        let cell = group_cell(&[rec("Math", WeekType::Upper, "G1")], GroupingView::Room);
        match &cell {
            CellContent::Split { upper, lower } => {
                assert_eq!(upper.blocks().len(), 1);
                assert!(lower.is_free());
            }
            other => panic!("expected split, got {other:?}"),
        }
    }

    #[test]
    fn lower_only_is_split_with_free_upper() {
        let cell = group_cell(&[rec("Art", WeekType::Lower, "G1")], GroupingView::Room);
        assert_eq!(cell.kind(), CellKind::Split);
        let CellContent::Split { upper, .. } = cell else {
            unreachable!()
        };
        assert!(upper.is_free());
    }

    #[test]
    fn mixed_weeks_example() {
        let cell = group_cell(
            &[
                LessonOccupancy::new("Math", WeekType::Upper, "G1"),
                LessonOccupancy::new("Math", WeekType::Upper, "G2"),
                LessonOccupancy::new("Physics", WeekType::Lower, "G3"),
            ],
            GroupingView::Room,
        );
        let CellContent::Split { upper, lower } = &cell else {
            panic!("expected split, got {cell:?}");
        };
        assert_eq!(upper.blocks().len(), 1);
        assert_eq!(upper.blocks()[0].lesson_name(), "Math");
        assert_eq!(groups(&upper.blocks()[0]), vec!["G1", "G2"]);
        assert_eq!(lower.blocks().len(), 1);
        assert_eq!(lower.blocks()[0].lesson_name(), "Physics");
        assert_eq!(groups(&lower.blocks()[0]), vec!["G3"]);
    }

    #[test]
    fn different_teachers_stay_apart_in_room_view() {
        let a = rec("Math", WeekType::Permanent, "A");
        let b = rec("Math", WeekType::Permanent, "B").with_teacher("Petro", "Shevchenko");
        let cell = group_cell(&[a, b], GroupingView::Room);
        assert_eq!(cell.blocks().count(), 2);
    }

    #[test]
    fn teacher_view_keys_by_room() {
        let a = rec("Math", WeekType::Permanent, "A");
        let b = rec("Math", WeekType::Permanent, "B").with_teacher("Petro", "Shevchenko");
        // Same room, different teacher names: one block in the teacher view.
        assert_eq!(group_cell(&[a.clone(), b.clone()], GroupingView::Teacher).blocks().count(), 1);

        let c = rec("Math", WeekType::Permanent, "C").with_room("202", "1");
        assert_eq!(group_cell(&[a, c], GroupingView::Teacher).blocks().count(), 2);
    }

    #[test]
    fn several_permanent_lessons_are_stacked() {
        let cell = group_cell(
            &[
                rec("Physics", WeekType::Permanent, "A"),
                rec("Math", WeekType::Permanent, "B"),
            ],
            GroupingView::Room,
        );
        let names: Vec<_> = cell.blocks().map(LessonBlock::lesson_name).collect();
        assert_eq!(names, vec!["Math", "Physics"]);
        assert_eq!(cell.kind(), CellKind::Single);
    }

    #[test]
    fn representative_is_order_independent() {
        let mut a = rec("Math", WeekType::Permanent, "A");
        a.extra.insert("lessonId".into(), serde_json::json!(1));
        let mut b = rec("Math", WeekType::Permanent, "B");
        b.extra.insert("lessonId".into(), serde_json::json!(2));
        let ab = group_cell(&[a.clone(), b.clone()], GroupingView::Room);
        let ba = group_cell(&[b, a], GroupingView::Room);
        assert_eq!(ab, ba);
        assert_eq!(ab.blocks().next().unwrap().lesson.group_name, "A");
    }

    #[test]
    fn records_without_group_still_render() {
        let cell = group_cell(&[rec("Seminar", WeekType::Permanent, "")], GroupingView::Room);
        let block = cell.blocks().next().unwrap();
        assert!(block.groups.is_empty());
        assert_eq!(block.lesson_name(), "Seminar");
    }

    #[test]
    fn free_for_week() {
        let split = group_cell(&[rec("Math", WeekType::Upper, "A")], GroupingView::Room);
        assert!(!split.is_free_for(WeekType::Upper));
        assert!(split.is_free_for(WeekType::Lower));
        assert!(!split.is_free_for(WeekType::Permanent));
        assert!(CellContent::Empty.is_free_for(WeekType::Permanent));
        assert!(!CellContent::Empty.is_free_for(WeekType::Unknown));
    }

    #[tracing_test::traced_test]
    #[test]
    fn unknown_week_is_dropped_with_warning() {
        let odd = rec("Math", WeekType::Unknown, "A");
        assert_eq!(group_cell(&[odd], GroupingView::Room), CellContent::Empty);
        assert!(logs_contain("unknown week type"));
    }

    #[tracing_test::traced_test]
    #[test]
    fn permanent_shadowing_is_logged() {
        let cell = group_cell(
            &[
                rec("Math", WeekType::Permanent, "A"),
                rec("Art", WeekType::Upper, "B"),
            ],
            GroupingView::Room,
        );
        assert_eq!(cell.kind(), CellKind::Single);
        assert!(logs_contain("shadows alternating-week"));
    }
}
