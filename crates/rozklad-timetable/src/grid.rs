#![forbid(unsafe_code)]

//! A week of grouped cells for one room or teacher.

use std::collections::{BTreeMap, BTreeSet};

use crate::grouping::{CellContent, GroupingView, group_cell_refs};
use crate::occupancy::{LessonOccupancy, OccupancySchedule};

static EMPTY_CELL: CellContent = CellContent::Empty;

/// (day, hour) coordinate.
pub type Slot = (u32, u32);

/// Grouped cells keyed by slot. Slots without records read as `Empty`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimetableGrid {
    view: GroupingView,
    cells: BTreeMap<Slot, CellContent>,
}

impl TimetableGrid {
    /// Group every slot of a schedule.
    ///
    /// Records for a slot listed more than once are grouped together.
    #[must_use]
    pub fn build(schedule: &OccupancySchedule, view: GroupingView) -> Self {
        let mut by_slot: BTreeMap<Slot, Vec<&LessonOccupancy>> = BTreeMap::new();
        for (day, hour, lessons) in schedule.slots() {
            by_slot.entry((day, hour)).or_default().extend(lessons);
        }
        let cells = by_slot
            .into_iter()
            .map(|(slot, records)| (slot, group_cell_refs(&records, view)))
            .filter(|(_, cell)| *cell != CellContent::Empty)
            .collect();
        Self { view, cells }
    }

    /// View the grid was grouped for.
    #[must_use]
    pub fn view(&self) -> GroupingView {
        self.view
    }

    /// Content of a slot.
    #[must_use]
    pub fn cell(&self, day: u32, hour: u32) -> &CellContent {
        self.cells.get(&(day, hour)).unwrap_or(&EMPTY_CELL)
    }

    /// Non-empty cells in (day, hour) order.
    pub fn occupied(&self) -> impl Iterator<Item = (Slot, &CellContent)> + '_ {
        self.cells.iter().map(|(slot, cell)| (*slot, cell))
    }

    /// Days with at least one lesson.
    #[must_use]
    pub fn days(&self) -> BTreeSet<u32> {
        self.cells.keys().map(|(day, _)| *day).collect()
    }

    /// Hours with at least one lesson on any day.
    #[must_use]
    pub fn hours(&self) -> BTreeSet<u32> {
        self.cells.keys().map(|(_, hour)| *hour).collect()
    }

    /// Whether nothing is scheduled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouping::CellKind;
    use serde_json::json;

    fn schedule() -> OccupancySchedule {
        OccupancySchedule::from_value(json!({"data": {"days": [
            {"dayId": 1, "hours": [
                {"hourId": 1, "lessons": [
                    {"lessonName": "Math", "weekTypeName": "permanent", "groupName": "B"},
                    {"lessonName": "Math", "weekTypeName": "permanent", "groupName": "A"}
                ]},
                {"hourId": 2, "lessons": []}
            ]},
            {"dayId": 3, "hours": [
                {"hourId": 4, "lessons": [
                    {"lessonName": "Art", "weekTypeName": "lower", "groupName": "C"}
                ]}
            ]}
        ]}}))
        .unwrap()
    }

    #[test]
    fn builds_cells_per_slot() {
        let grid = TimetableGrid::build(&schedule(), GroupingView::Room);
        assert_eq!(grid.cell(1, 1).kind(), CellKind::Single);
        assert_eq!(grid.cell(3, 4).kind(), CellKind::Split);
        assert_eq!(grid.cell(1, 2), &CellContent::Empty);
        assert_eq!(grid.cell(5, 5), &CellContent::Empty);
        assert_eq!(grid.days().into_iter().collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(grid.hours().into_iter().collect::<Vec<_>>(), vec![1, 4]);
        assert_eq!(grid.occupied().count(), 2);
    }

    #[test]
    fn merged_groups_survive_grid_build() {
        let grid = TimetableGrid::build(&schedule(), GroupingView::Room);
        let block = grid.cell(1, 1).blocks().next().unwrap();
        assert_eq!(block.groups, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn empty_schedule_is_empty_grid() {
        let grid = TimetableGrid::build(&OccupancySchedule::default(), GroupingView::Teacher);
        assert!(grid.is_empty());
        assert_eq!(grid.view(), GroupingView::Teacher);
    }
}
