#![forbid(unsafe_code)]

//! `rozklad-grid` entry point: read occupancy JSON, print grouped cells.

mod cli;

use std::io::{self, Read, Write};
use std::path::Path;
use std::process::ExitCode;

use rozklad::RozkladConfig;
use rozklad::logging;
use rozklad::select::fit_label;
use rozklad::timetable::{OccupancySchedule, TimetableGrid, TimetableLabels, cell_lines};

fn main() -> ExitCode {
    let opts = cli::Opts::parse();
    logging::init("warn", opts.log_format);

    match run(&opts) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            tracing::error!("{msg}");
            eprintln!("rozklad-grid: {msg}");
            ExitCode::FAILURE
        }
    }
}

fn run(opts: &cli::Opts) -> Result<(), String> {
    let mut config = match &opts.config {
        Some(path) => RozkladConfig::load(path).map_err(|e| e.to_string())?,
        None => RozkladConfig::default(),
    };
    config.apply_env().map_err(|e| e.to_string())?;

    let text = read_input(&opts.input).map_err(|e| format!("{}: {e}", opts.input.display()))?;
    let schedule = OccupancySchedule::from_json_str(&text).map_err(|e| e.to_string())?;
    tracing::info!(
        records = schedule.record_count(),
        view = ?opts.view,
        "occupancy loaded"
    );
    let grid = TimetableGrid::build(&schedule, opts.view);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    render_grid(&grid, &config.timetable_labels, opts.width, &mut out).map_err(|e| e.to_string())
}

fn read_input(path: &Path) -> io::Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        std::fs::read_to_string(path)
    }
}

fn render_grid(
    grid: &TimetableGrid,
    labels: &TimetableLabels,
    width: usize,
    out: &mut impl Write,
) -> io::Result<()> {
    if grid.is_empty() {
        return writeln!(out, "{}", labels.empty);
    }
    for ((day, hour), cell) in grid.occupied() {
        writeln!(out, "day {day}, hour {hour}")?;
        for line in cell_lines(cell, labels, grid.view()) {
            writeln!(out, "  {}", fit_label(&line, width))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rozklad::timetable::GroupingView;

    fn render(json: &str, view: GroupingView, width: usize) -> String {
        let schedule = OccupancySchedule::from_json_str(json).unwrap();
        let grid = TimetableGrid::build(&schedule, view);
        let mut out = Vec::new();
        render_grid(&grid, &TimetableLabels::default(), width, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    const SAMPLE: &str = r#"{"days": [{"dayId": 1, "hours": [{"hourId": 2, "lessons": [
        {"lessonName": "Math", "lessonTypeName": "lecture", "teacherName": "Olena",
         "teacherSurname": "Ivanenko", "weekTypeName": "upper", "groupName": "B",
         "roomName": "101", "corpId": 2},
        {"lessonName": "Math", "lessonTypeName": "lecture", "teacherName": "Olena",
         "teacherSurname": "Ivanenko", "weekTypeName": "upper", "groupName": "A",
         "roomName": "101", "corpId": 2}
    ]}]}]}"#;

    #[test]
    fn split_cell_shows_free_half() {
        let text = render(SAMPLE, GroupingView::Room, 40);
        assert!(text.starts_with("day 1, hour 2\n"));
        assert!(text.contains("  Upper week:\n"));
        assert!(text.contains("  A, B\n"));
        assert!(text.contains("  Lower week: free\n"));
    }

    #[test]
    fn lines_are_fitted_to_width() {
        let text = render(SAMPLE, GroupingView::Room, 6);
        for line in text.lines().skip(1) {
            assert!(line.trim_start().chars().count() <= 6, "{line:?}");
        }
    }

    #[test]
    fn empty_schedule_prints_dash() {
        assert_eq!(render(r#"{"days": []}"#, GroupingView::Teacher, 10), "-\n");
    }
}
