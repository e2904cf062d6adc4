#![forbid(unsafe_code)]

//! Command-line argument parsing for `rozklad-grid`.
//!
//! Parses args manually. Supports environment variable overrides via the
//! `ROZKLAD_GRID_*` prefix.

use std::env;
use std::path::PathBuf;
use std::process;

use rozklad::logging::LogFormat;
use rozklad::timetable::GroupingView;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const HELP_TEXT: &str = "\
rozklad-grid: print a grouped room or teacher timetable

USAGE:
    rozklad-grid [OPTIONS] FILE

    FILE is an occupancy JSON document ({\"days\": [...]} or
    {\"data\": {\"days\": [...]}}). Use '-' to read stdin.

OPTIONS:
    --view=VIEW          Grouping view: 'room' (default) or 'teacher'
    --width=N            Column width for cell text (default: 40)
    --config=PATH        JSON config file (labels, tuning)
    --log-format=FMT     Log output: 'text' (default) or 'json'
    --help, -h           Show this help message
    --version, -V        Show version

ENVIRONMENT VARIABLES:
    ROZKLAD_GRID_VIEW         Override --view
    ROZKLAD_GRID_WIDTH        Override --width
    ROZKLAD_LOG_FORMAT        Override --log-format
    ROZKLAD_LOG               Log filter directives (default: warn)
    ROZKLAD_LOCALE_FILE       JSON file with 'select' and 'timetable' labels";

/// Parsed command-line options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opts {
    /// Occupancy file, or `-` for stdin.
    pub input: PathBuf,
    /// Which timetable the file describes.
    pub view: GroupingView,
    /// Column width for cell text.
    pub width: usize,
    /// Optional config file.
    pub config: Option<PathBuf>,
    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            input: PathBuf::from("-"),
            view: GroupingView::Room,
            width: 40,
            config: None,
            log_format: LogFormat::Text,
        }
    }
}

/// What the command line asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    Run(Opts),
    Help,
    Version,
}

fn parse_view(val: &str) -> Option<GroupingView> {
    match val {
        "room" => Some(GroupingView::Room),
        "teacher" => Some(GroupingView::Teacher),
        _ => None,
    }
}

impl Opts {
    /// Parse process arguments and environment, exiting on `--help`,
    /// `--version` or bad input.
    pub fn parse() -> Self {
        let args: Vec<String> = env::args().skip(1).collect();
        match Self::parse_from(&args, |key| env::var(key).ok()) {
            Ok(Parsed::Run(opts)) => opts,
            Ok(Parsed::Help) => {
                println!("{HELP_TEXT}");
                process::exit(0);
            }
            Ok(Parsed::Version) => {
                println!("rozklad-grid {VERSION}");
                process::exit(0);
            }
            Err(msg) => {
                eprintln!("{msg}");
                eprintln!("Run with --help for usage information.");
                process::exit(1);
            }
        }
    }

    /// Parse `args` with `lookup` as the environment.
    ///
    /// Environment values override defaults; flags override both.
    pub fn parse_from<F>(args: &[String], lookup: F) -> Result<Parsed, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut opts = Self::default();

        if let Some(val) = lookup("ROZKLAD_GRID_VIEW")
            && let Some(view) = parse_view(&val)
        {
            opts.view = view;
        }
        if let Some(val) = lookup("ROZKLAD_GRID_WIDTH")
            && let Ok(n) = val.parse()
        {
            opts.width = n;
        }
        if let Some(val) = lookup("ROZKLAD_LOG_FORMAT")
            && let Some(format) = LogFormat::parse(&val)
        {
            opts.log_format = format;
        }

        let mut input = None;
        for arg in args {
            match arg.as_str() {
                "--help" | "-h" => return Ok(Parsed::Help),
                "--version" | "-V" => return Ok(Parsed::Version),
                other => {
                    if let Some(val) = other.strip_prefix("--view=") {
                        opts.view =
                            parse_view(val).ok_or_else(|| format!("Invalid --view value: {val}"))?;
                    } else if let Some(val) = other.strip_prefix("--width=") {
                        opts.width = val
                            .parse()
                            .map_err(|_| format!("Invalid --width value: {val}"))?;
                    } else if let Some(val) = other.strip_prefix("--config=") {
                        opts.config = Some(PathBuf::from(val));
                    } else if let Some(val) = other.strip_prefix("--log-format=") {
                        opts.log_format = LogFormat::parse(val)
                            .ok_or_else(|| format!("Invalid --log-format value: {val}"))?;
                    } else if other.starts_with("--") {
                        return Err(format!("Unknown argument: {other}"));
                    } else if input.is_some() {
                        return Err(format!("Unexpected extra argument: {other}"));
                    } else {
                        input = Some(PathBuf::from(other));
                    }
                }
            }
        }

        opts.input = input.ok_or_else(|| "Missing FILE argument".to_string())?;
        if opts.width == 0 {
            return Err("--width must be at least 1".to_string());
        }
        Ok(Parsed::Run(opts))
    }
}
