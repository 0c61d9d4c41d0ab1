use std::ffi::OsStr;
use std::path::PathBuf;

use churnlens_core::DatasetKind;
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Human,
    Json,
}

impl LogFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Human => "human",
            Self::Json => "json",
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            other => Err(format!(
                "invalid log format '{other}', expected one of: human, json"
            )),
        }
    }
}

/// Which hotspot measure sizes the map cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SizeMetric {
    #[default]
    Churn,
    Touches,
}

impl SizeMetric {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Churn => "churn",
            Self::Touches => "touches",
        }
    }
}

impl std::str::FromStr for SizeMetric {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "churn" => Ok(Self::Churn),
            "touches" => Ok(Self::Touches),
            other => Err(format!(
                "invalid size metric '{other}', expected one of: churn, touches"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct AnalyzeArgs {
    #[arg(help = "Repository URL to analyze")]
    pub repository_url: String,

    #[arg(long, help = "Branch to analyze instead of the default branch")]
    pub branch: Option<String>,

    #[arg(long, help = "Upper bound on commits walked by the service")]
    pub max_commits: Option<u32>,

    #[arg(long, help = "Track the run until it succeeds or fails")]
    pub wait: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct StatusArgs {
    #[arg(long, help = "Run to inspect; defaults to the session's active run")]
    pub run_id: Option<String>,

    #[arg(long, help = "Keep polling and print every state change")]
    pub follow: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum SessionAction {
    /// Print the persisted session
    Show,
    /// Forget the selected repository and run
    Clear,
}

#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct ReportArgs {
    #[arg(
        value_parser = parse_dataset_kind,
        help = "Dataset to report on; every dataset when omitted"
    )]
    pub kind: Option<DatasetKind>,

    #[arg(long, help = "Maximum rows in ranked lists")]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Args)]
pub struct SizeMapArgs {
    #[arg(long, default_value_t = 960.0, help = "Canvas width")]
    pub width: f64,

    #[arg(long, default_value_t = 600.0, help = "Canvas height")]
    pub height: f64,

    #[arg(
        long,
        default_value = "churn",
        value_parser = parse_size_metric,
        help = "Hotspot measure used as cell weight: churn or touches"
    )]
    pub metric: SizeMetric,

    #[arg(
        long,
        value_parser = parse_point,
        value_name = "X,Y",
        help = "Print only the file under this canvas point"
    )]
    pub at: Option<Point>,
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Commands {
    /// Submit a repository for analysis and select it in the session
    Analyze(AnalyzeArgs),
    /// Show the status of the active analysis run
    Status(StatusArgs),
    /// Inspect or reset the persisted session
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
    /// Print derived metrics for the session's repository
    Report(ReportArgs),
    /// Lay out the hotspot size map for the session's repository
    Sizemap(SizeMapArgs),
}

#[derive(Debug, Parser)]
#[command(author, version, about = "Git history analytics client")]
pub struct Cli {
    #[arg(
        long,
        global = true,
        default_value = ".",
        help = "Workspace root holding .churnlens/"
    )]
    pub workspace: PathBuf,

    #[arg(
        long,
        global = true,
        default_value = "human",
        value_parser = parse_log_format,
        help = "Log format: human or json"
    )]
    pub log_format: LogFormat,

    #[arg(long, global = true, help = "Log at debug level unless RUST_LOG is set")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

pub fn parse_cli() -> Cli {
    let mut args: Vec<_> = std::env::args_os().collect();
    if args.get(1).is_some_and(|arg| arg == OsStr::new("--")) {
        args.remove(1);
    }

    Cli::parse_from(args)
}

fn parse_log_format(value: &str) -> Result<LogFormat, String> {
    value.parse()
}

fn parse_size_metric(value: &str) -> Result<SizeMetric, String> {
    value.parse()
}

fn parse_dataset_kind(value: &str) -> Result<DatasetKind, String> {
    value.parse()
}

fn parse_point(value: &str) -> Result<Point, String> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| format!("invalid point '{value}', expected X,Y"))?;
    let parse = |part: &str| {
        part.trim()
            .parse::<f64>()
            .ok()
            .filter(|number| number.is_finite())
            .ok_or_else(|| format!("invalid coordinate '{}'", part.trim()))
    };

    Ok(Point {
        x: parse(x)?,
        y: parse(y)?,
    })
}
