//! HRV CLI - Command-line interface for Synheart HRV
//!
//! Commands:
//! - analyze: Range report (1d, 7d, 30d, 6m) over heart-rate readings
//! - day: Hour-of-day report for one calendar day
//! - days: Per-day hourly reports over a date range
//! - validate: Check readings for degenerate values
//! - ranges: Print the resolution table
//! - doctor: Diagnose configuration and environment

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use synheart_hrv::config::{parse_timezone, AnalyzerConfig, RangeKind};
use synheart_hrv::pipeline::{parse_date, HrvAnalyzer};
use synheart_hrv::source::{
    parse_readings, parse_readings_json, parse_readings_ndjson, validate_readings,
    HeartRateReading, InMemorySampleSource,
};
use synheart_hrv::{ComputeError, HRV_VERSION, PRODUCER_NAME};

/// HRV - Heart rate variability analytics over heart-rate samples
#[derive(Parser)]
#[command(name = "hrv")]
#[command(author = "Synheart AI Inc")]
#[command(version = HRV_VERSION)]
#[command(about = "Compute HRV reports from heart-rate readings", long_about = None)]
struct Cli {
    /// Analyzer configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Display timezone (IANA format, e.g., "America/New_York")
    #[arg(long, global = true)]
    timezone: Option<String>,

    /// Analysis window width in minutes
    #[arg(long, global = true)]
    window_minutes: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Range report over a fixed lookback
    Analyze {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Reporting range
        #[arg(short, long, value_enum)]
        range: RangeArg,

        /// User the readings belong to
        #[arg(long, default_value = "local")]
        user_id: String,

        /// Reference time for the lookback (RFC 3339); defaults to now
        #[arg(long)]
        now: Option<String>,

        /// Input format
        #[arg(long, default_value = "auto")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "json")]
        output_format: OutputFormat,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,
    },

    /// Hour-of-day report for one local calendar day
    Day {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Calendar date (YYYY-MM-DD)
        #[arg(long)]
        date: String,

        #[arg(long, default_value = "local")]
        user_id: String,

        #[arg(long, default_value = "auto")]
        input_format: InputFormat,

        #[arg(long, default_value = "json")]
        output_format: OutputFormat,

        #[arg(short, long, default_value = "-")]
        output: PathBuf,
    },

    /// Per-day hourly reports over an inclusive date range
    Days {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// First day (YYYY-MM-DD)
        #[arg(long)]
        start_date: String,

        /// Last day, inclusive (YYYY-MM-DD)
        #[arg(long)]
        end_date: String,

        #[arg(long, default_value = "local")]
        user_id: String,

        #[arg(long, default_value = "auto")]
        input_format: InputFormat,

        #[arg(long, default_value = "json")]
        output_format: OutputFormat,

        #[arg(short, long, default_value = "-")]
        output: PathBuf,
    },

    /// Check readings for non-positive bpm and out-of-order timestamps
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        #[arg(long, default_value = "auto")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the range resolution table
    Ranges {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum RangeArg {
    #[value(name = "1d")]
    OneDay,
    #[value(name = "7d")]
    SevenDays,
    #[value(name = "30d")]
    ThirtyDays,
    #[value(name = "6m")]
    SixMonths,
}

impl From<RangeArg> for RangeKind {
    fn from(arg: RangeArg) -> Self {
        match arg {
            RangeArg::OneDay => RangeKind::OneDay,
            RangeArg::SevenDays => RangeKind::SevenDays,
            RangeArg::ThirtyDays => RangeKind::ThirtyDays,
            RangeArg::SixMonths => RangeKind::SixMonths,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum InputFormat {
    /// Detect from the first character
    Auto,
    /// Newline-delimited JSON (one reading per line)
    Ndjson,
    /// JSON array of readings
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), HrvCliError> {
    let settings = Settings {
        config: cli.config,
        timezone: cli.timezone,
        window_minutes: cli.window_minutes,
    };

    match cli.command {
        Commands::Analyze {
            input,
            range,
            user_id,
            now,
            input_format,
            output_format,
            output,
        } => cmd_analyze(
            &settings,
            &input,
            range.into(),
            &user_id,
            now.as_deref(),
            input_format,
            output_format,
            &output,
        ),

        Commands::Day {
            input,
            date,
            user_id,
            input_format,
            output_format,
            output,
        } => cmd_day(
            &settings,
            &input,
            &date,
            &user_id,
            input_format,
            output_format,
            &output,
        ),

        Commands::Days {
            input,
            start_date,
            end_date,
            user_id,
            input_format,
            output_format,
            output,
        } => cmd_days(
            &settings,
            &input,
            (start_date.as_str(), end_date.as_str()),
            &user_id,
            input_format,
            output_format,
            &output,
        ),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Ranges { json } => cmd_ranges(&settings, json),

        Commands::Doctor { json } => cmd_doctor(&settings, json),
    }
}

/// Global options that shape the analyzer configuration
struct Settings {
    config: Option<PathBuf>,
    timezone: Option<String>,
    window_minutes: Option<u32>,
}

impl Settings {
    fn analyzer_config(&self) -> Result<AnalyzerConfig, ComputeError> {
        let mut config = match &self.config {
            Some(path) => AnalyzerConfig::load(path)?,
            None => AnalyzerConfig::default(),
        };
        if let Some(timezone) = &self.timezone {
            config.timezone = parse_timezone(timezone)?;
        }
        if let Some(minutes) = self.window_minutes {
            config = config.window_minutes(minutes);
        }
        config.validate()?;
        Ok(config)
    }

    fn analyzer(&self) -> Result<HrvAnalyzer, ComputeError> {
        HrvAnalyzer::with_config(self.analyzer_config()?)
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_analyze(
    settings: &Settings,
    input: &Path,
    range: RangeKind,
    user_id: &str,
    now: Option<&str>,
    input_format: InputFormat,
    output_format: OutputFormat,
    output: &Path,
) -> Result<(), HrvCliError> {
    let now = match now {
        Some(value) => DateTime::parse_from_rfc3339(value.trim())
            .map_err(|e| HrvCliError::InvalidNow(format!("{value}: {e}")))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };

    let source = load_source(input, input_format, user_id)?;
    let report = settings.analyzer()?.range_report(&source, user_id, range, now)?;
    write_output(&report, output_format, output)
}

fn cmd_day(
    settings: &Settings,
    input: &Path,
    date: &str,
    user_id: &str,
    input_format: InputFormat,
    output_format: OutputFormat,
    output: &Path,
) -> Result<(), HrvCliError> {
    let date = parse_date(date)?;
    let source = load_source(input, input_format, user_id)?;
    let report = settings.analyzer()?.day_report(&source, user_id, date)?;
    write_output(&report, output_format, output)
}

fn cmd_days(
    settings: &Settings,
    input: &Path,
    (start_date, end_date): (&str, &str),
    user_id: &str,
    input_format: InputFormat,
    output_format: OutputFormat,
    output: &Path,
) -> Result<(), HrvCliError> {
    let start = parse_date(start_date)?;
    let end = parse_date(end_date)?;
    let source = load_source(input, input_format, user_id)?;
    let report = settings
        .analyzer()?
        .date_range_report(&source, user_id, start, end)?;
    write_output(&report, output_format, output)
}

fn cmd_validate(input: &Path, input_format: InputFormat, json: bool) -> Result<(), HrvCliError> {
    let readings = read_readings(input, input_format)?;
    let issues = validate_readings(&readings);

    let mut invalid: Vec<usize> = issues.iter().map(|issue| issue.index).collect();
    invalid.dedup();

    let report = ValidationReport {
        total_readings: readings.len(),
        valid_readings: readings.len() - invalid.len(),
        invalid_readings: invalid.len(),
        errors: issues
            .iter()
            .map(|issue| ValidationErrorDetail {
                index: issue.index,
                timestamp: issue.timestamp.to_rfc3339(),
                error: issue.error.to_string(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total readings:   {}", report.total_readings);
        println!("Valid readings:   {}", report.valid_readings);
        println!("Invalid readings: {}", report.invalid_readings);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - Reading {} ({}): {}", err.index, err.timestamp, err.error);
            }
        }
    }

    if report.invalid_readings > 0 {
        Err(HrvCliError::ValidationFailed(report.invalid_readings))
    } else {
        Ok(())
    }
}

fn cmd_ranges(settings: &Settings, json: bool) -> Result<(), HrvCliError> {
    let config = settings.analyzer_config()?;
    let rows = config.resolutions.rows();

    if json {
        println!("{}", serde_json::to_string_pretty(rows)?);
    } else {
        println!("{:<6} {:>9}  {:<18} {}", "RANGE", "LOOKBACK", "BUCKET", "LABEL");
        for row in rows {
            let bucket = serde_json::to_value(row.bucket_width)?;
            println!(
                "{:<6} {:>8}d  {:<18} {}",
                row.range.as_str(),
                row.lookback_days,
                bucket.as_str().unwrap_or_default(),
                row.label_format
            );
        }
    }
    Ok(())
}

fn cmd_doctor(settings: &Settings, json: bool) -> Result<(), HrvCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "hrv_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("HRV version {}", HRV_VERSION),
    });

    match settings.analyzer_config() {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Ok,
                message: match &settings.config {
                    Some(path) => format!("Configuration loaded from {}", path.display()),
                    None => "Using default configuration".to_string(),
                },
            });
            checks.push(DoctorCheck {
                name: "timezone".to_string(),
                status: CheckStatus::Ok,
                message: format!(
                    "Display timezone {} with {}-minute windows",
                    config.timezone.name(),
                    config.window_minutes
                ),
            });
        }
        Err(e) => checks.push(DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Error,
            message: e.to_string(),
        }),
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Warning,
            message: "stdin is a TTY; pass readings with --input <file>".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (--input - ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: HRV_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("HRV Doctor Report");
        println!("=================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");
        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(HrvCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Helper functions

fn read_input(input: &Path) -> Result<String, HrvCliError> {
    if input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            return Err(HrvCliError::InteractiveStdin);
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn read_readings(
    input: &Path,
    input_format: InputFormat,
) -> Result<Vec<HeartRateReading>, HrvCliError> {
    let input_data = read_input(input)?;
    let readings = match input_format {
        InputFormat::Auto => parse_readings(&input_data)?,
        InputFormat::Ndjson => parse_readings_ndjson(&input_data)?,
        InputFormat::Json => parse_readings_json(&input_data)?,
    };
    if readings.is_empty() {
        return Err(HrvCliError::NoReadings);
    }
    debug!(readings = readings.len(), "parsed input");
    Ok(readings)
}

fn load_source(
    input: &Path,
    input_format: InputFormat,
    user_id: &str,
) -> Result<InMemorySampleSource, HrvCliError> {
    let readings = read_readings(input, input_format)?;
    Ok(InMemorySampleSource::new().with_readings(user_id, readings))
}

fn write_output<T: Serialize>(
    report: &T,
    format: OutputFormat,
    output: &Path,
) -> Result<(), HrvCliError> {
    let output_data = match format {
        OutputFormat::Json => serde_json::to_string(report)?,
        OutputFormat::JsonPretty => serde_json::to_string_pretty(report)?,
    };

    if output.to_string_lossy() == "-" {
        println!("{}", output_data);
    } else {
        fs::write(output, output_data + "\n")?;
    }
    Ok(())
}

// Error types

#[derive(Debug)]
enum HrvCliError {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    InvalidNow(String),
    NoReadings,
    InteractiveStdin,
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for HrvCliError {
    fn from(e: io::Error) -> Self {
        HrvCliError::Io(e)
    }
}

impl From<ComputeError> for HrvCliError {
    fn from(e: ComputeError) -> Self {
        HrvCliError::Compute(e)
    }
}

impl From<serde_json::Error> for HrvCliError {
    fn from(e: serde_json::Error) -> Self {
        HrvCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<HrvCliError> for CliError {
    fn from(e: HrvCliError) -> Self {
        match e {
            HrvCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            HrvCliError::Compute(e) => compute_error(e),
            HrvCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            HrvCliError::InvalidNow(msg) => CliError {
                code: "INVALID_NOW".to_string(),
                message: format!("Invalid --now value {msg}"),
                hint: Some("Use an RFC 3339 timestamp such as 2024-03-15T12:00:00Z".to_string()),
            },
            HrvCliError::NoReadings => CliError {
                code: "NO_READINGS".to_string(),
                message: "No readings found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            HrvCliError::InteractiveStdin => CliError {
                code: "INTERACTIVE_STDIN".to_string(),
                message: "Refusing to read readings from an interactive terminal".to_string(),
                hint: Some("Pipe readings into stdin or pass --input <file>".to_string()),
            },
            HrvCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} readings failed validation", count),
                hint: Some("Readings with these issues are skipped during analysis".to_string()),
            },
            HrvCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

fn compute_error(e: ComputeError) -> CliError {
    let (code, hint) = match &e {
        ComputeError::ParseError(_) | ComputeError::JsonError(_) => (
            "PARSE_ERROR",
            "Each reading needs an RFC 3339 timestamp and a bpm value",
        ),
        ComputeError::InvalidTimezone(_) => {
            ("INVALID_TIMEZONE", "Use an IANA name such as America/New_York")
        }
        ComputeError::DateParseError(_) => ("INVALID_DATE", "Dates use YYYY-MM-DD"),
        ComputeError::UnknownRange(_) => ("UNKNOWN_RANGE", "Run 'hrv ranges' to list ranges"),
        ComputeError::InvalidRange(_) => ("INVALID_RANGE", "Check --start-date and --end-date"),
        ComputeError::InvalidConfig(_) => ("INVALID_CONFIG", "Run 'hrv doctor' for details"),
        ComputeError::FeatureError(_) => ("FEATURE_ERROR", "Check input readings"),
        ComputeError::NoData(_) => ("NO_DATA", "Widen the range or supply more readings"),
    };
    CliError {
        code: code.to_string(),
        message: e.to_string(),
        hint: Some(hint.to_string()),
    }
}

// Report types

#[derive(Serialize)]
struct ValidationReport {
    total_readings: usize,
    valid_readings: usize,
    invalid_readings: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(Serialize)]
struct ValidationErrorDetail {
    index: usize,
    timestamp: String,
    error: String,
}

#[derive(Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
