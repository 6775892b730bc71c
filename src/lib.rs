//! Synheart HRV - Heart rate variability analytics over heart-rate samples
//!
//! Turns timestamped bpm readings into HRV reports through a deterministic
//! pipeline: IBI conversion → minute grid and windowing → per-window HRV
//! features → calendar bucketing → hour-of-day and weekly pattern analysis.
//!
//! ## Reports
//!
//! - **Range reports** (`1d`, `7d`, `30d`, `6m`): bucketed time series, a
//!   two-stage summary and, for multi-day ranges, weekly patterns
//! - **Day reports**: hour-of-day metrics for one local calendar day
//! - **Date-range reports**: hour-of-day metrics for each day of a range

pub mod bucketing;
pub mod calendar;
pub mod config;
pub mod error;
pub mod features;
pub mod hourly;
pub mod ibi;
pub mod pipeline;
pub mod report;
pub mod source;
pub mod stats;
pub mod types;
pub mod weekly;
pub mod windowing;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use bucketing::{bucketize, summarize_buckets, SummaryMetrics, TimeBucket};
pub use config::{AnalyzerConfig, RangeKind, Resolution, ResolutionTable};
pub use error::ComputeError;
pub use features::{extract_feature_records, HrvFeatureComputer, StandardFeatureComputer};
pub use hourly::{hourly_means, DayHourly, HourlyMetrics};
pub use pipeline::{
    parse_date, readings_to_date_range_report, readings_to_day_report, readings_to_range_report,
    HrvAnalyzer,
};
pub use report::{DateRangeReport, DayReport, RangeReport, ReportEncoder, ReportProducer};
pub use source::{HeartRateReading, InMemorySampleSource, SampleSource};
pub use types::{FeatureRecord, HrvFeatures, IbiSample, RawSample, Window};
pub use weekly::{WeeklyAnalyzer, WeeklySummary};
pub use windowing::WindowAggregator;

/// Crate version embedded in every range report
pub const HRV_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for range reports
pub const PRODUCER_NAME: &str = "synheart-hrv";
