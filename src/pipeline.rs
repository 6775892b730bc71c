//! Pipeline orchestration
//!
//! This module provides the public API for Synheart HRV. It runs readings
//! through the full pipeline and turns the results into reports:
//! ingestion → IBI conversion → windowing → feature computation →
//! bucketing / hourly aggregation → weekly patterns.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::{debug, info};

use crate::bucketing::{bucketize, summarize_buckets, SummaryMetrics, TimeBucket};
use crate::calendar::{day_bounds, resolve_local};
use crate::config::{AnalyzerConfig, RangeKind};
use crate::error::ComputeError;
use crate::features::{extract_feature_records, HrvFeatureComputer, StandardFeatureComputer};
use crate::hourly::{hourly_means, DayHourly};
use crate::ibi::to_ibi_samples;
use crate::report::{DateRangeReport, DayReport, RangeReport, ReportEncoder};
use crate::source::{ingest, parse_readings, HeartRateReading, InMemorySampleSource, SampleSource};
use crate::types::{FeatureRecord, RawSample};
use crate::weekly::{WeeklyAnalyzer, WeeklySummary};
use crate::windowing::WindowAggregator;

/// User id attached to readings passed in directly rather than fetched
const LOCAL_USER: &str = "local";

/// Bucketed result of one range analysis, before report assembly
#[derive(Debug, Clone, PartialEq)]
pub struct RangeAnalysis {
    pub time_series: Vec<TimeBucket>,
    pub summary_metrics: SummaryMetrics,
    pub patterns: Option<WeeklySummary>,
}

/// Stateless HRV analyzer bound to one configuration.
///
/// The configuration and feature computer are read-only, so one analyzer can
/// serve any number of independent requests.
pub struct HrvAnalyzer {
    config: AnalyzerConfig,
    computer: Box<dyn HrvFeatureComputer>,
    encoder: ReportEncoder,
    weekly: WeeklyAnalyzer,
}

impl Default for HrvAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl HrvAnalyzer {
    /// Create an analyzer with default settings
    pub fn new() -> Self {
        Self {
            config: AnalyzerConfig::default(),
            computer: Box::new(StandardFeatureComputer::default()),
            encoder: ReportEncoder::new(),
            weekly: WeeklyAnalyzer::default(),
        }
    }

    /// Create an analyzer with a validated configuration
    pub fn with_config(config: AnalyzerConfig) -> Result<Self, ComputeError> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new()
        })
    }

    /// Replace the feature computer
    pub fn with_feature_computer(mut self, computer: Box<dyn HrvFeatureComputer>) -> Self {
        self.computer = computer;
        self
    }

    /// Use a fixed producer instance id
    pub fn with_instance_id(mut self, instance_id: String) -> Self {
        self.encoder = ReportEncoder::with_instance_id(instance_id);
        self
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn instance_id(&self) -> &str {
        self.encoder.instance_id()
    }

    /// Run samples through IBI conversion, windowing and feature computation
    pub fn feature_records(&self, samples: &[RawSample]) -> Vec<FeatureRecord> {
        // Stage 1: bpm to inter-beat intervals
        let ibis = to_ibi_samples(samples);

        // Stage 2: minute grid and fixed windows
        let windows = WindowAggregator::new(self.config.window_minutes).aggregate(&ibis);

        // Stage 3: per-window HRV features
        let records = extract_feature_records(&windows, self.computer.as_ref());

        debug!(
            samples = samples.len(),
            windows = windows.len(),
            records = records.len(),
            "computed feature records"
        );
        records
    }

    /// Bucket records at the range's resolution and add weekly patterns
    /// when the range covers more than one day
    pub fn analyze_records(&self, records: &[FeatureRecord], range: RangeKind) -> RangeAnalysis {
        let resolution = self.config.resolutions.lookup(range);

        let time_series = bucketize(records, resolution);
        let summary_metrics = summarize_buckets(&time_series);
        let patterns = resolution
            .spans_multiple_days()
            .then(|| self.weekly.create_weekly_summary(records));

        RangeAnalysis {
            time_series,
            summary_metrics,
            patterns,
        }
    }

    /// Start of the lookback period for `range`, in UTC.
    ///
    /// The lookback is taken on the local wall clock, so "7d" always means
    /// the same local time seven days earlier.
    pub fn lookback_start(&self, range: RangeKind, now: DateTime<Utc>) -> DateTime<Utc> {
        let tz = self.config.timezone;
        let days = i64::from(self.config.resolutions.lookup(range).lookback_days);
        let now_local = now.with_timezone(&tz);
        resolve_local(&tz, now_local.naive_local() - Duration::days(days)).with_timezone(&Utc)
    }

    /// Range report for a user over one of the fixed lookback ranges
    pub fn range_report(
        &self,
        source: &dyn SampleSource,
        user_id: &str,
        range: RangeKind,
        now: DateTime<Utc>,
    ) -> Result<RangeReport, ComputeError> {
        let start = self.lookback_start(range, now);
        let readings = source.fetch_heart_rate(user_id, start)?;
        if readings.is_empty() {
            return Err(ComputeError::NoData(
                "No heart rate data for selected range.".to_string(),
            ));
        }

        let samples = ingest(&readings, &self.config.timezone);
        let records = self.feature_records(&samples);
        if records.is_empty() {
            return Err(ComputeError::NoData(
                "Insufficient heart rate data to form analysis windows.".to_string(),
            ));
        }

        let analysis = self.analyze_records(&records, range);
        info!(
            user_id,
            range = %range,
            readings = readings.len(),
            buckets = analysis.time_series.len(),
            "range report computed"
        );

        Ok(self.encoder.range_report(
            user_id,
            range,
            self.config.timezone.name(),
            now,
            analysis.summary_metrics,
            analysis.time_series,
            analysis.patterns,
        ))
    }

    /// Hourly report for one local calendar day
    pub fn day_report(
        &self,
        source: &dyn SampleSource,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<DayReport, ComputeError> {
        let tz = self.config.timezone;
        let (start, end) = day_bounds(&tz, date);

        let readings = source.fetch_heart_rate(user_id, start.with_timezone(&Utc))?;
        if readings.is_empty() {
            return Err(ComputeError::NoData(
                "No heart rate data for this day.".to_string(),
            ));
        }

        let samples: Vec<RawSample> = ingest(&readings, &tz)
            .into_iter()
            .filter(|s| s.timestamp >= start && s.timestamp < end)
            .collect();
        if samples.is_empty() {
            return Err(ComputeError::NoData(
                "No samples inside specified day.".to_string(),
            ));
        }

        let day = self.day_hourly(date, &samples);
        if !day.has_data() {
            return Err(ComputeError::NoData(
                "Insufficient HR data for hourly HRV.".to_string(),
            ));
        }
        Ok(DayReport::new(user_id, day))
    }

    /// Per-day hourly reports for an inclusive local date range.
    ///
    /// Each day runs through its own pipeline; days without data appear
    /// with an empty hourly list.
    pub fn date_range_report(
        &self,
        source: &dyn SampleSource,
        user_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<DateRangeReport, ComputeError> {
        if end_date < start_date {
            return Err(ComputeError::InvalidRange(
                "end_date must be >= start_date.".to_string(),
            ));
        }
        let total_days = (end_date - start_date).num_days() + 1;
        if total_days > i64::from(self.config.max_range_days) {
            return Err(ComputeError::InvalidRange(format!(
                "Date range cannot exceed {} days.",
                self.config.max_range_days
            )));
        }

        let tz = self.config.timezone;
        let (range_start, _) = day_bounds(&tz, start_date);
        let (_, range_end) = day_bounds(&tz, end_date);

        let readings = source.fetch_heart_rate(user_id, range_start.with_timezone(&Utc))?;
        if readings.is_empty() {
            return Err(ComputeError::NoData(
                "No heart rate data for selected range.".to_string(),
            ));
        }

        let samples: Vec<RawSample> = ingest(&readings, &tz)
            .into_iter()
            .filter(|s| s.timestamp >= range_start && s.timestamp < range_end)
            .collect();
        if samples.is_empty() {
            return Err(ComputeError::NoData(
                "No samples inside specified date range.".to_string(),
            ));
        }

        let days: Vec<DayHourly> = start_date
            .iter_days()
            .take_while(|date| *date <= end_date)
            .map(|date| {
                let (start, end) = day_bounds(&tz, date);
                let day_samples: Vec<RawSample> = samples
                    .iter()
                    .filter(|s| s.timestamp >= start && s.timestamp < end)
                    .cloned()
                    .collect();
                self.day_hourly(date, &day_samples)
            })
            .collect();

        Ok(DateRangeReport::new(user_id, start_date, end_date, days))
    }

    fn day_hourly(&self, date: NaiveDate, samples: &[RawSample]) -> DayHourly {
        if samples.is_empty() {
            return DayHourly::empty(date);
        }
        DayHourly::new(date, hourly_means(&self.feature_records(samples)))
    }
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(value: &str) -> Result<NaiveDate, ComputeError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| ComputeError::DateParseError(value.to_string()))
}

/// Build a range report from a JSON/NDJSON reading payload.
///
/// # Arguments
/// * `readings` - JSON array or NDJSON of `{timestamp, bpm}` readings
/// * `range` - One of `1d`, `7d`, `30d`, `6m`
/// * `config` - Analyzer configuration (timezone, window width)
/// * `now` - Reference time the lookback is measured from
pub fn readings_to_range_report(
    readings: &str,
    range: &str,
    config: AnalyzerConfig,
    now: DateTime<Utc>,
) -> Result<RangeReport, ComputeError> {
    let range: RangeKind = range.parse()?;
    let source = local_source(parse_readings(readings)?);
    HrvAnalyzer::with_config(config)?.range_report(&source, LOCAL_USER, range, now)
}

/// Build a single-day hourly report from a JSON/NDJSON reading payload
pub fn readings_to_day_report(
    readings: &str,
    date: &str,
    config: AnalyzerConfig,
) -> Result<DayReport, ComputeError> {
    let date = parse_date(date)?;
    let source = local_source(parse_readings(readings)?);
    HrvAnalyzer::with_config(config)?.day_report(&source, LOCAL_USER, date)
}

/// Build a date-range report from a JSON/NDJSON reading payload
pub fn readings_to_date_range_report(
    readings: &str,
    start_date: &str,
    end_date: &str,
    config: AnalyzerConfig,
) -> Result<DateRangeReport, ComputeError> {
    let start = parse_date(start_date)?;
    let end = parse_date(end_date)?;
    let source = local_source(parse_readings(readings)?);
    HrvAnalyzer::with_config(config)?.date_range_report(&source, LOCAL_USER, start, end)
}

fn local_source(readings: Vec<HeartRateReading>) -> InMemorySampleSource {
    InMemorySampleSource::new().with_readings(LOCAL_USER, readings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FeatureExtraction;
    use chrono::{FixedOffset, TimeZone};
    use chrono_tz::America::New_York;

    struct BrokenComputer;

    impl HrvFeatureComputer for BrokenComputer {
        fn compute(&self, _ibi_values: &[f64]) -> Result<FeatureExtraction, ComputeError> {
            Err(ComputeError::FeatureError("unavailable".to_string()))
        }
    }

    fn est() -> FixedOffset {
        FixedOffset::west_opt(5 * 3600).unwrap()
    }

    /// One reading per minute with a small oscillation around `base` bpm
    fn make_readings(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minutes: u32,
        base: f64,
    ) -> Vec<HeartRateReading> {
        let start = est().with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap();
        (0..minutes)
            .map(|i| {
                let bpm = base + [0.0, 3.0, -2.0, 4.0, -3.0][(i % 5) as usize];
                HeartRateReading::new(start + Duration::minutes(i64::from(i)), bpm)
            })
            .collect()
    }

    fn make_source(readings: Vec<HeartRateReading>) -> InMemorySampleSource {
        InMemorySampleSource::new().with_readings("user-1", readings)
    }

    fn now() -> DateTime<Utc> {
        // 2024-01-20 12:00 EST
        Utc.with_ymd_and_hms(2024, 1, 20, 17, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2024-03-09").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
        );
        assert!(matches!(
            parse_date("03/09/2024"),
            Err(ComputeError::DateParseError(_))
        ));
    }

    #[test]
    fn test_lookback_uses_local_wall_clock() {
        let analyzer = HrvAnalyzer::new();
        let start = analyzer.lookback_start(RangeKind::SevenDays, now());
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 1, 13, 17, 0, 0).unwrap());

        // crossing spring-forward keeps 12:00 local, so only 6d 23h elapse
        let after_dst = Utc.with_ymd_and_hms(2024, 3, 12, 16, 0, 0).unwrap();
        let start = analyzer.lookback_start(RangeKind::SevenDays, after_dst);
        assert_eq!((after_dst - start).num_hours(), 7 * 24 - 1);
    }

    #[test]
    fn test_one_day_report_has_no_patterns() {
        let source = make_source(make_readings(2024, 1, 20, 8, 60, 70.0));
        let report = HrvAnalyzer::new()
            .range_report(&source, "user-1", RangeKind::OneDay, now())
            .unwrap();

        assert!(report.patterns.is_none());
        assert_eq!(report.time_series[0].label, "2024-01-20 08:00");
        assert!(report.summary_metrics.rmssd_mean.is_some());
        assert_eq!(report.timezone, "America/New_York");
    }

    #[test]
    fn test_seven_day_report_has_patterns() {
        let mut readings = make_readings(2024, 1, 15, 8, 30, 70.0);
        readings.extend(make_readings(2024, 1, 17, 20, 30, 60.0));
        let source = make_source(readings);

        let report = HrvAnalyzer::new()
            .range_report(&source, "user-1", RangeKind::SevenDays, now())
            .unwrap();

        // the gap between the two sessions is filled by interpolation
        let labels: Vec<&str> = report.time_series.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["2024-01-15", "2024-01-16", "2024-01-17"]);
        let patterns = report.patterns.unwrap();
        assert_eq!(patterns.most_stressful_weekdays.len(), 3);
    }

    #[test]
    fn test_range_without_data_is_no_data() {
        let source = make_source(make_readings(2023, 6, 1, 8, 30, 70.0));
        let err = HrvAnalyzer::new()
            .range_report(&source, "user-1", RangeKind::ThirtyDays, now())
            .unwrap_err();
        assert!(err.is_no_data());
    }

    #[test]
    fn test_broken_computer_yields_empty_series() {
        let source = make_source(make_readings(2024, 1, 20, 8, 30, 70.0));
        let analyzer = HrvAnalyzer::new().with_feature_computer(Box::new(BrokenComputer));

        // every record is all-null, so no bucket survives
        let report = analyzer
            .range_report(&source, "user-1", RangeKind::OneDay, now())
            .unwrap();
        assert!(report.time_series.is_empty());
        assert!(report.summary_metrics.is_empty());
    }

    #[test]
    fn test_day_report_restricts_to_local_day() {
        let mut readings = make_readings(2024, 1, 15, 9, 45, 70.0);
        // 23:00 EST on the 14th must not leak into the 15th
        readings.extend(make_readings(2024, 1, 14, 23, 20, 90.0));
        let source = make_source(readings);

        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let report = HrvAnalyzer::new().day_report(&source, "user-1", date).unwrap();

        assert_eq!(report.date, date);
        assert_eq!(report.hours_available, 1);
        assert_eq!(report.hourly[0].hour, 9);
    }

    #[test]
    fn test_day_report_without_samples() {
        let source = make_source(make_readings(2024, 1, 16, 9, 30, 70.0));
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let err = HrvAnalyzer::new().day_report(&source, "user-1", date).unwrap_err();
        assert!(matches!(err, ComputeError::NoData(msg) if msg.contains("inside")));
    }

    #[test]
    fn test_date_range_report() {
        let mut readings = make_readings(2024, 1, 15, 9, 30, 70.0);
        readings.extend(make_readings(2024, 1, 17, 14, 30, 65.0));
        let source = make_source(readings);

        let start = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 17).unwrap();
        let report = HrvAnalyzer::new()
            .date_range_report(&source, "user-1", start, end)
            .unwrap();

        assert_eq!(report.total_days, 3);
        assert_eq!(report.days_with_data, 2);
        assert_eq!(report.days[1].hours_available, 0);
        assert_eq!(report.days[2].hourly[0].hour, 14);
    }

    #[test]
    fn test_date_range_validation() {
        let source = make_source(Vec::new());
        let analyzer = HrvAnalyzer::new();
        let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();

        let backwards = analyzer.date_range_report(&source, "user-1", day(10), day(9));
        assert!(matches!(backwards, Err(ComputeError::InvalidRange(_))));

        let too_long = analyzer.date_range_report(
            &source,
            "user-1",
            day(1),
            NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
        );
        assert!(matches!(too_long, Err(ComputeError::InvalidRange(_))));

        let empty = analyzer.date_range_report(&source, "user-1", day(1), day(2));
        assert!(matches!(empty, Err(ComputeError::NoData(_))));
    }

    #[test]
    fn test_readings_to_range_report() {
        let json = serde_json::to_string(&make_readings(2024, 1, 20, 8, 30, 70.0)).unwrap();
        let config = AnalyzerConfig::default();

        let report = readings_to_range_report(&json, "1d", config.clone(), now()).unwrap();
        assert_eq!(report.range, RangeKind::OneDay);

        let bad = readings_to_range_report(&json, "2w", config, now());
        assert!(matches!(bad, Err(ComputeError::UnknownRange(_))));
    }

    #[test]
    fn test_window_width_from_config() {
        let samples = ingest(&make_readings(2024, 1, 20, 8, 30, 70.0), &New_York);
        let narrow = HrvAnalyzer::with_config(AnalyzerConfig::default().window_minutes(5)).unwrap();
        assert_eq!(narrow.feature_records(&samples).len(), 6);
        assert_eq!(HrvAnalyzer::new().feature_records(&samples).len(), 2);
    }
}
