//! End-to-end report generation over synthetic heart-rate readings

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::America::New_York;
use pretty_assertions::assert_eq;

use synheart_hrv::config::{AnalyzerConfig, RangeKind};
use synheart_hrv::types::{Metric, RawSample};
use synheart_hrv::{
    readings_to_range_report, HeartRateReading, HrvAnalyzer, InMemorySampleSource,
};

const USER: &str = "user-1";

fn local(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<chrono_tz::Tz> {
    New_York.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

/// One reading per minute starting at `start`, bpm chosen by minute index
fn per_minute(
    start: DateTime<chrono_tz::Tz>,
    minutes: i64,
    bpm: impl Fn(i64) -> f64,
) -> Vec<HeartRateReading> {
    (0..minutes)
        .map(|i| HeartRateReading::new((start + Duration::minutes(i)).fixed_offset(), bpm(i)))
        .collect()
}

fn varied_bpm(i: i64) -> f64 {
    60.0 + (i % 4) as f64
}

#[test]
fn one_day_report_from_json_has_hourly_buckets_and_no_patterns() {
    let readings = per_minute(local(2024, 3, 15, 9, 0), 120, varied_bpm);
    let json = serde_json::to_string(&readings).unwrap();
    let now = local(2024, 3, 15, 12, 0).with_timezone(&Utc);

    let report = readings_to_range_report(&json, "1d", AnalyzerConfig::default(), now).unwrap();

    let labels: Vec<&str> = report.time_series.iter().map(|b| b.label.as_str()).collect();
    assert_eq!(labels, vec!["2024-03-15 09:00", "2024-03-15 10:00"]);
    assert_eq!(report.range, RangeKind::OneDay);
    assert_eq!(report.timezone, "America/New_York");
    assert!(report.summary_metrics.rmssd_mean.is_some());
    assert!(report.patterns.is_none());

    let value = serde_json::to_value(&report).unwrap();
    assert!(value.get("patterns").is_none());
    assert_eq!(value["generated_at"], "2024-03-15T16:00:00Z");
}

#[test]
fn zero_bpm_runs_never_leak_non_finite_metrics() {
    // a whole window of zeros plus scattered zeros elsewhere
    let readings = per_minute(local(2024, 3, 15, 9, 0), 120, |i| {
        if (60..75).contains(&i) || i % 7 == 3 {
            0.0
        } else {
            varied_bpm(i)
        }
    });
    let source = InMemorySampleSource::new().with_readings(USER, readings);
    let now = local(2024, 3, 15, 12, 0).with_timezone(&Utc);

    let report = HrvAnalyzer::new()
        .range_report(&source, USER, RangeKind::OneDay, now)
        .unwrap();

    assert!(!report.time_series.is_empty());
    for bucket in &report.time_series {
        for metric in Metric::TRACKED {
            if let Some(value) = bucket.metrics.get(metric) {
                assert!(value.is_finite(), "{} in {}", value, bucket.label);
            }
        }
    }
    let summary = &report.summary_metrics;
    for value in [
        summary.rmssd_mean,
        summary.sdnn_mean,
        summary.mean_hr,
        summary.lf_hf_ratio_mean,
    ]
    .into_iter()
    .flatten()
    {
        assert!(value.is_finite());
    }
    assert!(serde_json::to_string(&report).is_ok());
}

#[test]
fn workweek_difficulty_ranks_days_by_rmssd() {
    // Alternating beats; a larger swing means a higher RMSSD
    let swing = |day: i64| match day {
        0 => 1.0, // Monday
        1 => 5.0, // Tuesday
        2 => 2.0, // Wednesday
        3 => 6.0, // Thursday
        _ => 3.0, // Friday
    };
    let readings = per_minute(local(2024, 3, 11, 0, 0), 5 * 1440, |i| {
        let alt = if i % 2 == 0 { 0.0 } else { swing(i / 1440) };
        60.0 + alt
    });
    let source = InMemorySampleSource::new().with_readings(USER, readings);
    let now = local(2024, 3, 16, 12, 0).with_timezone(&Utc);

    let report = HrvAnalyzer::new()
        .range_report(&source, USER, RangeKind::SevenDays, now)
        .unwrap();

    assert_eq!(report.time_series.len(), 5);
    let patterns = report.patterns.expect("multi-day ranges carry patterns");

    let difficulty: Vec<(&str, &str)> = patterns
        .workweek_difficulty
        .iter()
        .map(|d| (d.weekday_name.as_str(), d.difficulty_label.as_str()))
        .collect();
    assert_eq!(
        difficulty,
        vec![
            ("Monday", "Hardest"),
            ("Wednesday", "Hard"),
            ("Friday", "Medium"),
            ("Tuesday", "Easy"),
            ("Thursday", "Easiest"),
        ]
    );

    let stress: Vec<usize> = patterns
        .most_stressful_weekdays
        .iter()
        .map(|d| d.stress_rank)
        .collect();
    assert_eq!(stress, vec![1, 2, 3, 4, 5]);
    assert_eq!(patterns.hourly_patterns.len(), 24);
    assert_eq!(patterns.best_hrv_hours.len(), 5);
}

#[test]
fn window_needs_ten_intervals_for_spectral_and_poincare_metrics() {
    let analyzer = HrvAnalyzer::new();
    let samples = |count: i64| -> Vec<RawSample> {
        per_minute(local(2024, 3, 15, 9, 0), count, varied_bpm)
            .into_iter()
            .map(|r| RawSample::new(r.timestamp.with_timezone(&New_York), r.bpm))
            .collect()
    };

    let nine = analyzer.feature_records(&samples(9));
    assert_eq!(nine.len(), 1);
    assert_eq!(nine[0].num_rr_intervals, 9);
    assert!(nine[0].features.has_time_domain());
    assert!(!nine[0].features.has_frequency_domain());
    assert!(!nine[0].features.has_nonlinear());

    let ten = analyzer.feature_records(&samples(10));
    assert_eq!(ten.len(), 1);
    assert_eq!(ten[0].num_rr_intervals, 10);
    assert!(ten[0].features.has_frequency_domain());
    assert!(ten[0].features.has_nonlinear());
}

#[test]
fn date_range_report_keeps_days_without_data() {
    let mut readings = per_minute(local(2024, 3, 11, 8, 0), 60, varied_bpm);
    readings.extend(per_minute(local(2024, 3, 13, 20, 0), 30, varied_bpm));
    let source = InMemorySampleSource::new().with_readings(USER, readings);

    let start = NaiveDate::from_ymd_opt(2024, 3, 11).unwrap();
    let end = NaiveDate::from_ymd_opt(2024, 3, 13).unwrap();
    let report = HrvAnalyzer::new()
        .date_range_report(&source, USER, start, end)
        .unwrap();

    assert_eq!(report.total_days, 3);
    assert_eq!(report.days_with_data, 2);

    let hours: Vec<Vec<u32>> = report
        .days
        .iter()
        .map(|d| d.hourly.iter().map(|h| h.hour).collect())
        .collect();
    assert_eq!(hours, vec![vec![8], vec![], vec![20]]);
    assert_eq!(report.days[1].hours_available, 0);
}
