//! Weekly pattern analysis
//!
//! Looks at the un-bucketed feature records of a multi-day query and
//! derives hour-of-day statistics, best and worst hours, and weekday
//! rankings by mean RMSSD (lower RMSSD reads as higher stress).

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::{local_hour, weekday_index, weekday_name};
use crate::stats::{finite_max, finite_min, MetricAccumulator};
use crate::types::{FeatureRecord, Metric};

/// Number of hours reported in the best/worst rankings
pub const DEFAULT_TOP_N: usize = 5;

/// Difficulty labels in rank order
pub const DIFFICULTY_LABELS: [&str; 5] = ["Hardest", "Hard", "Medium", "Easy", "Easiest"];

/// Calendar attributes of one record in the display timezone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemporalContext {
    pub hour: u32,
    /// Monday = 0 … Sunday = 6
    pub weekday: u32,
    pub date: NaiveDate,
    pub is_weekend: bool,
}

impl TemporalContext {
    pub fn of(record: &FeatureRecord) -> Self {
        let weekday = weekday_index(&record.timestamp);
        Self {
            hour: local_hour(&record.timestamp),
            weekday,
            date: record.timestamp.date_naive(),
            is_weekend: weekday >= 5,
        }
    }

    pub fn weekday_name(&self) -> &'static str {
        weekday_name(self.weekday)
    }

    pub fn is_workday(&self) -> bool {
        !self.is_weekend
    }
}

/// Statistics for one hour of the day across all days
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyPattern {
    pub hour: u32,
    pub rmssd_mean: Option<f64>,
    pub rmssd_std: Option<f64>,
    pub rmssd_min: Option<f64>,
    pub rmssd_max: Option<f64>,
    pub rmssd_count: usize,
    pub sdnn_mean: Option<f64>,
    pub sdnn_std: Option<f64>,
    pub mean_hr_mean: Option<f64>,
    pub mean_hr_std: Option<f64>,
    pub lf_hf_ratio_mean: Option<f64>,
    pub lf_hf_ratio_std: Option<f64>,
}

/// An hour ranked by mean RMSSD
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HourRanking {
    pub hour: u32,
    pub avg_rmssd: f64,
}

/// Best or worst hour within one weekday
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekdayHour {
    pub weekday: u32,
    pub weekday_name: String,
    pub hour: u32,
    pub avg_rmssd: f64,
}

/// Weekday ranked by stress (ascending mean RMSSD)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekdayStress {
    pub weekday: u32,
    pub weekday_name: String,
    pub rmssd: f64,
    pub mean_hr: Option<f64>,
    pub lf_hf_ratio: Option<f64>,
    pub stress_rank: usize,
}

/// Monday–Friday ranked by difficulty (ascending mean RMSSD)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkdayDifficulty {
    pub weekday: u32,
    pub weekday_name: String,
    pub rmssd: f64,
    pub mean_hr: Option<f64>,
    pub sdnn: Option<f64>,
    pub difficulty_rank: usize,
    pub difficulty_label: String,
}

/// Everything the weekly analysis produces for a multi-day query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeeklySummary {
    pub hourly_patterns: Vec<HourlyPattern>,
    pub best_hrv_hours: Vec<HourRanking>,
    pub worst_hrv_hours: Vec<HourRanking>,
    pub best_hours_per_weekday: Vec<WeekdayHour>,
    pub worst_hours_per_weekday: Vec<WeekdayHour>,
    pub most_stressful_weekdays: Vec<WeekdayStress>,
    pub workweek_difficulty: Vec<WorkdayDifficulty>,
}

/// Records accumulated by hour, weekday and weekday × hour
#[derive(Debug, Clone, Default)]
pub struct WeeklyGroups {
    by_hour: BTreeMap<u32, MetricAccumulator>,
    by_weekday: BTreeMap<u32, MetricAccumulator>,
    by_weekday_hour: BTreeMap<(u32, u32), MetricAccumulator>,
}

impl WeeklyGroups {
    pub fn from_records(records: &[FeatureRecord]) -> Self {
        let mut groups = Self::default();
        for record in records {
            let ctx = TemporalContext::of(record);
            groups.by_hour.entry(ctx.hour).or_default().push(&record.features);
            groups
                .by_weekday
                .entry(ctx.weekday)
                .or_default()
                .push(&record.features);
            groups
                .by_weekday_hour
                .entry((ctx.weekday, ctx.hour))
                .or_default()
                .push(&record.features);
        }
        groups
    }

    /// Hours with a finite mean RMSSD, ascending by hour
    fn hourly_rmssd(&self) -> Vec<HourRanking> {
        self.by_hour
            .iter()
            .filter_map(|(hour, acc)| {
                acc.mean(Metric::Rmssd).map(|avg_rmssd| HourRanking {
                    hour: *hour,
                    avg_rmssd,
                })
            })
            .collect()
    }

    /// Hours of one weekday with a finite mean RMSSD, ascending by hour
    fn weekday_hourly_rmssd(&self, weekday: u32) -> Vec<HourRanking> {
        self.by_weekday_hour
            .range((weekday, 0)..(weekday + 1, 0))
            .filter_map(|((_, hour), acc)| {
                acc.mean(Metric::Rmssd).map(|avg_rmssd| HourRanking {
                    hour: *hour,
                    avg_rmssd,
                })
            })
            .collect()
    }

    /// Weekdays with a finite mean RMSSD, ascending by weekday
    fn weekdays(&self) -> impl Iterator<Item = (u32, f64, &MetricAccumulator)> {
        self.by_weekday
            .iter()
            .filter_map(|(weekday, acc)| acc.mean(Metric::Rmssd).map(|rmssd| (*weekday, rmssd, acc)))
    }
}

/// Weekly pattern analyzer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklyAnalyzer {
    top_n: usize,
}

impl Default for WeeklyAnalyzer {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
        }
    }
}

impl WeeklyAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override how many hours the best/worst rankings keep
    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    /// Run every weekly analysis over the records
    pub fn create_weekly_summary(&self, records: &[FeatureRecord]) -> WeeklySummary {
        let groups = WeeklyGroups::from_records(records);

        WeeklySummary {
            hourly_patterns: self.hourly_patterns(&groups),
            best_hrv_hours: self.best_hrv_hours(&groups),
            worst_hrv_hours: self.worst_hrv_hours(&groups),
            best_hours_per_weekday: self.best_hours_per_weekday(&groups),
            worst_hours_per_weekday: self.worst_hours_per_weekday(&groups),
            most_stressful_weekdays: self.most_stressful_weekdays(&groups),
            workweek_difficulty: self.workweek_difficulty(&groups),
        }
    }

    pub fn hourly_patterns(&self, groups: &WeeklyGroups) -> Vec<HourlyPattern> {
        groups
            .by_hour
            .iter()
            .filter(|(_, acc)| !acc.is_empty())
            .map(|(hour, acc)| {
                let rmssd = acc.values(Metric::Rmssd);
                HourlyPattern {
                    hour: *hour,
                    rmssd_mean: acc.mean(Metric::Rmssd),
                    rmssd_std: acc.std(Metric::Rmssd),
                    rmssd_min: finite_min(rmssd),
                    rmssd_max: finite_max(rmssd),
                    rmssd_count: rmssd.len(),
                    sdnn_mean: acc.mean(Metric::Sdnn),
                    sdnn_std: acc.std(Metric::Sdnn),
                    mean_hr_mean: acc.mean(Metric::MeanHr),
                    mean_hr_std: acc.std(Metric::MeanHr),
                    lf_hf_ratio_mean: acc.mean(Metric::LfHfRatio),
                    lf_hf_ratio_std: acc.std(Metric::LfHfRatio),
                }
            })
            .collect()
    }

    /// Top hours by mean RMSSD, descending; ties keep hour order
    pub fn best_hrv_hours(&self, groups: &WeeklyGroups) -> Vec<HourRanking> {
        let mut hours = groups.hourly_rmssd();
        hours.sort_by(|a, b| b.avg_rmssd.total_cmp(&a.avg_rmssd));
        hours.truncate(self.top_n);
        hours
    }

    /// Bottom hours by mean RMSSD, ascending; ties keep hour order
    pub fn worst_hrv_hours(&self, groups: &WeeklyGroups) -> Vec<HourRanking> {
        let mut hours = groups.hourly_rmssd();
        hours.sort_by(|a, b| a.avg_rmssd.total_cmp(&b.avg_rmssd));
        hours.truncate(self.top_n);
        hours
    }

    pub fn best_hours_per_weekday(&self, groups: &WeeklyGroups) -> Vec<WeekdayHour> {
        per_weekday_extreme(groups, |candidate, current| candidate > current)
    }

    pub fn worst_hours_per_weekday(&self, groups: &WeeklyGroups) -> Vec<WeekdayHour> {
        per_weekday_extreme(groups, |candidate, current| candidate < current)
    }

    pub fn most_stressful_weekdays(&self, groups: &WeeklyGroups) -> Vec<WeekdayStress> {
        let mut days: Vec<WeekdayStress> = groups
            .weekdays()
            .map(|(weekday, rmssd, acc)| WeekdayStress {
                weekday,
                weekday_name: weekday_name(weekday).to_string(),
                rmssd,
                mean_hr: acc.mean(Metric::MeanHr),
                lf_hf_ratio: acc.mean(Metric::LfHfRatio),
                stress_rank: 0,
            })
            .collect();

        days.sort_by(|a, b| a.rmssd.total_cmp(&b.rmssd));
        for (rank, day) in days.iter_mut().enumerate() {
            day.stress_rank = rank + 1;
        }
        days
    }

    pub fn workweek_difficulty(&self, groups: &WeeklyGroups) -> Vec<WorkdayDifficulty> {
        let mut days: Vec<WorkdayDifficulty> = groups
            .weekdays()
            .filter(|(weekday, _, _)| *weekday < 5)
            .map(|(weekday, rmssd, acc)| WorkdayDifficulty {
                weekday,
                weekday_name: weekday_name(weekday).to_string(),
                rmssd,
                mean_hr: acc.mean(Metric::MeanHr),
                sdnn: acc.mean(Metric::Sdnn),
                difficulty_rank: 0,
                difficulty_label: String::new(),
            })
            .collect();

        days.sort_by(|a, b| a.rmssd.total_cmp(&b.rmssd));
        // at most five workdays, so every rank has a label
        for ((rank, day), label) in days.iter_mut().enumerate().zip(DIFFICULTY_LABELS) {
            day.difficulty_rank = rank + 1;
            day.difficulty_label = label.to_string();
        }
        days
    }
}

/// For each weekday, the first hour whose mean RMSSD wins `better`
fn per_weekday_extreme<F>(groups: &WeeklyGroups, better: F) -> Vec<WeekdayHour>
where
    F: Fn(f64, f64) -> bool,
{
    (0..7)
        .filter_map(|weekday| {
            let hours = groups.weekday_hourly_rmssd(weekday);
            let mut iter = hours.into_iter();
            let first = iter.next()?;
            let chosen = iter.fold(first, |current, candidate| {
                if better(candidate.avg_rmssd, current.avg_rmssd) {
                    candidate
                } else {
                    current
                }
            });
            Some(WeekdayHour {
                weekday,
                weekday_name: weekday_name(weekday).to_string(),
                hour: chosen.hour,
                avg_rmssd: chosen.avg_rmssd,
            })
        })
        .collect()
}
