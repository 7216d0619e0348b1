//! Man-hour (HH) calculation: time-window delta × headcount.

use chrono::NaiveTime;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

const SECONDS_PER_HOUR: i64 = 3600;

/// Signed elapsed hours between two same-day times. Negative when `end`
/// precedes `start`.
pub fn duration_hours(start: NaiveTime, end: NaiveTime) -> f64 {
    elapsed_seconds(start, end) as f64 / SECONDS_PER_HOUR as f64
}

/// HH for a window and team size. Inverted windows count as zero.
pub fn man_hours(start: NaiveTime, end: NaiveTime, team_size: usize) -> f64 {
    duration_hours(start, end).max(0.0) * team_size as f64
}

/// Exact HH, unrounded. Inverted windows count as zero.
pub fn man_hours_exact(start: NaiveTime, end: NaiveTime, team_size: usize) -> Decimal {
    let seconds = elapsed_seconds(start, end).max(0);
    Decimal::from(seconds) * Decimal::from(team_size as u64) / Decimal::from(SECONDS_PER_HOUR)
}

/// Exact HH rounded half-up to one decimal place.
pub fn man_hours_decimal(start: NaiveTime, end: NaiveTime, team_size: usize) -> Decimal {
    round_one_decimal(man_hours_exact(start, end, team_size))
}

pub fn round_one_decimal(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
}

/// `12.5`, `0.0`, `3.0`: the form and dashboard display format
pub fn format_hours(value: Decimal) -> String {
    format!("{:.1}", round_one_decimal(value))
}

fn elapsed_seconds(start: NaiveTime, end: NaiveTime) -> i64 {
    end.signed_duration_since(start).num_seconds()
}

/// Summary card shown beside the form
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HhSummary {
    pub duration_hours: Decimal,
    pub team_size: usize,
    pub man_hours: Decimal,
    /// Display string for `man_hours`
    pub display: String,
}

impl HhSummary {
    pub fn compute(start: NaiveTime, end: NaiveTime, team_size: usize) -> Self {
        let man_hours = man_hours_decimal(start, end, team_size);
        Self {
            duration_hours: man_hours_decimal(start, end, 1),
            team_size,
            man_hours,
            display: format_hours(man_hours),
        }
    }
}
