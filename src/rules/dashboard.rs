//! Dashboard aggregation: status counts and approved man-hours

use std::collections::BTreeMap;

use chrono::Datelike;
use rust_decimal::Decimal;
use serde::Serialize;

use super::man_hours::{man_hours_exact, round_one_decimal};
use crate::models::{AseStatRow, AseStatus};

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Fev", "Mar", "Abr", "Mai", "Jun", "Jul", "Ago", "Set", "Out", "Nov", "Dez",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardStats {
    pub total: usize,
    pub pending: usize,
    /// Approved, sent to HR, or completed
    pub approved: usize,
    pub rejected: usize,
    pub total_hh: Decimal,
    pub monthly_hh: Vec<MonthlyHh>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyHh {
    /// `YYYY-MM`
    pub month: String,
    pub label: &'static str,
    pub hh: Decimal,
}

impl DashboardStats {
    pub fn from_rows(rows: &[AseStatRow]) -> Self {
        let mut stats = DashboardStats {
            total: rows.len(),
            ..Default::default()
        };
        let mut by_month: BTreeMap<(i32, u32), Decimal> = BTreeMap::new();

        for row in rows {
            match row.status {
                AseStatus::Pending => stats.pending += 1,
                AseStatus::Rejected => stats.rejected += 1,
                status if status.counts_as_approved() => stats.approved += 1,
                _ => {}
            }

            if row.status.counts_as_approved() {
                // Unrounded per row so the total does not accumulate rounding error
                let hh = man_hours_exact(row.start_time, row.end_time, row.team_size);
                stats.total_hh += hh;
                *by_month
                    .entry((row.date.year(), row.date.month()))
                    .or_default() += hh;
            }
        }

        stats.total_hh = round_one_decimal(stats.total_hh);
        stats.monthly_hh = by_month
            .into_iter()
            .map(|((year, month), hh)| MonthlyHh {
                month: format!("{:04}-{:02}", year, month),
                label: MONTH_LABELS[(month as usize).saturating_sub(1) % 12],
                hh: round_one_decimal(hh),
            })
            .collect();
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn row(
        status: AseStatus,
        month: u32,
        start: (u32, u32),
        end: (u32, u32),
        team: usize,
    ) -> AseStatRow {
        AseStatRow {
            status,
            date: NaiveDate::from_ymd_opt(2026, month, 10).unwrap(),
            start_time: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
            team_size: team,
        }
    }

    #[test]
    fn test_counts_by_status() {
        let rows = vec![
            row(AseStatus::Draft, 1, (17, 0), (19, 0), 2),
            row(AseStatus::Pending, 1, (17, 0), (19, 0), 2),
            row(AseStatus::Approved, 1, (17, 0), (19, 0), 2),
            row(AseStatus::SentToHr, 2, (17, 0), (18, 30), 4),
            row(AseStatus::Completed, 2, (6, 0), (7, 0), 1),
            row(AseStatus::Rejected, 2, (17, 0), (19, 0), 10),
        ];
        let stats = DashboardStats::from_rows(&rows);
        assert_eq!(stats.total, 6);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.approved, 3);
        assert_eq!(stats.rejected, 1);
        // 2h*2 + 1.5h*4 + 1h*1
        assert_eq!(stats.total_hh, Decimal::from(11));
    }

    #[test]
    fn test_monthly_series_only_counts_approved() {
        let rows = vec![
            row(AseStatus::Approved, 3, (17, 0), (19, 0), 3),
            row(AseStatus::Pending, 3, (17, 0), (19, 0), 3),
            row(AseStatus::Completed, 1, (17, 0), (17, 20), 3),
        ];
        let stats = DashboardStats::from_rows(&rows);
        let months: Vec<_> = stats.monthly_hh.iter().map(|m| (m.label, m.hh)).collect();
        assert_eq!(
            months,
            vec![("Jan", Decimal::from(1)), ("Mar", Decimal::from(6))]
        );
        assert_eq!(stats.monthly_hh[1].month, "2026-03");
    }

    #[test]
    fn test_inverted_window_adds_nothing() {
        let rows = vec![row(AseStatus::Approved, 5, (19, 0), (17, 0), 3)];
        let stats = DashboardStats::from_rows(&rows);
        assert_eq!(stats.approved, 1);
        assert_eq!(stats.total_hh, Decimal::ZERO);
    }

    #[test]
    fn test_empty_dashboard() {
        let stats = DashboardStats::from_rows(&[]);
        assert_eq!(stats, DashboardStats::default());
    }
}
