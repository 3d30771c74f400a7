//! Attendance roll-ups over a date range.
//!
//! All aggregation is a linear scan over the already-filtered record set;
//! nothing here touches the database.

use crate::model::attendance::{AttendanceRecord, AttendanceStatus};
use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AttendanceSummary {
    pub total_days: i64,
    /// Days in range minus active holidays.
    pub working_days: i64,
    pub present_days: i64,
    pub absent_days: i64,
    pub late_days: i64,
    /// (present + late) / working_days, as a percentage, 2dp. Zero when
    /// there are no working days.
    pub attendance_percentage: f64,
    #[schema(example = "08:52:30", value_type = Option<String>)]
    pub average_check_in_time: Option<NaiveTime>,
    /// Sum of checked-in-and-out durations, formatted `H:MM:SS`.
    pub total_hours_worked: String,
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Roll one user's records in [start, end] up into a summary.
/// `holidays_in_range` is the count of active holidays in the same range.
pub fn summarize(
    start: NaiveDate,
    end: NaiveDate,
    holidays_in_range: i64,
    records: &[AttendanceRecord],
) -> AttendanceSummary {
    let total_days = (end - start).num_days() + 1;
    let working_days = total_days - holidays_in_range;

    let mut present_days = 0i64;
    let mut absent_days = 0i64;
    let mut late_days = 0i64;
    let mut check_in_seconds = 0i64;
    let mut check_in_count = 0i64;
    let mut worked_seconds = 0i64;

    for record in records {
        match record.status {
            AttendanceStatus::Present => present_days += 1,
            AttendanceStatus::Absent => absent_days += 1,
            AttendanceStatus::Late => late_days += 1,
        }

        if let Some(check_in) = record.check_in_time {
            check_in_seconds += i64::from(check_in.time().num_seconds_from_midnight());
            check_in_count += 1;
        }

        if let Some(duration) = record.duration() {
            worked_seconds += duration.num_seconds();
        }
    }

    let attendance_percentage = if working_days > 0 {
        round2((present_days + late_days) as f64 / working_days as f64 * 100.0)
    } else {
        0.0
    };

    // Mean of seconds-since-midnight. Not meaningful for shifts that
    // cross midnight; no circular mean is attempted.
    let average_check_in_time = if check_in_count > 0 {
        NaiveTime::from_num_seconds_from_midnight_opt(
            (check_in_seconds / check_in_count) as u32,
            0,
        )
    } else {
        None
    };

    AttendanceSummary {
        total_days,
        working_days,
        present_days,
        absent_days,
        late_days,
        attendance_percentage,
        average_check_in_time,
        total_hours_worked: format_duration(worked_seconds),
    }
}

/// Unweighted mean of per-user percentages, 2dp; zero for an empty cohort.
pub fn cohort_average(percentages: &[f64]) -> f64 {
    if percentages.is_empty() {
        return 0.0;
    }
    round2(percentages.iter().sum::<f64>() / percentages.len() as f64)
}

fn format_duration(total_seconds: i64) -> String {
    let seconds = total_seconds.max(0);
    format!(
        "{}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::AttendanceStatus;
    use chrono::{NaiveDateTime, Utc};

    fn record(
        day: u32,
        status: AttendanceStatus,
        check_in: Option<(u32, u32)>,
        check_out: Option<(u32, u32)>,
    ) -> AttendanceRecord {
        let date = NaiveDate::from_ymd_opt(2026, 1, day).unwrap();
        let stamp = |hm: (u32, u32)| -> NaiveDateTime {
            date.and_hms_opt(hm.0, hm.1, 0).unwrap()
        };
        AttendanceRecord {
            id: u64::from(day),
            user_id: 1,
            date,
            check_in_time: check_in.map(stamp),
            check_out_time: check_out.map(stamp),
            status,
            marked_by_face: false,
            confidence_score: None,
            location: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn range() -> (NaiveDate, NaiveDate) {
        (
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
        )
    }

    #[test]
    fn january_scenario_from_the_reporting_contract() {
        // 31 days, 2 holidays, 20 present + 2 late -> 22/29 ~= 75.86%.
        let mut records = Vec::new();
        for day in 1..=20 {
            records.push(record(day, AttendanceStatus::Present, Some((8, 30)), None));
        }
        records.push(record(21, AttendanceStatus::Late, Some((9, 30)), None));
        records.push(record(22, AttendanceStatus::Late, Some((9, 45)), None));

        let (start, end) = range();
        let summary = summarize(start, end, 2, &records);

        assert_eq!(summary.total_days, 31);
        assert_eq!(summary.working_days, 29);
        assert_eq!(summary.present_days, 20);
        assert_eq!(summary.late_days, 2);
        assert_eq!(summary.absent_days, 0);
        assert!((summary.attendance_percentage - 75.86).abs() < 1e-9);
    }

    #[test]
    fn zero_working_days_yields_zero_percent() {
        let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
        // every day in range is a holiday
        let summary = summarize(start, end, 2, &[]);
        assert_eq!(summary.working_days, 0);
        assert_eq!(summary.attendance_percentage, 0.0);
        assert!(summary.attendance_percentage.is_finite());
    }

    #[test]
    fn worked_hours_skip_open_records() {
        let records = vec![
            record(1, AttendanceStatus::Present, Some((9, 0)), Some((17, 0))),
            record(2, AttendanceStatus::Present, Some((9, 0)), None),
            record(3, AttendanceStatus::Absent, None, None),
        ];
        let (start, end) = range();
        let summary = summarize(start, end, 0, &records);
        assert_eq!(summary.total_hours_worked, "8:00:00");
    }

    #[test]
    fn average_check_in_is_the_mean_of_times() {
        let records = vec![
            record(1, AttendanceStatus::Present, Some((8, 0)), None),
            record(2, AttendanceStatus::Present, Some((10, 0)), None),
        ];
        let (start, end) = range();
        let summary = summarize(start, end, 0, &records);
        assert_eq!(
            summary.average_check_in_time,
            NaiveTime::from_hms_opt(9, 0, 0)
        );
    }

    #[test]
    fn no_check_ins_means_no_average() {
        let records = vec![record(1, AttendanceStatus::Absent, None, None)];
        let (start, end) = range();
        let summary = summarize(start, end, 0, &records);
        assert_eq!(summary.average_check_in_time, None);
    }

    #[test]
    fn cohort_average_handles_empty_population() {
        assert_eq!(cohort_average(&[]), 0.0);
        assert_eq!(cohort_average(&[100.0, 50.0]), 75.0);
        assert_eq!(cohort_average(&[75.86, 100.0, 0.0]), 58.62);
    }
}
