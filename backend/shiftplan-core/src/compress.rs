// src/compress.rs
//! Compaction of per-day assignments into contiguous ranges for display.
//!
//! A range only summarizes; hours per day must always come from the original
//! entries, never be re-derived from a range.
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io;

use crate::calendar::{days_inclusive, shift_hours};
use crate::store::ScheduleEntry;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedDay {
    pub employee_id: String,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
}

impl From<&ScheduleEntry> for AssignedDay {
    fn from(entry: &ScheduleEntry) -> Self {
        Self {
            employee_id: entry.employee_id.clone(),
            date: entry.date,
            start_time: entry.start_time.clone(),
            end_time: entry.end_time.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedRange {
    pub employee_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
}

impl AssignedRange {
    fn open(day: &AssignedDay) -> Self {
        Self {
            employee_id: day.employee_id.clone(),
            start_date: day.date,
            end_date: day.date,
            start_time: day.start_time.clone(),
            end_time: day.end_time.clone(),
        }
    }

    fn extends_with(&self, day: &AssignedDay) -> bool {
        self.start_time == day.start_time
            && self.end_time == day.end_time
            && self.end_date.succ_opt() == Some(day.date)
    }

    /// Days covered; for labels only.
    pub fn day_count(&self) -> i64 {
        days_inclusive(self.start_date, self.end_date)
    }

    pub fn label(&self) -> String {
        let days = self.day_count();
        let dates = if self.start_date == self.end_date {
            self.start_date.to_string()
        } else {
            format!("{}..{}", self.start_date, self.end_date)
        };
        format!(
            "{} {}-{} ({} {})",
            dates,
            self.start_time,
            self.end_time,
            days,
            if days == 1 { "day" } else { "days" }
        )
    }
}

/// Groups assignments into maximal runs of consecutive days with identical hours.
///
/// Employees keep their order of first appearance; each employee's ranges are
/// chronological.
pub fn compress(entries: &[AssignedDay]) -> Vec<AssignedRange> {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<&AssignedDay>> = HashMap::new();
    for entry in entries {
        let group = groups.entry(entry.employee_id.as_str()).or_insert_with(|| {
            order.push(entry.employee_id.as_str());
            Vec::new()
        });
        group.push(entry);
    }

    let mut ranges = Vec::new();
    for employee_id in order {
        let Some(mut days) = groups.remove(employee_id) else {
            continue;
        };
        days.sort_by_key(|day| day.date);

        let mut current: Option<AssignedRange> = None;
        for day in days {
            if let Some(range) = current.as_mut() {
                if range.extends_with(day) {
                    range.end_date = day.date;
                    continue;
                }
            }
            if let Some(done) = current.replace(AssignedRange::open(day)) {
                ranges.push(done);
            }
        }
        ranges.extend(current);
    }
    ranges
}

#[derive(Debug, Serialize)]
struct RangeRow<'a> {
    employee_id: &'a str,
    start_date: NaiveDate,
    end_date: NaiveDate,
    start_time: &'a str,
    end_time: &'a str,
    days: i64,
    hours_per_day: Option<String>,
}

/// Writes ranges as CSV for table export.
pub fn write_ranges_csv<W: io::Write>(writer: W, ranges: &[AssignedRange]) -> Result<(), csv::Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for range in ranges {
        csv_writer.serialize(RangeRow {
            employee_id: &range.employee_id,
            start_date: range.start_date,
            end_date: range.end_date,
            start_time: &range.start_time,
            end_time: &range.end_time,
            days: range.day_count(),
            hours_per_day: shift_hours(&range.start_time, &range.end_time).map(|h| h.normalize().to_string()),
        })?;
    }
    csv_writer.flush()?;
    Ok(())
}
