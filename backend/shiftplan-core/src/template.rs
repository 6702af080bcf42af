// src/template.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::calendar::months_in_range;
use crate::expander::{expand_with, holiday_window};
use crate::holidays::HolidayLookup;
use crate::schedule_config::{CycleMode, ScheduleConfig, SchedulePattern, WeeklyRotation};
use crate::store::{NewScheduleEntry, ScheduleStore};
use crate::validation::{validate, ConfigIssue};

/// Materializes a config for one employee over `[start_date, end_date]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyRequest {
    pub schedule_id: String,
    pub employee_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// 1-based starting position within the rotation or cycle.
    #[serde(default = "default_position")]
    pub position: usize,
}

fn default_position() -> usize {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedDay {
    pub date: NaiveDate,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyReport {
    pub applied: Vec<NaiveDate>,
    pub skipped: Vec<SkippedDay>,
}

impl ApplyReport {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    #[error("Config '{config_id}' is not valid for application: {issues:?}")]
    InvalidConfig {
        config_id: String,
        issues: Vec<ConfigIssue>,
    },

    #[error("Invalid date range: {start} is after {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("Nothing to apply: no working days between {start} and {end}")]
    NothingToApply { start: NaiveDate, end: NaiveDate },
}

/// Rotates the rotation/cycle left so that `position` becomes the first slot.
///
/// Positions are 1-based and clamped into `[1, max_positions]`.
pub fn rotate_pattern(config: &ScheduleConfig, position: usize) -> ScheduleConfig {
    let mut rotated = config.clone();
    let shift = position.clamp(1, config.max_positions()) - 1;
    if shift == 0 {
        return rotated;
    }

    match &mut rotated.pattern {
        SchedulePattern::WeeklyRotation(WeeklyRotation::ByWeeks(rotation)) => {
            rotation.rotation.rotate_left(shift);
        }
        SchedulePattern::CycleWorkOff(cycle) => match &mut cycle.mode {
            CycleMode::Letters(letters) => {
                let mut normalized = letters.normalized();
                normalized.rotate_left(shift);
                letters.cycle = normalized.iter().map(|l| l.as_char()).collect();
            }
            CycleMode::Blocks(blocks) => blocks.blocks.rotate_left(shift),
        },
        SchedulePattern::FixedHours(_) | SchedulePattern::WeeklyRotation(WeeklyRotation::ByDates(_)) => {}
    }
    debug!(
        "Rotated config '{}' to start at position {} of {}",
        config.id,
        shift + 1,
        config.max_positions()
    );
    rotated
}

/// Dates whose holiday status can affect applying `config` over the request range.
///
/// Spans every month the range touches, reaching back to the earliest cycle anchor.
pub fn application_holiday_window(config: &ScheduleConfig, request: &ApplyRequest) -> (NaiveDate, NaiveDate) {
    months_in_range(request.start_date, request.end_date)
        .into_iter()
        .map(|month| holiday_window(config, month))
        .reduce(|(start_a, end_a), (start_b, end_b)| (start_a.min(start_b), end_a.max(end_b)))
        .unwrap_or((request.start_date, request.end_date))
}

/// Entries that applying `config` would create, in date order.
///
/// Each month touched by the range is expanded on its own, so anchor fallbacks
/// resolve per month exactly as they do in the live preview.
///
/// `holidays` must cover [`application_holiday_window`], the same dates the live
/// preview of each month counts over.
pub fn plan_application<H>(
    config: &ScheduleConfig,
    request: &ApplyRequest,
    holidays: &H,
) -> Result<Vec<NewScheduleEntry>, ApplyError>
where
    H: HolidayLookup + ?Sized,
{
    validate(config).map_err(|issues| ApplyError::InvalidConfig {
        config_id: config.id.clone(),
        issues,
    })?;

    let (start, end) = (request.start_date, request.end_date);
    if end < start {
        return Err(ApplyError::InvalidRange { start, end });
    }

    let rotated = rotate_pattern(config, request.position);
    let entries: Vec<NewScheduleEntry> = months_in_range(start, end)
        .into_iter()
        .flat_map(|month| expand_with(&rotated, month, holidays))
        .filter(|day| day.is_work && day.date >= start && day.date <= end)
        .filter_map(|day| {
            Some(NewScheduleEntry {
                employee_id: request.employee_id.clone(),
                date: day.date,
                start_time: day.start_time?,
                end_time: day.end_time?,
            })
        })
        .collect();

    if entries.is_empty() {
        return Err(ApplyError::NothingToApply { start, end });
    }
    Ok(entries)
}

/// Creates one store entry per planned working day, one request at a time.
///
/// A rejected day is recorded as skipped and the remaining days are still sent.
pub async fn apply_template<S, H>(
    store: &S,
    config: &ScheduleConfig,
    request: &ApplyRequest,
    holidays: &H,
) -> Result<ApplyReport, ApplyError>
where
    S: ScheduleStore + ?Sized,
    H: HolidayLookup + ?Sized,
{
    let planned = plan_application(config, request, holidays)?;
    info!(
        "Applying config '{}' to schedule {} for {}: {} days",
        config.id,
        request.schedule_id,
        request.employee_id,
        planned.len()
    );

    let mut report = ApplyReport::default();
    for entry in &planned {
        match store.add_entry(&request.schedule_id, entry).await {
            Ok(stored) => {
                debug!("Stored entry {} for {}", stored.id, stored.date);
                report.applied.push(entry.date);
            }
            Err(e) => {
                warn!(
                    "Skipping {} for {} on schedule {}: {}",
                    entry.date, entry.employee_id, request.schedule_id, e
                );
                report.skipped.push(SkippedDay {
                    date: entry.date,
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(
        "Applied {} days, skipped {}",
        report.applied.len(),
        report.skipped.len()
    );
    Ok(report)
}
