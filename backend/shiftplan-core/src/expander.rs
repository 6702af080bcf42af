// src/expander.rs
//! Expansion of a [`ScheduleConfig`] into one [`DayPreview`] per day of a month.
//!
//! Expansion is pure: the same config, month and holidays always give the same
//! output. Malformed or half-edited configs never fail; affected days simply come
//! out as non-working.
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use tracing::debug;

use crate::calendar::{cyclic_index, parse_iso_date, weeks_between, YearMonth};
use crate::holidays::{HolidayLookup, HolidayPredicate};
use crate::schedule_config::{
    BlockKind, CycleBlock, CycleBlocks, CycleLetter, CycleLetters, CycleMode, CycleWorkOff,
    DateSegment, DateSegments, DayFilter, DayPreview, RotationShift, ScheduleConfig,
    SchedulePattern, WeekRotation, WeeklyRotation,
};

/// Expands `config` over every day of `month`, in date order.
pub fn expand<F>(config: &ScheduleConfig, month: YearMonth, is_holiday: F) -> Vec<DayPreview>
where
    F: Fn(NaiveDate) -> bool,
{
    expand_with(config, month, &HolidayPredicate(is_holiday))
}

/// [`expand`] over any [`HolidayLookup`]. A lookup that lists its dates keeps cycle
/// counting independent of how far the anchor lies from `month`.
pub fn expand_with<H>(config: &ScheduleConfig, month: YearMonth, holidays: &H) -> Vec<DayPreview>
where
    H: HolidayLookup + ?Sized,
{
    let filter = config.day_filter();
    let mut pattern = PatternState::new(config, month, filter, holidays);

    let days: Vec<DayPreview> = month
        .days()
        .map(|date| {
            if filter.is_excluded(date, holidays.is_holiday(date)) {
                return DayPreview::off(date);
            }
            pattern.day(date)
        })
        .collect();

    debug!(
        "Expanded config '{}' ({}) for {}: {} work days of {}",
        config.id,
        config.type_name(),
        month,
        days.iter().filter(|d| d.is_work).count(),
        days.len()
    );
    days
}

/// Dates whose holiday status can affect `expand(config, month, ..)`.
///
/// Cycles count excluded days from their anchor, so the window reaches back to the
/// anchor when it precedes the month.
pub fn holiday_window(config: &ScheduleConfig, month: YearMonth) -> (NaiveDate, NaiveDate) {
    let start = match &config.pattern {
        SchedulePattern::CycleWorkOff(cycle) => {
            resolve_cycle_anchor(cycle, month, config.day_filter()).min(month.first_day())
        }
        _ => month.first_day(),
    };
    (start, month.last_day())
}

// --- Anchors ---

/// Anchor for a BY_WEEKS rotation: the configured start date, else the 1st of `month`.
pub fn resolve_rotation_anchor(rotation: &WeekRotation, month: YearMonth) -> NaiveDate {
    rotation
        .rotation_start_date
        .as_deref()
        .and_then(parse_iso_date)
        .unwrap_or_else(|| month.first_day())
}

/// Anchor for a work/off cycle.
///
/// Without a configured start date: with `start_on_weekend` the first Saturday of the
/// month (the first Sunday when only Sundays are included), otherwise the 1st.
pub fn resolve_cycle_anchor(cycle: &CycleWorkOff, month: YearMonth, filter: DayFilter) -> NaiveDate {
    if let Some(anchor) = cycle.cycle_start_date.as_deref().and_then(parse_iso_date) {
        return anchor;
    }
    if !cycle.start_on_weekend {
        return month.first_day();
    }
    let target = if !filter.include_saturdays && filter.include_sundays {
        Weekday::Sun
    } else {
        Weekday::Sat
    };
    month
        .days()
        .find(|d| d.weekday() == target)
        .unwrap_or_else(|| month.first_day())
}

/// Number of countable days in `[from, to]` under `filter`.
///
/// Whole weeks are counted arithmetically. Holidays are subtracted from the lookup's
/// listing; a lookup that cannot list them is asked once per day.
pub fn countable_days_between<H>(from: NaiveDate, to: NaiveDate, filter: DayFilter, holidays: &H) -> i64
where
    H: HolidayLookup + ?Sized,
{
    if to < from {
        return 0;
    }
    let span = (to - from).num_days() + 1;
    let full_weeks = span / 7;
    let tail = from
        .checked_add_signed(Duration::days(full_weeks * 7))
        .map(|tail_start| {
            tail_start
                .iter_days()
                .take_while(|d| *d <= to)
                .filter(|d| !filter.excludes_weekend_day(*d))
                .count() as i64
        })
        .unwrap_or(0);
    let mut count = full_weeks * filter.countable_per_week() + tail;

    if !filter.include_holidays {
        let on_countable_weekday = |d: &NaiveDate| !filter.excludes_weekend_day(*d);
        let excluded_holidays = match holidays.holidays_between(from, to) {
            Some(listed) => listed.into_iter().filter(on_countable_weekday).count(),
            None => from
                .iter_days()
                .take_while(|d| *d <= to)
                .filter(on_countable_weekday)
                .filter(|d| holidays.is_holiday(*d))
                .count(),
        };
        count -= excluded_holidays as i64;
    }
    count
}

/// The item owning `offset` in a cycle of consecutive runs, `run_length(item)` long each.
///
/// Runs shorter than one are skipped; `None` when the cycle has no length.
fn run_owner<T>(items: &[T], total: i128, offset: i64, run_length: impl Fn(&T) -> i64) -> Option<&T> {
    if total <= 0 {
        return None;
    }
    let mut slot = i128::from(offset).rem_euclid(total);
    for item in items {
        let length = i128::from(run_length(item));
        if length < 1 {
            continue;
        }
        if slot < length {
            return Some(item);
        }
        slot -= length;
    }
    None
}

// --- Per-pattern state ---

/// Everything resolved once per `expand` call, then queried day by day.
enum PatternState<'a> {
    Fixed {
        start_time: &'a str,
        end_time: &'a str,
    },
    BySegments(Vec<(NaiveDate, NaiveDate, &'a DateSegment)>),
    ByWeeks {
        anchor: NaiveDate,
        rotation: &'a [RotationShift],
        total_weeks: i128,
    },
    Cycle {
        counter: CycleCounter,
        slots: CycleSlots<'a>,
    },
}

/// Running position of countable days since the cycle anchor.
struct CycleCounter {
    anchor: NaiveDate,
    position: i64,
}

impl CycleCounter {
    /// Pre-counts the countable days between the anchor and the start of the month.
    fn new<H>(anchor: NaiveDate, month: YearMonth, filter: DayFilter, holidays: &H) -> Self
    where
        H: HolidayLookup + ?Sized,
    {
        let position = match month.first_day().pred_opt() {
            Some(day_before) => countable_days_between(anchor, day_before, filter, holidays),
            None => 0,
        };
        Self { anchor, position }
    }

    /// Advances on a countable day and returns its 1-based position (< 1 before the anchor).
    fn advance(&mut self, date: NaiveDate) -> i64 {
        if date < self.anchor {
            return 0;
        }
        self.position += 1;
        self.position
    }
}

enum CycleSlots<'a> {
    Letters {
        letters: Vec<CycleLetter>,
        pattern: &'a CycleLetters,
    },
    Blocks {
        blocks: &'a [CycleBlock],
        total_days: i128,
    },
}

impl<'a> PatternState<'a> {
    fn new<H>(config: &'a ScheduleConfig, month: YearMonth, filter: DayFilter, holidays: &H) -> Self
    where
        H: HolidayLookup + ?Sized,
    {
        match &config.pattern {
            SchedulePattern::FixedHours(fixed) => PatternState::Fixed {
                start_time: &fixed.start_time,
                end_time: &fixed.end_time,
            },
            SchedulePattern::WeeklyRotation(WeeklyRotation::ByDates(segments)) => {
                PatternState::BySegments(parsed_segments(segments))
            }
            SchedulePattern::WeeklyRotation(WeeklyRotation::ByWeeks(rotation)) => PatternState::ByWeeks {
                anchor: resolve_rotation_anchor(rotation, month),
                rotation: &rotation.rotation,
                total_weeks: rotation.total_weeks(),
            },
            SchedulePattern::CycleWorkOff(cycle) => {
                let anchor = resolve_cycle_anchor(cycle, month, filter);
                let slots = match &cycle.mode {
                    CycleMode::Letters(pattern) => CycleSlots::Letters {
                        letters: pattern.normalized(),
                        pattern,
                    },
                    CycleMode::Blocks(blocks) => block_slots(blocks),
                };
                PatternState::Cycle {
                    counter: CycleCounter::new(anchor, month, filter, holidays),
                    slots,
                }
            }
        }
    }

    /// Outcome for a countable (non-excluded) day. Days must be fed in date order.
    fn day(&mut self, date: NaiveDate) -> DayPreview {
        match self {
            PatternState::Fixed {
                start_time,
                end_time,
            } => DayPreview::work(
                date,
                Some(start_time.to_string()),
                Some(end_time.to_string()),
                None,
            ),
            PatternState::BySegments(segments) => segments
                .iter()
                .find(|(from, to, _)| *from <= date && date <= *to)
                .map(|(_, _, segment)| {
                    DayPreview::work(
                        date,
                        Some(segment.start_time.clone()),
                        Some(segment.end_time.clone()),
                        Some(segment.label.clone()),
                    )
                })
                .unwrap_or_else(|| DayPreview::off(date)),
            PatternState::ByWeeks {
                anchor,
                rotation,
                total_weeks,
            } => {
                let week = weeks_between(*anchor, date);
                match run_owner(*rotation, *total_weeks, week, |shift| shift.weeks) {
                    Some(shift) => DayPreview::work(
                        date,
                        Some(shift.start_time.clone()),
                        Some(shift.end_time.clone()),
                        Some(shift.label.clone()),
                    ),
                    None => DayPreview::off(date),
                }
            }
            PatternState::Cycle { counter, slots } => {
                let position = counter.advance(date);
                if position < 1 {
                    return DayPreview::off(date);
                }
                slots.day(date, position)
            }
        }
    }
}

fn block_slots(blocks: &CycleBlocks) -> CycleSlots<'_> {
    CycleSlots::Blocks {
        blocks: &blocks.blocks,
        total_days: blocks.total_days(),
    }
}

impl CycleSlots<'_> {
    fn day(&self, date: NaiveDate, position: i64) -> DayPreview {
        match self {
            CycleSlots::Letters { letters, pattern } => {
                match cyclic_index(position - 1, letters.len()).map(|i| letters[i]) {
                    Some(CycleLetter::Work) => DayPreview::work(
                        date,
                        Some(pattern.work_start_time.clone()),
                        Some(pattern.work_end_time.clone()),
                        None,
                    ),
                    Some(CycleLetter::Off) | None => DayPreview::off(date),
                }
            }
            CycleSlots::Blocks { blocks, total_days } => {
                match run_owner(*blocks, *total_days, position - 1, |block| block.days) {
                    Some(block) => match block.kind {
                        BlockKind::Work => DayPreview::work(
                            date,
                            block.start_time.clone(),
                            block.end_time.clone(),
                            block.label.clone(),
                        ),
                        BlockKind::Off => DayPreview::off_with_note(date, block.label.clone()),
                    },
                    None => DayPreview::off(date),
                }
            }
        }
    }
}

/// Segments with both bounds parseable, in list order. First match wins on overlap.
fn parsed_segments(
    segments: &DateSegments,
) -> Vec<(NaiveDate, NaiveDate, &DateSegment)> {
    segments
        .segments
        .iter()
        .filter_map(|s| Some((parse_iso_date(&s.from)?, parse_iso_date(&s.to)?, s)))
        .collect()
}
