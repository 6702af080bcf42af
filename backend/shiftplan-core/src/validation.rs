// src/validation.rs
//! Strict checks run before a config is applied to a real schedule.
//!
//! Expansion itself tolerates anything; these rules decide whether a config is
//! complete enough to be persisted as schedule entries.
use chrono::NaiveDate;
use thiserror::Error;
use tracing::debug;

use crate::calendar::{parse_iso_date, ShiftTime};
use crate::schedule_config::{
    BlockKind, CycleLetter, CycleMode, ScheduleConfig, SchedulePattern, WeeklyRotation,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigIssue {
    #[error("Invalid time for {field}: '{value}' (expected HH:mm)")]
    InvalidTime { field: String, value: String },

    #[error("Invalid anchor date for {field}: '{value}'")]
    InvalidAnchor { field: String, value: String },

    #[error("Weekly rotation has no shifts")]
    EmptyRotation,

    #[error("Rotation shift #{index} must last at least one week (got {weeks})")]
    ShiftWeeksInvalid { index: usize, weeks: i64 },

    #[error("Date rotation has no segments")]
    EmptySegments,

    #[error("Segment #{index} has an invalid {field} date '{value}'")]
    InvalidSegmentDate {
        index: usize,
        field: String,
        value: String,
    },

    #[error("Segment #{index} ends ({to}) before it starts ({from})")]
    SegmentReversed {
        index: usize,
        from: NaiveDate,
        to: NaiveDate,
    },

    #[error("Segments #{first} and #{second} overlap")]
    OverlappingSegments { first: usize, second: usize },

    #[error("Work/off cycle contains no W or O letters")]
    EmptyCycle,

    #[error("Work/off cycle contains no working days")]
    CycleNeverWorks,

    #[error("Cycle needs at least one block lasting one day or more")]
    NoCountableBlocks,

    #[error("Block #{index} must last at least one day (got {days})")]
    BlockDaysInvalid { index: usize, days: i64 },

    #[error("Work block #{index} is missing its {field}")]
    WorkBlockMissingTime { index: usize, field: String },
}

/// Collects every issue in `config`; `Ok` only when the config is safe to apply.
pub fn validate(config: &ScheduleConfig) -> Result<(), Vec<ConfigIssue>> {
    let mut issues = Vec::new();

    match &config.pattern {
        SchedulePattern::FixedHours(fixed) => {
            check_time(&mut issues, "startTime", &fixed.start_time);
            check_time(&mut issues, "endTime", &fixed.end_time);
        }
        SchedulePattern::WeeklyRotation(WeeklyRotation::ByWeeks(rotation)) => {
            check_anchor(&mut issues, "rotationStartDate", rotation.rotation_start_date.as_deref());
            if rotation.rotation.is_empty() {
                issues.push(ConfigIssue::EmptyRotation);
            }
            for (index, shift) in rotation.rotation.iter().enumerate() {
                if shift.weeks < 1 {
                    issues.push(ConfigIssue::ShiftWeeksInvalid {
                        index,
                        weeks: shift.weeks,
                    });
                }
                check_time(&mut issues, &format!("rotation[{}].startTime", index), &shift.start_time);
                check_time(&mut issues, &format!("rotation[{}].endTime", index), &shift.end_time);
            }
        }
        SchedulePattern::WeeklyRotation(WeeklyRotation::ByDates(segments)) => {
            if segments.segments.is_empty() {
                issues.push(ConfigIssue::EmptySegments);
            }
            let mut ranges: Vec<(usize, NaiveDate, NaiveDate)> = Vec::new();
            for (index, segment) in segments.segments.iter().enumerate() {
                let from = check_segment_date(&mut issues, index, "from", &segment.from);
                let to = check_segment_date(&mut issues, index, "to", &segment.to);
                check_time(&mut issues, &format!("segments[{}].startTime", index), &segment.start_time);
                check_time(&mut issues, &format!("segments[{}].endTime", index), &segment.end_time);
                if let (Some(from), Some(to)) = (from, to) {
                    if to < from {
                        issues.push(ConfigIssue::SegmentReversed { index, from, to });
                    } else {
                        ranges.push((index, from, to));
                    }
                }
            }
            for (i, (first, from_a, to_a)) in ranges.iter().enumerate() {
                for (second, from_b, to_b) in &ranges[i + 1..] {
                    if from_a <= to_b && from_b <= to_a {
                        issues.push(ConfigIssue::OverlappingSegments {
                            first: *first,
                            second: *second,
                        });
                    }
                }
            }
        }
        SchedulePattern::CycleWorkOff(cycle) => {
            check_anchor(&mut issues, "cycleStartDate", cycle.cycle_start_date.as_deref());
            match &cycle.mode {
                CycleMode::Letters(letters) => {
                    let normalized = letters.normalized();
                    if normalized.is_empty() {
                        issues.push(ConfigIssue::EmptyCycle);
                    } else if !normalized.contains(&CycleLetter::Work) {
                        issues.push(ConfigIssue::CycleNeverWorks);
                    } else {
                        check_time(&mut issues, "workStartTime", &letters.work_start_time);
                        check_time(&mut issues, "workEndTime", &letters.work_end_time);
                    }
                }
                CycleMode::Blocks(blocks) => {
                    if !blocks.blocks.iter().any(|b| b.days >= 1) {
                        issues.push(ConfigIssue::NoCountableBlocks);
                    }
                    for (index, block) in blocks.blocks.iter().enumerate() {
                        if block.days < 1 {
                            issues.push(ConfigIssue::BlockDaysInvalid {
                                index,
                                days: block.days,
                            });
                        }
                        if block.kind == BlockKind::Work {
                            check_block_time(&mut issues, index, "startTime", block.start_time.as_deref());
                            check_block_time(&mut issues, index, "endTime", block.end_time.as_deref());
                        }
                    }
                }
            }
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        debug!("Config '{}' failed validation: {:?}", config.id, issues);
        Err(issues)
    }
}

fn check_time(issues: &mut Vec<ConfigIssue>, field: &str, value: &str) {
    if value.parse::<ShiftTime>().is_err() {
        issues.push(ConfigIssue::InvalidTime {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
}

// An absent or blank anchor is fine (fallback policy applies); a garbled one is not.
fn check_anchor(issues: &mut Vec<ConfigIssue>, field: &str, value: Option<&str>) {
    if let Some(value) = value {
        if !value.trim().is_empty() && parse_iso_date(value).is_none() {
            issues.push(ConfigIssue::InvalidAnchor {
                field: field.to_string(),
                value: value.to_string(),
            });
        }
    }
}

fn check_segment_date(
    issues: &mut Vec<ConfigIssue>,
    index: usize,
    field: &str,
    value: &str,
) -> Option<NaiveDate> {
    let parsed = parse_iso_date(value);
    if parsed.is_none() {
        issues.push(ConfigIssue::InvalidSegmentDate {
            index,
            field: field.to_string(),
            value: value.to_string(),
        });
    }
    parsed
}

fn check_block_time(issues: &mut Vec<ConfigIssue>, index: usize, field: &str, value: Option<&str>) {
    match value {
        Some(v) if !v.trim().is_empty() => {
            check_time(issues, &format!("blocks[{}].{}", index, field), v)
        }
        _ => issues.push(ConfigIssue::WorkBlockMissingTime {
            index,
            field: field.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule_config::{
        CycleBlock, CycleBlocks, CycleLetters, CycleWorkOff, DateSegment, DateSegments, FixedHours,
        RotationShift, WeekRotation,
    };

    fn config(pattern: SchedulePattern) -> ScheduleConfig {
        ScheduleConfig {
            id: "cfg".into(),
            name: "Test".into(),
            include_saturdays: false,
            include_sundays: false,
            include_holidays: false,
            pattern,
        }
    }

    fn segment(from: &str, to: &str) -> DateSegment {
        DateSegment {
            from: from.into(),
            to: to.into(),
            label: "Seg".into(),
            start_time: "08:00".into(),
            end_time: "16:00".into(),
        }
    }

    #[test]
    fn fixed_hours_accepts_overnight_and_rejects_garbage() {
        let overnight = config(SchedulePattern::FixedHours(FixedHours {
            start_time: "22:00".into(),
            end_time: "06:00".into(),
        }));
        assert_eq!(validate(&overnight), Ok(()));

        let broken = config(SchedulePattern::FixedHours(FixedHours {
            start_time: "8".into(),
            end_time: String::new(),
        }));
        assert_eq!(validate(&broken).unwrap_err().len(), 2);
    }

    #[test]
    fn rotation_needs_shifts_with_positive_weeks() {
        let empty = config(SchedulePattern::WeeklyRotation(WeeklyRotation::ByWeeks(
            WeekRotation::default(),
        )));
        assert_eq!(validate(&empty), Err(vec![ConfigIssue::EmptyRotation]));

        let zero_weeks = config(SchedulePattern::WeeklyRotation(WeeklyRotation::ByWeeks(
            WeekRotation {
                rotation: vec![RotationShift {
                    label: "A".into(),
                    start_time: "06:00".into(),
                    end_time: "14:00".into(),
                    weeks: 0,
                }],
                rotation_start_date: Some("2025-13-01".into()),
            },
        )));
        let issues = validate(&zero_weeks).unwrap_err();
        assert!(issues.contains(&ConfigIssue::ShiftWeeksInvalid { index: 0, weeks: 0 }));
        assert!(issues
            .iter()
            .any(|i| matches!(i, ConfigIssue::InvalidAnchor { field, .. } if field == "rotationStartDate")));
    }

    #[test]
    fn overlapping_segments_are_rejected() {
        let overlapping = config(SchedulePattern::WeeklyRotation(WeeklyRotation::ByDates(
            DateSegments {
                segments: vec![
                    segment("2025-03-01", "2025-03-10"),
                    segment("2025-03-11", "2025-03-20"),
                    segment("2025-03-20", "2025-03-31"),
                ],
            },
        )));
        assert_eq!(
            validate(&overlapping),
            Err(vec![ConfigIssue::OverlappingSegments { first: 1, second: 2 }])
        );
    }

    #[test]
    fn reversed_and_unparsable_segments_are_reported() {
        let broken = config(SchedulePattern::WeeklyRotation(WeeklyRotation::ByDates(
            DateSegments {
                segments: vec![segment("2025-03-10", "2025-03-01"), segment("soon", "2025-03-05")],
            },
        )));
        let issues = validate(&broken).unwrap_err();
        assert_eq!(issues.len(), 2);
        assert!(matches!(issues[0], ConfigIssue::SegmentReversed { index: 0, .. }));
        assert!(matches!(issues[1], ConfigIssue::InvalidSegmentDate { index: 1, .. }));
    }

    #[test]
    fn letter_cycle_must_contain_work() {
        let cycle = |letters: &str| {
            config(SchedulePattern::CycleWorkOff(CycleWorkOff {
                cycle_start_date: None,
                start_on_weekend: false,
                mode: CycleMode::Letters(CycleLetters {
                    cycle: letters.into(),
                    work_start_time: "07:00".into(),
                    work_end_time: "19:00".into(),
                }),
            }))
        };
        assert_eq!(validate(&cycle("--")), Err(vec![ConfigIssue::EmptyCycle]));
        assert_eq!(validate(&cycle("ooo")), Err(vec![ConfigIssue::CycleNeverWorks]));
        assert_eq!(validate(&cycle("wwoo")), Ok(()));
    }

    #[test]
    fn blocks_need_days_and_work_hours() {
        let blocks = config(SchedulePattern::CycleWorkOff(CycleWorkOff {
            cycle_start_date: Some(" ".into()),
            start_on_weekend: false,
            mode: CycleMode::Blocks(CycleBlocks {
                blocks: vec![
                    CycleBlock {
                        kind: BlockKind::Work,
                        days: 0,
                        start_time: Some("06:00".into()),
                        end_time: None,
                        label: None,
                    },
                    CycleBlock::off(0),
                ],
            }),
        }));
        let issues = validate(&blocks).unwrap_err();
        assert_eq!(
            issues,
            vec![
                ConfigIssue::NoCountableBlocks,
                ConfigIssue::BlockDaysInvalid { index: 0, days: 0 },
                ConfigIssue::WorkBlockMissingTime {
                    index: 0,
                    field: "endTime".into()
                },
                ConfigIssue::BlockDaysInvalid { index: 1, days: 0 },
            ]
        );

        let good = config(SchedulePattern::CycleWorkOff(CycleWorkOff {
            cycle_start_date: Some("2025-03-01".into()),
            start_on_weekend: false,
            mode: CycleMode::Blocks(CycleBlocks {
                blocks: vec![CycleBlock::work(2, "06:00", "14:00"), CycleBlock::off(2)],
            }),
        }));
        assert_eq!(validate(&good), Ok(()));
    }
}
