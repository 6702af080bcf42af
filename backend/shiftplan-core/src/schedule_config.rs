// src/schedule_config.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::{is_saturday, is_sunday};

// --- Schedule Configuration ---

/// A reusable work pattern as authored in the config editor.
///
/// Every field tolerates a half-filled editor state: missing values default and
/// dates stay as the raw strings the editor produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleConfig {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub include_saturdays: bool,
    #[serde(default)]
    pub include_sundays: bool,
    #[serde(default)]
    pub include_holidays: bool,
    #[serde(flatten)]
    pub pattern: SchedulePattern,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SchedulePattern {
    FixedHours(FixedHours),
    WeeklyRotation(WeeklyRotation),
    CycleWorkOff(CycleWorkOff),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixedHours {
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rotationMode", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WeeklyRotation {
    ByWeeks(WeekRotation),
    ByDates(DateSegments),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekRotation {
    #[serde(default)]
    pub rotation: Vec<RotationShift>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation_start_date: Option<String>,
}

impl WeekRotation {
    /// Total rotation period in weeks; shifts with `weeks < 1` contribute nothing.
    pub fn total_weeks(&self) -> i128 {
        self.rotation
            .iter()
            .filter(|s| s.weeks > 0)
            .map(|s| i128::from(s.weeks))
            .sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationShift {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
    #[serde(default)]
    pub weeks: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateSegments {
    #[serde(default)]
    pub segments: Vec<DateSegment>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateSegment {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleWorkOff {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle_start_date: Option<String>,
    #[serde(default)]
    pub start_on_weekend: bool,
    #[serde(flatten)]
    pub mode: CycleMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cycleMode", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CycleMode {
    #[serde(rename = "STRING")]
    Letters(CycleLetters),
    Blocks(CycleBlocks),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleLetters {
    #[serde(default)]
    pub cycle: String,
    #[serde(default)]
    pub work_start_time: String,
    #[serde(default)]
    pub work_end_time: String,
}

impl CycleLetters {
    /// The cycle uppercased with everything except `W` and `O` stripped.
    pub fn normalized(&self) -> Vec<CycleLetter> {
        self.cycle
            .chars()
            .filter_map(|c| match c.to_ascii_uppercase() {
                'W' => Some(CycleLetter::Work),
                'O' => Some(CycleLetter::Off),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleLetter {
    Work,
    Off,
}

impl CycleLetter {
    pub fn as_char(&self) -> char {
        match self {
            CycleLetter::Work => 'W',
            CycleLetter::Off => 'O',
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleBlocks {
    #[serde(default)]
    pub blocks: Vec<CycleBlock>,
}

impl CycleBlocks {
    /// Cycle length in days, counting only blocks with `days > 0`.
    pub fn total_days(&self) -> i128 {
        self.blocks
            .iter()
            .filter(|b| b.days > 0)
            .map(|b| i128::from(b.days))
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleBlock {
    pub kind: BlockKind,
    #[serde(default)]
    pub days: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl CycleBlock {
    pub fn work(days: i64, start_time: &str, end_time: &str) -> Self {
        Self {
            kind: BlockKind::Work,
            days,
            start_time: Some(start_time.to_string()),
            end_time: Some(end_time.to_string()),
            label: None,
        }
    }

    pub fn off(days: i64) -> Self {
        Self {
            kind: BlockKind::Off,
            days,
            start_time: None,
            end_time: None,
            label: None,
        }
    }

    pub fn labeled(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockKind {
    Work,
    Off,
}

// --- Day filtering ---

/// The weekend/holiday inclusion flags of a config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayFilter {
    pub include_saturdays: bool,
    pub include_sundays: bool,
    pub include_holidays: bool,
}

impl DayFilter {
    /// Excluded days are never worked and never advance a cycle or rotation.
    pub fn is_excluded(&self, date: NaiveDate, is_holiday: bool) -> bool {
        self.excludes_weekend_day(date) || (is_holiday && !self.include_holidays)
    }

    /// True for a Saturday or Sunday this filter leaves out, regardless of holidays.
    pub fn excludes_weekend_day(&self, date: NaiveDate) -> bool {
        (is_saturday(date) && !self.include_saturdays) || (is_sunday(date) && !self.include_sundays)
    }

    /// Countable days in a whole Monday-to-Sunday week, before holidays.
    pub fn countable_per_week(&self) -> i64 {
        5 + i64::from(self.include_saturdays) + i64::from(self.include_sundays)
    }
}

impl ScheduleConfig {
    pub fn day_filter(&self) -> DayFilter {
        DayFilter {
            include_saturdays: self.include_saturdays,
            include_sundays: self.include_sundays,
            include_holidays: self.include_holidays,
        }
    }

    /// How many distinct starting positions a template application can pick from.
    pub fn max_positions(&self) -> usize {
        let positions = match &self.pattern {
            SchedulePattern::FixedHours(_) => 1,
            SchedulePattern::WeeklyRotation(WeeklyRotation::ByDates(_)) => 1,
            SchedulePattern::WeeklyRotation(WeeklyRotation::ByWeeks(r)) => r.rotation.len(),
            SchedulePattern::CycleWorkOff(c) => match &c.mode {
                CycleMode::Letters(letters) => letters.normalized().len(),
                CycleMode::Blocks(blocks) => blocks.blocks.len(),
            },
        };
        positions.max(1)
    }

    pub fn type_name(&self) -> &'static str {
        match &self.pattern {
            SchedulePattern::FixedHours(_) => "FIXED_HOURS",
            SchedulePattern::WeeklyRotation(_) => "WEEKLY_ROTATION",
            SchedulePattern::CycleWorkOff(_) => "CYCLE_WORK_OFF",
        }
    }
}

// --- Preview output ---

/// The expansion result for a single calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayPreview {
    pub date: NaiveDate,
    pub is_work: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl DayPreview {
    pub fn off(date: NaiveDate) -> Self {
        Self {
            date,
            is_work: false,
            start_time: None,
            end_time: None,
            note: None,
        }
    }

    pub fn off_with_note(date: NaiveDate, note: Option<String>) -> Self {
        Self {
            note,
            ..Self::off(date)
        }
    }

    pub fn work(
        date: NaiveDate,
        start_time: Option<String>,
        end_time: Option<String>,
        note: Option<String>,
    ) -> Self {
        Self {
            date,
            is_work: true,
            start_time,
            end_time,
            note,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_fixed_hours_from_editor_json() {
        let config: ScheduleConfig = serde_json::from_value(json!({
            "id": "cfg-1",
            "name": "Office",
            "type": "FIXED_HOURS",
            "includeSaturdays": false,
            "includeSundays": false,
            "includeHolidays": false,
            "startTime": "08:00",
            "endTime": "16:00"
        }))
        .unwrap();
        assert_eq!(config.type_name(), "FIXED_HOURS");
        assert_eq!(
            config.pattern,
            SchedulePattern::FixedHours(FixedHours {
                start_time: "08:00".into(),
                end_time: "16:00".into(),
            })
        );
    }

    #[test]
    fn parses_nested_rotation_mode() {
        let config: ScheduleConfig = serde_json::from_value(json!({
            "id": "rot",
            "name": "Three shift",
            "type": "WEEKLY_ROTATION",
            "rotationMode": "BY_WEEKS",
            "rotationStartDate": "2025-03-03",
            "rotation": [
                {"label": "Morning", "startTime": "06:00", "endTime": "14:00", "weeks": 2},
                {"label": "Night", "startTime": "22:00", "endTime": "06:00", "weeks": 1}
            ]
        }))
        .unwrap();
        match &config.pattern {
            SchedulePattern::WeeklyRotation(WeeklyRotation::ByWeeks(r)) => {
                assert_eq!(r.total_weeks(), 3);
                assert_eq!(r.rotation_start_date.as_deref(), Some("2025-03-03"));
            }
            other => panic!("unexpected pattern {:?}", other),
        }
        assert_eq!(config.max_positions(), 2);
        assert!(!config.include_saturdays);
    }

    #[test]
    fn parses_half_filled_cycle_blocks() {
        let config: ScheduleConfig = serde_json::from_value(json!({
            "type": "CYCLE_WORK_OFF",
            "cycleMode": "BLOCKS",
            "blocks": [{"kind": "WORK", "days": 2, "startTime": "06:00"}, {"kind": "OFF"}]
        }))
        .unwrap();
        match &config.pattern {
            SchedulePattern::CycleWorkOff(c) => {
                assert_eq!(c.cycle_start_date, None);
                assert!(!c.start_on_weekend);
                match &c.mode {
                    CycleMode::Blocks(b) => {
                        assert_eq!(b.total_days(), 2);
                        assert_eq!(b.blocks[1].days, 0);
                        assert_eq!(b.blocks[0].end_time, None);
                    }
                    other => panic!("unexpected mode {:?}", other),
                }
            }
            other => panic!("unexpected pattern {:?}", other),
        }
    }

    #[test]
    fn serializes_with_discriminants() {
        let config = ScheduleConfig {
            id: "c".into(),
            name: "Cycle".into(),
            include_saturdays: true,
            include_sundays: true,
            include_holidays: false,
            pattern: SchedulePattern::CycleWorkOff(CycleWorkOff {
                cycle_start_date: Some("2025-01-01".into()),
                start_on_weekend: false,
                mode: CycleMode::Letters(CycleLetters {
                    cycle: "wwoo".into(),
                    work_start_time: "07:00".into(),
                    work_end_time: "19:00".into(),
                }),
            }),
        };
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["type"], "CYCLE_WORK_OFF");
        assert_eq!(value["cycleMode"], "STRING");
        assert_eq!(value["cycleStartDate"], "2025-01-01");
        assert_eq!(value["workStartTime"], "07:00");

        let back: ScheduleConfig = serde_json::from_value(value).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn cycle_letters_strip_noise_case_insensitively() {
        let letters = CycleLetters {
            cycle: "w-W o/x O".into(),
            ..Default::default()
        };
        let normalized: String = letters.normalized().iter().map(|l| l.as_char()).collect();
        assert_eq!(normalized, "WWOO");
    }

    #[test]
    fn period_totals_do_not_overflow() {
        let blocks = CycleBlocks {
            blocks: vec![CycleBlock::work(i64::MAX, "06:00", "14:00"), CycleBlock::off(1)],
        };
        assert_eq!(blocks.total_days(), i128::from(i64::MAX) + 1);

        let rotation = WeekRotation {
            rotation: vec![
                RotationShift {
                    label: "A".into(),
                    start_time: "06:00".into(),
                    end_time: "14:00".into(),
                    weeks: i64::MAX,
                },
                RotationShift {
                    label: "B".into(),
                    start_time: "14:00".into(),
                    end_time: "22:00".into(),
                    weeks: i64::MAX,
                },
            ],
            rotation_start_date: None,
        };
        assert_eq!(rotation.total_weeks(), 2 * i128::from(i64::MAX));
    }

    #[test]
    fn weekend_filter_counts_per_week() {
        let filter = DayFilter {
            include_saturdays: true,
            include_sundays: false,
            include_holidays: false,
        };
        assert_eq!(filter.countable_per_week(), 6);
        let sunday = NaiveDate::from_ymd_opt(2025, 3, 2).unwrap();
        assert!(filter.excludes_weekend_day(sunday));
        assert!(!filter.excludes_weekend_day(sunday.pred_opt().unwrap()));
    }

    #[test]
    fn day_preview_omits_absent_fields() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let value = serde_json::to_value(DayPreview::off(date)).unwrap();
        assert_eq!(value, json!({"date": "2025-03-01", "isWork": false}));
    }
}
