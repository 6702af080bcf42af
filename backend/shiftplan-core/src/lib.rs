// src/lib.rs
//! Recurring work-pattern expansion for the HR portal.
//!
//! A [`ScheduleConfig`] (fixed hours, weekly rotation or work/off cycle) is expanded
//! into one [`DayPreview`] per day of a month. Applying a config turns the working
//! days of that expansion into schedule entries, and [`compress`] folds stored
//! entries back into contiguous ranges for display.

pub mod calendar;
pub mod compress;
pub mod config;
pub mod expander;
pub mod holidays;
pub mod schedule_config;
pub mod store;
pub mod template;
pub mod validation;


pub use calendar::{CalendarError, YearMonth};
pub use compress::{compress, AssignedDay, AssignedRange};
pub use expander::{expand, expand_with, holiday_window};
pub use holidays::{HolidayCalendar, HolidayLookup, HolidayPredicate, HolidayRules, HolidaySet};
pub use schedule_config::{DayPreview, ScheduleConfig, SchedulePattern};
pub use store::{HttpScheduleStore, InMemoryScheduleStore, ScheduleStore, StoreError};
pub use template::{
    application_holiday_window, apply_template, plan_application, ApplyError, ApplyReport,
    ApplyRequest,
};
pub use validation::{validate, ConfigIssue};
