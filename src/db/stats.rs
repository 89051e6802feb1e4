use std::collections::BTreeSet;

use chrono::NaiveDate;
use sqlx::FromRow;
use tracing::warn;

use crate::models::{Habit, HabitStatus, HabitWithStats};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, FromRow)]
pub struct HabitLogRow {
    pub habit_id: String,
    pub date: String,
    pub status: String,
    pub completed_count: i64,
}

pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).ok()
}

pub fn format_day(day: NaiveDate) -> String {
    day.format(DATE_FORMAT).to_string()
}

/// Builds the view of `habit` on `day` from its logs. Logs after `day` are
/// ignored so that browsing back in time shows the statistics as they were.
pub fn habit_for_day(habit: Habit, logs: &[HabitLogRow], day: NaiveDate) -> HabitWithStats {
    let mut status = HabitStatus::Current;
    let mut done_today = 0;
    let mut completed = 0;
    let mut skipped = 0;
    let mut failed = 0;
    let mut completed_days = BTreeSet::new();

    for log in logs {
        let Some(log_day) = parse_day(&log.date) else {
            warn!("Skipping habit log with bad date: {} {}", log.habit_id, log.date);
            continue;
        };
        if log_day > day {
            continue;
        }
        let log_status = match log.status.parse::<HabitStatus>() {
            Ok(s) => s,
            Err(e) => {
                warn!("Skipping habit log for {}: {}", log.habit_id, e);
                continue;
            }
        };

        if log_day == day {
            status = log_status;
            done_today = log.completed_count;
        }

        match log_status {
            HabitStatus::Completed => {
                completed += 1;
                completed_days.insert(log_day);
            }
            HabitStatus::Skipped => skipped += 1,
            HabitStatus::Failed => failed += 1,
            HabitStatus::Current => {}
        }
    }

    let remaining_count = habit.goal_count.saturating_sub(done_today).max(0);

    HabitWithStats {
        habit,
        status,
        remaining_count,
        completed,
        skipped,
        failed,
        total: completed + skipped + failed,
        streak: streak_ending_at(&completed_days, day, status),
    }
}

/// Consecutive completed days ending at `day`. A `day` still `Current` does
/// not break the streak; counting then starts from the day before. A day
/// closed as skipped or failed ends it.
fn streak_ending_at(
    completed_days: &BTreeSet<NaiveDate>,
    day: NaiveDate,
    day_status: HabitStatus,
) -> i64 {
    let mut cursor = match day_status {
        HabitStatus::Completed => Some(day),
        HabitStatus::Current => day.pred_opt(),
        HabitStatus::Skipped | HabitStatus::Failed => return 0,
    };

    let mut streak = 0;
    while let Some(d) = cursor {
        if !completed_days.contains(&d) {
            break;
        }
        streak += 1;
        cursor = d.pred_opt();
    }
    streak
}
