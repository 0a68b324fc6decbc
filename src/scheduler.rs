//! Wall-clock triggers for the report pipeline.
//!
//! Every fire spawns the job as its own task. Runs are never skipped, queued or
//! caught up, so a slow run may overlap the next one.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Datelike, NaiveTime, TimeZone, Utc, Weekday};
use tracing::{debug, info, warn};

use crate::config::MARKET_TZ;

/// Recurring daily slots, exchange-local: `start`, `start + step`, ... up to `end`
/// inclusive, on each listed weekday.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeWindow {
    pub days: Vec<Weekday>,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub step_mins: u32,
}

impl TimeWindow {
    /// True when `at` falls on a listed day between `start` and `end` inclusive.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let local = at.with_timezone(&MARKET_TZ);
        let time = local.time();
        self.days.contains(&local.weekday()) && time >= self.start && time <= self.end
    }

    /// First slot strictly after `after`, looking at most a week ahead.
    fn next_slot(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if self.step_mins == 0 || self.days.is_empty() || self.start > self.end {
            return None;
        }
        let step = chrono::Duration::minutes(i64::from(self.step_mins));
        let today = after.with_timezone(&MARKET_TZ).date_naive();

        for offset in 0..=7 {
            let date = today + chrono::Duration::days(offset);
            if !self.days.contains(&date.weekday()) {
                continue;
            }
            let mut slot = self.start;
            loop {
                if let Some(local) = MARKET_TZ.from_local_datetime(&date.and_time(slot)).single() {
                    let candidate = local.with_timezone(&Utc);
                    if candidate > after {
                        return Some(candidate);
                    }
                }
                let (next, wrapped) = slot.overflowing_add_signed(step);
                if wrapped != 0 || next > self.end {
                    break;
                }
                slot = next;
            }
        }
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schedule {
    /// Fire every fixed interval.
    Interval(Duration),
    /// Fire on the slots of any window.
    Windows(Vec<TimeWindow>),
}

impl Schedule {
    /// Next firing instant strictly after `after`. `None` if the schedule never fires.
    pub fn next_fire(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Schedule::Interval(every) => {
                if every.is_zero() {
                    return None;
                }
                chrono::Duration::from_std(*every).ok().map(|d| after + d)
            }
            Schedule::Windows(windows) => windows.iter().filter_map(|w| w.next_slot(after)).min(),
        }
    }
}

/// Drive `job` on `schedule` forever. Returns only if the schedule has no next fire.
pub async fn run<F, Fut>(schedule: Schedule, mut job: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    info!(?schedule, "scheduler started");
    loop {
        let now = Utc::now();
        let Some(next) = schedule.next_fire(now) else {
            warn!("schedule has no upcoming fire time, scheduler stopping");
            return;
        };
        let wait = (next - now).to_std().unwrap_or_default();
        debug!(next = %next, wait_secs = wait.as_secs(), "next scheduled run");
        tokio::time::sleep(wait).await;
        tokio::spawn(job());
    }
}
