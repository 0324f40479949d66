//! Periodic jobs: attendance digests and the reservation expiry sweep

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, Utc};
use std::time::Duration as StdDuration;
use tokio::task::JoinHandle;

use crate::{
    config::SchedulerConfig,
    services::{library::LibraryService, reports::ReportsService},
};

fn at_local(date: NaiveDate, hour: u32, offset: FixedOffset) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_opt(hour.min(23), 0, 0).unwrap_or(NaiveTime::MIN);
    let naive = date.and_time(time) - Duration::seconds(i64::from(offset.local_minus_utc()));
    DateTime::from_naive_utc_and_offset(naive, Utc)
}

/// Next `hour:00` local time strictly after `now`
pub fn next_daily_run(now: DateTime<Utc>, offset: FixedOffset, hour: u32) -> DateTime<Utc> {
    let today = now.with_timezone(&offset).date_naive();
    let run = at_local(today, hour, offset);
    if run > now {
        run
    } else {
        at_local(today + Duration::days(1), hour, offset)
    }
}

/// Next `hour:00` local time on `weekday` (0 = Sunday) strictly after `now`
pub fn next_weekly_run(now: DateTime<Utc>, offset: FixedOffset, weekday: u32, hour: u32) -> DateTime<Utc> {
    let today = now.with_timezone(&offset).date_naive();
    let current = today.weekday().num_days_from_sunday();
    let ahead = i64::from((weekday % 7 + 7 - current) % 7);

    let run = at_local(today + Duration::days(ahead), hour, offset);
    if run > now {
        run
    } else {
        at_local(today + Duration::days(ahead + 7), hour, offset)
    }
}

async fn sleep_until(at: DateTime<Utc>) {
    let wait = (at - Utc::now()).to_std().unwrap_or(StdDuration::ZERO);
    tokio::time::sleep(wait).await;
}

pub struct Scheduler {
    config: SchedulerConfig,
    reports: ReportsService,
    library: LibraryService,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig, reports: ReportsService, library: LibraryService) -> Self {
        Self {
            config,
            reports,
            library,
        }
    }

    /// Start every job on its own task
    pub fn spawn(self) -> Vec<JoinHandle<()>> {
        tracing::info!(
            "Scheduler started: digests at {:02}:00 (UTC{:+}), weekly on day {}, reservation sweep every {} min",
            self.config.digest_hour,
            self.config.utc_offset_hours,
            self.config.weekly_digest_weekday,
            self.config.reservation_sweep_minutes
        );

        vec![
            tokio::spawn(daily_digest(self.config.clone(), self.reports.clone())),
            tokio::spawn(weekly_digest(self.config.clone(), self.reports)),
            tokio::spawn(reservation_sweep(self.config, self.library)),
        ]
    }
}

async fn daily_digest(config: SchedulerConfig, reports: ReportsService) {
    let offset = config.offset();
    loop {
        let next = next_daily_run(Utc::now(), offset, config.digest_hour);
        tracing::debug!("Next daily digest at {}", next);
        sleep_until(next).await;

        let date = config.local_date(Utc::now());
        if let Err(e) = reports.send_daily_digest(Some(date), None).await {
            tracing::error!("Daily digest for {} failed: {}", date, e);
        }
    }
}

async fn weekly_digest(config: SchedulerConfig, reports: ReportsService) {
    let offset = config.offset();
    loop {
        let next = next_weekly_run(Utc::now(), offset, config.weekly_digest_weekday, config.digest_hour);
        tracing::debug!("Next weekly digest at {}", next);
        sleep_until(next).await;

        let date = config.local_date(Utc::now());
        if let Err(e) = reports.send_weekly_digest(Some(date), None).await {
            tracing::error!("Weekly digest ending {} failed: {}", date, e);
        }
    }
}

async fn reservation_sweep(config: SchedulerConfig, library: LibraryService) {
    let period = StdDuration::from_secs(config.reservation_sweep_minutes.max(1) * 60);
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        if let Err(e) = library.expire_reservations().await {
            tracing::error!("Reservation sweep failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn plus8() -> FixedOffset {
        FixedOffset::east_opt(8 * 3600).unwrap()
    }

    #[test]
    fn daily_run_later_today() {
        // 09:00 local on March 3rd
        let now = utc("2025-03-03T01:00:00Z");
        assert_eq!(next_daily_run(now, plus8(), 18), utc("2025-03-03T10:00:00Z"));
    }

    #[test]
    fn daily_run_rolls_to_tomorrow_once_passed() {
        let now = utc("2025-03-03T10:00:00Z");
        assert_eq!(next_daily_run(now, plus8(), 18), utc("2025-03-04T10:00:00Z"));

        let now = utc("2025-03-03T12:30:00Z");
        assert_eq!(next_daily_run(now, plus8(), 18), utc("2025-03-04T10:00:00Z"));
    }

    #[test]
    fn daily_run_uses_local_calendar_day() {
        // 17:30 UTC on the 3rd is already 01:30 on the 4th at UTC+8
        let now = utc("2025-03-03T17:30:00Z");
        assert_eq!(next_daily_run(now, plus8(), 18), utc("2025-03-04T10:00:00Z"));
    }

    #[test]
    fn weekly_run_lands_on_sunday() {
        // Monday 2025-03-03, local
        let now = utc("2025-03-03T01:00:00Z");
        let next = next_weekly_run(now, plus8(), 0, 18);
        assert_eq!(next, utc("2025-03-09T10:00:00Z"));
        assert_eq!(next.with_timezone(&plus8()).weekday(), chrono::Weekday::Sun);
    }

    #[test]
    fn weekly_run_on_the_day_itself() {
        // Sunday 2025-03-09 at 08:00 local
        let before = utc("2025-03-09T00:00:00Z");
        assert_eq!(next_weekly_run(before, plus8(), 0, 18), utc("2025-03-09T10:00:00Z"));

        let after = utc("2025-03-09T11:00:00Z");
        assert_eq!(next_weekly_run(after, plus8(), 0, 18), utc("2025-03-16T10:00:00Z"));
    }
}
