use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Days, NaiveTime, Utc};

/// When `serve` mode fires a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Schedule {
    /// Fixed gap measured from the end of the previous run.
    Interval(Duration),
    /// Once a day at the given UTC wall-clock time.
    DailyAt(NaiveTime),
}

impl Schedule {
    pub fn parse_daily_at(value: &str) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
    }

    pub fn next_fire(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::Interval(interval) => chrono::Duration::from_std(*interval)
                .ok()
                .and_then(|gap| now.checked_add_signed(gap))
                .unwrap_or(now),
            Self::DailyAt(time) => {
                let today = now.date_naive().and_time(*time).and_utc();
                if today > now {
                    today
                } else {
                    now.date_naive()
                        .checked_add_days(Days::new(1))
                        .map(|tomorrow| tomorrow.and_time(*time).and_utc())
                        .unwrap_or(today)
                }
            }
        }
    }

    pub fn delay_until_next(&self, now: DateTime<Utc>) -> Duration {
        (self.next_fire(now) - now).to_std().unwrap_or(Duration::ZERO)
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interval(interval) => write!(f, "every {}s", interval.as_secs()),
            Self::DailyAt(time) => write!(f, "daily at {} UTC", time.format("%H:%M")),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{NaiveTime, TimeZone, Utc};

    use super::Schedule;

    #[test]
    fn daily_schedule_fires_later_today_when_time_is_ahead() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 6, 30, 0).unwrap();
        let schedule = Schedule::DailyAt(NaiveTime::from_hms_opt(7, 0, 0).unwrap());

        assert_eq!(schedule.next_fire(now), Utc.with_ymd_and_hms(2026, 3, 10, 7, 0, 0).unwrap());
        assert_eq!(schedule.delay_until_next(now), Duration::from_secs(30 * 60));
    }

    #[test]
    fn daily_schedule_rolls_over_to_tomorrow() {
        let now = Utc.with_ymd_and_hms(2026, 12, 31, 7, 0, 0).unwrap();
        let schedule = Schedule::DailyAt(NaiveTime::from_hms_opt(7, 0, 0).unwrap());

        assert_eq!(schedule.next_fire(now), Utc.with_ymd_and_hms(2027, 1, 1, 7, 0, 0).unwrap());
    }

    #[test]
    fn interval_schedule_adds_the_gap() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 6, 30, 0).unwrap();
        let schedule = Schedule::Interval(Duration::from_secs(90));

        assert_eq!(schedule.delay_until_next(now), Duration::from_secs(90));
        assert_eq!(schedule.to_string(), "every 90s");
    }

    #[test]
    fn parses_hour_minute_times() {
        assert_eq!(Schedule::parse_daily_at(" 07:05 "), NaiveTime::from_hms_opt(7, 5, 0));
        assert_eq!(Schedule::parse_daily_at("25:00"), None);
        assert_eq!(Schedule::parse_daily_at("seven"), None);
    }
}
