use crate::error::ConfigError;
use chrono::{DateTime, Days, TimeDelta, Timelike, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SECS_PER_HOUR: u64 = 3600;

/// Timing policy for autonomous broadcasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchedulePolicy {
    /// Minute 0 of every hour.
    FixedHourly,
    /// Once a day at a fixed UTC wall-clock instant.
    FixedDailyUtc { hour: u32, minute: u32 },
    /// Uniformly random delay in `[min_secs, max_secs]`, redrawn after every fire.
    RandomBounded { min_secs: u64, max_secs: u64 },
}

impl Default for SchedulePolicy {
    fn default() -> Self {
        Self::RandomBounded {
            min_secs: 60 * 60,
            max_secs: 120 * 60,
        }
    }
}

/// The single active schedule: which policy, and when it fires next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub policy: SchedulePolicy,
    pub next_fire_at: DateTime<Utc>,
}

impl SchedulePolicy {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            Self::FixedHourly => Ok(()),
            Self::FixedDailyUtc { hour, minute } => {
                if hour > 23 || minute > 59 {
                    return Err(ConfigError::Validation(format!(
                        "daily schedule time {hour:02}:{minute:02} is not a valid UTC time"
                    )));
                }
                Ok(())
            }
            Self::RandomBounded { min_secs, max_secs } => {
                if min_secs == 0 || min_secs > max_secs {
                    return Err(ConfigError::Validation(format!(
                        "random schedule bounds must satisfy 0 < min <= max, got [{min_secs}, {max_secs}]"
                    )));
                }
                Ok(())
            }
        }
    }

    /// Delay from `now` until the next fire under this policy.
    pub fn delay_from<R: Rng + ?Sized>(&self, now: DateTime<Utc>, rng: &mut R) -> Duration {
        match *self {
            Self::FixedHourly => until_next_hour(now),
            Self::FixedDailyUtc { hour, minute } => until_daily_instant(now, hour, minute),
            Self::RandomBounded { min_secs, max_secs } => {
                let millis = rng.random_range(min_secs * 1000..=max_secs * 1000);
                Duration::from_millis(millis)
            }
        }
    }

    pub fn next_entry<R: Rng + ?Sized>(&self, now: DateTime<Utc>, rng: &mut R) -> ScheduleEntry {
        let delay = self.delay_from(now, rng);
        let next_fire_at = TimeDelta::from_std(delay)
            .ok()
            .and_then(|delta| now.checked_add_signed(delta))
            .unwrap_or(now);
        ScheduleEntry {
            policy: *self,
            next_fire_at,
        }
    }
}

fn until_next_hour(now: DateTime<Utc>) -> Duration {
    let into_hour = u64::from(now.minute()) * 60 + u64::from(now.second());
    // Leap seconds report nanosecond >= 1e9.
    let nanos = now.nanosecond().min(999_999_999);
    Duration::from_secs(SECS_PER_HOUR - into_hour) - Duration::from_nanos(u64::from(nanos))
}

fn until_daily_instant(now: DateTime<Utc>, hour: u32, minute: u32) -> Duration {
    let Some(today) = now.date_naive().and_hms_opt(hour, minute, 0) else {
        return Duration::from_secs(24 * SECS_PER_HOUR);
    };
    let mut target = today.and_utc();
    if target <= now {
        target = target
            .checked_add_days(Days::new(1))
            .unwrap_or(target + TimeDelta::days(1));
    }
    (target - now).to_std().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, h, m, s).unwrap()
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn hourly_delay_matches_remaining_seconds() {
        let delay = SchedulePolicy::FixedHourly.delay_from(at(10, 17, 42), &mut rng());
        assert_eq!(delay, Duration::from_secs((60 - 17) * 60 - 42));
    }

    #[test]
    fn hourly_on_the_boundary_waits_a_full_hour() {
        let delay = SchedulePolicy::FixedHourly.delay_from(at(10, 0, 0), &mut rng());
        assert_eq!(delay, Duration::from_secs(3600));
    }

    #[test]
    fn hourly_one_second_before_boundary() {
        let delay = SchedulePolicy::FixedHourly.delay_from(at(23, 59, 59), &mut rng());
        assert_eq!(delay, Duration::from_secs(1));
    }

    #[test]
    fn daily_later_today() {
        let policy = SchedulePolicy::FixedDailyUtc {
            hour: 18,
            minute: 30,
        };
        let delay = policy.delay_from(at(12, 0, 0), &mut rng());
        assert_eq!(delay, Duration::from_secs(6 * 3600 + 30 * 60));
    }

    #[test]
    fn daily_already_passed_rolls_to_tomorrow() {
        let policy = SchedulePolicy::FixedDailyUtc { hour: 9, minute: 0 };
        let delay = policy.delay_from(at(9, 0, 1), &mut rng());
        assert_eq!(delay, Duration::from_secs(24 * 3600 - 1));
    }

    #[test]
    fn daily_exact_instant_rolls_to_tomorrow() {
        let policy = SchedulePolicy::FixedDailyUtc { hour: 9, minute: 0 };
        let delay = policy.delay_from(at(9, 0, 0), &mut rng());
        assert_eq!(delay, Duration::from_secs(24 * 3600));
    }

    #[test]
    fn random_delay_stays_within_bounds() {
        let policy = SchedulePolicy::RandomBounded {
            min_secs: 60,
            max_secs: 120,
        };
        let mut rng = rng();
        for _ in 0..200 {
            let delay = policy.delay_from(at(1, 2, 3), &mut rng);
            assert!(delay >= Duration::from_secs(60));
            assert!(delay <= Duration::from_secs(120));
        }
    }

    #[test]
    fn next_entry_adds_delay_to_now() {
        let entry = SchedulePolicy::FixedHourly.next_entry(at(4, 45, 0), &mut rng());
        assert_eq!(entry.next_fire_at, at(5, 0, 0));
        assert_eq!(entry.policy, SchedulePolicy::FixedHourly);
    }

    #[test]
    fn validation_rejects_bad_bounds() {
        assert!(
            SchedulePolicy::RandomBounded {
                min_secs: 10,
                max_secs: 5
            }
            .validate()
            .is_err()
        );
        assert!(
            SchedulePolicy::FixedDailyUtc {
                hour: 24,
                minute: 0
            }
            .validate()
            .is_err()
        );
        assert!(SchedulePolicy::default().validate().is_ok());
    }

    #[test]
    fn policy_deserializes_from_tagged_toml() {
        let policy: SchedulePolicy =
            toml::from_str("kind = \"fixed_daily_utc\"\nhour = 7\nminute = 15").unwrap();
        assert_eq!(
            policy,
            SchedulePolicy::FixedDailyUtc {
                hour: 7,
                minute: 15
            }
        );
    }
}
