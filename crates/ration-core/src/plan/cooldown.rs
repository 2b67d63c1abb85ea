//! Minimum interval between two new week plans of one user.

use chrono::{DateTime, Duration, Utc};

pub const COOLDOWN_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownStatus {
    Allowed,
    Blocked {
        /// Whole days until the next plan may be created, 1..=7.
        days_left: i64,
        next_allowed_at: DateTime<Utc>,
    },
}

impl CooldownStatus {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Whether a user whose latest plan was created at `last_created_at` may
/// create a new one at `now`.
pub fn cooldown_status(last_created_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> CooldownStatus {
    let Some(last) = last_created_at else {
        return CooldownStatus::Allowed;
    };

    let days_since = (now - last).num_days().max(0);
    if days_since >= COOLDOWN_DAYS {
        return CooldownStatus::Allowed;
    }

    CooldownStatus::Blocked {
        days_left: COOLDOWN_DAYS - days_since,
        next_allowed_at: last + Duration::days(COOLDOWN_DAYS),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn first_plan_is_allowed() {
        assert!(cooldown_status(None, at(1, 0)).is_allowed());
    }

    #[test]
    fn same_day_blocks_for_full_week() {
        let last = at(10, 8);
        assert_eq!(
            cooldown_status(Some(last), at(10, 20)),
            CooldownStatus::Blocked {
                days_left: 7,
                next_allowed_at: at(17, 8),
            }
        );
    }

    #[test]
    fn partial_days_are_floored() {
        // 3 days and 23 hours
        match cooldown_status(Some(at(10, 8)), at(14, 7)) {
            CooldownStatus::Blocked { days_left, .. } => assert_eq!(days_left, 4),
            other => panic!("expected blocked, got {other:?}"),
        }
    }

    #[test]
    fn seven_days_later_is_allowed() {
        assert!(cooldown_status(Some(at(10, 8)), at(17, 8)).is_allowed());
        assert!(!cooldown_status(Some(at(10, 8)), at(17, 7)).is_allowed());
    }
}
