//! Predicate library
//!
//! Every predicate is a pure function of (field value, rule value, clock).
//! Text predicates compare case-insensitively; date predicates fail closed.

use chrono::{DateTime, FixedOffset, Utc};

use super::model::Predicate;

/// Format of the `received_at` field (the RFC 2822 `Date` header shape)
pub const RECEIVED_AT_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Source of "now" for relative-date predicates
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

impl Predicate {
    /// Apply the predicate to a field value and the configured rule value
    pub fn apply(self, field: &str, value: &str, clock: &dyn Clock) -> bool {
        match self {
            Self::Contains => contains(field, value),
            Self::DoesNotContain => !contains(field, value),
            Self::Equals => equals(field, value),
            Self::DoesNotEqual => !equals(field, value),
            Self::StartsWith => field.to_lowercase().starts_with(&value.to_lowercase()),
            Self::EndsWith => field.to_lowercase().ends_with(&value.to_lowercase()),
            Self::LessThanDays => {
                days_compare(field, value, clock, |elapsed, limit| elapsed < limit)
            }
            Self::GreaterThanDays => {
                days_compare(field, value, clock, |elapsed, limit| elapsed > limit)
            }
        }
    }
}

fn contains(field: &str, value: &str) -> bool {
    field.to_lowercase().contains(&value.to_lowercase())
}

fn equals(field: &str, value: &str) -> bool {
    field.to_lowercase() == value.to_lowercase()
}

fn days_compare(field: &str, value: &str, clock: &dyn Clock, cmp: fn(i64, i64) -> bool) -> bool {
    let Ok(limit) = value.trim().parse::<i64>() else {
        return false;
    };
    match elapsed_days(field, clock) {
        Some(elapsed) => cmp(elapsed, limit),
        None => false,
    }
}

/// Whole days between the timestamp and now, floored
///
/// `None` when the field is empty or not in [`RECEIVED_AT_FORMAT`].
pub fn elapsed_days(field: &str, clock: &dyn Clock) -> Option<i64> {
    if field.is_empty() {
        return None;
    }
    let received: DateTime<FixedOffset> =
        DateTime::parse_from_str(field, RECEIVED_AT_FORMAT).ok()?;
    let now = clock.now().with_timezone(received.offset());
    Some((now - received).num_milliseconds().div_euclid(MILLIS_PER_DAY))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap())
    }

    fn days_ago(days: i64) -> String {
        (clock().0 - Duration::days(days))
            .format(RECEIVED_AT_FORMAT)
            .to_string()
    }

    #[test]
    fn test_contains_is_case_insensitive() {
        assert!(Predicate::Contains.apply("Invoice Pending", "invoice", &clock()));
        assert!(Predicate::Contains.apply("Urgent Invoice", "INVOICE", &clock()));
        assert!(!Predicate::Contains.apply("Urgent Invoice", "receipt", &clock()));
    }

    #[test]
    fn test_negations() {
        assert!(Predicate::DoesNotContain.apply("Please process", "salary", &clock()));
        assert!(!Predicate::DoesNotContain.apply("Salary slip", "salary", &clock()));
        assert!(Predicate::DoesNotEqual.apply("Urgent Invoice", "Meeting Notes", &clock()));
        assert!(!Predicate::DoesNotEqual.apply("Meeting Notes", "meeting notes", &clock()));
    }

    #[test]
    fn test_equals_is_full_match() {
        assert!(Predicate::Equals.apply("billing@x.com", "BILLING@X.COM", &clock()));
        assert!(!Predicate::Equals.apply("billing@x.com", "billing", &clock()));
    }

    #[test]
    fn test_prefix_and_suffix() {
        assert!(Predicate::StartsWith.apply("Re: Invoice", "re:", &clock()));
        assert!(!Predicate::StartsWith.apply("Fwd: Invoice", "re:", &clock()));
        assert!(Predicate::EndsWith.apply("billing@x.com", "@X.com", &clock()));
        assert!(!Predicate::EndsWith.apply("billing@x.org", "@x.com", &clock()));
    }

    #[test]
    fn test_empty_field_is_empty_string() {
        assert!(!Predicate::Contains.apply("", "invoice", &clock()));
        assert!(Predicate::DoesNotContain.apply("", "invoice", &clock()));
        assert!(Predicate::Equals.apply("", "", &clock()));
        assert!(Predicate::Contains.apply("", "", &clock()));
    }

    #[test]
    fn test_less_than_days() {
        assert!(Predicate::LessThanDays.apply(&days_ago(2), "7", &clock()));
        assert!(!Predicate::LessThanDays.apply(&days_ago(10), "7", &clock()));
        // Strict comparison
        assert!(!Predicate::LessThanDays.apply(&days_ago(7), "7", &clock()));
    }

    #[test]
    fn test_greater_than_days() {
        assert!(Predicate::GreaterThanDays.apply(&days_ago(30), "7", &clock()));
        assert!(!Predicate::GreaterThanDays.apply(&days_ago(2), "7", &clock()));
        assert!(!Predicate::GreaterThanDays.apply(&days_ago(7), "7", &clock()));
    }

    #[test]
    fn test_partial_days_are_floored() {
        let received = (clock().0 - Duration::hours(47))
            .format(RECEIVED_AT_FORMAT)
            .to_string();
        assert_eq!(elapsed_days(&received, &clock()), Some(1));

        let future = (clock().0 + Duration::hours(1))
            .format(RECEIVED_AT_FORMAT)
            .to_string();
        assert_eq!(elapsed_days(&future, &clock()), Some(-1));
    }

    #[test]
    fn test_offset_timestamps() {
        let received = "Mon, 24 Jun 2024 09:00:00 -0500";
        // 2024-06-24 14:00 UTC to 2024-07-01 12:00 UTC
        assert_eq!(elapsed_days(received, &clock()), Some(6));
        assert!(Predicate::LessThanDays.apply(received, "7", &clock()));
    }

    #[test]
    fn test_date_predicates_fail_closed() {
        assert!(!Predicate::LessThanDays.apply("not-a-date", "7", &clock()));
        assert!(!Predicate::GreaterThanDays.apply("not-a-date", "7", &clock()));
        assert!(!Predicate::LessThanDays.apply("", "7", &clock()));
        assert!(!Predicate::LessThanDays.apply("2024-06-25 15:00:00", "7", &clock()));
        assert!(!Predicate::LessThanDays.apply(&days_ago(2), "seven", &clock()));
        assert!(!Predicate::GreaterThanDays.apply(&days_ago(30), "", &clock()));
    }
}
