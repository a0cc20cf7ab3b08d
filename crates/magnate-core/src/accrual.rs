use chrono::{DateTime, Utc};
use contracts::SECONDS_IN_MONTH;

/// Amount owed to an account for the time elapsed since its last credit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElapsedCredit {
    pub amount: f64,
    pub elapsed_seconds: i64,
}

/// Income earned between `last` and `now` at a monthly rate of
/// `passive_income_month`. Elapsed time floors to whole seconds; `None`
/// means there is nothing to credit (no time passed, or no income rate),
/// which callers treat as a no-op rather than an error.
pub fn elapsed_credit(
    passive_income_month: f64,
    last: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Option<ElapsedCredit> {
    if passive_income_month <= 0.0 {
        return None;
    }

    let elapsed_seconds = (now - last).num_seconds();
    if elapsed_seconds <= 0 {
        return None;
    }

    Some(ElapsedCredit {
        amount: passive_income_month * (elapsed_seconds as f64 / SECONDS_IN_MONTH),
        elapsed_seconds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn zero_rate_yields_nothing() {
        let now = Utc::now();
        assert!(elapsed_credit(0.0, now - Duration::hours(5), now).is_none());
        assert!(elapsed_credit(-3.0, now - Duration::hours(5), now).is_none());
    }

    #[test]
    fn no_elapsed_time_yields_nothing() {
        let now = Utc::now();
        assert!(elapsed_credit(100.0, now, now).is_none());
        assert!(elapsed_credit(100.0, now + Duration::seconds(30), now).is_none());
    }

    #[test]
    fn sub_second_elapsed_floors_to_zero() {
        let now = Utc::now();
        assert!(elapsed_credit(100.0, now - Duration::milliseconds(900), now).is_none());
    }

    #[test]
    fn one_day_credits_a_thirtieth_of_the_monthly_rate() {
        let now = Utc::now();
        let credit = elapsed_credit(2592.0, now - Duration::seconds(86_400), now)
            .expect("a day of income is due");

        assert_eq!(credit.elapsed_seconds, 86_400);
        assert!((credit.amount - 2592.0 / 30.0).abs() < 1e-9);
    }

    #[test]
    fn split_credits_sum_to_a_single_credit() {
        let rate = 777.5;
        let start = Utc::now();
        let mid = start + Duration::seconds(4_000);
        let end = start + Duration::seconds(10_000);

        let whole = elapsed_credit(rate, start, end).expect("whole window due");
        let first = elapsed_credit(rate, start, mid).expect("first window due");
        let second = elapsed_credit(rate, mid, end).expect("second window due");

        assert!((whole.amount - (first.amount + second.amount)).abs() < 1e-9);
    }
}
