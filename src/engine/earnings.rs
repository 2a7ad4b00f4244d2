use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// How a job pays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayType {
    /// `rate` is per hour of accrued session time
    Time,
    /// `rate` is per completion
    Task,
}

/// Currency amount in whole cents.
///
/// Serialized as a decimal number (`24.5`), rendered as `$24.50`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Normalize a decimal amount to cents, rounding half up.
    ///
    /// Rounds the shortest decimal text of `amount` rather than its binary
    /// value, so `1.005` becomes `1.01`. Non-finite input is zero.
    pub fn from_decimal(amount: f64) -> Self {
        if !amount.is_finite() {
            return Money::ZERO;
        }
        let text = amount.to_string();
        let (negative, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.as_str()),
        };
        let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));

        let mut fraction = fraction.bytes().map(|b| i64::from(b - b'0'));
        let tenths = fraction.next().unwrap_or(0);
        let hundredths = fraction.next().unwrap_or(0);
        let round_up = fraction.next().is_some_and(|digit| digit >= 5);

        let cents = whole
            .parse::<i64>()
            .unwrap_or(i64::MAX / 100)
            .saturating_mul(100)
            .saturating_add(tenths * 10 + hundredths + i64::from(round_up));
        Money(if negative { -cents } else { cents })
    }

    pub fn cents(self) -> i64 {
        self.0
    }

    pub fn as_decimal(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let cents = self.0.unsigned_abs();
        let dollars = (cents / 100).to_string();

        let mut grouped = String::with_capacity(dollars.len() + dollars.len() / 3);
        for (i, digit) in dollars.chars().enumerate() {
            if i > 0 && (dollars.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(digit);
        }

        write!(f, "{}${}.{:02}", sign, grouped, cents % 100)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_decimal())
    }
}

/// Earnings for `elapsed_seconds` of work.
///
/// Time-based work pays `elapsed / 3600 * rate` rounded up to the next cent,
/// so a single second at any positive rate is worth at least one cent.
/// Task-based work pays the flat rate.
pub fn project(pay_type: PayType, rate: Money, elapsed_seconds: u64) -> Money {
    match pay_type {
        PayType::Task => rate,
        PayType::Time => {
            let numerator = elapsed_seconds as i128 * rate.cents().max(0) as i128;
            let cents = (numerator + 3599) / 3600;
            Money(cents.min(i64::MAX as i128) as i64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_second_at_minimum_wage_earns_a_cent() {
        assert_eq!(project(PayType::Time, Money::from_cents(1500), 1), Money::from_cents(1));
    }

    #[test]
    fn zero_elapsed_earns_nothing() {
        assert_eq!(project(PayType::Time, Money::from_cents(2450), 0), Money::ZERO);
    }

    #[test]
    fn partial_minutes_round_up() {
        // 10m10s at 20.00/h = 3.3888...
        assert_eq!(project(PayType::Time, Money::from_cents(2000), 610), Money::from_cents(339));
        // 3661s at 12.00/h = 12.2033...
        assert_eq!(project(PayType::Time, Money::from_cents(1200), 3661), Money::from_cents(1221));
    }

    #[test]
    fn whole_hours_are_exact() {
        assert_eq!(project(PayType::Time, Money::from_cents(1800), 7200), Money::from_cents(3600));
    }

    #[test]
    fn task_pay_ignores_time() {
        let rate = Money::from_cents(2500);
        assert_eq!(project(PayType::Task, rate, 0), rate);
        assert_eq!(project(PayType::Task, rate, 86_400), rate);
    }

    #[test]
    fn decimal_input_is_normalized_to_cents() {
        assert_eq!(Money::from_decimal(24.5), Money::from_cents(2450));
        assert_eq!(Money::from_decimal(0.125), Money::from_cents(13));
        assert_eq!(Money::from_decimal(19.999), Money::from_cents(2000));
    }

    #[test]
    fn decimal_halves_round_up_from_their_text() {
        assert_eq!(Money::from_decimal(1.005), Money::from_cents(101));
        assert_eq!(Money::from_decimal(2.675), Money::from_cents(268));
        assert_eq!(Money::from_decimal(1.004), Money::from_cents(100));
        assert_eq!(Money::from_decimal(-1.005), Money::from_cents(-101));
        assert_eq!(Money::from_decimal(18.0), Money::from_cents(1800));
        assert_eq!(Money::from_decimal(f64::NAN), Money::ZERO);
    }

    #[test]
    fn renders_as_dollars_with_grouping() {
        assert_eq!(Money::from_cents(1).to_string(), "$0.01");
        assert_eq!(Money::from_cents(1221).to_string(), "$12.21");
        assert_eq!(Money::from_cents(123_456_789).to_string(), "$1,234,567.89");
    }

    #[test]
    fn serializes_as_decimal_number() {
        let json = serde_json::to_value(Money::from_cents(2450)).unwrap();
        assert_eq!(json, serde_json::json!(24.5));
    }
}
