use super::super::domain::{MeterReading, Money};
use super::BillingError;

/// Consumed units between two readings. A meter that reads lower than last period
/// (replacement or rollover) bills nothing rather than a credit.
pub fn utility_usage(reading: MeterReading) -> f64 {
    (reading.current - reading.previous).max(0.0)
}

pub fn utility_cost(reading: MeterReading, rate: Money) -> Result<Money, BillingError> {
    rate.checked_times(utility_usage(reading))
        .ok_or_else(|| BillingError::AmountOutOfRange {
            field: "utility charge".to_string(),
        })
}

pub(crate) fn reading_is_valid(reading: MeterReading) -> bool {
    reading.previous.is_finite()
        && reading.current.is_finite()
        && reading.previous >= 0.0
        && reading.current >= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_is_difference_of_readings() {
        assert_eq!(utility_usage(MeterReading::new(120.0, 130.0)), 10.0);
    }

    #[test]
    fn usage_floors_at_zero_when_meter_goes_backwards() {
        assert_eq!(utility_usage(MeterReading::new(130.0, 120.0)), 0.0);
        assert_eq!(
            utility_cost(MeterReading::new(130.0, 120.0), Money::from_whole(20)),
            Ok(Money::ZERO)
        );
    }

    #[test]
    fn cost_multiplies_usage_by_rate() {
        let cost = utility_cost(MeterReading::new(0.0, 10.0), Money::from_whole(20));
        assert_eq!(cost, Ok(Money::from_whole(200)));

        let fractional = utility_cost(MeterReading::new(100.0, 112.5), Money::from_minor(1_150));
        assert_eq!(fractional, Ok(Money::from_minor(14_375)));
    }

    #[test]
    fn cost_too_large_to_represent_is_an_error() {
        let reading = MeterReading::new(0.0, 1e12);
        assert!(matches!(
            utility_cost(reading, Money::from_whole(1_000_000_000)),
            Err(BillingError::AmountOutOfRange { .. })
        ));
    }

    #[test]
    fn rejects_negative_or_non_finite_readings() {
        assert!(!reading_is_valid(MeterReading::new(-1.0, 4.0)));
        assert!(!reading_is_valid(MeterReading::new(0.0, f64::INFINITY)));
        assert!(reading_is_valid(MeterReading::new(0.0, 0.0)));
    }
}
