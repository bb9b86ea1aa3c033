use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use super::Priority;

pub const DEFAULT_HOURS_PER_UNIT: u32 = 2;

/// Estimated production time in whole hours: `hours_per_unit` per window,
/// scaled by the priority multiplier and rounded up.
pub fn estimate_production_hours(
    unit_quantities: impl IntoIterator<Item = i32>,
    priority: Priority,
    hours_per_unit: u32,
) -> i64 {
    let units: i64 = unit_quantities.into_iter().map(i64::from).sum();
    let base = Decimal::from(units) * Decimal::from(hours_per_unit);
    (base * priority.time_multiplier())
        .ceil()
        .to_i64()
        .unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn urgent_order_of_five_units_takes_eight_hours() {
        assert_eq!(
            estimate_production_hours([2, 3], Priority::Urgent, DEFAULT_HOURS_PER_UNIT),
            8
        );
    }

    #[rstest]
    #[case(Priority::Low, 3, 8)]
    #[case(Priority::Normal, 3, 6)]
    #[case(Priority::High, 3, 6)]
    #[case(Priority::Urgent, 3, 5)]
    #[case(Priority::Low, 10, 24)]
    fn multiplier_rounds_up(#[case] priority: Priority, #[case] units: i32, #[case] hours: i64) {
        assert_eq!(
            estimate_production_hours([units], priority, DEFAULT_HOURS_PER_UNIT),
            hours
        );
    }

    #[test]
    fn no_items_no_time() {
        assert_eq!(estimate_production_hours([], Priority::Normal, 2), 0);
    }
}
