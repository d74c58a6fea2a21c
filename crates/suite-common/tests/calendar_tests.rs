//! Property and boundary tests for the 360-day calendar.

use proptest::prelude::*;
use suite_common::{apply_offsets, Calendar, CalendarDate, Offset};

// ============================================================================
// Round trip
// ============================================================================

#[test]
fn test_round_trip_every_day_of_a_century() {
    for year in 1800..1900 {
        for month in 1..=12 {
            for day in 1..=30 {
                let date = CalendarDate::new(year, month, day);
                assert_eq!(CalendarDate::from_ordinal(date.to_ordinal()), date);
            }
        }
    }
}

#[test]
fn test_ordinals_are_consecutive() {
    let mut previous = CalendarDate::new(1849, 12, 30).to_ordinal();
    for ordinal in 0..1000 {
        let date = CalendarDate::from_ordinal(ordinal);
        assert_eq!(date.to_ordinal(), previous + 1);
        previous = date.to_ordinal();
    }
}

proptest! {
    #[test]
    fn prop_ordinal_round_trip(ordinal in -1_000_000i64..1_000_000i64) {
        let date = CalendarDate::from_ordinal(ordinal);
        prop_assert!(date.validate(Calendar::Day360).is_ok());
        prop_assert_eq!(date.to_ordinal(), ordinal);
    }

    #[test]
    fn prop_date_round_trip(year in 0i32..4000, month in 1u32..=12, day in 1u32..=30) {
        let date = CalendarDate::new(year, month, day);
        prop_assert_eq!(CalendarDate::from_ordinal(date.to_ordinal()), date);
    }

    #[test]
    fn prop_day_offsets_are_ordinal_shifts(ordinal in -100_000i64..100_000, days in -5000i64..5000) {
        let date = CalendarDate::from_ordinal(ordinal);
        let shifted = Offset::days(days).apply(date, Calendar::Day360).unwrap();
        prop_assert_eq!(shifted.to_ordinal(), ordinal + days);
    }

    #[test]
    fn prop_year_offsets_are_360_days(ordinal in -100_000i64..100_000, years in -50i32..50) {
        let date = CalendarDate::from_ordinal(ordinal);
        let shifted = Offset::years(years).apply(date, Calendar::Day360).unwrap();
        prop_assert_eq!(shifted.to_ordinal(), ordinal + years as i64 * 360);
    }
}

// ============================================================================
// Offset composition
// ============================================================================

#[test]
fn test_cycle_end_minus_one_day() {
    let offsets: Vec<Offset> = ["P1Y", "-P1D"].iter().map(|s| s.parse().unwrap()).collect();
    let end = apply_offsets(CalendarDate::jan1(1850), &offsets, Calendar::Day360).unwrap();
    assert_eq!(end, CalendarDate::new(1850, 12, 30));
}

#[test]
fn test_gregorian_and_360_disagree_on_month_lengths() {
    let start = CalendarDate::new(1850, 1, 30);
    let day360 = Offset::days(1).apply(start, Calendar::Day360).unwrap();
    let gregorian = Offset::days(1).apply(start, Calendar::Gregorian).unwrap();
    assert_eq!(day360, CalendarDate::new(1850, 2, 1));
    assert_eq!(gregorian, CalendarDate::new(1850, 1, 31));
}
