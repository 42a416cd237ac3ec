//! Demand forecasting.
//!
//! Exponential-smoothing-style forecast with day-of-week seasonality:
//! historical loans are truncated to calendar days and counted, the overall
//! mean daily count forms the baseline, and each forecast day is scaled by
//! the seasonal factor of its weekday. Deterministic given (loans, now).

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};

use stacksense_core::Loan;

/// Fixed smoothing constant; forecasts are scaled by `1 + ALPHA`.
pub const SMOOTHING_ALPHA: f64 = 0.2;

/// Default forecast horizon.
pub const DEFAULT_HORIZON_DAYS: u32 = 30;

/// One forecast point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandPoint {
    pub date: NaiveDate,
    pub predicted_demand: f64,
}

/// Forecast daily loan demand for `horizon_days` days starting at `now`.
///
/// Produces exactly `horizon_days` points in date order, all values >= 0.
/// With no loan history the baseline is 0 and every point predicts 0.
pub fn forecast(loans: &[Loan], now: DateTime<Utc>, horizon_days: u32) -> Vec<DemandPoint> {
    let mut daily_counts: HashMap<NaiveDate, u64> = HashMap::new();
    for loan in loans {
        *daily_counts.entry(loan.borrowed_at.date_naive()).or_default() += 1;
    }

    let baseline = if daily_counts.is_empty() {
        0.0
    } else {
        daily_counts.values().map(|&c| c as f64).sum::<f64>() / daily_counts.len() as f64
    };

    let weekday_means = weekday_means(&daily_counts);

    let today = now.date_naive();
    (0..horizon_days)
        .map(|offset| {
            let date = today
                .checked_add_days(Days::new(u64::from(offset)))
                .unwrap_or(today);
            let factor = seasonal_factor(&weekday_means, date.weekday());
            DemandPoint {
                date,
                predicted_demand: baseline * factor * (1.0 + SMOOTHING_ALPHA),
            }
        })
        .collect()
}

/// Mean observed daily count per weekday, over days that saw any loans.
fn weekday_means(daily_counts: &HashMap<NaiveDate, u64>) -> HashMap<Weekday, f64> {
    let mut sums: HashMap<Weekday, (u64, u64)> = HashMap::new();
    for (date, &count) in daily_counts {
        let entry = sums.entry(date.weekday()).or_default();
        entry.0 += count;
        entry.1 += 1;
    }
    sums.into_iter()
        .map(|(weekday, (sum, days))| (weekday, sum as f64 / days as f64))
        .collect()
}

/// That weekday's mean daily count relative to the mean of weekday means.
///
/// Defaults to 1.0 when the weekday was never observed or the overall mean
/// is 0 (no division by zero).
fn seasonal_factor(weekday_means: &HashMap<Weekday, f64>, weekday: Weekday) -> f64 {
    if weekday_means.is_empty() {
        return 1.0;
    }
    let overall = weekday_means.values().sum::<f64>() / weekday_means.len() as f64;
    if overall == 0.0 {
        return 1.0;
    }
    weekday_means.get(&weekday).map_or(1.0, |mean| mean / overall)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{book, closed_loan, ts, user};
    use proptest::prelude::*;

    fn loans_on(days: &[(u32, u32)]) -> Vec<Loan> {
        let b = book("Dune", "Science Fiction", 3, 3);
        let u = user("reader");
        days.iter()
            .map(|&(month, day)| closed_loan(b.id, u.id, ts(month, day, 10), 7))
            .collect()
    }

    #[test]
    fn no_history_forecasts_all_zeros() {
        let points = forecast(&[], ts(6, 1, 12), DEFAULT_HORIZON_DAYS);
        assert_eq!(points.len(), 30);
        assert!(points.iter().all(|p| p.predicted_demand == 0.0));
    }

    #[test]
    fn uniform_history_forecasts_baseline_times_alpha() {
        // One loan on each of seven consecutive days: every weekday mean is 1,
        // so every seasonal factor is 1 and each prediction is 1 * 1.2.
        let loans = loans_on(&[(3, 2), (3, 3), (3, 4), (3, 5), (3, 6), (3, 7), (3, 8)]);
        let points = forecast(&loans, ts(6, 1, 12), 7);
        for point in points {
            assert!((point.predicted_demand - 1.2).abs() < 1e-9);
        }
    }

    #[test]
    fn busy_weekday_is_scaled_up() {
        // Mondays (Mar 2, Mar 9) see 2 loans each; Tuesday (Mar 3) sees 1.
        // Weekday means: Mon = 2, Tue = 1; overall mean = 1.5.
        let loans = loans_on(&[(3, 2), (3, 2), (3, 9), (3, 9), (3, 3)]);
        // June 1 2026 is a Monday.
        let points = forecast(&loans, ts(6, 1, 0), 2);

        let baseline = 5.0 / 3.0; // 5 loans over 3 observed days
        let monday = baseline * (2.0 / 1.5) * 1.2;
        let tuesday = baseline * (1.0 / 1.5) * 1.2;
        assert!((points[0].predicted_demand - monday).abs() < 1e-9);
        assert!((points[1].predicted_demand - tuesday).abs() < 1e-9);
        assert!(points[0].predicted_demand > points[1].predicted_demand);
    }

    #[test]
    fn unobserved_weekday_defaults_to_factor_one() {
        // History only on a Monday; the Tuesday forecast falls back to 1.0.
        let loans = loans_on(&[(3, 2)]);
        let points = forecast(&loans, ts(6, 2, 0), 1); // June 2 2026 is a Tuesday
        assert!((points[0].predicted_demand - 1.2).abs() < 1e-9);
    }

    proptest! {
        /// Forecast length, ordering and non-negativity hold for arbitrary
        /// borrow-day histories.
        #[test]
        fn forecast_is_ordered_and_non_negative(
            day_offsets in prop::collection::vec(0i64..365, 0..60),
            horizon in 0u32..60,
        ) {
            let b = book("Dune", "Science Fiction", 3, 3);
            let u = user("reader");
            let origin = ts(1, 1, 10);
            let loans: Vec<Loan> = day_offsets
                .iter()
                .map(|&d| closed_loan(b.id, u.id, origin + chrono::Duration::days(d), 7))
                .collect();

            let points = forecast(&loans, ts(6, 1, 12), horizon);
            prop_assert_eq!(points.len(), horizon as usize);
            for pair in points.windows(2) {
                prop_assert!(pair[0].date < pair[1].date);
            }
            for point in &points {
                prop_assert!(point.predicted_demand >= 0.0);
            }
        }
    }
}
