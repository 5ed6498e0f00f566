//! Expiry calendar and maturity selection.

use chrono::{Datelike, NaiveDate, Weekday};

/// Nearest DTE that is at least `min_dte` and no more than `max_dte`.
pub fn select_expiry(available_dtes: &[i64], min_dte: i64, max_dte: i64) -> Option<i64> {
    available_dtes
        .iter()
        .copied()
        .filter(|&d| d >= min_dte && d <= max_dte)
        .min()
}

/// Standard monthly equity option expiry.
pub fn third_friday(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_weekday_of_month_opt(year, month, Weekday::Fri, 3)
}

/// The next `count` monthly expiries strictly after `as_of`.
pub fn monthly_expiries(as_of: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let mut out = Vec::with_capacity(count);
    let (mut year, mut month) = (as_of.year(), as_of.month());
    while out.len() < count {
        if let Some(date) = third_friday(year, month) {
            if date > as_of {
                out.push(date);
            }
        }
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn picks_smallest_dte_at_or_above_floor() {
        assert_eq!(select_expiry(&[12, 29, 33, 47, 61], 30, 60), Some(33));
        assert_eq!(select_expiry(&[30, 45], 30, 60), Some(30));
    }

    #[test]
    fn nothing_inside_band() {
        assert_eq!(select_expiry(&[5, 12, 70], 30, 60), None);
        assert_eq!(select_expiry(&[], 30, 60), None);
    }

    #[test]
    fn third_fridays() {
        assert_eq!(third_friday(2024, 6), Some(d(2024, 6, 21)));
        assert_eq!(third_friday(2024, 3), Some(d(2024, 3, 15)));
    }

    #[test]
    fn monthly_expiries_roll_over_year_end() {
        let got = monthly_expiries(d(2024, 11, 20), 3);
        assert_eq!(got, vec![d(2024, 12, 20), d(2025, 1, 17), d(2025, 2, 21)]);
    }

    #[test]
    fn expiry_on_as_of_date_is_skipped() {
        let got = monthly_expiries(d(2024, 6, 21), 1);
        assert_eq!(got, vec![d(2024, 7, 19)]);
    }
}
