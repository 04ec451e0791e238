use chrono::{Days, NaiveDate};

/// Splits `[start, end]` into contiguous, inclusive `(window_start,
/// window_end)` pairs of `stride_days` each (default 15, spec §4.7), oldest
/// first. The last window is shortened to fit within `end`.
pub fn default_windows(start: NaiveDate, end: NaiveDate, stride_days: u64) -> Vec<(NaiveDate, NaiveDate)> {
    assert!(stride_days > 0, "stride must be non-zero");
    assert!(start <= end, "start must not be after end");

    let mut windows = Vec::new();
    let mut window_start = start;
    while window_start <= end {
        let window_end = window_start
            .checked_add_days(Days::new(stride_days - 1))
            .unwrap_or(end)
            .min(end);
        windows.push((window_start, window_end));
        window_start = match window_end.checked_add_days(Days::new(1)) {
            Some(next) => next,
            None => break,
        };
    }
    windows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_a_range_into_fifteen_day_strides() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let windows = default_windows(start, end, 15);

        assert_eq!(windows.len(), 3);
        assert_eq!(windows[0], (NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()));
        assert_eq!(windows[1], (NaiveDate::from_ymd_opt(2024, 1, 16).unwrap(), NaiveDate::from_ymd_opt(2024, 1, 30).unwrap()));
        assert_eq!(windows[2], (NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(), NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()));
    }

    #[test]
    fn a_single_day_range_is_one_window() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(default_windows(day, day, 15), vec![(day, day)]);
    }
}
