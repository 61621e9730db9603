//! Date handling for output time steps.

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{SstError, SstResult};
use crate::resolution::TemporalResolution;

/// Half-open date range `[start, end)` of one output time step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeStep {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TimeStep {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: &NaiveDate) -> bool {
        date >= &self.start && date < &self.end
    }

    /// Zero-based month of the step start, as used to select monthly LUTs.
    pub fn month0(&self) -> usize {
        self.start.month0() as usize
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

/// Parse a date in `YYYY-MM-DD` or RFC 3339 form.
pub fn parse_date(s: &str) -> SstResult<NaiveDate> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc).date_naive());
    }
    Err(SstError::invalid_argument(format!("invalid date: {}", s)))
}

/// Start of the step following one beginning at `start`.
pub fn next_step_start(start: NaiveDate, resolution: TemporalResolution) -> SstResult<NaiveDate> {
    let next = match resolution {
        TemporalResolution::Daily => start.checked_add_days(Days::new(1)),
        TemporalResolution::Weekly5d => start.checked_add_days(Days::new(5)),
        TemporalResolution::Weekly7d => start.checked_add_days(Days::new(7)),
        TemporalResolution::Monthly => start.checked_add_months(Months::new(1)),
        TemporalResolution::Seasonal => start.checked_add_months(Months::new(3)),
        TemporalResolution::Annual => start.checked_add_months(Months::new(12)),
    };
    next.ok_or_else(|| SstError::out_of_range(format!("date overflow after {}", start)))
}

/// Consecutive steps starting at `start` while the step start is before `end`.
///
/// The last step may extend past `end`.
pub fn time_steps(
    start: NaiveDate,
    end: NaiveDate,
    resolution: TemporalResolution,
) -> SstResult<Vec<TimeStep>> {
    let mut steps = Vec::new();
    let mut current = start;
    while current < end {
        let next = next_step_start(current, resolution)?;
        steps.push(TimeStep::new(current, next));
        current = next;
    }
    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_monthly_steps() {
        let steps = time_steps(date(2003, 1, 1), date(2004, 1, 1), TemporalResolution::Monthly).unwrap();
        assert_eq!(steps.len(), 12);
        assert_eq!(steps[1], TimeStep::new(date(2003, 2, 1), date(2003, 3, 1)));
        assert_eq!(steps[11].month0(), 11);
    }

    #[test]
    fn test_weekly_steps_overrun_end() {
        let steps = time_steps(date(2003, 1, 1), date(2003, 1, 12), TemporalResolution::Weekly5d).unwrap();
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[2].end, date(2003, 1, 16));
    }

    #[test]
    fn test_seasonal_and_annual() {
        let steps = time_steps(date(2003, 1, 1), date(2004, 1, 1), TemporalResolution::Seasonal).unwrap();
        assert_eq!(steps.len(), 4);
        assert_eq!(steps[3].start, date(2003, 10, 1));
        let steps = time_steps(date(2003, 1, 1), date(2004, 1, 1), TemporalResolution::Annual).unwrap();
        assert_eq!(steps.len(), 1);
    }

    #[test]
    fn test_empty_range() {
        assert!(time_steps(date(2003, 1, 1), date(2003, 1, 1), TemporalResolution::Daily)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2003-04-05").unwrap(), date(2003, 4, 5));
        assert_eq!(parse_date("2003-04-05T12:00:00Z").unwrap(), date(2003, 4, 5));
        assert!(parse_date("05/04/2003").is_err());
    }
}
