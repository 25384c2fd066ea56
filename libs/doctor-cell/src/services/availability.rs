use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use tracing::debug;

use crate::models::{AvailabilityWindow, DoctorError};

/// Read-only view over a doctor's weekly open hours.
#[derive(Debug, Clone, Copy)]
pub struct AvailabilityModel<'a> {
    windows: &'a [AvailabilityWindow],
}

impl<'a> AvailabilityModel<'a> {
    pub fn new(windows: &'a [AvailabilityWindow]) -> Self {
        Self { windows }
    }

    /// True when some open window on `day` fully contains `[start, end]`.
    /// Overlapping windows are allowed; any single one containing the range suffices.
    pub fn is_open_at(&self, day: Weekday, start: NaiveTime, end: NaiveTime) -> bool {
        let open = self.windows.iter().any(|w| w.contains(day, start, end));
        debug!("Availability check {} {}-{}: {}", day, start, end, open);
        open
    }

    pub fn is_open_on(&self, date: NaiveDate, start: NaiveTime, end: NaiveTime) -> bool {
        self.is_open_at(date.weekday(), start, end)
    }

    /// Open windows for `day`, in stored order.
    pub fn open_windows_on(&self, day: Weekday) -> impl Iterator<Item = &'a AvailabilityWindow> + 'a {
        self.windows
            .iter()
            .filter(move |w| w.is_open && w.day_of_week == day)
    }

    /// Open windows must have `start < end`. Closed windows are stored as given.
    pub fn validate(windows: &[AvailabilityWindow]) -> Result<(), DoctorError> {
        for window in windows.iter().filter(|w| w.is_open) {
            if window.start_time >= window.end_time {
                return Err(DoctorError::ValidationError(format!(
                    "Window on {} must start before it ends ({} >= {})",
                    window.day_of_week, window.start_time, window.end_time
                )));
            }
        }
        Ok(())
    }
}
