use chrono::{DateTime, Duration, Utc};

use crate::utils::time::pretty_duration;

use super::error::TrackerError;

/// One recorded time interval of an activity. An instance without a stop
/// time is still running and its duration grows with the clock.
///
/// Within an activity an instance is identified by its start time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeInstance {
    start: DateTime<Utc>,
    stop: Option<DateTime<Utc>>,
    duration: Duration,
}

impl TimeInstance {
    /// Creates a running instance starting at `start`.
    pub fn begin(start: DateTime<Utc>) -> Self {
        Self {
            start,
            stop: None,
            duration: Duration::zero(),
        }
    }

    /// Creates an already finished instance, for manual entry and loading
    /// from the activities table.
    pub fn finished(start: DateTime<Utc>, stop: DateTime<Utc>) -> Result<Self, TrackerError> {
        if stop < start {
            return Err(TrackerError::InvalidInterval { start, stop });
        }
        Ok(Self {
            start,
            stop: Some(stop),
            duration: stop - start,
        })
    }

    /// Finalizes a running instance. Finalizing twice only moves the stop
    /// time forward through the same validation.
    pub fn stop(&mut self, stop: DateTime<Utc>) -> Result<(), TrackerError> {
        if stop < self.start {
            return Err(TrackerError::InvalidInterval {
                start: self.start,
                stop,
            });
        }
        self.stop = Some(stop);
        self.duration = stop - self.start;
        Ok(())
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn stop_time(&self) -> Option<DateTime<Utc>> {
        self.stop
    }

    /// Recorded duration. Zero while the instance is running.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn is_running(&self) -> bool {
        self.stop.is_none()
    }

    /// Duration observed at `now`: the stored duration once stopped, the
    /// elapsed time so far while running. Never negative.
    pub fn duration_as_of(&self, now: DateTime<Utc>) -> Duration {
        match self.stop {
            Some(_) => self.duration,
            None => (now - self.start).max(Duration::zero()),
        }
    }

    pub fn pretty_date(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    pub fn pretty_start_time(&self) -> String {
        self.start.format("%H:%M:%S").to_string()
    }

    pub fn pretty_stop_time(&self) -> String {
        match self.stop {
            Some(stop) => stop.format("%H:%M:%S").to_string(),
            None => "running".to_string(),
        }
    }

    pub fn pretty_duration_as_of(&self, now: DateTime<Utc>) -> String {
        pretty_duration(self.duration_as_of(now))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use crate::tracker::error::TrackerError;

    use super::TimeInstance;

    #[test]
    fn stop_before_start_is_rejected() {
        let start = Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap();
        let stop = start - Duration::seconds(1);

        let mut instance = TimeInstance::begin(start);
        assert_eq!(
            instance.stop(stop),
            Err(TrackerError::InvalidInterval { start, stop })
        );
        assert!(instance.is_running());

        assert_eq!(
            TimeInstance::finished(start, stop),
            Err(TrackerError::InvalidInterval { start, stop })
        );
    }

    #[test]
    fn stopped_instance_keeps_recorded_duration() {
        let start = Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap();
        let stop = start + Duration::minutes(90);
        let instance = TimeInstance::finished(start, stop).unwrap();

        assert_eq!(instance.duration(), Duration::minutes(90));
        // `now` is irrelevant once stopped.
        assert_eq!(
            instance.duration_as_of(stop + Duration::hours(5)),
            Duration::minutes(90)
        );
    }

    #[test]
    fn running_instance_tracks_elapsed_time() {
        let start = Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap();
        let instance = TimeInstance::begin(start);

        assert_eq!(
            instance.duration_as_of(start + Duration::minutes(10)),
            Duration::minutes(10)
        );
        // A clock observed before the start never yields a negative value.
        assert_eq!(
            instance.duration_as_of(start - Duration::minutes(1)),
            Duration::zero()
        );
    }

    #[test]
    fn pretty_helpers() {
        let start = Utc.with_ymd_and_hms(2024, 3, 15, 9, 5, 7).unwrap();
        let mut instance = TimeInstance::begin(start);
        assert_eq!(instance.pretty_date(), "2024-03-15");
        assert_eq!(instance.pretty_start_time(), "09:05:07");
        assert_eq!(instance.pretty_stop_time(), "running");

        instance.stop(start + Duration::seconds(3725)).unwrap();
        assert_eq!(instance.pretty_stop_time(), "10:07:12");
        assert_eq!(instance.pretty_duration_as_of(start), "1:02:05");
    }
}
