use chrono::{DateTime, Duration, Utc};

use super::{error::TrackerError, instance::TimeInstance};

/// A named category of tracked time. Owns its instances; at most one of
/// them may be running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    name: String,
    instances: Vec<TimeInstance>,
}

impl Activity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instances: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instances(&self) -> &[TimeInstance] {
        &self.instances
    }

    /// Opens a new running instance at `start`.
    pub fn begin_instance(&mut self, start: DateTime<Utc>) -> Result<(), TrackerError> {
        if self.has_running_instance() {
            return Err(TrackerError::AlreadyRunning(self.name.clone()));
        }
        self.record_instance(TimeInstance::begin(start))
    }

    /// Adds a prebuilt instance, used for manual entries and loading. Start
    /// times are the instance identity, so duplicates are rejected.
    pub fn record_instance(&mut self, instance: TimeInstance) -> Result<(), TrackerError> {
        if instance.is_running() && self.has_running_instance() {
            return Err(TrackerError::AlreadyRunning(self.name.clone()));
        }
        if self.instances.iter().any(|v| v.start() == instance.start()) {
            return Err(TrackerError::DuplicateStart(instance.start()));
        }
        self.instances.push(instance);
        Ok(())
    }

    /// Removes the instance starting at `start`. Returns false when there
    /// is no such instance; the caller decides whether that matters.
    pub fn delete_instance(&mut self, start: DateTime<Utc>) -> bool {
        let before = self.instances.len();
        self.instances.retain(|v| v.start() != start);
        self.instances.len() != before
    }

    /// Instances ordered by start time descending. Recomputed on each call.
    pub fn sorted_instances(&self) -> Vec<&TimeInstance> {
        let mut instances: Vec<&TimeInstance> = self.instances.iter().collect();
        instances.sort_by_key(|v| std::cmp::Reverse(v.start()));
        instances
    }

    /// Total time across all instances, counting the running one up to `now`.
    pub fn total_time(&self, now: DateTime<Utc>) -> Duration {
        self.instances
            .iter()
            .fold(Duration::zero(), |acc, v| acc + v.duration_as_of(now))
    }

    /// Time spent in instances started within the trailing 7 days. An
    /// instance straddling the boundary counts by its whole recorded
    /// duration, not a clipped one.
    pub fn last_week_time(&self, now: DateTime<Utc>) -> Duration {
        let cutoff = now - Duration::days(7);
        self.instances
            .iter()
            .filter(|v| v.start() >= cutoff)
            .fold(Duration::zero(), |acc, v| acc + v.duration_as_of(now))
    }

    pub fn has_running_instance(&self) -> bool {
        self.instances.iter().any(|v| v.is_running())
    }

    pub(super) fn running_instance_mut(&mut self) -> Option<&mut TimeInstance> {
        self.instances.iter_mut().find(|v| v.is_running())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use crate::tracker::{error::TrackerError, instance::TimeInstance};

    use super::Activity;

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn second_running_instance_is_rejected() {
        let mut activity = Activity::new("coding");
        activity.begin_instance(base_time()).unwrap();

        assert_eq!(
            activity.begin_instance(base_time() + Duration::minutes(1)),
            Err(TrackerError::AlreadyRunning("coding".into()))
        );
    }

    #[test]
    fn stopped_instance_does_not_block_a_new_timer() {
        let mut activity = Activity::new("coding");
        activity
            .record_instance(
                TimeInstance::finished(base_time(), base_time() + Duration::minutes(90)).unwrap(),
            )
            .unwrap();

        // Overlap with a stopped instance is fine, only a second running one
        // is an error.
        activity
            .begin_instance(base_time() + Duration::minutes(30))
            .unwrap();
        assert!(activity.has_running_instance());
    }

    #[test]
    fn duplicate_start_is_rejected() {
        let mut activity = Activity::new("coding");
        activity
            .record_instance(
                TimeInstance::finished(base_time(), base_time() + Duration::minutes(10)).unwrap(),
            )
            .unwrap();

        assert_eq!(
            activity.record_instance(
                TimeInstance::finished(base_time(), base_time() + Duration::minutes(20)).unwrap()
            ),
            Err(TrackerError::DuplicateStart(base_time()))
        );
        assert_eq!(activity.instances().len(), 1);
    }

    #[test]
    fn delete_missing_instance_returns_false() {
        let mut activity = Activity::new("coding");
        activity
            .record_instance(
                TimeInstance::finished(base_time(), base_time() + Duration::minutes(10)).unwrap(),
            )
            .unwrap();

        assert!(!activity.delete_instance(base_time() + Duration::hours(1)));
        assert!(activity.delete_instance(base_time()));
        assert!(activity.instances().is_empty());
    }

    #[test]
    fn sorted_instances_are_start_descending() {
        let mut activity = Activity::new("coding");
        for offset in [3, 1, 2] {
            activity
                .record_instance(
                    TimeInstance::finished(
                        base_time() + Duration::hours(offset),
                        base_time() + Duration::hours(offset) + Duration::minutes(5),
                    )
                    .unwrap(),
                )
                .unwrap();
        }

        let starts: Vec<_> = activity
            .sorted_instances()
            .iter()
            .map(|v| v.start())
            .collect();
        assert_eq!(
            starts,
            vec![
                base_time() + Duration::hours(3),
                base_time() + Duration::hours(2),
                base_time() + Duration::hours(1),
            ]
        );
    }

    #[test]
    fn total_time_counts_running_elapsed() {
        let mut activity = Activity::new("coding");
        activity
            .record_instance(
                TimeInstance::finished(
                    base_time() - Duration::hours(2),
                    base_time() - Duration::hours(1),
                )
                .unwrap(),
            )
            .unwrap();
        activity.begin_instance(base_time()).unwrap();

        let now = base_time() + Duration::minutes(30);
        assert_eq!(
            activity.total_time(now),
            Duration::hours(1) + Duration::minutes(30)
        );
        // Idempotent when nothing is running.
        activity.running_instance_mut().unwrap().stop(now).unwrap();
        assert_eq!(activity.total_time(now), activity.total_time(now + Duration::days(1)));
    }

    #[test]
    fn last_week_window_is_inclusive_at_seven_days() {
        let now = base_time();
        let mut activity = Activity::new("coding");
        activity
            .record_instance(
                TimeInstance::finished(
                    now - Duration::days(8),
                    now - Duration::days(8) + Duration::hours(1),
                )
                .unwrap(),
            )
            .unwrap();
        activity
            .record_instance(
                TimeInstance::finished(
                    now - Duration::days(6),
                    now - Duration::days(6) + Duration::minutes(30),
                )
                .unwrap(),
            )
            .unwrap();
        activity
            .record_instance(
                TimeInstance::finished(
                    now - Duration::days(7),
                    now - Duration::days(7) + Duration::minutes(15),
                )
                .unwrap(),
            )
            .unwrap();

        assert_eq!(
            activity.last_week_time(now),
            Duration::minutes(45),
        );
    }
}
