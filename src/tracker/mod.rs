pub mod activity;
pub mod error;
pub mod instance;

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use self::{activity::Activity, error::TrackerError, instance::TimeInstance};

/// One tabular row of the activities table, the unit of persistence. A row
/// with no stop time is a running instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceRow {
    pub activity: String,
    pub start: DateTime<Utc>,
    pub stop: Option<DateTime<Utc>>,
    pub duration: Duration,
}

/// The timer that `stop_timer` or an implicit stop-then-start finalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoppedTimer {
    pub activity: String,
    pub duration: Duration,
}

/// All tracked activities plus two independent pieces of optional state:
/// which activity has the running timer and which one is selected for
/// display. A user can browse one activity's history while another one's
/// timer runs, so the two are never conflated.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ActivityTracker {
    activities: BTreeMap<String, Activity>,
    active: Option<String>,
    selected: Option<String>,
}

impl ActivityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_activity(&mut self, name: &str) -> Result<(), TrackerError> {
        if self.activities.contains_key(name) {
            return Err(TrackerError::DuplicateName(name.to_string()));
        }
        self.activities
            .insert(name.to_string(), Activity::new(name));
        Ok(())
    }

    /// Removes an activity and all of its instances. Returns false when the
    /// name is unknown. Removing the active activity also drops its timer.
    pub fn remove_activity(&mut self, name: &str) -> bool {
        let removed = self.activities.remove(name).is_some();
        if removed {
            if self.active.as_deref() == Some(name) {
                self.active = None;
            }
            if self.selected.as_deref() == Some(name) {
                self.selected = None;
            }
        }
        removed
    }

    pub fn name_available(&self, name: &str) -> bool {
        !self.activities.contains_key(name)
    }

    pub fn activity(&self, name: &str) -> Option<&Activity> {
        self.activities.get(name)
    }

    /// Mutable access for manual instance edits. Callers must only record
    /// finished instances here; running ones go through `start_timer`.
    pub fn activity_mut(&mut self, name: &str) -> Option<&mut Activity> {
        self.activities.get_mut(name)
    }

    /// Activities in name order.
    pub fn activities(&self) -> impl Iterator<Item = &Activity> {
        self.activities.values()
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }

    /// Starts the timer on `name` at `now`. Any running timer, on this or
    /// any other activity, is finalized first so there is never more than
    /// one running instance across the tracker. Returns what was stopped.
    pub fn start_timer(
        &mut self,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<StoppedTimer>, TrackerError> {
        if self.name_available(name) {
            return Err(TrackerError::UnknownActivity(name.to_string()));
        }
        // Restarting the active activity within the same second would
        // finalize the running instance and reopen one with the same start
        // key, so keep the one that is already running.
        if self.active.as_deref() == Some(name)
            && self
                .activities
                .get(name)
                .and_then(|v| v.instances().iter().find(|i| i.is_running()))
                .is_some_and(|v| v.start() == now)
        {
            return Ok(None);
        }
        let stopped = self.stop_timer(now)?;
        let activity = self
            .activities
            .get_mut(name)
            .ok_or_else(|| TrackerError::UnknownActivity(name.to_string()))?;
        activity.begin_instance(now)?;
        self.active = Some(name.to_string());
        Ok(stopped)
    }

    /// Finalizes the running timer at `now`. Returns None when the tracker
    /// is idle, leaving state untouched.
    pub fn stop_timer(&mut self, now: DateTime<Utc>) -> Result<Option<StoppedTimer>, TrackerError> {
        let Some(name) = self.active.clone() else {
            return Ok(None);
        };
        let Some(activity) = self.activities.get_mut(&name) else {
            // Active name without a backing activity means corrupt state.
            warn!("active activity {name} is missing, clearing timer");
            self.active = None;
            return Ok(None);
        };
        let duration = match activity.running_instance_mut() {
            Some(instance) => {
                instance.stop(now)?;
                instance.duration()
            }
            None => {
                warn!("active activity {name} has no running instance, clearing timer");
                Duration::zero()
            }
        };
        self.active = None;
        Ok(Some(StoppedTimer {
            activity: name,
            duration,
        }))
    }

    pub fn timer_running(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_activity_name(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Live elapsed time of the running timer, None when idle.
    pub fn current_elapsed(&self, now: DateTime<Utc>) -> Option<Duration> {
        let activity = self.activities.get(self.active.as_deref()?)?;
        activity
            .instances()
            .iter()
            .find(|v| v.is_running())
            .map(|v| v.duration_as_of(now))
    }

    /// Selects an activity as the display focus. Returns false and leaves
    /// the selection alone when the name is unknown.
    pub fn set_activity(&mut self, name: &str) -> bool {
        if self.name_available(name) {
            return false;
        }
        self.selected = Some(name.to_string());
        true
    }

    pub fn unload_activity(&mut self) {
        self.selected = None;
    }

    pub fn current_activity(&self) -> Option<&Activity> {
        self.activities.get(self.selected.as_deref()?)
    }

    /// Serializes the tracker to rows, one per instance, activities in name
    /// order and instances in insertion order.
    pub fn to_rows(&self) -> Vec<InstanceRow> {
        self.activities
            .values()
            .flat_map(|activity| {
                activity.instances().iter().map(|instance| InstanceRow {
                    activity: activity.name().to_string(),
                    start: instance.start(),
                    stop: instance.stop_time(),
                    duration: instance.duration(),
                })
            })
            .collect()
    }

    /// Rebuilds a tracker from rows. One activity per distinct name, one
    /// instance per row. The first running row restores the active timer;
    /// rows that violate tracker invariants are skipped with a warning so a
    /// damaged table still loads.
    pub fn from_rows(rows: impl IntoIterator<Item = InstanceRow>) -> Self {
        let mut tracker = Self::new();
        for row in rows {
            let activity = tracker
                .activities
                .entry(row.activity.clone())
                .or_insert_with(|| Activity::new(row.activity.clone()));

            let instance = match row.stop {
                Some(stop) => TimeInstance::finished(row.start, stop),
                None if tracker.active.is_some() => {
                    warn!(
                        "skipping second running instance for {} at {}",
                        row.activity, row.start
                    );
                    continue;
                }
                None => Ok(TimeInstance::begin(row.start)),
            };

            match instance {
                Ok(instance) => {
                    let running = instance.is_running();
                    if let Err(e) = activity.record_instance(instance) {
                        warn!("skipping row for {} at {}: {e}", row.activity, row.start);
                    } else if running {
                        tracker.active = Some(row.activity);
                    }
                }
                Err(e) => warn!("skipping row for {} at {}: {e}", row.activity, row.start),
            }
        }
        tracker
    }
}
