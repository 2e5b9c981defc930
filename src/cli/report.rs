use ansi_term::Colour;
use chrono::{DateTime, Utc};

use crate::{
    tracker::{activity::Activity, instance::TimeInstance, ActivityTracker},
    utils::time::pretty_duration,
};

/// Prints the activity overview: total and trailing 7 day time per
/// activity, with the running one highlighted.
pub fn print_activities(tracker: &ActivityTracker, now: DateTime<Utc>) {
    if tracker.is_empty() {
        println!("No activities yet. Add one with `timekeep add <name>`.");
        return;
    }
    println!("{:<24}{:>12}{:>12}", "Activity", "Total", "7 Day");
    for activity in tracker.activities() {
        let running = tracker.active_activity_name() == Some(activity.name());
        let marker = if running { " *" } else { "" };
        let line = format!(
            "{:<24}{:>12}{:>12}",
            format!("{}{marker}", activity.name()),
            pretty_duration(activity.total_time(now)),
            pretty_duration(activity.last_week_time(now)),
        );
        if running {
            println!("{}", Colour::Green.paint(line));
        } else {
            println!("{line}");
        }
    }
}

/// Prints one activity's instances, newest first. Times are UTC; the start
/// column is also the key for `timekeep delete`.
pub fn print_instances(activity: &Activity, instances: &[&TimeInstance], now: DateTime<Utc>) {
    println!("{:<12}{:<10}{:<10}{:>10}", "Date", "Start", "Stop", "Duration");
    for instance in instances {
        println!(
            "{:<12}{:<10}{:<10}{:>10}",
            instance.pretty_date(),
            instance.pretty_start_time(),
            instance.pretty_stop_time(),
            instance.pretty_duration_as_of(now),
        );
    }
    println!();
    println!("7 day: {}", pretty_duration(activity.last_week_time(now)));
}
