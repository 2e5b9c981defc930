use std::{io::Write, time::Duration};

use anyhow::Result;
use tokio::select;
use tokio_util::sync::CancellationToken;

use crate::{
    tracker::ActivityTracker,
    utils::{clock::Clock, time::pretty_duration},
};

/// Rewrites the elapsed time of the running timer once a second until
/// interrupted. Display only; nothing is mutated or saved.
pub async fn run_watch(
    tracker: &ActivityTracker,
    clock: &dyn Clock,
    cancel: CancellationToken,
) -> Result<()> {
    let Some(name) = tracker.active_activity_name() else {
        println!("No timer running.");
        return Ok(());
    };

    while let Some(elapsed) = tracker.current_elapsed(clock.time()) {
        print!("\r{name}: {}", pretty_duration(elapsed));
        std::io::stdout().flush()?;
        select! {
            _ = cancel.cancelled() => break,
            _ = clock.sleep(Duration::from_secs(1)) => {}
        }
    }
    println!();
    Ok(())
}

/// Cancels the token on ctrl-c, ending the watch loop.
pub async fn cancel_on_interrupt(cancel: CancellationToken) {
    select! {
        _ = tokio::signal::ctrl_c() => {
            cancel.cancel();
        },
    };
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use anyhow::Result;
    use chrono::{DateTime, TimeZone, Utc};
    use tokio::time::Instant;
    use tokio_util::sync::CancellationToken;

    use crate::{tracker::ActivityTracker, utils::clock::Clock};

    use super::run_watch;

    struct TestClock {
        start_time: DateTime<Utc>,
        reference: Instant,
    }

    #[async_trait::async_trait]
    impl Clock for TestClock {
        fn time(&self) -> DateTime<Utc> {
            self.start_time + self.reference.elapsed()
        }

        async fn sleep(&self, duration: Duration) {
            tokio::time::sleep(duration).await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn watch_stops_on_cancellation() -> Result<()> {
        let start = Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap();
        let mut tracker = ActivityTracker::new();
        tracker.add_activity("coding")?;
        tracker.start_timer("coding", start)?;

        let clock = TestClock {
            start_time: start,
            reference: Instant::now(),
        };
        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            canceller.cancel();
        });

        run_watch(&tracker, &clock, cancel).await?;
        Ok(())
    }

    #[tokio::test]
    async fn watch_returns_immediately_when_idle() -> Result<()> {
        let mut tracker = ActivityTracker::new();
        tracker.add_activity("coding")?;

        let clock = TestClock {
            start_time: Utc::now(),
            reference: Instant::now(),
        };
        run_watch(&tracker, &clock, CancellationToken::new()).await?;
        Ok(())
    }
}
