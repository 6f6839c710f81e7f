use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::time::{Duration, Instant, MissedTickBehavior};

use crate::models::Sample;

use super::{liveness::LivenessToken, source::SampleSource, TickCallback};

const ENABLE_LOGS: bool = true;
const LOG_TAG: &str = "sampler";

use crate::{log_debug, log_info};

pub(crate) async fn sampling_loop(
    interval: Duration,
    threshold: u8,
    source: Arc<dyn SampleSource>,
    on_tick: TickCallback,
    token: LivenessToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut last_timestamp: Option<DateTime<Utc>> = None;
    let mut ticks: u64 = 0;

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                log_info!("sampling loop {} shutting down after {} ticks", token.id(), ticks);
                break;
            }
            _ = ticker.tick() => {
                let fired = token.run_if_live(|| {
                    let timestamp = non_decreasing(Utc::now(), &mut last_timestamp);
                    let sample = Sample::classify(source.detect(), timestamp, threshold);
                    on_tick(sample);
                });

                if !fired {
                    log_debug!("tick for {} skipped; token no longer live", token.id());
                    break;
                }
                ticks += 1;
            }
        }
    }
}

/// Clamps `now` so successive tick timestamps never go backwards.
fn non_decreasing(now: DateTime<Utc>, last: &mut Option<DateTime<Utc>>) -> DateTime<Utc> {
    let timestamp = match *last {
        Some(previous) if now < previous => previous,
        _ => now,
    };
    *last = Some(timestamp);
    timestamp
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    #[test]
    fn clock_regressions_are_clamped() {
        let t0 = Utc::now();
        let mut last = None;
        assert_eq!(non_decreasing(t0, &mut last), t0);
        assert_eq!(non_decreasing(t0 - ChronoDuration::seconds(3), &mut last), t0);
        let later = t0 + ChronoDuration::seconds(1);
        assert_eq!(non_decreasing(later, &mut last), later);
    }
}
