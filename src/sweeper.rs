// Periodic background maintenance
//
// Both the limiter and the artifact store expire entries lazily on access;
// this task bounds memory and disk for entries nobody touches again.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Run `tick` every `interval` until `cancel` fires.
///
/// The first tick runs right away, so a restart sweeps before serving traffic
/// for long.
pub fn spawn_periodic<F>(
    name: &'static str,
    interval: Duration,
    cancel: CancellationToken,
    mut tick: F,
) -> JoinHandle<()>
where
    F: FnMut() -> usize + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(task = name, "Sweeper stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let removed = tick();
                    if removed > 0 {
                        tracing::info!(task = name, removed, "Sweep finished");
                    } else {
                        tracing::debug!(task = name, "Sweep found nothing to remove");
                    }
                }
            }
        }
    })
}
