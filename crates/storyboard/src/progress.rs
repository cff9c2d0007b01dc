use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;

pub const PROGRESS_TICK: Duration = Duration::from_millis(250);
const CAP: f32 = 95.0;

/// Simulated progress for a request with no real progress reporting.
#[derive(Debug, Clone)]
pub struct ProgressEstimator {
    step: f32,
    percent: f32,
}

impl ProgressEstimator {
    pub fn new(estimate: Duration) -> Self {
        let estimate = estimate.max(PROGRESS_TICK);
        Self {
            step: 100.0 * PROGRESS_TICK.as_secs_f32() / estimate.as_secs_f32(),
            percent: 0.0,
        }
    }

    pub fn percent(&self) -> u8 {
        self.percent.floor() as u8
    }

    /// Advance by one tick; never passes 95 on its own.
    pub fn tick(&mut self) -> u8 {
        self.percent = (self.percent + self.step).min(CAP);
        self.percent()
    }

    pub fn complete(&mut self) -> u8 {
        self.percent = 100.0;
        100
    }
}

/// Drive `fut` to completion while publishing estimated progress on `tx`.
///
/// Progress jumps to 100 only when `fut` yields `Ok`.
pub async fn track<T, E, F>(fut: F, estimate: Duration, tx: &watch::Sender<u8>) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    let mut estimator = ProgressEstimator::new(estimate);
    let _ = tx.send(estimator.percent());
    let mut ticker = tokio::time::interval(PROGRESS_TICK);
    ticker.tick().await;
    tokio::pin!(fut);
    loop {
        tokio::select! {
            result = &mut fut => {
                if result.is_ok() {
                    let _ = tx.send(estimator.complete());
                }
                return result;
            }
            _ = ticker.tick() => {
                let _ = tx.send(estimator.tick());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caps_at_ninety_five() {
        let mut est = ProgressEstimator::new(Duration::from_secs(1));
        assert_eq!(est.tick(), 25);
        for _ in 0..20 {
            est.tick();
        }
        assert_eq!(est.percent(), 95);
        assert_eq!(est.complete(), 100);
    }

    #[test]
    fn longer_estimates_advance_slower() {
        let mut short = ProgressEstimator::new(Duration::from_secs(30));
        let mut long = ProgressEstimator::new(Duration::from_secs(75));
        for _ in 0..40 {
            short.tick();
            long.tick();
        }
        assert!(short.percent() > long.percent());
    }

    #[tokio::test(start_paused = true)]
    async fn tracks_until_completion() {
        let (tx, rx) = watch::channel(0u8);
        let fut = async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, ()>("done")
        };
        let result = track(fut, Duration::from_secs(30), &tx).await;
        assert_eq!(result, Ok("done"));
        assert_eq!(*rx.borrow(), 100);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_keeps_last_estimate() {
        let (tx, rx) = watch::channel(0u8);
        let fut = async {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Err::<(), _>("boom")
        };
        assert!(track(fut, Duration::from_secs(30), &tx).await.is_err());
        let last = *rx.borrow();
        assert!(last > 0 && last < 95, "unexpected progress {last}");
    }
}
