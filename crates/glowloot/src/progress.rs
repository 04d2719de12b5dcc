//! # Reveal Progress
//!
//! Cosmetic decryption progress for boxes in `Decrypting`.
//!
//! Each box gets one ticking task. Every tick adds a random step in
//! `[0, max_step]`, capped at 100. The task is owned by a [`ProgressHandle`]:
//!
//! - `complete()` snaps to 100 and cancels
//! - `abandon()` resets to 0 and cancels
//! - dropping the handle cancels
//!
//! The phase is checked under the same lock that applies a step, so once a
//! handle is finalized no tick can change the value again.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::task::JoinHandle;

use crate::lootbox::BoxId;

/// Upper bound of the progress signal.
pub const PROGRESS_MAX: f64 = 100.0;

/// Lifecycle of one progress signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgressPhase {
    /// Still ticking.
    Running,
    /// Snapped to 100 on reveal.
    Completed,
    /// Discarded on failure.
    Abandoned,
}

#[derive(Debug)]
struct ProgressCell {
    value: f64,
    phase: ProgressPhase,
}

/// Spawns progress tasks.
pub struct ProgressCoordinator {
    tick: Duration,
    max_step: f64,
    rng: Mutex<ChaCha8Rng>,
}

impl ProgressCoordinator {
    /// Creates a coordinator seeded from OS entropy.
    #[must_use]
    pub fn new(tick: Duration, max_step: f64) -> Self {
        Self::with_rng(tick, max_step, ChaCha8Rng::from_entropy())
    }

    /// Creates a coordinator with a fixed seed.
    #[must_use]
    pub fn seeded(tick: Duration, max_step: f64, seed: u64) -> Self {
        Self::with_rng(tick, max_step, ChaCha8Rng::seed_from_u64(seed))
    }

    fn with_rng(tick: Duration, max_step: f64, rng: ChaCha8Rng) -> Self {
        Self {
            tick,
            max_step: max_step.max(0.0),
            rng: Mutex::new(rng),
        }
    }

    /// Begins accrual for `box_id`.
    ///
    /// Outside a Tokio runtime the handle is created without a task and
    /// simply holds 0 until finalized.
    #[must_use]
    pub fn start(&self, box_id: &BoxId) -> ProgressHandle {
        let cell = Arc::new(Mutex::new(ProgressCell {
            value: 0.0,
            phase: ProgressPhase::Running,
        }));
        let rng = ChaCha8Rng::seed_from_u64(self.rng.lock().gen());

        let task = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => Some(runtime.spawn(tick_loop(
                Arc::clone(&cell),
                self.tick,
                self.max_step,
                rng,
            ))),
            Err(_) => {
                tracing::warn!(box_id = %box_id, "no runtime; progress will not tick");
                None
            }
        };

        tracing::debug!(box_id = %box_id, "progress started");
        ProgressHandle {
            box_id: box_id.clone(),
            cell,
            task,
        }
    }
}

async fn tick_loop(
    cell: Arc<Mutex<ProgressCell>>,
    tick: Duration,
    max_step: f64,
    mut rng: ChaCha8Rng,
) {
    let mut interval = tokio::time::interval(tick);
    // First tick fires immediately.
    interval.tick().await;

    loop {
        interval.tick().await;
        let step = rng.gen_range(0.0..=max_step);

        let mut cell = cell.lock();
        if cell.phase != ProgressPhase::Running {
            return;
        }
        cell.value = (cell.value + step).min(PROGRESS_MAX);
        if cell.value >= PROGRESS_MAX {
            return;
        }
    }
}

/// Owner of one box's progress task.
#[derive(Debug)]
pub struct ProgressHandle {
    box_id: BoxId,
    cell: Arc<Mutex<ProgressCell>>,
    task: Option<JoinHandle<()>>,
}

impl ProgressHandle {
    /// Current value in `[0, 100]`.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.cell.lock().value
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> ProgressPhase {
        self.cell.lock().phase
    }

    /// Snaps to 100 and stops ticking. No-op once finalized.
    pub fn complete(&mut self) {
        self.finalize(ProgressPhase::Completed, PROGRESS_MAX);
    }

    /// Resets to 0 and stops ticking. No-op once finalized.
    pub fn abandon(&mut self) {
        self.finalize(ProgressPhase::Abandoned, 0.0);
    }

    fn finalize(&mut self, phase: ProgressPhase, value: f64) {
        {
            let mut cell = self.cell.lock();
            if cell.phase != ProgressPhase::Running {
                return;
            }
            cell.phase = phase;
            cell.value = value;
        }
        self.cancel();
        tracing::debug!(box_id = %self.box_id, ?phase, "progress finalized");
    }

    fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for ProgressHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK: Duration = Duration::from_millis(200);

    fn coordinator() -> ProgressCoordinator {
        ProgressCoordinator::seeded(TICK, 15.0, 7)
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_is_monotonic_and_bounded() {
        let handle = coordinator().start(&BoxId::from("box-1"));
        let mut last = handle.value();

        for _ in 0..40 {
            tokio::time::sleep(TICK).await;
            let now = handle.value();
            assert!(now >= last);
            assert!(now <= PROGRESS_MAX);
            last = now;
        }
        assert_eq!(handle.phase(), ProgressPhase::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_complete_snaps_and_freezes() {
        let mut handle = coordinator().start(&BoxId::from("box-1"));
        tokio::time::sleep(TICK * 3).await;

        handle.complete();
        assert_eq!(handle.value(), PROGRESS_MAX);

        tokio::time::sleep(TICK * 10).await;
        assert_eq!(handle.value(), PROGRESS_MAX);
        assert_eq!(handle.phase(), ProgressPhase::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandon_resets_and_no_late_tick() {
        let mut handle = coordinator().start(&BoxId::from("box-2"));
        tokio::time::sleep(TICK * 5).await;

        handle.abandon();
        assert_eq!(handle.value(), 0.0);

        tokio::time::sleep(TICK * 10).await;
        assert_eq!(handle.value(), 0.0);

        // Finalization is one-shot.
        handle.complete();
        assert_eq!(handle.phase(), ProgressPhase::Abandoned);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_step_never_moves() {
        let handle = ProgressCoordinator::seeded(TICK, 0.0, 1).start(&BoxId::from("box-3"));
        tokio::time::sleep(TICK * 10).await;
        assert_eq!(handle.value(), 0.0);
    }

    #[test]
    fn test_start_without_runtime() {
        let mut handle = coordinator().start(&BoxId::from("box-4"));
        assert_eq!(handle.value(), 0.0);
        handle.complete();
        assert_eq!(handle.value(), PROGRESS_MAX);
    }
}
