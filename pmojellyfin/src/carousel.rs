//! Featured banner rotation
//!
//! [`Carousel`] schedules which entry of the featured row is on screen.
//! With two or more entries it advances every rotation period; with zero
//! or one entry no timer runs at all. Manual navigation moves immediately
//! and restarts the timer at a full period, so the banner never flips
//! right after the user pressed next.
//!
//! Every index change goes through [`Inner::advance`], and the timer is
//! re-armed in exactly one place, the top of the worker loop. Armed
//! deadlines carry an epoch; one that expired before a manual move or a
//! replacement is dropped instead of advancing a second time.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::debug;

/// Default time between automatic rotations
pub const DEFAULT_ROTATION_PERIOD: Duration = Duration::from_secs(10);

/// Behavior implied by the number of entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarouselMode {
    /// No entries, nothing to show
    Empty,
    /// One entry, shown without rotation
    Static,
    /// Two or more entries, rotating on a timer
    Cycling,
}

/// Direction of one rotation step
#[derive(Debug, Clone, Copy)]
enum Step {
    Forward,
    Backward,
}

#[derive(Debug)]
struct Inner {
    index: usize,
    len: usize,
    period: Duration,
    /// Counts manual moves and replacements; a deadline armed under an
    /// older epoch is stale and must not advance
    epoch: u64,
}

impl Inner {
    /// Move one step, wrapping around
    ///
    /// The only place the index ever changes outside of a replacement.
    /// Returns whether a move happened; with fewer than two entries this
    /// is a no-op.
    fn advance(&mut self, step: Step) -> bool {
        if self.len <= 1 {
            return false;
        }
        self.index = match step {
            Step::Forward => (self.index + 1) % self.len,
            Step::Backward => (self.index + self.len - 1) % self.len,
        };
        true
    }

    /// Move one step on user input, invalidating any armed deadline
    fn manual_advance(&mut self, step: Step) -> bool {
        if !self.advance(step) {
            return false;
        }
        self.epoch += 1;
        true
    }

    /// Move one step when the rotation deadline fires
    ///
    /// A manual move or a replacement that landed after the deadline was
    /// armed wins; the stale advance is dropped.
    fn timer_advance(&mut self, armed_epoch: u64) -> bool {
        if self.epoch != armed_epoch {
            return false;
        }
        self.advance(Step::Forward)
    }

    /// Install a new entry list, restarting from the first entry
    fn replace(&mut self, len: usize) {
        self.len = len;
        self.index = 0;
        self.epoch += 1;
    }

    fn mode(&self) -> CarouselMode {
        match self.len {
            0 => CarouselMode::Empty,
            1 => CarouselMode::Static,
            _ => CarouselMode::Cycling,
        }
    }
}

/// Rotation scheduler for the featured banner
///
/// Holds only the entry count and the current index; pairing the index
/// with the actual card list is up to the caller. Dropping the carousel
/// stops the rotation task.
pub struct Carousel {
    inner: Arc<Mutex<Inner>>,
    rearm: Arc<Notify>,
    worker: JoinHandle<()>,
}

impl Carousel {
    /// Create a carousel over `len` entries with the default period
    pub fn new(len: usize) -> Self {
        Self::with_period(len, DEFAULT_ROTATION_PERIOD)
    }

    /// Create a carousel over `len` entries with a custom period
    pub fn with_period(len: usize, period: Duration) -> Self {
        let inner = Arc::new(Mutex::new(Inner {
            index: 0,
            len,
            period,
            epoch: 0,
        }));
        let rearm = Arc::new(Notify::new());
        let worker = tokio::spawn(run_rotation(inner.clone(), rearm.clone()));
        Self {
            inner,
            rearm,
            worker,
        }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len
    }

    /// Whether there are no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current mode, derived from the entry count
    pub fn mode(&self) -> CarouselMode {
        self.inner.lock().unwrap().mode()
    }

    /// Index of the entry on screen, `None` when there are no entries
    pub fn current_index(&self) -> Option<usize> {
        let inner = self.inner.lock().unwrap();
        if inner.len == 0 {
            None
        } else {
            Some(inner.index)
        }
    }

    /// Move to the next entry and restart the timer at a full period
    pub fn next(&self) {
        if self.inner.lock().unwrap().manual_advance(Step::Forward) {
            self.rearm.notify_one();
        }
    }

    /// Move to the previous entry and restart the timer at a full period
    pub fn prev(&self) {
        if self.inner.lock().unwrap().manual_advance(Step::Backward) {
            self.rearm.notify_one();
        }
    }

    /// Install a new entry list, restarting from the first entry
    ///
    /// The timer restarts at a full period as well, or stops when the new
    /// list has fewer than two entries.
    pub fn replace(&self, len: usize) {
        self.inner.lock().unwrap().replace(len);
        self.rearm.notify_one();
    }
}

impl Drop for Carousel {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

/// Rotation task
///
/// Re-arms the timer at the top of each iteration from the current state.
/// Any state change rings `rearm`, so after a manual move or a list
/// replacement the next automatic rotation is a full period away. The
/// select is biased toward `rearm` and the deadline is epoch-checked under
/// the lock, so a manual move racing an expired deadline wins: the index
/// moves once, never twice.
async fn run_rotation(inner: Arc<Mutex<Inner>>, rearm: Arc<Notify>) {
    loop {
        let (rotating, period, epoch) = {
            let inner = inner.lock().unwrap();
            (inner.len > 1, inner.period, inner.epoch)
        };

        if !rotating {
            rearm.notified().await;
            continue;
        }

        tokio::select! {
            biased;
            _ = rearm.notified() => {
                // State changed under us, restart with a fresh deadline
            }
            _ = tokio::time::sleep(period) => {
                let mut inner = inner.lock().unwrap();
                if inner.timer_advance(epoch) {
                    debug!("Rotated to entry {} of {}", inner.index, inner.len);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERIOD: Duration = Duration::from_secs(10);

    /// Let the rotation task catch up with the clock
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    async fn carousel(len: usize) -> Carousel {
        let carousel = Carousel::with_period(len, PERIOD);
        // Give the worker a chance to arm its first deadline
        settle().await;
        carousel
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_carousel_has_no_current_entry() {
        let carousel = carousel(0).await;
        assert_eq!(carousel.mode(), CarouselMode::Empty);
        assert_eq!(carousel.current_index(), None);

        carousel.next();
        carousel.prev();
        tokio::time::advance(PERIOD * 3).await;
        settle().await;
        assert_eq!(carousel.current_index(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_entry_never_rotates() {
        let carousel = carousel(1).await;
        assert_eq!(carousel.mode(), CarouselMode::Static);

        tokio::time::advance(PERIOD * 3 + Duration::from_millis(100)).await;
        settle().await;
        assert_eq!(carousel.current_index(), Some(0));

        carousel.next();
        settle().await;
        assert_eq!(carousel.current_index(), Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rotation_advances_every_period() {
        let carousel = carousel(3).await;
        assert_eq!(carousel.mode(), CarouselMode::Cycling);
        assert_eq!(carousel.current_index(), Some(0));

        let step = PERIOD + Duration::from_millis(100);
        tokio::time::advance(step).await;
        settle().await;
        assert_eq!(carousel.current_index(), Some(1));

        tokio::time::advance(step).await;
        settle().await;
        assert_eq!(carousel.current_index(), Some(2));

        // Wraps back to the first entry
        tokio::time::advance(step).await;
        settle().await;
        assert_eq!(carousel.current_index(), Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_move_restarts_the_timer() {
        let carousel = carousel(3).await;

        // Just before the first automatic rotation
        tokio::time::advance(Duration::from_secs(9)).await;
        settle().await;
        assert_eq!(carousel.current_index(), Some(0));

        // Manual move lands immediately
        carousel.next();
        assert_eq!(carousel.current_index(), Some(1));
        settle().await;

        // The old deadline has long passed; nothing fires because the
        // manual move restarted the timer at a full period
        tokio::time::advance(Duration::from_secs(9)).await;
        settle().await;
        assert_eq!(carousel.current_index(), Some(1));

        // A full period after the manual move, rotation resumes
        tokio::time::advance(Duration::from_millis(1100)).await;
        settle().await;
        assert_eq!(carousel.current_index(), Some(2));
    }

    #[test]
    fn test_expired_deadline_loses_to_manual_move() {
        let mut inner = Inner {
            index: 0,
            len: 3,
            period: PERIOD,
            epoch: 0,
        };
        let armed = inner.epoch;

        // Manual move lands between the deadline expiring and the
        // rotation task taking the lock
        assert!(inner.manual_advance(Step::Forward));
        assert_eq!(inner.index, 1);

        // The stale deadline must not advance a second time
        assert!(!inner.timer_advance(armed));
        assert_eq!(inner.index, 1);

        // A deadline armed after the move fires normally
        assert!(inner.timer_advance(inner.epoch));
        assert_eq!(inner.index, 2);
    }

    #[test]
    fn test_expired_deadline_loses_to_replacement() {
        let mut inner = Inner {
            index: 2,
            len: 3,
            period: PERIOD,
            epoch: 0,
        };
        let armed = inner.epoch;

        inner.replace(5);
        assert!(!inner.timer_advance(armed));
        assert_eq!(inner.index, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_wraps_after_last_entry() {
        let carousel = carousel(5).await;
        for expected in 1..5 {
            carousel.next();
            assert_eq!(carousel.current_index(), Some(expected));
        }
        carousel.next();
        assert_eq!(carousel.current_index(), Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_prev_wraps_backward() {
        let carousel = carousel(3).await;
        carousel.prev();
        assert_eq!(carousel.current_index(), Some(2));
        carousel.prev();
        assert_eq!(carousel.current_index(), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_replace_restarts_from_first_entry() {
        let carousel = carousel(3).await;
        carousel.next();
        assert_eq!(carousel.current_index(), Some(1));

        carousel.replace(5);
        assert_eq!(carousel.current_index(), Some(0));
        assert_eq!(carousel.len(), 5);

        carousel.replace(0);
        assert_eq!(carousel.current_index(), None);
        assert_eq!(carousel.mode(), CarouselMode::Empty);
        carousel.next();
        assert_eq!(carousel.current_index(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_the_rotation_task() {
        let carousel = carousel(3).await;
        let inner = carousel.inner.clone();

        drop(carousel);
        settle().await;

        tokio::time::advance(PERIOD * 5).await;
        settle().await;
        assert_eq!(inner.lock().unwrap().index, 0);
    }
}
