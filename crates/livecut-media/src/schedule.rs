// crates/livecut-media/src/schedule.rs
//
// Drift-free periodic ticker. Every stage worker runs one of these for its
// production rate, and one more drives the selector from its own thread.
//
// The next fire time is the PRIOR SCHEDULED time plus the interval, not
// "now + interval" — an action that takes 3 ms out of a 10 ms interval still
// fires 100 times per second over the long run. When the action overruns by
// more than a whole interval the schedule re-anchors to now, so a stall is
// followed by one catch-up fire, never a burst.

use std::time::{Duration, Instant};

/// Run `action` every `interval` until `halt` returns true.
///
/// `halt` is consulted before each fire; the call returns without firing
/// when it trips. Blocks the calling thread for its whole lifetime.
pub fn run_periodic(
    interval: Duration,
    mut halt: impl FnMut() -> bool,
    mut action: impl FnMut(),
) {
    let mut next = Instant::now();
    loop {
        if halt() {
            return;
        }
        action();

        next += interval;
        let now = Instant::now();
        if now > next {
            // Missed one or more deadlines — coalesce instead of bursting.
            next = now;
        } else {
            std::thread::sleep(next - now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn fires_until_halted() {
        let count = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&count);
        run_periodic(
            Duration::from_millis(1),
            move || c.load(Ordering::Relaxed) >= 5,
            {
                let c = Arc::clone(&count);
                move || {
                    c.fetch_add(1, Ordering::Relaxed);
                }
            },
        );
        assert_eq!(count.load(Ordering::Relaxed), 5);
    }

    #[test]
    fn halt_before_first_fire_means_zero_actions() {
        let fired = AtomicU32::new(0);
        run_periodic(
            Duration::from_millis(1),
            || true,
            || {
                fired.fetch_add(1, Ordering::Relaxed);
            },
        );
        assert_eq!(fired.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn long_run_rate_tracks_the_interval() {
        // 20 fires at 5 ms should take roughly 100 ms even though each
        // action also burns time — the schedule absorbs the action cost.
        let count = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&count);
        let start = Instant::now();
        run_periodic(
            Duration::from_millis(5),
            move || c.load(Ordering::Relaxed) >= 20,
            {
                let c = Arc::clone(&count);
                move || {
                    std::thread::sleep(Duration::from_millis(2));
                    c.fetch_add(1, Ordering::Relaxed);
                }
            },
        );
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(90), "ran too fast: {elapsed:?}");
        assert!(elapsed < Duration::from_millis(400), "ran too slow: {elapsed:?}");
    }

    #[test]
    fn overrun_coalesces_instead_of_bursting() {
        // One action stalls for 10 intervals. If missed deadlines were
        // replayed, the total count would overshoot; coalescing keeps the
        // fire count equal to the halt threshold with no rapid-fire burst.
        let count = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&count);
        run_periodic(
            Duration::from_millis(2),
            move || c.load(Ordering::Relaxed) >= 4,
            {
                let c = Arc::clone(&count);
                move || {
                    let n = c.fetch_add(1, Ordering::Relaxed);
                    if n == 0 {
                        std::thread::sleep(Duration::from_millis(20));
                    }
                }
            },
        );
        assert_eq!(count.load(Ordering::Relaxed), 4);
    }
}
