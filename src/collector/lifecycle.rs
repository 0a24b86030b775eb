//! One-shot worker start.

use std::sync::atomic::{AtomicBool, Ordering};

/// Runs a launch function at most once, no matter how many callers race.
///
/// The flag goes from not-started to started exactly once and is never
/// reset. It is a single compare-and-set, so checking it on every `add` costs
/// no lock.
#[derive(Debug, Default)]
pub struct StartGuard {
    started: AtomicBool,
}

impl StartGuard {
    pub const fn new() -> Self {
        Self {
            started: AtomicBool::new(false),
        }
    }

    /// Calls `launch` if this is the first call; returns whether it did.
    pub fn ensure_started<F: FnOnce()>(&self, launch: F) -> bool {
        if self
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            launch();
            true
        } else {
            false
        }
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Barrier};

    #[test]
    fn test_sequential_calls_launch_once() {
        let guard = StartGuard::new();
        let launches = AtomicUsize::new(0);
        assert!(guard.ensure_started(|| {
            launches.fetch_add(1, Ordering::SeqCst);
        }));
        assert!(!guard.ensure_started(|| {
            launches.fetch_add(1, Ordering::SeqCst);
        }));
        assert!(guard.is_started());
        assert_eq!(launches.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_first_calls_launch_exactly_once() {
        const CALLERS: usize = 32;

        for _ in 0..50 {
            let guard = Arc::new(StartGuard::new());
            let launches = Arc::new(AtomicUsize::new(0));
            let barrier = Arc::new(Barrier::new(CALLERS));

            let handles: Vec<_> = (0..CALLERS)
                .map(|_| {
                    let guard = Arc::clone(&guard);
                    let launches = Arc::clone(&launches);
                    let barrier = Arc::clone(&barrier);
                    std::thread::spawn(move || {
                        barrier.wait();
                        guard.ensure_started(|| {
                            launches.fetch_add(1, Ordering::SeqCst);
                        })
                    })
                })
                .collect();

            let winners = handles
                .into_iter()
                .map(|h| h.join().expect("caller panicked"))
                .filter(|won| *won)
                .count();

            assert_eq!(winners, 1);
            assert_eq!(launches.load(Ordering::SeqCst), 1);
        }
    }
}
