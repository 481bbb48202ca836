//! Blocking delays, injected wherever the keypad code has to wait.

use std::fmt::Debug;
use std::thread;
use std::time::Duration;

/// Suspends the caller for a while.
///
/// Takes `&self` so one delay source can be shared by the scanner and the polling loop.
pub trait Delay: Debug {
    fn delay(&self, duration: Duration);
}

/// A [Delay] that puts the current thread to sleep.
#[derive(Copy, Clone, Debug, Default)]
pub struct ThreadDelay;

impl Delay for ThreadDelay {
    fn delay(&self, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }
}
