// src/clock.rs

//! Monotonic millisecond clock anchored at platform initialization.

use std::time::Duration;

#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;
#[cfg(target_arch = "wasm32")]
use web_time::Instant;

#[derive(Debug, Clone, Copy)]
pub struct Clock {
    start: Instant,
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Milliseconds since this clock was created. Never decreases.
    pub fn ticks(&self) -> u64 {
        millis(self.start.elapsed())
    }

    /// Yield the calling context for at least `ms` milliseconds.
    pub fn delay(&self, ms: u32) {
        sleep(Duration::from_millis(u64::from(ms)));
    }
}

fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(not(target_arch = "wasm32"))]
fn sleep(duration: Duration) {
    std::thread::sleep(duration);
}

// The browser has no thread sleep. A worker can park on Atomics.wait; the
// main thread is not allowed to block at all, so there the delay is skipped.
#[cfg(target_arch = "wasm32")]
fn sleep(duration: Duration) {
    use js_sys::{Atomics, Int32Array, SharedArrayBuffer};
    use std::sync::atomic::{AtomicBool, Ordering};

    static WARNED: AtomicBool = AtomicBool::new(false);

    let cell = Int32Array::new(&SharedArrayBuffer::new(4));
    if let Err(e) = Atomics::wait_with_timeout(&cell, 0, 0, duration.as_secs_f64() * 1000.0) {
        if !WARNED.swap(true, Ordering::Relaxed) {
            log::warn!("delay() cannot block on this thread ({:?}); run the loop in a worker", e);
        }
    }
}
