//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod mock_helpers;

use std::time::{Duration, Instant};

/// Read timeout used by test links
pub fn test_timeout() -> Duration {
    Duration::from_millis(10)
}

/// Upper bound on waiting for the ingest thread
pub fn wait_limit() -> Duration {
    Duration::from_secs(5)
}

/// Poll `condition` until it holds, panicking after [`wait_limit`]
pub fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + wait_limit();
    while !condition() {
        assert!(Instant::now() < deadline, "Timed out waiting for {}", what);
        std::thread::sleep(Duration::from_millis(2));
    }
}

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}
