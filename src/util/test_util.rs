//! Helpers for tests that touch process-global state (environment
//! variables).

use std::panic;
use std::sync::Mutex;

lazy_static! {
    // A global lock to make environment-dependent tests serial.
    static ref SERIAL_TEST_LOCK: Mutex<()> = Mutex::default();
}

/// Force tests holding this lock to execute serially.
pub fn serial_test<F>(f: F)
where
    F: FnOnce(),
{
    // If one test fails, the lock becomes poisoned. We want to continue for
    // the other tests anyway.
    let _guard = SERIAL_TEST_LOCK
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    f();
}

/// Always execute a cleanup closure, whether the test panics or not.
pub fn with_cleanup<T, C>(test: T, cleanup: C)
where
    T: FnOnce() + panic::UnwindSafe,
    C: FnOnce(),
{
    let res = panic::catch_unwind(test);
    cleanup();
    if let Err(e) = res {
        panic::resume_unwind(e);
    }
}
