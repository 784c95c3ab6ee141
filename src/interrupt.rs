// Signal handling logic.
//
// The interesting signals are SIGTERM (sent by the service manager, and often followed by SIGKILL
// if not honored within some reasonable time), and SIGINT and SIGQUIT (sent from the keyboard,
// more typical during development).  Any of them requests an orderly shutdown; nothing else is
// done on signals.
//
// The flag is shared between a signal-processing thread, which only ever sets it, and the receive
// loop, which reads it between iterations.  The loop never blocks for longer than its receive
// timeout, so a shutdown request is observed within one poll interval; a receive that is
// interrupted outright (EINTR) returns early as well.
//
// Call ShutdownController::new() then install() to establish handlers, then is_shutdown_requested()
// to check whether a signal has been received.

use crate::error::ShutdownError;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use signal_hook::consts::signal;
use signal_hook::iterator::{Handle, Signals};

pub const SHUTDOWN_SIGNALS: [i32; 3] = [signal::SIGINT, signal::SIGTERM, signal::SIGQUIT];

// Running -> ShuttingDown, never back.
#[derive(Clone, Default, Debug)]
pub struct ShutdownController {
    requested: Arc<AtomicBool>,
}

// Returned by install(); close() stops the signal thread.
pub struct SignalGuard {
    handle: Handle,
}

impl SignalGuard {
    pub fn close(self) {
        self.handle.close();
    }
}

impl ShutdownController {
    pub fn new() -> ShutdownController {
        ShutdownController::default()
    }

    pub fn install(&self) -> Result<SignalGuard, ShutdownError> {
        let mut signals = Signals::new(SHUTDOWN_SIGNALS)?;
        let handle = signals.handle();
        let controller = self.clone();
        thread::spawn(move || {
            for s in signals.forever() {
                log::info!("Got signal {s}");
                controller.request_shutdown();
            }
        });
        Ok(SignalGuard { handle })
    }

    pub fn request_shutdown(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

#[test]
pub fn test_request_is_sticky() {
    let c = ShutdownController::new();
    assert!(!c.is_shutdown_requested());
    c.request_shutdown();
    assert!(c.is_shutdown_requested());
    c.request_shutdown();
    assert!(c.is_shutdown_requested());
}

#[test]
pub fn test_clones_share_state() {
    let c = ShutdownController::new();
    let d = c.clone();
    let t = thread::spawn(move || d.request_shutdown());
    t.join().unwrap();
    assert!(c.is_shutdown_requested());
}

#[test]
pub fn test_signal_sets_flag() {
    let c = ShutdownController::new();
    let guard = c.install().unwrap();
    signal_hook::low_level::raise(signal::SIGQUIT).unwrap();
    let mut waited = 0;
    while !c.is_shutdown_requested() && waited < 200 {
        thread::sleep(std::time::Duration::from_millis(10));
        waited += 1;
    }
    guard.close();
    assert!(c.is_shutdown_requested());
}
