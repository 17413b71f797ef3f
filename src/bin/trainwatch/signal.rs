use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use trainwatch::log_debug;

/// Raised by SIGINT/SIGTERM; the monitor loop polls it between samples.
static STOP_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Only touches an atomic, so it is async-signal-safe.
extern "C" fn handle_stop(_: libc::c_int) {
    STOP_REQUESTED.store(true, Ordering::SeqCst);
}

pub(crate) fn install_stop_handler() -> Result<()> {
    for (signal, name) in [(libc::SIGINT, "SIGINT"), (libc::SIGTERM, "SIGTERM")] {
        unsafe {
            // SAFETY: handle_stop is an extern "C" handler that only stores to an
            // atomic flag, which is async-signal-safe.
            let handler = handle_stop as *const () as libc::sighandler_t;
            if libc::signal(signal, handler) == libc::SIG_ERR {
                log_debug(&format!("failed to install {name} handler"));
                return Err(anyhow!("failed to install {name} handler"));
            }
        }
    }
    Ok(())
}

pub(crate) fn stop_flag() -> &'static AtomicBool {
    &STOP_REQUESTED
}
