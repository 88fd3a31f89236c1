//! Raw terminal mode management with panic-safe cleanup.

use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::io;
use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};

/// Static flag to track if raw mode is active (for panic handler)
pub(crate) static RAW_MODE_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Guard that ensures the terminal is restored to normal mode on drop.
/// This handles both normal exits and panics.
pub struct RawModeGuard {
    /// Whether this guard is responsible for cleanup
    active: bool,
}

impl RawModeGuard {
    /// Enter raw mode and return a guard that will restore it on drop.
    ///
    /// # Errors
    /// Returns an error if enabling raw mode fails (e.g. no TTY)
    pub fn enter() -> io::Result<Self> {
        // Install panic hook before entering raw mode
        install_panic_hook();

        enable_raw_mode()?;
        RAW_MODE_ACTIVE.store(true, Ordering::SeqCst);

        Ok(Self { active: true })
    }

    /// Manually exit raw mode without dropping the guard.
    /// After calling this, the guard's drop will be a no-op.
    pub fn exit(&mut self) -> io::Result<()> {
        if self.active {
            self.active = false;
            RAW_MODE_ACTIVE.store(false, Ordering::SeqCst);
            disable_raw_mode()?;
        }
        Ok(())
    }

    /// Run a closure with raw mode temporarily disabled.
    ///
    /// Used for line-oriented prompts (delete confirmation, scene name
    /// entry) that need canonical terminal input. Raw mode is re-entered
    /// before returning, even if the closure errors.
    pub fn suspended<T>(&mut self, f: impl FnOnce() -> io::Result<T>) -> io::Result<T> {
        if !self.active {
            return f();
        }

        RAW_MODE_ACTIVE.store(false, Ordering::SeqCst);
        disable_raw_mode()?;

        let result = f();

        enable_raw_mode()?;
        RAW_MODE_ACTIVE.store(true, Ordering::SeqCst);

        result
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if self.active {
            RAW_MODE_ACTIVE.store(false, Ordering::SeqCst);
            // Best-effort cleanup - ignore errors during drop
            let _ = disable_raw_mode();
        }
    }
}

/// Install a panic hook that restores terminal state before panicking.
/// This ensures the terminal is usable even if the app panics.
pub(crate) fn install_panic_hook() {
    // Only install once - check if we've already installed
    static HOOK_INSTALLED: AtomicBool = AtomicBool::new(false);

    if HOOK_INSTALLED.swap(true, Ordering::SeqCst) {
        return; // Already installed
    }

    let original_hook = panic::take_hook();

    panic::set_hook(Box::new(move |panic_info| {
        // Restore terminal before showing panic message
        if RAW_MODE_ACTIVE.load(Ordering::SeqCst) {
            let _ = disable_raw_mode();
            RAW_MODE_ACTIVE.store(false, Ordering::SeqCst);
        }

        // Call the original panic hook to print the panic message
        original_hook(panic_info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_mode_guard_enter_and_drop() {
        // Raw mode requires a real TTY; skip in CI environments
        match RawModeGuard::enter() {
            Ok(guard) => {
                assert!(RAW_MODE_ACTIVE.load(Ordering::SeqCst));
                drop(guard);
                assert!(!RAW_MODE_ACTIVE.load(Ordering::SeqCst));
            }
            Err(e) => {
                eprintln!("Skipping test (no TTY): {}", e);
            }
        }
    }

    #[test]
    fn test_raw_mode_guard_manual_exit() {
        match RawModeGuard::enter() {
            Ok(mut guard) => {
                assert!(RAW_MODE_ACTIVE.load(Ordering::SeqCst));

                guard.exit().expect("Should exit raw mode");
                assert!(!RAW_MODE_ACTIVE.load(Ordering::SeqCst));

                // Drop should be a no-op now
                drop(guard);
                assert!(!RAW_MODE_ACTIVE.load(Ordering::SeqCst));
            }
            Err(e) => {
                eprintln!("Skipping test (no TTY): {}", e);
            }
        }
    }

    #[test]
    fn test_suspended_runs_closure_without_tty() {
        // suspended() on an inactive guard should just run the closure
        match RawModeGuard::enter() {
            Ok(mut guard) => {
                guard.exit().expect("Should exit raw mode");
                let value = guard.suspended(|| Ok(42)).expect("closure should run");
                assert_eq!(value, 42);
            }
            Err(e) => {
                eprintln!("Skipping test (no TTY): {}", e);
            }
        }
    }

    #[test]
    fn test_panic_hook_installation() {
        // Just verify the hook can be installed without crashing
        install_panic_hook();
        install_panic_hook(); // Second call should be no-op
    }
}
