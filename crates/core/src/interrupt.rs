//! Cooperative cancellation for long-running checks.

use crate::error::{Error, Result};
use alloc::sync::Arc;
use core::sync::atomic::{AtomicBool, Ordering};

/// A shared cancellation flag.
///
/// Clones share the same flag. Checks poll it between chunks of work, not per
/// row, and abort with `Error::Interrupted` once it is raised.
#[derive(Clone, Debug, Default)]
pub struct Interrupt {
    flag: Arc<AtomicBool>,
}

impl Interrupt {
    /// Creates a new, lowered flag.
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Raises the flag.
    pub fn interrupt(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Lowers the flag again.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::Relaxed);
    }

    /// Returns true if the flag is raised.
    #[inline]
    pub fn is_interrupted(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Fails with `Error::Interrupted` if the flag is raised.
    #[inline]
    pub fn check(&self) -> Result<()> {
        if self.is_interrupted() {
            Err(Error::Interrupted)
        } else {
            Ok(())
        }
    }
}
