//! Operator abort detection
//!
//! Two sources: Ctrl+C (trapped into a flag) and the failsafe corner, where
//! parking the pointer at the top-left of the screen stops the run. Both are
//! polled between actions, never during a delay.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{AbortKind, ActionError};
use crate::input::InputChannel;

#[derive(Clone, Debug, Default)]
pub struct AbortWatch {
    interrupted: Arc<AtomicBool>,
    failsafe: bool,
}

impl AbortWatch {
    pub fn new(failsafe: bool) -> Self {
        Self {
            interrupted: Arc::new(AtomicBool::new(false)),
            failsafe,
        }
    }

    /// Route Ctrl+C into this watch. Can only be installed once per process.
    pub fn install_ctrlc_handler(&self) -> Result<(), ctrlc::Error> {
        let flag = Arc::clone(&self.interrupted);
        ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
    }

    /// Handle for raising an interrupt from elsewhere
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupted)
    }

    pub fn interrupt(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    /// Fail if the operator asked to stop
    pub fn check<I: InputChannel + ?Sized>(&self, input: &I) -> Result<(), ActionError> {
        if self.is_interrupted() {
            return Err(ActionError::Abort(AbortKind::Interrupt));
        }
        if self.failsafe {
            let (x, y) = input.pointer_position()?;
            if in_failsafe_corner(x, y) {
                return Err(ActionError::Abort(AbortKind::Failsafe));
            }
        }
        Ok(())
    }
}

pub fn in_failsafe_corner(x: i32, y: i32) -> bool {
    x <= 0 && y <= 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failsafe_corner() {
        assert!(in_failsafe_corner(0, 0));
        assert!(in_failsafe_corner(-3, 0));
        assert!(!in_failsafe_corner(0, 10));
        assert!(!in_failsafe_corner(500, 0));
    }

    #[test]
    fn test_interrupt_flag_is_shared() {
        let watch = AbortWatch::new(false);
        let clone = watch.clone();
        assert!(!clone.is_interrupted());
        watch.interrupt_flag().store(true, Ordering::SeqCst);
        assert!(clone.is_interrupted());
    }
}
