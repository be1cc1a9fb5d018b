//! Proximity exception window.
//!
//! While the window is active, proximity is forced to report covered. The
//! window is armed for a short period whenever the hub starts or stops; it
//! is also considered active before the hub has ever been seen, so the
//! device boots with proximity covered until real data arrives.

#[derive(Debug)]
pub struct ExceptionWindow {
    /// A timed window is currently armed.
    armed: bool,
    /// The hub has been observed (started or stopped) at least once.
    started: bool,
}

impl Default for ExceptionWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl ExceptionWindow {
    pub fn new() -> Self {
        Self {
            armed: false,
            started: false,
        }
    }

    /// Arm the window; the caller is responsible for scheduling expiry.
    pub fn start(&mut self) {
        self.armed = true;
        self.started = true;
    }

    /// The armed window's timer fired.
    pub fn expire(&mut self) {
        self.armed = false;
    }

    /// Tear down without waiting for the timer.
    pub fn cancel(&mut self) {
        self.armed = false;
    }

    pub fn is_active(&self) -> bool {
        self.armed || !self.started
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_until_first_window() {
        let window = ExceptionWindow::new();
        assert!(window.is_active());
    }

    #[test]
    fn start_then_expire() {
        let mut window = ExceptionWindow::new();
        window.start();
        assert!(window.is_active());
        window.expire();
        assert!(!window.is_active());
    }

    #[test]
    fn rearming_after_expiry_reactivates() {
        let mut window = ExceptionWindow::new();
        window.start();
        window.expire();
        window.start();
        assert!(window.is_active());
    }

    #[test]
    fn cancel_clears_armed_window() {
        let mut window = ExceptionWindow::new();
        window.start();
        window.cancel();
        assert!(!window.is_active());
    }
}
