//! Boolean flag shared between the scheduler and other threads.

use parking_lot::Mutex;

/// A lockable boolean.
///
/// # Example
///
/// ```rust,ignore
/// let quit = scheduler.quit_signal();
/// std::thread::spawn(move || quit.set(true));
/// scheduler.run();
/// ```
#[derive(Debug, Default)]
pub struct Signal {
    value: Mutex<bool>,
}

impl Signal {
    /// Creates a signal with an initial value.
    #[must_use]
    pub fn new(value: bool) -> Self {
        Self {
            value: Mutex::new(value),
        }
    }

    /// Stores a value.
    pub fn set(&self, value: bool) {
        *self.value.lock() = value;
    }

    /// Loads the current value.
    #[must_use]
    pub fn get(&self) -> bool {
        *self.value.lock()
    }
}
