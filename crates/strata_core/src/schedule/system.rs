//! Units of work and their timing records.

use std::any::type_name;
use std::fmt;
use std::time::{Duration, Instant};

/// A named unit of work, called with the elapsed time of its phase.
pub struct System {
    name: String,
    func: Box<dyn FnMut(Duration) + Send>,
}

impl System {
    /// Wraps a callable under an explicit name.
    pub fn new(name: impl Into<String>, func: impl FnMut(Duration) + Send + 'static) -> Self {
        Self {
            name: name.into(),
            func: Box::new(func),
        }
    }

    /// Wraps a callable, naming it after its type.
    pub fn from_fn<F>(func: F) -> Self
    where
        F: FnMut(Duration) + Send + 'static,
    {
        Self::new(type_name::<F>(), func)
    }

    /// Returns the system's name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the system once.
    ///
    /// # Returns
    ///
    /// How long the call took.
    pub fn run(&mut self, dt: Duration) -> Duration {
        let start = Instant::now();
        (self.func)(dt);
        let elapsed = start.elapsed();
        tracing::trace!(system = %self.name, ?elapsed, "ran system");
        elapsed
    }
}

impl fmt::Debug for System {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("System").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Time one system took during one frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SystemLog {
    /// System name.
    pub name: String,
    /// Wall time of the call.
    pub time: Duration,
}

impl fmt::Display for SystemLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:?}", self.name, self.time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_passes_dt() {
        let mut seen = Vec::new();
        {
            let (tx, rx) = std::sync::mpsc::channel();
            let mut system = System::new("probe", move |dt| tx.send(dt).unwrap());
            system.run(Duration::from_millis(5));
            system.run(Duration::from_millis(7));
            drop(system);
            seen.extend(rx.iter());
        }
        assert_eq!(seen, vec![Duration::from_millis(5), Duration::from_millis(7)]);
    }

    #[test]
    fn test_from_fn_names_after_type() {
        fn tick(_: Duration) {}
        let system = System::from_fn(tick);
        assert!(system.name().ends_with("tick"));
        assert!(format!("{system:?}").contains("tick"));
    }

    #[test]
    fn test_log_display() {
        let log = SystemLog {
            name: "physics".to_string(),
            time: Duration::from_millis(3),
        };
        assert_eq!(log.to_string(), "physics: 3ms");
    }
}
