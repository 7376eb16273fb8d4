//! Store configuration.

use std::time::Duration;

/// Configuration for opening a store.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum transaction-open attempts made by the retry combinator.
    pub retry_max_attempts: u32,

    /// Delay between retry attempts.
    pub retry_delay: Duration,

    /// Whether `close()` flushes the backend before closing.
    pub flush_on_close: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            retry_max_attempts: 10,
            retry_delay: Duration::from_millis(500),
            flush_on_close: true,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the retry attempt budget.
    #[must_use]
    pub const fn retry_max_attempts(mut self, attempts: u32) -> Self {
        self.retry_max_attempts = attempts;
        self
    }

    /// Sets the delay between retry attempts.
    #[must_use]
    pub const fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Sets whether `close()` flushes first.
    #[must_use]
    pub const fn flush_on_close(mut self, value: bool) -> Self {
        self.flush_on_close = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.retry_max_attempts, 10);
        assert_eq!(config.retry_delay, Duration::from_millis(500));
        assert!(config.flush_on_close);
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new()
            .retry_max_attempts(3)
            .retry_delay(Duration::from_millis(10))
            .flush_on_close(false);

        assert_eq!(config.retry_max_attempts, 3);
        assert_eq!(config.retry_delay, Duration::from_millis(10));
        assert!(!config.flush_on_close);
    }
}
