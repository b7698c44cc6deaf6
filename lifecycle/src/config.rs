//! Lifecycle configuration.

use std::time::Duration;

use crate::error::ConfigError;

/// Deadline and shutdown settings for one algorithm run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleConfig {
    /// Wall-clock budget measured from activation. `None` or zero disables it.
    pub timeout: Option<Duration>,
    /// How long before the deadline the guard interrupt fires.
    pub timeout_precaution_offset: Duration,
    /// Run shutdown when a timeout or foreign interrupt is detected.
    pub shutdown_on_termination: bool,
}

impl LifecycleConfig {
    /// Config with the given timeout and default everything else.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..Self::default()
        }
    }

    /// The timeout, if one is configured and positive.
    #[must_use]
    pub fn effective_timeout(&self) -> Option<Duration> {
        self.timeout.filter(|t| !t.is_zero())
    }

    /// Pre-flight validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::PrecautionOffsetTooLarge`] if the offset would
    /// fire the guard at or before activation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(timeout) = self.effective_timeout() {
            if self.timeout_precaution_offset >= timeout {
                return Err(ConfigError::PrecautionOffsetTooLarge {
                    offset: self.timeout_precaution_offset,
                    timeout,
                });
            }
        }
        Ok(())
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            timeout_precaution_offset: Duration::from_millis(100),
            shutdown_on_termination: true,
        }
    }
}
