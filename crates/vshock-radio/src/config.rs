use std::time::Duration;

use crate::error::{RadioError, Result};

/// Timing and buffering knobs for a [`RadioEngine`](crate::RadioEngine).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadioConfig {
    /// Target length of one pump tick.
    pub pump_period: Duration,
    /// Sleep between pipe 0 polls while waiting for an ack.
    pub ack_poll_interval: Duration,
    /// How long a `require_ack` send waits before giving up.
    pub ack_timeout: Duration,
    /// Delivery reports kept before the oldest is discarded. 0 disables the cap.
    pub delivery_report_backlog: usize,
}

impl RadioConfig {
    pub const DEFAULT_PUMP_PERIOD: Duration = Duration::from_millis(25);
    pub const DEFAULT_ACK_POLL_INTERVAL: Duration = Duration::from_millis(10);
    pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(5);
    pub const DEFAULT_DELIVERY_REPORT_BACKLOG: usize = 256;

    pub fn with_ack_timeout(mut self, timeout: Duration) -> Self {
        self.ack_timeout = timeout;
        self
    }

    pub fn with_pump_period(mut self, period: Duration) -> Self {
        self.pump_period = period;
        self
    }

    pub fn with_ack_poll_interval(mut self, interval: Duration) -> Self {
        self.ack_poll_interval = interval;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.pump_period.is_zero() {
            return Err(RadioError::InvalidConfig("pump_period must be non-zero"));
        }
        if self.ack_poll_interval.is_zero() {
            return Err(RadioError::InvalidConfig(
                "ack_poll_interval must be non-zero",
            ));
        }
        if self.ack_poll_interval > self.ack_timeout {
            return Err(RadioError::InvalidConfig(
                "ack_poll_interval must not exceed ack_timeout",
            ));
        }
        Ok(())
    }
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            pump_period: Self::DEFAULT_PUMP_PERIOD,
            ack_poll_interval: Self::DEFAULT_ACK_POLL_INTERVAL,
            ack_timeout: Self::DEFAULT_ACK_TIMEOUT,
            delivery_report_backlog: Self::DEFAULT_DELIVERY_REPORT_BACKLOG,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_hardware_timing() {
        let config = RadioConfig::default();
        assert_eq!(config.pump_period, Duration::from_millis(25));
        assert_eq!(config.ack_poll_interval, Duration::from_millis(10));
        assert_eq!(config.ack_timeout, Duration::from_secs(5));
        config.validate().expect("defaults should validate");
    }

    #[test]
    fn rejects_zero_intervals() {
        let config = RadioConfig::default().with_pump_period(Duration::ZERO);
        assert!(matches!(config.validate(), Err(RadioError::InvalidConfig(_))));

        let config = RadioConfig::default().with_ack_poll_interval(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_poll_interval_longer_than_timeout() {
        let config = RadioConfig::default()
            .with_ack_timeout(Duration::from_millis(5))
            .with_ack_poll_interval(Duration::from_millis(10));
        assert!(config.validate().is_err());
    }
}
