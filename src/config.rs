use crate::domain::payout::{
    Amount, DEFAULT_DELAY_THRESHOLD_MINUTES, DEFAULT_MAX_PAYOUTS_PER_FLIGHT, PayoutRules,
};
use crate::domain::ports::Channel;
use crate::error::{FlightError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

/// Which channels a notification fans out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    pub email: bool,
    pub sms: bool,
    pub push: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            email: true,
            sms: false,
            push: true,
        }
    }
}

impl NotificationSettings {
    pub fn channels(&self) -> Vec<Channel> {
        [
            (Channel::Email, self.email),
            (Channel::Sms, self.sms),
            (Channel::Push, self.push),
        ]
        .into_iter()
        .filter_map(|(channel, enabled)| enabled.then_some(channel))
        .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 5000,
        }
    }
}

impl RetrySettings {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Settings of the auto-pay monitor.
///
/// Read from a camelCase JSON file; any missing field takes its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AutoPayConfig {
    pub enabled: bool,
    pub delay_threshold_minutes: u32,
    pub payout_amount: Amount,
    pub max_payouts_per_flight: usize,
    pub require_confirmation: bool,
    pub notification_settings: NotificationSettings,
    pub retry_settings: RetrySettings,
    pub poll_interval_ms: u64,
}

impl Default for AutoPayConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            delay_threshold_minutes: DEFAULT_DELAY_THRESHOLD_MINUTES,
            payout_amount: PayoutRules::default().payout_amount,
            max_payouts_per_flight: DEFAULT_MAX_PAYOUTS_PER_FLIGHT,
            require_confirmation: false,
            notification_settings: NotificationSettings::default(),
            retry_settings: RetrySettings::default(),
            poll_interval_ms: 30_000,
        }
    }
}

impl AutoPayConfig {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let config: Self = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(FlightError::ValidationError(
                "pollIntervalMs must be greater than zero".to_string(),
            ));
        }
        if self.max_payouts_per_flight == 0 {
            return Err(FlightError::ValidationError(
                "maxPayoutsPerFlight must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn rules(&self) -> PayoutRules {
        PayoutRules {
            threshold_minutes: self.delay_threshold_minutes,
            payout_amount: self.payout_amount,
            max_payouts_per_flight: self.max_payouts_per_flight,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = AutoPayConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.delay_threshold_minutes, 120);
        assert_eq!(config.payout_amount.value(), dec!(500));
        assert_eq!(config.max_payouts_per_flight, 10);
        assert_eq!(config.retry_settings.max_retries, 3);
        assert_eq!(config.retry_settings.retry_delay(), Duration::from_millis(5000));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_notification_channels_follow_flags() {
        assert_eq!(
            NotificationSettings::default().channels(),
            vec![Channel::Email, Channel::Push]
        );

        let settings: NotificationSettings =
            serde_json::from_str(r#"{"sms": true, "email": false}"#).unwrap();
        assert_eq!(settings.channels(), vec![Channel::Sms, Channel::Push]);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: AutoPayConfig = serde_json::from_str(
            r#"{"enabled": true, "delayThresholdMinutes": 90, "retrySettings": {"maxRetries": 5}}"#,
        )
        .unwrap();
        assert!(config.enabled);
        assert_eq!(config.rules().threshold_minutes, 90);
        assert_eq!(config.retry_settings.max_retries, 5);
        assert_eq!(config.retry_settings.retry_delay_ms, 5000);
        assert_eq!(config.poll_interval_ms, 30_000);
    }

    #[test]
    fn test_from_path_validates() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"pollIntervalMs": 0}}"#).unwrap();
        assert!(matches!(
            AutoPayConfig::from_path(file.path()),
            Err(FlightError::ValidationError(_))
        ));

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"payoutAmount": -5}}"#).unwrap();
        assert!(matches!(
            AutoPayConfig::from_path(file.path()),
            Err(FlightError::JsonError(_))
        ));
    }
}
