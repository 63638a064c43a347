//! Configuration validation

use crate::{AppConfig, ConfigError, Result};

/// Validation error details
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn validate_log_level(level: &str) -> std::result::Result<(), ValidationError> {
    match level {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        other => Err(ValidationError::new(
            "network.log_level",
            format!("unknown log level: {other}"),
        )),
    }
}

/// Validate the entire application configuration
pub fn validate_config(config: &AppConfig) -> Result<()> {
    let mut errors = Vec::new();

    // Validate network config
    if let Err(e) = validate_log_level(&config.network.log_level) {
        errors.push(e);
    }

    if config.network.metrics_port == 0 {
        errors.push(ValidationError::new(
            "network.metrics_port",
            "metrics port must be greater than 0",
        ));
    }

    // Validate e-sign provider config
    if config.esign.base_url.is_empty() {
        errors.push(ValidationError::new(
            "esign.base_url",
            "provider base URL is required",
        ));
    }

    if config.esign.api_key.is_empty() {
        errors.push(ValidationError::new(
            "esign.api_key",
            "provider API key is required",
        ));
    }

    if config.esign.template_id.is_empty() {
        errors.push(ValidationError::new(
            "esign.template_id",
            "agreement template ID is required",
        ));
    }

    if config.esign.webhook_secret.is_empty() {
        errors.push(ValidationError::new(
            "esign.webhook_secret",
            "webhook secret is required - unsigned callbacks cannot be trusted",
        ));
    }

    if config.esign.timeout_ms == 0 {
        errors.push(ValidationError::new(
            "esign.timeout_ms",
            "must be greater than 0",
        ));
    }

    // Validate email config
    if config.email.endpoint.is_empty() {
        errors.push(ValidationError::new(
            "email.endpoint",
            "email API endpoint is required",
        ));
    }

    if config.email.from_address.is_empty() {
        errors.push(ValidationError::new(
            "email.from_address",
            "sender address is required",
        ));
    } else if !config.email.from_address.contains('@') {
        errors.push(ValidationError::new(
            "email.from_address",
            "sender address must be an email address",
        ));
    }

    if config.email.office_phone.is_empty() {
        errors.push(ValidationError::new(
            "email.office_phone",
            "office phone is required - the final warning instructs the customer to call it",
        ));
    }

    // Validate reminder thresholds: escalation must tighten
    let r = &config.reminders;
    if r.normal_hours <= 0 || r.urgent_hours <= 0 || r.critical_hours <= 0 {
        errors.push(ValidationError::new(
            "reminders",
            "all reminder thresholds must be greater than 0",
        ));
    }

    if !(r.critical_hours < r.urgent_hours && r.urgent_hours < r.normal_hours) {
        errors.push(ValidationError::new(
            "reminders",
            "thresholds must be strictly ordered: critical < urgent < normal",
        ));
    }

    if r.tick_interval_secs == 0 {
        errors.push(ValidationError::new(
            "reminders.tick_interval_secs",
            "must be greater than 0",
        ));
    }

    if r.batch_limit == 0 {
        errors.push(ValidationError::new(
            "reminders.batch_limit",
            "must be greater than 0",
        ));
    }

    // Validate sweep config
    if config.sweep.interval_secs == 0 {
        errors.push(ValidationError::new(
            "sweep.interval_secs",
            "must be greater than 0",
        ));
    }

    if config.sweep.batch_limit == 0 {
        errors.push(ValidationError::new(
            "sweep.batch_limit",
            "must be greater than 0",
        ));
    }

    // Validate store config
    if config.store.db_path.is_empty() {
        errors.push(ValidationError::new(
            "store.db_path",
            "database path is required",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        let combined = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        Err(ConfigError::ValidationError(combined))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.esign.base_url = "https://sign.example.com/api".to_string();
        config.esign.api_key = "esign-key".to_string();
        config.esign.template_id = "tpl-agreement".to_string();
        config.esign.webhook_secret = "hook-secret".to_string();
        config.email.endpoint = "https://mail.example.com/v1/send".to_string();
        config.email.api_key = "mail-key".to_string();
        config.email.from_address = "bookings@partyrentals.example".to_string();
        config.email.office_phone = "(555) 010-2030".to_string();
        config
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_missing_webhook_secret_fails() {
        let mut config = valid_config();
        config.esign.webhook_secret = String::new();

        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("webhook_secret"));
    }

    #[test]
    fn test_unordered_thresholds_fail() {
        let mut config = valid_config();
        config.reminders.urgent_hours = 72; // above normal_hours

        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("critical < urgent < normal"));
    }

    #[test]
    fn test_bad_log_level_fails() {
        let mut config = valid_config();
        config.network.log_level = "loud".to_string();

        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_bad_sender_address_fails() {
        let mut config = valid_config();
        config.email.from_address = "not-an-address".to_string();

        assert!(validate_config(&config).is_err());
    }
}
