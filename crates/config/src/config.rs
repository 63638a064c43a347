//! Core configuration structures for the rental agreement service

use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Network and observability configuration
    pub network: NetworkConfig,

    /// E-signature provider configuration
    pub esign: EsignConfig,

    /// Email transport configuration
    pub email: EmailConfig,

    /// Reminder escalation configuration
    pub reminders: ReminderConfig,

    /// Status sweep configuration
    pub sweep: SweepConfig,

    /// Order store configuration
    pub store: StoreConfig,
}

/// Network environment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Environment type (production, staging, local)
    pub environment: Environment,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable metrics collection
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,

    /// Metrics server port
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

/// Environment types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    Staging,
    #[default]
    Local,
}

/// E-signature provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EsignConfig {
    /// Provider API base URL
    pub base_url: String,

    /// Provider API key
    pub api_key: String,

    /// Agreement template identifier
    pub template_id: String,

    /// Shared secret for webhook signature verification
    pub webhook_secret: String,

    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum retry attempts for retryable failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

/// Email transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// Transactional email API endpoint
    pub endpoint: String,

    /// Email API key
    pub api_key: String,

    /// Sender address
    pub from_address: String,

    /// Sender display name
    #[serde(default = "default_from_name")]
    pub from_name: String,

    /// Phone number quoted in the final-warning copy
    pub office_phone: String,

    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Reminder escalation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderConfig {
    /// Hours before delivery for the normal reminder
    #[serde(default = "default_normal_hours")]
    pub normal_hours: i64,

    /// Hours before delivery for the urgent reminder
    #[serde(default = "default_urgent_hours")]
    pub urgent_hours: i64,

    /// Hours before delivery for the final warning
    #[serde(default = "default_critical_hours")]
    pub critical_hours: i64,

    /// Reminder tick interval in seconds
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,

    /// Per-tick order limit
    #[serde(default = "default_batch_limit")]
    pub batch_limit: usize,

    /// Always open a fresh submission after a decline
    #[serde(default = "default_true")]
    pub recreate_after_decline: bool,
}

/// Status sweep configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Sweep interval in seconds
    #[serde(default = "default_sweep_interval_secs")]
    pub interval_secs: u64,

    /// Per-run order limit
    #[serde(default = "default_batch_limit")]
    pub batch_limit: usize,
}

/// Order store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database path
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_metrics_port() -> u16 {
    9090
}

fn default_timeout_ms() -> u64 {
    30000
}

fn default_max_retries() -> u32 {
    3
}

fn default_from_name() -> String {
    "Party Rentals".to_string()
}

fn default_normal_hours() -> i64 {
    48
}

fn default_urgent_hours() -> i64 {
    24
}

fn default_critical_hours() -> i64 {
    8
}

fn default_tick_interval_secs() -> u64 {
    900 // 15 minutes
}

fn default_sweep_interval_secs() -> u64 {
    300 // 5 minutes
}

fn default_batch_limit() -> usize {
    200
}

fn default_db_path() -> String {
    "orders.db".to_string()
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Local,
            log_level: default_log_level(),
            metrics_enabled: default_true(),
            metrics_port: default_metrics_port(),
        }
    }
}

impl Default for EsignConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            template_id: String::new(),
            webhook_secret: String::new(),
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            from_address: String::new(),
            from_name: default_from_name(),
            office_phone: String::new(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            normal_hours: default_normal_hours(),
            urgent_hours: default_urgent_hours(),
            critical_hours: default_critical_hours(),
            tick_interval_secs: default_tick_interval_secs(),
            batch_limit: default_batch_limit(),
            recreate_after_decline: default_true(),
        }
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_sweep_interval_secs(),
            batch_limit: default_batch_limit(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}
