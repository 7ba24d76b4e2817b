//! Configuration loading and validation

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::disburse::amount::AmountRange;
use crate::disburse::runner::DelayRange;
use crate::error::{Error, Result};

/// Environment variable holding the signing key
pub const CREDENTIAL_VAR: &str = "PRIVATE_KEY";

/// Run interval used when `INTERVAL_MINUTES` is unset, zero or not a number
pub const DEFAULT_INTERVAL_MINUTES: u64 = 1;

/// Longest accepted run interval (one year)
pub const MAX_INTERVAL_MINUTES: u64 = 365 * 24 * 60;

/// Main configuration structure
///
/// Keys mirror the environment variable names in lower case, so `MIN_AMOUNT`
/// in the environment and `min_amount` in the TOML file are the same setting.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// Hex-encoded private key of the funding wallet
    #[serde(default)]
    pub private_key: Option<Credential>,

    /// Lower bound of the per-send amount, in whole tokens
    #[serde(default = "default_min_amount")]
    pub min_amount: String,

    /// Upper bound (exclusive) of the per-send amount, in whole tokens
    #[serde(default = "default_max_amount")]
    pub max_amount: String,

    /// `INTERVAL_MINUTES` as given; resolved into `interval_minutes` on load
    #[serde(default, rename = "interval_minutes")]
    interval_raw: Option<String>,

    /// Minutes between run starts, in `1..=MAX_INTERVAL_MINUTES`
    #[serde(skip)]
    pub interval_minutes: u64,

    #[serde(default = "default_address_file")]
    pub address_file: PathBuf,

    /// Symbol used in log lines
    #[serde(default = "default_token_symbol")]
    pub token_symbol: String,

    #[serde(default = "default_delay_min_ms")]
    pub delay_min_ms: u64,

    #[serde(default = "default_delay_max_ms")]
    pub delay_max_ms: u64,

    #[serde(default)]
    pub overlap_policy: OverlapPolicy,

    /// 0 disables the run timeout
    #[serde(default)]
    pub run_timeout_secs: u64,

    /// 0 waits for confirmation indefinitely
    #[serde(default)]
    pub confirmation_timeout_secs: u64,

    #[serde(default = "default_receipt_poll_ms")]
    pub receipt_poll_ms: u64,
}

/// What the scheduler does when a tick fires while a run is still in flight
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Drop the tick
    #[default]
    Skip,
    /// Wait for the in-flight run, then start immediately
    Queue,
    /// Abort the in-flight run and start a new one
    Cancel,
    /// Start a new run alongside the in-flight one
    Overlap,
}

impl fmt::Display for OverlapPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OverlapPolicy::Skip => "skip",
            OverlapPolicy::Queue => "queue",
            OverlapPolicy::Cancel => "cancel",
            OverlapPolicy::Overlap => "overlap",
        };
        f.write_str(name)
    }
}

/// Signing secret; never printed
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

fn default_rpc_url() -> String {
    "https://tea-sepolia.g.alchemy.com/public".to_string()
}

fn default_min_amount() -> String {
    "0.001".to_string()
}

fn default_max_amount() -> String {
    "0.01".to_string()
}

fn default_address_file() -> PathBuf {
    PathBuf::from("address.txt")
}

fn default_token_symbol() -> String {
    "TEA".to_string()
}

fn default_delay_min_ms() -> u64 {
    1000
}

fn default_delay_max_ms() -> u64 {
    3000
}

fn default_receipt_poll_ms() -> u64 {
    1000
}

impl Config {
    /// Load configuration from file and environment variables
    ///
    /// The file is optional. Environment variables win over the file; empty
    /// variables count as unset.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).required(false))
            .add_source(config::Environment::default().ignore_empty(true));

        Self::from_builder(builder)
    }

    fn from_builder(
        builder: config::builder::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self> {
        let settings = builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to build configuration: {}", e)))?;

        let mut config: Config = settings
            .try_deserialize()
            .map_err(|e| Error::Config(format!("Failed to deserialize configuration: {}", e)))?;
        config.interval_minutes = parse_interval_minutes(config.interval_raw.as_deref());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    ///
    /// The credential is checked first so a missing key is reported before
    /// anything else is touched.
    fn validate(&self) -> Result<()> {
        self.credential()?;

        url::Url::parse(&self.rpc_url)
            .map_err(|e| Error::Config(format!("Invalid RPC_URL {}: {}", self.rpc_url, e)))?;

        if self.delay_min_ms > self.delay_max_ms {
            return Err(Error::Config(format!(
                "DELAY_MIN_MS ({}) cannot exceed DELAY_MAX_MS ({})",
                self.delay_min_ms, self.delay_max_ms
            )));
        }

        if self.receipt_poll_ms == 0 {
            return Err(Error::Config("RECEIPT_POLL_MS must be positive".to_string()));
        }

        self.amount_range()?;

        Ok(())
    }

    /// The signing key, or the fatal missing-credential error
    pub fn credential(&self) -> Result<&str> {
        match &self.private_key {
            Some(key) if !key.expose().trim().is_empty() => Ok(key.expose().trim()),
            _ => Err(Error::MissingEnvVar(CREDENTIAL_VAR.to_string())),
        }
    }

    pub fn amount_range(&self) -> Result<AmountRange> {
        AmountRange::parse(&self.min_amount, &self.max_amount)
    }

    pub fn delay_range(&self) -> DelayRange {
        DelayRange::new(
            Duration::from_millis(self.delay_min_ms),
            Duration::from_millis(self.delay_max_ms),
        )
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.saturating_mul(60))
    }

    pub fn run_timeout(&self) -> Option<Duration> {
        (self.run_timeout_secs > 0).then(|| Duration::from_secs(self.run_timeout_secs))
    }

    pub fn confirmation_timeout(&self) -> Option<Duration> {
        (self.confirmation_timeout_secs > 0)
            .then(|| Duration::from_secs(self.confirmation_timeout_secs))
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_ms)
    }

    /// RPC endpoint with query parameters masked
    pub fn display_rpc_url(&self) -> String {
        mask_url(&self.rpc_url)
    }

    /// Get masked configuration for display (hide secrets)
    pub fn masked_display(&self) -> String {
        format!(
            r#"Configuration:
  RPC:
    endpoint: {}
    receipt_poll: {}ms
    confirmation_timeout: {}
  Wallet:
    private_key: {}
  Disbursement:
    address_file: {}
    amount: {} - {} {}
    delay: {}ms - {}ms
  Schedule:
    interval: {} min
    overlap_policy: {}
    run_timeout: {}
"#,
            self.display_rpc_url(),
            self.receipt_poll_ms,
            display_secs(self.confirmation_timeout_secs),
            if self.private_key.is_some() {
                "***"
            } else {
                "(not set)"
            },
            self.address_file.display(),
            self.min_amount,
            self.max_amount,
            self.token_symbol,
            self.delay_min_ms,
            self.delay_max_ms,
            self.interval_minutes,
            self.overlap_policy,
            display_secs(self.run_timeout_secs),
        )
    }
}

/// Resolve `INTERVAL_MINUTES` the lenient way: leading integer digits count,
/// anything else (missing, zero, negative, no digits) falls back to the default
fn parse_interval_minutes(raw: Option<&str>) -> u64 {
    let Some(raw) = raw else {
        return DEFAULT_INTERVAL_MINUTES;
    };

    let trimmed = raw.trim_start();
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let end = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(unsigned.len());
    let digits = &unsigned[..end];

    // Too many digits for u64 is still a (very large) positive number
    let minutes = match digits.parse::<u64>() {
        Ok(minutes) => minutes,
        Err(_) if !digits.is_empty() => u64::MAX,
        Err(_) => 0,
    };

    if minutes == 0 {
        warn!(
            "INTERVAL_MINUTES {:?} is not a positive integer, using {}",
            raw, DEFAULT_INTERVAL_MINUTES
        );
        return DEFAULT_INTERVAL_MINUTES;
    }

    if minutes > MAX_INTERVAL_MINUTES {
        warn!(
            "INTERVAL_MINUTES {} is too large, using {}",
            raw.trim(),
            MAX_INTERVAL_MINUTES
        );
        return MAX_INTERVAL_MINUTES;
    }

    minutes
}

fn display_secs(secs: u64) -> String {
    if secs == 0 {
        "none".to_string()
    } else {
        format!("{}s", secs)
    }
}

/// Mask URL for display (hide API keys in query params)
fn mask_url(url: &str) -> String {
    if let Some(idx) = url.find('?') {
        format!("{}?***", &url[..idx])
    } else {
        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{File, FileFormat};

    fn from_toml(toml: &str) -> Result<Config> {
        Config::from_builder(
            config::Config::builder().add_source(File::from_str(toml, FileFormat::Toml)),
        )
    }

    #[test]
    fn test_defaults() {
        let config = from_toml(r#"private_key = "0x01""#).unwrap();
        assert_eq!(config.rpc_url, "https://tea-sepolia.g.alchemy.com/public");
        assert_eq!(config.min_amount, "0.001");
        assert_eq!(config.max_amount, "0.01");
        assert_eq!(config.interval(), Duration::from_secs(60));
        assert_eq!(config.address_file, PathBuf::from("address.txt"));
        assert_eq!(config.overlap_policy, OverlapPolicy::Skip);
        assert_eq!(config.run_timeout(), None);
        assert_eq!(config.confirmation_timeout(), None);
        assert_eq!(config.credential().unwrap(), "0x01");
    }

    #[test]
    fn test_missing_credential() {
        let err = from_toml("").unwrap_err();
        assert!(matches!(err, Error::MissingEnvVar(ref var) if var == CREDENTIAL_VAR));

        let err = from_toml(r#"private_key = "   ""#).unwrap_err();
        assert!(matches!(err, Error::MissingEnvVar(_)));
    }

    #[test]
    fn test_missing_credential_reported_before_other_errors() {
        let err = from_toml(
            r#"
            min_amount = "1.0"
            max_amount = "0.5"
            interval_minutes = 0
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::MissingEnvVar(_)));
    }

    #[test]
    fn test_overrides() {
        let config = from_toml(
            r#"
            private_key = "0x01"
            rpc_url = "http://localhost:8545"
            min_amount = "0.5"
            max_amount = "2"
            interval_minutes = 15
            address_file = "recipients.txt"
            token_symbol = "ETH"
            overlap_policy = "queue"
            run_timeout_secs = 600
            confirmation_timeout_secs = 120
            "#,
        )
        .unwrap();

        assert_eq!(config.rpc_url, "http://localhost:8545");
        assert_eq!(config.interval(), Duration::from_secs(900));
        assert_eq!(config.address_file, PathBuf::from("recipients.txt"));
        assert_eq!(config.overlap_policy, OverlapPolicy::Queue);
        assert_eq!(config.run_timeout(), Some(Duration::from_secs(600)));
        assert_eq!(config.confirmation_timeout(), Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_inverted_amount_range_rejected() {
        let err = from_toml(
            r#"
            private_key = "0x01"
            min_amount = "0.5"
            max_amount = "0.1"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::AmountRange { .. }));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let bad_url = from_toml(
            r#"
            private_key = "0x01"
            rpc_url = "not a url"
            "#,
        );
        assert!(matches!(bad_url, Err(Error::Config(_))));

        let bad_delay = from_toml(
            r#"
            private_key = "0x01"
            delay_min_ms = 5000
            delay_max_ms = 1000
            "#,
        );
        assert!(matches!(bad_delay, Err(Error::Config(_))));
    }

    #[test]
    fn test_lenient_interval() {
        let cases = [
            (r#""0""#, 1),
            (r#""abc""#, 1),
            (r#""1.5""#, 1),
            (r#""5""#, 5),
            (r#"" 7 minutes""#, 7),
            (r#""-3""#, 1),
            (r#""""#, 1),
            ("0", 1),
            ("1.5", 1),
            ("30", 30),
        ];

        for (value, expected) in cases {
            let config = from_toml(&format!(
                "private_key = \"0x01\"\ninterval_minutes = {}",
                value
            ))
            .unwrap_or_else(|e| panic!("interval_minutes = {} failed: {}", value, e));
            assert_eq!(config.interval_minutes, expected, "interval_minutes = {}", value);
            assert_eq!(config.interval(), Duration::from_secs(expected * 60));
        }
    }

    #[test]
    fn test_huge_interval_is_capped() {
        for value in [r#""5256000000""#, r#""99999999999999999999999""#] {
            let config = from_toml(&format!(
                "private_key = \"0x01\"\ninterval_minutes = {}",
                value
            ))
            .unwrap();
            assert_eq!(config.interval_minutes, MAX_INTERVAL_MINUTES);
        }

        assert_eq!(parse_interval_minutes(Some("18446744073709551615")), MAX_INTERVAL_MINUTES);
        assert_eq!(parse_interval_minutes(None), DEFAULT_INTERVAL_MINUTES);
    }

    #[test]
    fn test_overlap_policy_deserialize() {
        let config = from_toml(
            r#"
            private_key = "0x01"
            overlap_policy = "overlap"
            "#,
        )
        .unwrap();
        assert_eq!(config.overlap_policy, OverlapPolicy::Overlap);
        assert_eq!(config.overlap_policy.to_string(), "overlap");
    }

    #[test]
    fn test_masked_display_hides_key() {
        let config = from_toml(
            r#"
            private_key = "0xdeadbeef"
            rpc_url = "https://rpc.example.com?key=secret"
            "#,
        )
        .unwrap();

        let display = config.masked_display();
        assert!(!display.contains("deadbeef"));
        assert!(!display.contains("secret"));
        assert!(display.contains("private_key: ***"));
        assert!(!format!("{:?}", config).contains("deadbeef"));
    }

    #[test]
    fn test_mask_url() {
        assert_eq!(
            mask_url("https://api.example.com?key=secret"),
            "https://api.example.com?***"
        );
        assert_eq!(mask_url("https://api.example.com"), "https://api.example.com");
    }
}
