//! Daemon configuration.
//!
//! Layering, lowest precedence first: built-in defaults, the TOML file,
//! `JOGHD_*` environment variables. The result is validated once and the
//! targets are resolved into fully defaulted [`Target`]s.

use crate::error::{JoghdError, Result};
use crate::retry::RetryPolicy;
use crate::target::{Target, DEFAULT_EXPECTED_STATUS, DEFAULT_INTERVAL, DEFAULT_METHOD};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::ffi::OsString;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "JOGHD_";

/// Default Telegram Bot API endpoint
pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// How the daemon runs its checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Check every target once and exit
    #[default]
    Oneshot,
    /// Check every target on its interval until shut down
    Continuous,
}

impl FromStr for RunMode {
    type Err = JoghdError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "oneshot" => Ok(RunMode::Oneshot),
            "continuous" => Ok(RunMode::Continuous),
            other => Err(JoghdError::invalid_config(
                format!("invalid app.mode: {}", other),
                "app.mode must be 'oneshot' or 'continuous'",
            )),
        }
    }
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunMode::Oneshot => write!(f, "oneshot"),
            RunMode::Continuous => write!(f, "continuous"),
        }
    }
}

/// `[app]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub mode: RunMode,
    pub log_level: String,
    /// Maximum probes in flight in one-shot mode
    pub concurrency: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mode: RunMode::Oneshot,
            log_level: "info".to_string(),
            concurrency: 10,
        }
    }
}

/// `[http]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Timeout for targets that don't set their own
    #[serde(deserialize_with = "duration::deserialize")]
    pub timeout: Duration,
    pub user_agent: String,
    pub skip_tls_verification: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            user_agent: "Joghd/1.0".to_string(),
            skip_tls_verification: false,
        }
    }
}

/// `[alerters.telegram]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub enabled: bool,
    pub bot_token: String,
    pub chat_id: String,
    pub api_url: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bot_token: String::new(),
            chat_id: String::new(),
            api_url: TELEGRAM_API_URL.to_string(),
        }
    }
}

/// `[alerters]`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AlertersConfig {
    pub telegram: TelegramConfig,
}

/// One `[[targets]]` entry as written in the file; unset fields are defaulted
/// by [`Config::targets`]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TargetSpec {
    pub name: String,
    pub url: String,
    pub method: Option<String>,
    pub expected_status: Option<u16>,
    #[serde(deserialize_with = "duration::deserialize_option")]
    pub timeout: Option<Duration>,
    #[serde(deserialize_with = "duration::deserialize_option")]
    pub interval: Option<Duration>,
    pub headers: BTreeMap<String, String>,
}

/// Complete daemon configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub app: AppConfig,
    pub http: HttpConfig,
    pub retry: RetryPolicy,
    pub alerters: AlertersConfig,
    #[serde(rename = "targets")]
    pub target_specs: Vec<TargetSpec>,
}

impl Config {
    /// Load defaults, then the file at `path` (if any), then `JOGHD_*`
    /// environment overrides, and validate the result.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let label = path.display().to_string();
                let contents = std::fs::read_to_string(path)
                    .map_err(|e| JoghdError::config_read(&label, e))?;
                debug!("Loaded config file {}", label);
                Self::from_toml_str(&contents, &label)?
            }
            None => Self::default(),
        };

        config.apply_env_overrides(prefixed_env(std::env::vars_os())?)?;
        config.validate()?;

        Ok(config)
    }

    /// Parse a TOML document on top of the defaults, without validating
    pub fn from_toml_str(contents: &str, label: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| JoghdError::config_parse(label, e.to_string()))
    }

    /// Apply `JOGHD_<SECTION>_<FIELD>` overrides. Unrecognized keys are ignored.
    pub fn apply_env_overrides<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (name, value) in vars {
            let Some(key) = name.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let key = key.to_ascii_lowercase();

            match key.as_str() {
                "app_mode" => self.app.mode = value.parse()?,
                "app_log_level" => self.app.log_level = value,
                "app_concurrency" => self.app.concurrency = parse_env(&name, &value)?,
                "http_timeout" => self.http.timeout = parse_env_duration(&name, &value)?,
                "http_user_agent" => self.http.user_agent = value,
                "http_skip_tls_verification" => {
                    self.http.skip_tls_verification = parse_env(&name, &value)?
                }
                "retry_max_attempts" => self.retry.max_attempts = parse_env(&name, &value)?,
                "retry_initial_wait" => {
                    self.retry.initial_wait = parse_env_duration(&name, &value)?
                }
                "retry_max_wait" => self.retry.max_wait = parse_env_duration(&name, &value)?,
                "retry_multiplier" => self.retry.multiplier = parse_env(&name, &value)?,
                "alerters_telegram_enabled" => {
                    self.alerters.telegram.enabled = parse_env(&name, &value)?
                }
                "alerters_telegram_bot_token" => self.alerters.telegram.bot_token = value,
                "alerters_telegram_chat_id" => self.alerters.telegram.chat_id = value,
                "alerters_telegram_api_url" => self.alerters.telegram.api_url = value,
                // Config file path, consumed by the CLI
                "config" => continue,
                _ => {
                    warn!("Ignoring unrecognized environment override {}", name);
                    continue;
                }
            }

            debug!("Applied environment override {}", name);
        }

        Ok(())
    }

    /// Check every invariant the checker and scheduler rely on
    pub fn validate(&self) -> Result<()> {
        if self.app.concurrency < 1 {
            return Err(JoghdError::invalid_config(
                "app.concurrency must be at least 1",
                "Set app.concurrency to the number of probes allowed in flight",
            ));
        }

        self.retry.validate()?;

        let telegram = &self.alerters.telegram;
        if telegram.enabled {
            if telegram.bot_token.is_empty() {
                return Err(JoghdError::invalid_config(
                    "telegram.bot_token is required when telegram is enabled",
                    "Set alerters.telegram.bot_token or JOGHD_ALERTERS_TELEGRAM_BOT_TOKEN",
                ));
            }
            if telegram.chat_id.is_empty() {
                return Err(JoghdError::invalid_config(
                    "telegram.chat_id is required when telegram is enabled",
                    "Set alerters.telegram.chat_id or JOGHD_ALERTERS_TELEGRAM_CHAT_ID",
                ));
            }
        }

        let mut names = HashSet::new();
        let mut urls = HashSet::new();
        for (i, spec) in self.target_specs.iter().enumerate() {
            if spec.url.is_empty() {
                return Err(JoghdError::invalid_config(
                    format!("target[{}]: url is required", i),
                    "Every [[targets]] entry needs a url",
                ));
            }
            if spec.name.is_empty() {
                return Err(JoghdError::invalid_config(
                    format!("target[{}]: name is required", i),
                    "Every [[targets]] entry needs a name",
                ));
            }
            if !names.insert(spec.name.as_str()) {
                return Err(JoghdError::invalid_config(
                    format!("target[{}]: duplicate name '{}'", i, spec.name),
                    "Target names must be unique",
                ));
            }
            if !urls.insert(spec.url.as_str()) {
                return Err(JoghdError::invalid_config(
                    format!("target[{}]: duplicate url '{}'", i, spec.url),
                    "Health state is tracked per url, so each url may appear only once",
                ));
            }
            if spec.interval == Some(Duration::ZERO) {
                return Err(JoghdError::invalid_config(
                    format!("target[{}]: interval must be greater than zero", i),
                    "Omit interval to use the 30s default",
                ));
            }
            if let Some(status) = spec.expected_status.filter(|s| *s != 0) {
                if !(100..=599).contains(&status) {
                    return Err(JoghdError::invalid_config(
                        format!("target[{}]: expected_status {} is not an HTTP status", i, status),
                        "Use a status code between 100 and 599",
                    ));
                }
            }
        }

        Ok(())
    }

    /// Resolve the configured targets, filling in defaults
    pub fn targets(&self) -> Vec<Target> {
        self.target_specs
            .iter()
            .map(|spec| Target {
                name: spec.name.clone(),
                url: spec.url.clone(),
                method: spec
                    .method
                    .as_deref()
                    .filter(|m| !m.is_empty())
                    .unwrap_or(DEFAULT_METHOD)
                    .to_ascii_uppercase(),
                expected_status: spec
                    .expected_status
                    .filter(|s| *s != 0)
                    .unwrap_or(DEFAULT_EXPECTED_STATUS),
                timeout: spec
                    .timeout
                    .filter(|t| !t.is_zero())
                    .unwrap_or(self.http.timeout),
                interval: spec.interval.unwrap_or(DEFAULT_INTERVAL),
                headers: spec.headers.clone(),
            })
            .collect()
    }
}

/// Keep only `JOGHD_*` variables. Variables with non-UTF-8 names can't be
/// ours and are skipped; a non-UTF-8 value on one of ours is an error.
fn prefixed_env<I>(vars: I) -> Result<Vec<(String, String)>>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    let mut prefixed = Vec::new();
    for (name, value) in vars {
        let Some(name) = name.to_str().filter(|n| n.starts_with(ENV_PREFIX)) else {
            continue;
        };
        let value = value.into_string().map_err(|raw| {
            JoghdError::invalid_config(
                format!("{} is not valid UTF-8: {:?}", name, raw),
                "Environment overrides must be UTF-8 text",
            )
        })?;
        prefixed.push((name.to_string(), value));
    }
    Ok(prefixed)
}

fn parse_env<T>(name: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| {
        JoghdError::invalid_config(
            format!("{}={}: {}", name, value, e),
            "Check the value's type against the config file reference",
        )
    })
}

fn parse_env_duration(name: &str, value: &str) -> Result<Duration> {
    duration::parse(value).ok_or_else(|| {
        JoghdError::invalid_config(
            format!("{}={}: not a duration", name, value),
            "Use a duration like \"500ms\", \"10s\", \"5m\" or a number of seconds",
        )
    })
}

/// Human-friendly durations: "500ms", "10s", "5m", "1h" or integer seconds.
pub mod duration {
    use serde::de::{self, Deserializer, Visitor};
    use std::time::Duration;

    /// Parse a duration string, `None` if malformed
    pub fn parse(s: &str) -> Option<Duration> {
        let s = s.trim();
        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim().parse::<u64>().ok().map(Duration::from_millis)
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim().parse::<u64>().ok().map(Duration::from_secs)
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.trim()
                .parse::<u64>()
                .ok()
                .and_then(|m| m.checked_mul(60))
                .map(Duration::from_secs)
        } else if let Some(hours) = s.strip_suffix('h') {
            hours
                .trim()
                .parse::<u64>()
                .ok()
                .and_then(|h| h.checked_mul(3600))
                .map(Duration::from_secs)
        } else {
            s.parse::<u64>().ok().map(Duration::from_secs)
        }
    }

    struct DurationVisitor;

    impl Visitor<'_> for DurationVisitor {
        type Value = Duration;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            f.write_str("a duration such as \"10s\" or an integer number of seconds")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Duration, E> {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Duration, E> {
            u64::try_from(v)
                .map(Duration::from_secs)
                .map_err(|_| E::custom(format!("negative duration: {}", v)))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Duration, E> {
            parse(v).ok_or_else(|| E::custom(format!("invalid duration: {:?}", v)))
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        deserializer.deserialize_any(DurationVisitor)
    }

    pub fn deserialize_option<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        deserializer.deserialize_any(DurationVisitor).map(Some)
    }
}
