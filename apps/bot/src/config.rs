//! YAML configuration with environment overrides.
//!
//! `${ENV_VAR}` placeholders inside string values are resolved before
//! deserialization, so secrets like bot tokens stay out of the file. The
//! `POSITIONS` and `INDICES` environment variables override the portfolio
//! and index lists wholesale, which is how container deployments configure
//! the bot without mounting a file edit.

use std::path::Path;

use serde::Deserialize;
use stockbot_core::{Position, SortKey};
use thiserror::Error;
use tracing::warn;

const DEFAULT_CONFIG_PATH: &str = "config.yml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub portfolio: PortfolioConfig,
    pub report: ReportConfig,
    pub telegram: TelegramConfig,
    pub signal: SignalConfig,
    pub schedule: ScheduleConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PortfolioConfig {
    pub base_currency: String,
    pub positions: Vec<Position>,
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            base_currency: "EUR".to_string(),
            positions: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub sort_by: SortKey,
    pub top_n: usize,
    pub include_index: Vec<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            sort_by: SortKey::default(),
            top_n: 10,
            include_index: Vec::new(),
        }
    }
}

/// Telegram delivery settings. Header and footer live here and are shared
/// with the Signal channel.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_ids: Vec<String>,
    pub header: String,
    pub footer: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chat_ids: Vec::new(),
            header: "Daily Stock Report".to_string(),
            footer: "— sent by stock-bot".to_string(),
        }
    }
}

/// Signal delivery settings, for a signal-cli-rest-api instance.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    pub sender: String,
    pub recipients: Vec<String>,
    pub api_base: String,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            sender: String::new(),
            recipients: Vec::new(),
            api_base: "http://signal:8080".to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Local wall-clock times in HH:MM, interpreted in `timezone`.
    pub times: Vec<String>,
    pub timezone: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            times: vec!["08:10".to_string()],
            timezone: "Europe/Amsterdam".to_string(),
        }
    }
}

/// Load configuration from the given path, or `CONFIG_PATH`, or `config.yml`.
pub fn load(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path
        .map(str::to_string)
        .or_else(|| std::env::var("CONFIG_PATH").ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let mut config = if Path::new(&path).exists() {
        let raw = std::fs::read_to_string(&path)?;
        parse(&raw)?
    } else {
        warn!("Config file not found at {}, using defaults", path);
        Config::default()
    };

    apply_env_overrides(&mut config);
    Ok(config)
}

fn parse(raw: &str) -> Result<Config, ConfigError> {
    let mut value: serde_yaml::Value = serde_yaml::from_str(raw)?;
    resolve_env_vars(&mut value);
    Ok(serde_yaml::from_value(value)?)
}

/// Resolve `${ENV_VAR}` placeholders in every string value. Unset variables
/// resolve to the empty string.
fn resolve_env_vars(value: &mut serde_yaml::Value) {
    match value {
        serde_yaml::Value::String(s) if s.contains("${") => *s = interpolate(s),
        serde_yaml::Value::Sequence(seq) => seq.iter_mut().for_each(resolve_env_vars),
        serde_yaml::Value::Mapping(map) => {
            map.iter_mut().for_each(|(_, v)| resolve_env_vars(v));
        }
        _ => {}
    }
}

fn interpolate(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        match rest[start + 2..].find('}') {
            Some(end) => {
                let name = &rest[start + 2..start + 2 + end];
                out.push_str(&std::env::var(name).unwrap_or_default());
                rest = &rest[start + 2 + end + 1..];
            }
            None => {
                // Unterminated placeholder, keep it verbatim
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(raw) = std::env::var("POSITIONS") {
        if !raw.is_empty() {
            config.portfolio.positions = parse_positions_env(&raw);
        }
    }

    if let Ok(raw) = std::env::var("INDICES") {
        if !raw.is_empty() {
            config.report.include_index = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
    }
}

/// Parse the `POSITIONS` override, e.g. `AAPL:12:148.20,MSFT:8,ASML.AS:5`.
/// Malformed entries are skipped so one typo doesn't take the bot down.
fn parse_positions_env(raw: &str) -> Vec<Position> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| match entry.parse::<Position>() {
            Ok(pos) => Some(pos),
            Err(e) => {
                warn!("Skipping malformed position '{}': {}", entry, e);
                None
            }
        })
        .collect()
}
