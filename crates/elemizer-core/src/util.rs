use std::fmt::Display;
use std::str::FromStr;

use crate::error::AppError;

/// Read and parse an environment variable, falling back to `default` when it is unset.
///
/// A set but unparsable value is a [`AppError::ConfigError`], never silently replaced.
pub fn env_or<T>(name: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(name) {
        Err(_) => Ok(default),
        Ok(raw) => parse_value(name, &raw),
    }
}

/// Read a boolean flag. Accepts `true/false`, `1/0`, `yes/no`, `on/off` in any case.
pub fn env_flag(name: &str, default: bool) -> Result<bool, AppError> {
    match std::env::var(name) {
        Err(_) => Ok(default),
        Ok(raw) => parse_flag(name, &raw),
    }
}

fn parse_value<T>(name: &str, raw: &str) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim()
        .parse()
        .map_err(|e| AppError::ConfigError(format!("Invalid {name} '{raw}': {e}")))
}

fn parse_flag(name: &str, raw: &str) -> Result<bool, AppError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(AppError::ConfigError(format!(
            "Invalid {name} '{raw}': expected true or false"
        ))),
    }
}
