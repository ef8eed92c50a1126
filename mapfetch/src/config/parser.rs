//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This module is the single place where INI key names are mapped to struct
//! fields.

use ini::Ini;
use std::path::PathBuf;

use super::file::ConfigFileError;
use super::settings::ConfigFile;
use super::size::parse_size;
use crate::coordinator::MaxConcurrentTransfers;

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_bool(section: &str, key: &str, value: &str) -> Result<bool, ConfigFileError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(invalid(section, key, value, "must be 'true' or 'false'")),
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [network] section
    if let Some(section) = ini.section(Some("network")) {
        if let Some(v) = section.get("access_token") {
            config.network.access_token = non_empty(v).map(str::to_string);
        }
        if let Some(v) = section.get("api_base_url").and_then(non_empty) {
            if !v.starts_with("http://") && !v.starts_with("https://") {
                return Err(invalid(
                    "network",
                    "api_base_url",
                    v,
                    "must start with http:// or https://",
                ));
            }
            config.network.api_base_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = section.get("managed_hosts") {
            config.network.managed_hosts = v
                .split(',')
                .filter_map(non_empty)
                .map(|host| host.to_lowercase())
                .collect();
        }
        if let Some(v) = section.get("user_agent").and_then(non_empty) {
            config.network.user_agent = v.to_string();
        }
        if let Some(v) = section.get("timeout") {
            config.network.timeout = match v.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(invalid(
                        "network",
                        "timeout",
                        v,
                        "must be a positive integer (seconds)",
                    ))
                }
            };
        }
        if let Some(v) = section.get("ca_bundle") {
            config.network.ca_bundle = non_empty(v).map(expand_tilde);
        }
    }

    // [cache] section
    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = section.get("path").and_then(non_empty) {
            config.cache.directory = expand_tilde(v);
        }
        if let Some(v) = section.get("max_size") {
            config.cache.max_size = parse_size(v).map_err(|_| {
                invalid(
                    "cache",
                    "max_size",
                    v,
                    "expected format like '50MB', '2GB', or '1024KB'",
                )
            })?;
        }
        if let Some(v) = section.get("enabled") {
            config.cache.enabled = parse_bool("cache", "enabled", v)?;
        }
    }

    // [coordinator] section
    if let Some(section) = ini.section(Some("coordinator")) {
        if let Some(v) = section.get("max_concurrent_transfers") {
            config.coordinator.max_concurrent_transfers = v
                .parse::<MaxConcurrentTransfers>()
                .map_err(|reason| invalid("coordinator", "max_concurrent_transfers", v, &reason))?;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("directory").and_then(non_empty) {
            config.logging.directory = expand_tilde(v);
        }
        if let Some(v) = section.get("file").and_then(non_empty) {
            config.logging.file = v.to_string();
        }
    }

    Ok(config)
}

/// Expand a leading `~/` to the home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
