//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! Produces the commented INI representation written to `config.ini`.

use std::path::Path;

use super::settings::ConfigFile;
use super::size::format_size;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let access_token = config.network.access_token.as_deref().unwrap_or("");
    let managed_hosts = config.network.managed_hosts.join(", ");
    let ca_bundle = config
        .network
        .ca_bundle
        .as_ref()
        .map(|p| path_to_string(p))
        .unwrap_or_default();

    format!(
        r#"[network]
; Access token added to managed URLs (mapbox:// and the managed hosts below)
; Leave empty to send requests without a token
access_token = {}
; Base URL that mapbox:// URLs are rewritten against
api_base_url = {}
; Comma-separated list of additional hosts that receive the access token
managed_hosts = {}
; User-Agent header sent with every request
user_agent = {}
; Request timeout in seconds
timeout = {}
; PEM bundle with extra trusted root certificates (empty = system roots only)
ca_bundle = {}

[cache]
; Directory for the persistent resource cache
path = {}
; Maximum cache size (default: 50MB)
; Supports: KB, MB, GB suffixes (e.g., 500KB, 50MB, 1GB)
max_size = {}
; Set to false to disable the persistent cache
enabled = {}

[coordinator]
; Maximum number of transfers in flight at once, or 'unbounded'
max_concurrent_transfers = {}

[logging]
; Directory for the log file
directory = {}
; Log file name
file = {}
"#,
        access_token,
        config.network.api_base_url,
        managed_hosts,
        config.network.user_agent,
        config.network.timeout,
        ca_bundle,
        path_to_string(&config.cache.directory),
        format_size(config.cache.max_size),
        config.cache.enabled,
        config.coordinator.max_concurrent_transfers,
        path_to_string(&config.logging.directory),
        config.logging.file,
    )
}

/// Render a path, shortening the home directory to `~`.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::MaxConcurrentTransfers;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");

        let mut config = ConfigFile::default();
        config.network.access_token = Some("pk.saved".to_string());
        config.network.managed_hosts = vec!["a.example".to_string(), "b.example".to_string()];
        config.network.ca_bundle = Some(PathBuf::from("/etc/ssl/extra.pem"));
        config.cache.directory = PathBuf::from("/var/cache/mapfetch");
        config.cache.max_size = 200 * 1024 * 1024;
        config.coordinator.max_concurrent_transfers = MaxConcurrentTransfers::Unbounded;

        config.save_to(&config_path).unwrap();
        let loaded = ConfigFile::load_from(&config_path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_default_round_trips() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");

        ConfigFile::default().save_to(&config_path).unwrap();

        assert_eq!(
            ConfigFile::load_from(&config_path).unwrap(),
            ConfigFile::default()
        );
    }

    #[test]
    fn test_output_is_commented() {
        let text = to_config_string(&ConfigFile::default());
        assert!(text.contains("[network]"));
        assert!(text.contains("max_size = 50MB"));
        assert!(text.contains("max_concurrent_transfers = 4"));
        assert!(text.lines().any(|l| l.starts_with("; ")));
    }

    #[test]
    fn test_home_is_shortened() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(path_to_string(&home.join("cache")), "~/cache");
        }
    }
}
